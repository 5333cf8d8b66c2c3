//! Persistence seam for the `users` collection.
//!
//! Everything above this module works against [`UserStore`]; the MongoDB
//! backend is used in production and the in-memory backend in development
//! and tests.

pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::models::{RawUserDocument, UserStatus};
use crate::utils::AppError;

pub use memory::InMemoryUserStore;
pub use mongo::MongoUserStore;

/// Each item is the full collection at one point in time
pub type SnapshotStream = BoxStream<'static, Result<Vec<RawUserDocument>, AppError>>;

#[async_trait]
pub trait UserStore: Send + Sync {
    /// One-shot read of the whole collection
    async fn fetch_all(&self) -> Result<Vec<RawUserDocument>, AppError>;

    /// Partial update of the `status` field only. Fails with `NotFound` when
    /// no document has this id.
    async fn update_status(&self, id: &str, status: UserStatus) -> Result<(), AppError>;

    /// Live query: yields the current snapshot first, then a fresh snapshot
    /// after every change. Dropping the stream releases the subscription.
    async fn subscribe(&self) -> Result<SnapshotStream, AppError>;

    /// Cheap round trip used by the health endpoint
    async fn ping(&self) -> Result<(), AppError>;

    fn backend(&self) -> &'static str;
}
