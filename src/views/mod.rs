//! Server-side view models for the admin dashboard
pub mod user_detail;
pub mod user_list;

pub use user_detail::*;
pub use user_list::*;
