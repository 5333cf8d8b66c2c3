use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use mongodb::bson::{doc, oid::ObjectId, Document};
use mongodb::Collection;

use super::{SnapshotStream, UserStore};
use crate::database::MongoDB;
use crate::models::{RawUserDocument, UserStatus};
use crate::utils::AppError;

/// `users` collection on MongoDB
#[derive(Clone)]
pub struct MongoUserStore {
    db: MongoDB,
    collection_name: String,
}

impl MongoUserStore {
    pub fn new(db: MongoDB, collection_name: impl Into<String>) -> Self {
        Self {
            db,
            collection_name: collection_name.into(),
        }
    }

    fn collection(&self) -> Collection<Document> {
        self.db.collection::<Document>(&self.collection_name)
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn fetch_all(&self) -> Result<Vec<RawUserDocument>, AppError> {
        fetch_documents(&self.collection()).await
    }

    async fn update_status(&self, id: &str, status: UserStatus) -> Result<(), AppError> {
        let result = self
            .collection()
            .update_one(id_filter(id), doc! { "$set": { "status": status.as_str() } })
            .await?;

        if result.matched_count == 0 {
            return Err(AppError::NotFound(format!("User {} not found", id)));
        }

        log::debug!(
            "📝 {}.{} status -> {} (modified: {})",
            self.collection_name,
            id,
            status,
            result.modified_count
        );
        Ok(())
    }

    async fn subscribe(&self) -> Result<SnapshotStream, AppError> {
        let collection = self.collection();

        // Abre o change stream antes da leitura inicial para não perder eventos
        let changes = collection.watch().await?;
        let initial = fetch_documents(&collection).await?;

        log::info!("👀 Watching {} for changes", self.collection_name);

        let updates = changes.then(move |event| {
            let collection = collection.clone();
            async move {
                event.map_err(AppError::from)?;
                fetch_documents(&collection).await
            }
        });

        Ok(stream::once(async move { Ok::<_, AppError>(initial) }).chain(updates).boxed())
    }

    async fn ping(&self) -> Result<(), AppError> {
        self.db.health_check().await
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}

/// Reads the whole collection. A bad document fails the read instead of being
/// skipped so callers never see a partial list.
async fn fetch_documents(collection: &Collection<Document>) -> Result<Vec<RawUserDocument>, AppError> {
    let mut cursor = collection.find(doc! {}).await?;
    let mut docs = Vec::new();

    while let Some(result) = cursor.next().await {
        let document = result?;
        match RawUserDocument::from_document(document) {
            Some(raw) => docs.push(raw),
            None => log::warn!("⚠️  Skipping document without _id"),
        }
    }

    Ok(docs)
}

/// Ids are opaque strings; a 24-char hex id may be stored as either an ObjectId or a string
fn id_filter(id: &str) -> Document {
    match ObjectId::parse_str(id) {
        Ok(oid) => doc! { "$or": [ { "_id": oid }, { "_id": id } ] },
        Err(_) => doc! { "_id": id },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_string_ids_match_directly() {
        assert_eq!(id_filter("firebase-uid-123"), doc! { "_id": "firebase-uid-123" });
    }

    #[test]
    fn hex_ids_match_object_id_or_string() {
        let oid = ObjectId::new();
        let hex = oid.to_hex();
        assert_eq!(
            id_filter(&hex),
            doc! { "$or": [ { "_id": oid }, { "_id": hex.as_str() } ] }
        );
    }

    #[tokio::test]
    #[ignore] // Requires MongoDB running as a replica set
    async fn test_mongodb_roundtrip() {
        dotenv::dotenv().ok();
        let uri = std::env::var("DATABASE_URL").unwrap_or_else(|_| "mongodb://localhost:27017/applicants_test".to_string());
        let db = MongoDB::new(&uri, "users").await.unwrap();
        let store = MongoUserStore::new(db, "users");

        assert!(store.ping().await.is_ok());
        assert!(store.fetch_all().await.is_ok());
    }
}
