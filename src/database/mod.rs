use mongodb::{Client, Collection, Database};

use crate::utils::AppError;

#[derive(Clone)]
pub struct MongoDB {
    db: Database,
}

impl MongoDB {
    pub async fn new(uri: &str, users_collection: &str) -> Result<Self, AppError> {
        let mut client_options = mongodb::options::ClientOptions::parse(uri).await?;

        // Pool pequeno: o painel tem poucos admins simultâneos
        client_options.max_pool_size = Some(10);
        client_options.min_pool_size = Some(1);
        client_options.max_idle_time = Some(std::time::Duration::from_secs(300));
        client_options.app_name = Some(env!("CARGO_PKG_NAME").to_string());

        client_options.connect_timeout = Some(std::time::Duration::from_secs(5));
        client_options.server_selection_timeout = Some(std::time::Duration::from_secs(5));

        let client = Client::with_options(client_options)?;

        // Extract database name from URI or use default
        let db_name = database_name_from_uri(uri);
        let db = client.database(db_name);

        // Test connection
        db.list_collection_names().await?;

        let mongodb = Self { db };
        mongodb.ensure_indexes(users_collection).await;

        Ok(mongodb)
    }

    /// Indexes for the admin list; failures are not fatal
    async fn ensure_indexes(&self, users_collection: &str) {
        use mongodb::bson::doc;
        use mongodb::IndexModel;

        log::info!("🔧 Creating database indexes...");

        let users = self.collection::<mongodb::bson::Document>(users_collection);

        for keys in [doc! { "status": 1 }, doc! { "email": 1 }] {
            let label = keys.keys().cloned().collect::<Vec<_>>().join(", ");
            let index = IndexModel::builder().keys(keys).build();

            match users.create_index(index).await {
                Ok(_) => log::info!("   ✅ Index created: {}({})", users_collection, label),
                Err(e) => log::debug!("   ℹ️  Index not created: {}", e),
            }
        }

        log::info!("✅ Database indexes ready");
    }

    pub fn collection<T: Send + Sync>(&self, name: &str) -> Collection<T> {
        self.db.collection(name)
    }

    pub async fn health_check(&self) -> Result<(), AppError> {
        self.db.list_collection_names().await?;
        Ok(())
    }
}

fn database_name_from_uri(uri: &str) -> &str {
    let without_scheme = uri.split("://").nth(1).unwrap_or(uri);
    without_scheme
        .split_once('/')
        .map(|(_, rest)| rest.split('?').next().unwrap_or(""))
        .filter(|name| !name.is_empty())
        .unwrap_or("applicants")
}
