use log::warn;
use mongodb::{Client, Collection};
use snafu::ResultExt;

use crate::errors::{LifestreamError, StoreConfigSnafu};

use super::{DocumentStore, SensorDocument};

/// Environment variable holding the MongoDB connection string.
pub const MONGO_URI_ENV: &str = "MONGO_DB_URI";
/// Driver default used when no connection string is configured.
pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE: &str = "health_data";
pub const DEFAULT_COLLECTION: &str = "sensor_data";

/// Sensor documents stored in a MongoDB collection.
pub struct MongoDocumentStore {
    collection: Collection<SensorDocument>,
}

impl MongoDocumentStore {
    /// Build a client for `uri`. The driver connects lazily, so an unreachable server only
    /// shows up as failed inserts later on.
    pub async fn connect(
        uri: &str,
        database: &str,
        collection: &str,
    ) -> Result<Self, LifestreamError> {
        let client = Client::with_uri_str(uri).await.context(StoreConfigSnafu)?;
        Ok(Self {
            collection: client.database(database).collection(collection),
        })
    }

    /// Connection string from the environment, falling back to a local server.
    pub fn uri_from_env() -> String {
        std::env::var(MONGO_URI_ENV).unwrap_or_else(|_| {
            warn!(
                "{} is not set, recording to {}",
                MONGO_URI_ENV, DEFAULT_MONGO_URI
            );
            DEFAULT_MONGO_URI.to_string()
        })
    }
}

impl DocumentStore for MongoDocumentStore {
    async fn insert(&self, document: SensorDocument) -> Result<(), LifestreamError> {
        self.collection
            .insert_one(document)
            .await
            .map(|_| ())
            .map_err(|e| LifestreamError::StoreWrite {
                reason: e.to_string(),
            })
    }
}
