use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use surrealdb::engine::local::{Db, RocksDb};
use surrealdb::Surreal;
use tracing::debug;

use crate::error::Result;
use crate::models::{CleanableFile, EmbeddingRecord};

const EMBEDDINGS: &str = "embeddings";
const CLEANABLES: &str = "cleanables";

/// Persistence for per-user results, keyed by (user, file).
#[async_trait]
pub trait RecordStore: Send + Sync {
    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<()>;
    async fn embeddings(&self, user_id: &str) -> Result<Vec<EmbeddingRecord>>;
    /// Drops the user's embeddings for files not in `file_ids`. Returns how many went.
    async fn retain_embeddings(&self, user_id: &str, file_ids: &[String]) -> Result<usize>;
    async fn put_cleanable(&self, user_id: &str, file: CleanableFile) -> Result<()>;
    /// Swaps the user's stored cleanables for `files`.
    async fn replace_cleanables(&self, user_id: &str, files: Vec<CleanableFile>) -> Result<()>;
    async fn cleanables(&self, user_id: &str) -> Result<Vec<CleanableFile>>;
    /// Forgets everything stored for one file.
    async fn remove(&self, user_id: &str, file_id: &str) -> Result<()>;
}

#[derive(Debug, Serialize, Deserialize, Clone)]
struct CleanableRecord {
    user_id: String,
    file_id: String,
    cleanable: CleanableFile,
}

fn record_key(user_id: &str, file_id: &str) -> String {
    format!("{}/{}", user_id, file_id)
}

pub struct SurrealStore {
    db: Surreal<Db>,
}

impl SurrealStore {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_string_lossy().to_string();
        let db = Surreal::new::<RocksDb>(path.as_str()).await?;
        db.use_ns("organizer").use_db("files").await?;
        db.query(
            "
            DEFINE TABLE embeddings SCHEMALESS;
            DEFINE FIELD user_id ON embeddings TYPE string;
            DEFINE FIELD file_id ON embeddings TYPE string;
            DEFINE FIELD embedding ON embeddings TYPE array<float>;
            DEFINE INDEX idx_embeddings_user ON embeddings FIELDS user_id;

            DEFINE TABLE cleanables SCHEMALESS;
            DEFINE FIELD user_id ON cleanables TYPE string;
            DEFINE FIELD file_id ON cleanables TYPE string;
            DEFINE INDEX idx_cleanables_user ON cleanables FIELDS user_id;
        "
        ).await?;

        debug!(path = %path, "opened record store");
        Ok(Self { db })
    }
}

#[async_trait]
impl RecordStore for SurrealStore {
    async fn put_embedding(&self, record: EmbeddingRecord) -> Result<()> {
        let key = record_key(&record.user_id, &record.file_id);
        let _: Option<EmbeddingRecord> = self.db
            .update((EMBEDDINGS, key.as_str()))
            .content(record).await?;
        Ok(())
    }

    async fn embeddings(&self, user_id: &str) -> Result<Vec<EmbeddingRecord>> {
        let records: Vec<EmbeddingRecord> = self.db
            .query("SELECT * FROM embeddings WHERE user_id = $user ORDER BY file_id")
            .bind(("user", user_id.to_string())).await?
            .take(0)?;
        Ok(records)
    }

    async fn retain_embeddings(&self, user_id: &str, file_ids: &[String]) -> Result<usize> {
        let keep: HashSet<&str> = file_ids.iter().map(String::as_str).collect();
        let mut removed = 0;

        for record in self.embeddings(user_id).await? {
            if keep.contains(record.file_id.as_str()) {
                continue;
            }
            let key = record_key(user_id, &record.file_id);
            let _: Option<EmbeddingRecord> = self.db.delete((EMBEDDINGS, key.as_str())).await?;
            removed += 1;
        }

        if removed > 0 {
            debug!(user_id, removed, "dropped stale embeddings");
        }
        Ok(removed)
    }

    async fn put_cleanable(&self, user_id: &str, file: CleanableFile) -> Result<()> {
        let key = record_key(user_id, &file.file_id);
        let record = CleanableRecord {
            user_id: user_id.to_string(),
            file_id: file.file_id.clone(),
            cleanable: file,
        };
        let _: Option<CleanableRecord> = self.db
            .update((CLEANABLES, key.as_str()))
            .content(record).await?;
        Ok(())
    }

    async fn cleanables(&self, user_id: &str) -> Result<Vec<CleanableFile>> {
        let records: Vec<CleanableRecord> = self.db
            .query("SELECT * FROM cleanables WHERE user_id = $user ORDER BY file_id")
            .bind(("user", user_id.to_string())).await?
            .take(0)?;
        Ok(records.into_iter().map(|r| r.cleanable).collect())
    }

    async fn replace_cleanables(&self, user_id: &str, files: Vec<CleanableFile>) -> Result<()> {
        self.db
            .query("DELETE cleanables WHERE user_id = $user")
            .bind(("user", user_id.to_string())).await?
            .check()?;

        for file in files {
            self.put_cleanable(user_id, file).await?;
        }
        Ok(())
    }

    async fn remove(&self, user_id: &str, file_id: &str) -> Result<()> {
        let key = record_key(user_id, file_id);
        let _: Option<EmbeddingRecord> = self.db.delete((EMBEDDINGS, key.as_str())).await?;
        let _: Option<CleanableRecord> = self.db.delete((CLEANABLES, key.as_str())).await?;
        Ok(())
    }
}
