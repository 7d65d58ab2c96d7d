//! LanceDB connection for the event vector index.
//!
//! `LanceVectorStore` owns the `lancedb::Connection` rooted at the configured
//! vector directory; `LanceVectorIndex` opens its table through it.

use std::path::PathBuf;
use std::sync::Arc;

use arrow_schema::Schema;

pub struct LanceVectorStore {
    db: lancedb::Connection,
}

impl LanceVectorStore {
    /// Connect to the LanceDB directory at `dir`, creating it if missing.
    pub async fn new(dir: PathBuf) -> Result<Self, lancedb::Error> {
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| lancedb::Error::CreateDir {
                path: dir.display().to_string(),
                source: e,
            })?;

        let uri = dir.to_str().ok_or_else(|| lancedb::Error::InvalidInput {
            message: format!("vector directory is not valid UTF-8: {}", dir.display()),
        })?;

        let db = lancedb::connect(uri).execute().await?;
        tracing::debug!(path = %dir.display(), "Vector store connected");
        Ok(Self { db })
    }

    /// Open the event table, creating it empty with `schema` on first use.
    pub async fn ensure_table(
        &self,
        table_name: &str,
        schema: Arc<Schema>,
    ) -> Result<lancedb::Table, lancedb::Error> {
        match self.db.open_table(table_name).execute().await {
            Ok(table) => Ok(table),
            Err(lancedb::Error::TableNotFound { .. }) => {
                tracing::info!(table = table_name, "Creating event vector table");
                self.db
                    .create_empty_table(table_name, schema)
                    .execute()
                    .await
            }
            Err(e) => Err(e),
        }
    }
}
