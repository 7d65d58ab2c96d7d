//! Application state wiring the catalog and pipeline together.
//!
//! AppState holds the concrete instances used by both CLI and REST API.
//! The catalog and pipeline are generic over their ports, but AppState pins
//! them to the infra implementations.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use eventwatch_core::catalog::box_embedder::BoxEmbedder;
use eventwatch_core::catalog::engine::EventCatalog;
use eventwatch_core::ingest::pipeline::IngestionPipeline;
use eventwatch_infra::config::{load_config, records_path, resolve_data_dir, vector_path};
use eventwatch_infra::llm::OpenAiEventModel;
use eventwatch_infra::record::json_store::JsonRecordStore;
use eventwatch_infra::vector::embedder::FastEmbedder;
use eventwatch_infra::vector::index::LanceVectorIndex;
use eventwatch_infra::vector::lance::LanceVectorStore;
use eventwatch_types::config::CatalogConfig;

/// Concrete type aliases for the generics pinned to infra implementations.
pub type ConcreteCatalog = EventCatalog<JsonRecordStore, LanceVectorIndex>;

pub type ConcretePipeline =
    IngestionPipeline<OpenAiEventModel, OpenAiEventModel, JsonRecordStore, LanceVectorIndex>;

/// Shared application state.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<ConcreteCatalog>,
    /// `None` when no LLM API key is configured.
    pub pipeline: Option<Arc<ConcretePipeline>>,
    pub config: Arc<CatalogConfig>,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Initialize the application state from the resolved data directory.
    pub async fn init() -> anyhow::Result<Self> {
        let data_dir = resolve_data_dir();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .with_context(|| format!("failed to create data dir {}", data_dir.display()))?;

        let config = load_config(&data_dir).await;

        let records = JsonRecordStore::open(records_path(&data_dir, &config))
            .await
            .context("failed to open record store")?;

        // Model loading may download weights; keep it off the async workers.
        let model_name = config.embedding.model.clone();
        let cache_dir = config
            .embedding
            .cache_dir
            .as_ref()
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("models"));
        let embedder =
            tokio::task::spawn_blocking(move || FastEmbedder::new(&model_name, Some(cache_dir)))
                .await?
                .context("failed to load embedding model")?;
        let embedder = BoxEmbedder::new(embedder);

        let vector_store = LanceVectorStore::new(vector_path(&data_dir, &config))
            .await
            .context("failed to open vector store")?;
        let index = LanceVectorIndex::open(
            &vector_store,
            &config.vector.table,
            embedder.dimension(),
            config.vector.distance,
            embedder.model_name(),
        )
        .await
        .context("failed to open vector index")?;

        let catalog = Arc::new(EventCatalog::new(
            records,
            index,
            Arc::new(embedder),
            config.dedup.threshold,
        ));

        if config.reconcile_on_startup {
            // A failed pass leaves the catalog usable; the next pass retries.
            if let Err(e) = catalog.reconcile().await {
                tracing::warn!(error = %e, "Startup reconciliation failed");
            }
        }

        let pipeline = match OpenAiEventModel::from_env(&config.llm) {
            Some(model) => Some(Arc::new(IngestionPipeline::new(
                model.clone(),
                model,
                Arc::clone(&catalog),
            ))),
            None => {
                tracing::info!(
                    env = %config.llm.api_key_env,
                    "No LLM API key set, report submission disabled"
                );
                None
            }
        };

        Ok(Self {
            catalog,
            pipeline,
            config: Arc::new(config),
            data_dir,
        })
    }
}
