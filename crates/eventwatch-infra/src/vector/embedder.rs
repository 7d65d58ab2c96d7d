//! FastEmbed-based local embedding generator.
//!
//! Implements the `Embedder` trait from `eventwatch-core` using fastembed
//! with ONNX runtime inference. The default model is AllMiniLML6V2
//! (384 dimensions). Inference is CPU-bound, so every call runs on the
//! blocking thread pool.

use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use fastembed::{EmbeddingModel, InitOptions, TextEmbedding};

use eventwatch_core::catalog::embedder::Embedder;
use eventwatch_types::error::RepositoryError;

/// A supported local embedding model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelSpec {
    pub name: &'static str,
    pub dimension: usize,
}

impl ModelSpec {
    fn fastembed_model(&self) -> EmbeddingModel {
        match self.name {
            "bge-small-en-v1.5" => EmbeddingModel::BGESmallENV15,
            _ => EmbeddingModel::AllMiniLML6V2,
        }
    }
}

const MODELS: &[ModelSpec] = &[
    ModelSpec {
        name: "all-minilm-l6-v2",
        dimension: 384,
    },
    ModelSpec {
        name: "bge-small-en-v1.5",
        dimension: 384,
    },
];

/// Look up a configured model name (case-insensitive).
pub fn model_spec(name: &str) -> Option<ModelSpec> {
    let wanted = name.trim().to_lowercase();
    MODELS.iter().copied().find(|spec| spec.name == wanted)
}

/// Local embedder backed by a fastembed `TextEmbedding`.
///
/// `TextEmbedding::embed` takes `&mut self`, so the model sits behind a
/// mutex shared with the blocking tasks.
pub struct FastEmbedder {
    model: Arc<Mutex<TextEmbedding>>,
    spec: ModelSpec,
}

impl FastEmbedder {
    /// Load `model_name`, downloading it into `cache_dir` on first use.
    pub fn new(model_name: &str, cache_dir: Option<PathBuf>) -> Result<Self, RepositoryError> {
        let spec = model_spec(model_name).ok_or_else(|| {
            RepositoryError::Query(format!("unsupported embedding model '{model_name}'"))
        })?;

        let mut options = InitOptions::new(spec.fastembed_model()).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let model = TextEmbedding::try_new(options).map_err(|e| {
            RepositoryError::Query(format!("failed to load embedding model '{}': {e}", spec.name))
        })?;
        tracing::info!(model = spec.name, dimension = spec.dimension, "Embedding model loaded");

        Ok(Self {
            model: Arc::new(Mutex::new(model)),
            spec,
        })
    }
}

impl Embedder for FastEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, RepositoryError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let model = Arc::clone(&self.model);
        let texts = texts.to_vec();
        tokio::task::spawn_blocking(move || {
            let mut model = model
                .lock()
                .map_err(|_| RepositoryError::Query("embedding model lock poisoned".into()))?;
            model
                .embed(texts, None)
                .map_err(|e| RepositoryError::Query(format!("embedding failed: {e}")))
        })
        .await
        .map_err(|e| RepositoryError::Query(format!("embedding task failed: {e}")))?
    }

    fn model_name(&self) -> &str {
        self.spec.name
    }

    fn dimension(&self) -> usize {
        self.spec.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_lookup() {
        let spec = model_spec("All-MiniLM-L6-v2").unwrap();
        assert_eq!(spec.name, "all-minilm-l6-v2");
        assert_eq!(spec.dimension, 384);
        assert!(model_spec("bge-small-en-v1.5").is_some());
        assert!(model_spec("word2vec").is_none());
    }

    #[test]
    fn test_unknown_model_is_rejected() {
        let result = FastEmbedder::new("word2vec", None);
        assert!(matches!(result, Err(RepositoryError::Query(msg)) if msg.contains("unsupported")));
    }

    /// Downloads the model on first run.
    #[tokio::test]
    #[ignore]
    async fn test_similar_summaries_are_close() {
        let cache = tempfile::tempdir().unwrap();
        let embedder = FastEmbedder::new("all-minilm-l6-v2", Some(cache.path().to_path_buf()))
            .expect("Failed to load model");

        let vectors = embedder
            .embed(&[
                "Flood in Riverside".to_string(),
                "Major flood hits Riverside area".to_string(),
                "Wildfire near Crestview".to_string(),
            ])
            .await
            .unwrap();
        assert_eq!(vectors.len(), 3);
        assert_eq!(vectors[0].len(), 384);

        let l2 = |a: &[f32], b: &[f32]| -> f32 { a.iter().zip(b).map(|(x, y)| (x - y).powi(2)).sum() };
        assert!(l2(&vectors[0], &vectors[1]) < l2(&vectors[0], &vectors[2]));
    }
}
