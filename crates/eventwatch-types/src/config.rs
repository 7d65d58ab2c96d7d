//! Configuration types for eventwatch.
//!
//! `CatalogConfig` represents the top-level `config.toml` in the data
//! directory. Every field has a default so an empty or partial file works.

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Record store file, relative to the data directory.
    #[serde(default = "default_records_file")]
    pub records_file: String,

    /// Vector store directory, relative to the data directory.
    #[serde(default = "default_vector_dir")]
    pub vector_dir: String,

    /// Rebuild missing/stale index entries when the process starts.
    #[serde(default = "default_true")]
    pub reconcile_on_startup: bool,

    #[serde(default)]
    pub dedup: DedupConfig,

    #[serde(default)]
    pub vector: VectorConfig,

    #[serde(default)]
    pub embedding: EmbeddingConfig,

    #[serde(default)]
    pub llm: LlmConfig,

    #[serde(default)]
    pub server: ServerConfig,
}

fn default_records_file() -> String {
    "events.json".to_string()
}

fn default_vector_dir() -> String {
    "vector_store".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            records_file: default_records_file(),
            vector_dir: default_vector_dir(),
            reconcile_on_startup: true,
            dedup: DedupConfig::default(),
            vector: VectorConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

/// Dedup decision settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// Candidates strictly closer than this to their nearest neighbor are
    /// merged into it. Must be calibrated against `vector.distance`.
    #[serde(default = "default_threshold")]
    pub threshold: f32,
}

pub const DEFAULT_DEDUP_THRESHOLD: f32 = 0.6;

fn default_threshold() -> f32 {
    DEFAULT_DEDUP_THRESHOLD
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_DEDUP_THRESHOLD,
        }
    }
}

/// Distance metric used by the vector index. Lower is always more similar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DistanceMetric {
    /// Squared euclidean distance.
    #[default]
    L2,
    /// 1 - cosine similarity.
    Cosine,
    /// Negated dot product.
    Dot,
}

impl std::fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DistanceMetric::L2 => "l2",
            DistanceMetric::Cosine => "cosine",
            DistanceMetric::Dot => "dot",
        };
        f.write_str(s)
    }
}

/// Vector index settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VectorConfig {
    #[serde(default = "default_table")]
    pub table: String,

    #[serde(default)]
    pub distance: DistanceMetric,
}

fn default_table() -> String {
    "events".to_string()
}

impl Default for VectorConfig {
    fn default() -> Self {
        Self {
            table: default_table(),
            distance: DistanceMetric::default(),
        }
    }
}

/// Local embedding model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// `all-minilm-l6-v2` or `bge-small-en-v1.5`.
    #[serde(default = "default_embedding_model")]
    pub model: String,

    /// Where downloaded model files are cached. Defaults to the data directory.
    #[serde(default)]
    pub cache_dir: Option<String>,
}

fn default_embedding_model() -> String {
    "all-minilm-l6-v2".to_string()
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            cache_dir: None,
        }
    }
}

/// Chat model used for classification and extraction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Environment variable holding the API key. The pipeline is disabled
    /// when it is unset.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_llm_model() -> String {
    "gpt-4".to_string()
}

fn default_temperature() -> f32 {
    0.2
}

fn default_api_key_env() -> String {
    "OPENAI_API_KEY".to_string()
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            model: default_llm_model(),
            temperature: default_temperature(),
            api_key_env: default_api_key_env(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origins")]
    pub cors_origins: Vec<String>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5002
}

fn default_cors_origins() -> Vec<String> {
    vec!["http://localhost:3000".to_string()]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: default_cors_origins(),
        }
    }
}
