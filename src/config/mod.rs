//! Configuration management for termweave
//!
//! A single TOML file holds the store, term extraction, embedding, ingestion
//! and retrieval settings plus named retrieval profiles. Values can be
//! overridden with `TERMWEAVE_SECTION__KEY` environment variables.

use crate::error::{Result, TermweaveError};
use crate::retrieval::{FusionMethod, HybridSearchConfig, SearchMode};
use crate::store::{Metric, StoreSettings};
use crate::terms::TermExtractionOptions;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

mod validator;

pub use validator::ConfigValidator;

const ENV_PREFIX: &str = "TERMWEAVE_";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub store: StoreConfig,
    pub terms: TermExtractionOptions,
    pub embedding: EmbeddingConfig,
    pub ingest: IngestConfig,
    pub retrieval: HybridSearchConfig,
    #[serde(default)]
    pub profiles: HashMap<String, ProfileOverrides>,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Vector store and index settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    pub hnsw_m: usize,
    pub hnsw_ef_construction: usize,
    pub default_metric: Metric,
    pub persist_poll_interval_ms: u64,
    pub persist_max_attempts: u32,
}

impl StoreConfig {
    pub fn settings(&self) -> StoreSettings {
        StoreSettings {
            hnsw_m: self.hnsw_m,
            hnsw_ef_construction: self.hnsw_ef_construction,
            default_metric: self.default_metric,
            persist_poll_interval: Duration::from_millis(self.persist_poll_interval_ms),
            persist_max_attempts: self.persist_max_attempts,
        }
    }
}

/// Embedding configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    pub model: String,
    pub batch_size: usize,
}

/// Ingestion configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Target collection for imported translation memory entries
    pub collection: String,
}

/// Profile-specific retrieval overrides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfileOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mode: Option<SearchMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fusion_strategy: Option<FusionMethod>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub final_top_k: Option<usize>,
}

fn parse_value<T: FromStr>(path: &str, value: &str, expected: &str) -> Result<T> {
    value.parse().map_err(|_| TermweaveError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}' as {}", value, expected),
    })
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(TermweaveError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| TermweaveError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();

        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| TermweaveError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Load configuration with a specific profile applied
    pub fn load_with_profile(path: &Path, profile: &str) -> Result<Self> {
        let mut config = Self::load(path)?;
        config.apply_profile(profile)?;
        Ok(config)
    }

    /// Apply a profile's overrides to the retrieval settings
    pub fn apply_profile(&mut self, profile: &str) -> Result<()> {
        let overrides = self
            .profiles
            .get(profile)
            .cloned()
            .ok_or_else(|| TermweaveError::ProfileNotFound {
                name: profile.to_string(),
            })?;

        if let Some(mode) = overrides.mode {
            self.retrieval.mode = mode;
        }
        if let Some(fusion) = overrides.fusion_strategy {
            self.retrieval.fusion_strategy = Some(fusion);
        }
        if let Some(top_k) = overrides.final_top_k {
            self.retrieval.final_top_k = top_k;
        }
        tracing::debug!("Applied profile {}", profile);
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: TERMWEAVE_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        for (key, value) in std::env::vars() {
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "EMBEDDING__MODEL" => self.embedding.model = value.to_string(),
            "EMBEDDING__BATCH_SIZE" => {
                self.embedding.batch_size = parse_value(path, value, "integer")?
            }
            "INGEST__COLLECTION" => self.ingest.collection = value.to_string(),
            "TERMS__CHUNK_SIZE" => self.terms.chunk_size = parse_value(path, value, "integer")?,
            "TERMS__OVERLAP" => self.terms.overlap = parse_value(path, value, "integer")?,
            "TERMS__MAX_CANDIDATES" => {
                self.terms.max_candidates = parse_value(path, value, "integer")?
            }
            "RETRIEVAL__MODE" => {
                self.retrieval.mode = parse_value(path, value, "vector, keyword or hybrid")?
            }
            "RETRIEVAL__FUSION" => {
                self.retrieval.fusion_strategy = Some(parse_value(path, value, "fusion method")?)
            }
            "RETRIEVAL__FINAL_TOP_K" => {
                self.retrieval.final_top_k = parse_value(path, value, "integer")?
            }
            "STORE__DEFAULT_METRIC" => {
                self.store.default_metric = parse_value(path, value, "L2, IP or COSINE")?
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().ok_or_else(|| {
            TermweaveError::Config("Cannot determine config directory".to_string())
        })?;

        Ok(config_dir.join("termweave").join("config.toml"))
    }
}

impl Default for Config {
    fn default() -> Self {
        let mut profiles = HashMap::new();
        profiles.insert(
            "lexical".to_string(),
            ProfileOverrides {
                mode: Some(SearchMode::Keyword),
                ..ProfileOverrides::default()
            },
        );
        profiles.insert(
            "rrf".to_string(),
            ProfileOverrides {
                fusion_strategy: Some(FusionMethod::ReciprocalRankFusion {
                    rank_fusion: Default::default(),
                }),
                final_top_k: Some(20),
                ..ProfileOverrides::default()
            },
        );

        Self {
            meta: MetaConfig {
                schema_version: "1.0.0".to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            store: StoreConfig {
                hnsw_m: 16,
                hnsw_ef_construction: 200,
                default_metric: Metric::Cosine,
                persist_poll_interval_ms: 500,
                persist_max_attempts: 20,
            },
            terms: TermExtractionOptions::default(),
            embedding: EmbeddingConfig {
                model: "all-MiniLM-L6-v2".to_string(),
                batch_size: crate::embedding::DEFAULT_BATCH_SIZE,
            },
            ingest: IngestConfig {
                collection: "TranslationMemory".to_string(),
            },
            retrieval: HybridSearchConfig::default(),
            profiles,
        }
    }
}
