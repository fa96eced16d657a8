//! Configuration management for CliniQ
//!
//! Provides TOML-based configuration with defaults and validation.
//! Location: ~/.cliniq/config.toml

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::completion::{DEFAULT_MODEL, DEFAULT_OLLAMA_URL};
use crate::embedding::{DEFAULT_EMBEDDING_DIM, DEFAULT_MODEL_ID};
use crate::errors::{ClinicalError, Result};
use crate::ingest::{BATCH_SIZE, MAX_RECORDS_PER_DATASET};
use crate::rag::{PipelineConfig, DEFAULT_INDEX_NAME, TOP_K};
use crate::vector_db::DEFAULT_QDRANT_URL;

/// Complete configuration for CliniQ
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ollama: OllamaConfig,
    pub vector_store: VectorStoreConfig,
    pub embedding: EmbeddingConfig,
    pub pipeline: PipelineSettings,
    pub ingest: IngestConfig,
}

/// Ollama connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OllamaConfig {
    pub url: String,
    pub model: String,
    pub request_timeout_secs: u64,
}

/// Vector store connection configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VectorStoreConfig {
    pub url: String,
    pub index_name: String,
}

/// Embedding model configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub model_id: String,
    pub dimension: usize,
}

/// Pipeline behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub top_k: usize,
    /// Per-stage deadline; absent means no deadline
    pub stage_timeout_secs: Option<u64>,
}

/// Dataset ingestion configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub max_records_per_dataset: usize,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            request_timeout_secs: 120,
        }
    }
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_QDRANT_URL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model_id: DEFAULT_MODEL_ID.to_string(),
            dimension: DEFAULT_EMBEDDING_DIM,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            top_k: TOP_K,
            stage_timeout_secs: None,
        }
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            max_records_per_dataset: MAX_RECORDS_PER_DATASET,
        }
    }
}

impl Config {
    /// Load configuration from file or use defaults
    pub fn load(path: Option<PathBuf>) -> Result<Self> {
        if let Some(config_path) = path {
            Self::load_from_file(&config_path)
        } else {
            Self::load_default()
        }
    }

    /// Load configuration from specific file
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ClinicalError::Config(format!("Failed to read config: {}", e)))?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ClinicalError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Load from ~/.cliniq/config.toml, or built-in defaults if absent
    pub fn load_default() -> Result<Self> {
        if let Some(config_path) = Self::default_path() {
            if config_path.exists() {
                return Self::load_from_file(&config_path);
            }
        }

        Ok(Config::default())
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".cliniq").join("config.toml"))
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<()> {
        if self.pipeline.top_k == 0 {
            return Err(ClinicalError::Config(
                "pipeline.top_k must be greater than 0".to_string(),
            ));
        }

        if self.embedding.dimension == 0 {
            return Err(ClinicalError::Config(
                "embedding.dimension must be greater than 0".to_string(),
            ));
        }

        if self.ingest.batch_size == 0 {
            return Err(ClinicalError::Config(
                "ingest.batch_size must be greater than 0".to_string(),
            ));
        }

        if self.vector_store.index_name.trim().is_empty() {
            return Err(ClinicalError::Config(
                "vector_store.index_name must not be empty".to_string(),
            ));
        }

        if self.pipeline.stage_timeout_secs == Some(0) {
            return Err(ClinicalError::Config(
                "pipeline.stage_timeout_secs must be greater than 0 when set".to_string(),
            ));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        let contents = self.to_toml()?;

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| ClinicalError::Config(format!("Failed to create config dir: {}", e)))?;
        }

        std::fs::write(path, contents)
            .map_err(|e| ClinicalError::Config(format!("Failed to write config: {}", e)))?;

        Ok(())
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| ClinicalError::Config(format!("Failed to serialize config: {}", e)))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.ollama.request_timeout_secs)
    }

    /// Settings for the pipeline orchestrator
    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            model: self.ollama.model.clone(),
            index_name: self.vector_store.index_name.clone(),
            top_k: self.pipeline.top_k,
            stage_timeout: self.pipeline.stage_timeout_secs.map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.ollama.url, "http://127.0.0.1:11434");
        assert_eq!(config.ollama.model, "llama3.2:3b");
        assert_eq!(config.vector_store.index_name, "cliniq");
        assert_eq!(config.embedding.dimension, 384);
        assert_eq!(config.pipeline.top_k, 5);
        assert_eq!(config.ingest.batch_size, 100);
        assert_eq!(config.ingest.max_records_per_dataset, 1000);
    }

    #[test]
    fn test_config_validation_success() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_config_validation_zero_top_k() {
        let mut config = Config::default();
        config.pipeline.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_batch() {
        let mut config = Config::default();
        config.ingest.batch_size = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_zero_timeout() {
        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = Some(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[ollama]\nmodel = \"llama3.1:8b\"\n").unwrap();

        let config = Config::load(Some(path)).unwrap();
        assert_eq!(config.ollama.model, "llama3.1:8b");
        assert_eq!(config.ollama.url, DEFAULT_OLLAMA_URL);
        assert_eq!(config.pipeline.top_k, 5);
    }

    #[test]
    fn test_save_and_reload() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = Some(90);
        config.save(&path).unwrap();

        let loaded = Config::load_from_file(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_default_config_matches_pipeline_defaults() {
        assert_eq!(Config::default().pipeline_config(), PipelineConfig::default());
    }

    #[test]
    fn test_pipeline_config_mapping() {
        let mut config = Config::default();
        config.pipeline.stage_timeout_secs = Some(30);
        let pipeline = config.pipeline_config();
        assert_eq!(pipeline.model, "llama3.2:3b");
        assert_eq!(pipeline.stage_timeout, Some(Duration::from_secs(30)));
    }
}
