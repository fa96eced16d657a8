//! Bootstrap and health checks for CliniQ
//!
//! Detects whether Ollama is running with the configured model, and whether
//! the vector store is reachable and holds the case index.

use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

use crate::errors::{ClinicalError, Result};
use crate::providers::VectorStore;
use crate::vector_db::QdrantVectorStore;

/// Ollama detector and bootstrap manager
pub struct Bootstrap {
    client: Client,
    ollama_url: String,
}

/// Ollama API tags response
#[derive(Debug, Deserialize)]
struct TagsResponse {
    models: Vec<ModelInfo>,
}

/// Model information from Ollama API
#[derive(Debug, Deserialize)]
struct ModelInfo {
    name: String,
}

/// Bootstrap check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BootstrapStatus {
    Ready,
    OllamaNotRunning,
    ModelNotAvailable(String),
}

impl Bootstrap {
    /// Create a new bootstrap detector
    pub fn new(ollama_url: &str) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            ollama_url: ollama_url.trim_end_matches('/').to_string(),
        }
    }

    /// Check if Ollama API is reachable
    pub async fn check_ollama_running(&self) -> bool {
        let url = format!("{}/api/tags", self.ollama_url);

        match self.client.get(&url).send().await {
            Ok(response) => response.status().is_success(),
            Err(_) => false,
        }
    }

    /// Get list of available models
    pub async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/api/tags", self.ollama_url);

        let response = self.client
            .get(&url)
            .send()
            .await
            .map_err(|e| ClinicalError::completion(format!("Failed to query models: {}", e)))?;

        if !response.status().is_success() {
            return Err(ClinicalError::completion(format!(
                "API returned status: {}",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| ClinicalError::completion(format!("Failed to parse response: {}", e)))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Run complete bootstrap check
    pub async fn check(&self, model_tag: &str) -> Result<BootstrapStatus> {
        if !self.check_ollama_running().await {
            return Ok(BootstrapStatus::OllamaNotRunning);
        }

        let models = self.list_models().await?;
        if !models.iter().any(|m| m == model_tag) {
            return Ok(BootstrapStatus::ModelNotAvailable(model_tag.to_string()));
        }

        Ok(BootstrapStatus::Ready)
    }
}

/// Health check result
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    Pass,
    Warn(String),
    Fail(String),
}

/// Individual health check
#[derive(Debug, Clone)]
pub struct HealthCheck {
    pub name: String,
    pub status: HealthStatus,
}

impl HealthCheck {
    fn new(name: &str, status: HealthStatus) -> Self {
        Self {
            name: name.to_string(),
            status,
        }
    }
}

/// Run every check used by `cliniq doctor`
pub async fn run_diagnostics(
    ollama_url: &str,
    model: &str,
    store: &QdrantVectorStore,
    index_name: &str,
) -> Vec<HealthCheck> {
    let mut checks = Vec::new();

    let ollama = match Bootstrap::new(ollama_url).check(model).await {
        Ok(BootstrapStatus::Ready) => HealthStatus::Pass,
        Ok(BootstrapStatus::OllamaNotRunning) => {
            HealthStatus::Fail(format!("Ollama not reachable at {}; start it with `ollama serve`", ollama_url))
        }
        Ok(BootstrapStatus::ModelNotAvailable(tag)) => {
            HealthStatus::Fail(format!("Model '{}' not pulled; run `ollama pull {}`", tag, tag))
        }
        Err(e) => HealthStatus::Fail(e.to_string()),
    };
    checks.push(HealthCheck::new("Ollama", ollama));

    let reachable = store.health_check().await;
    checks.push(HealthCheck::new(
        "Vector store",
        if reachable {
            HealthStatus::Pass
        } else {
            HealthStatus::Fail(format!("Qdrant not reachable at {}", store.url()))
        },
    ));

    if reachable {
        let index = match store.open_index(index_name).await {
            Ok(_) => HealthStatus::Pass,
            Err(ClinicalError::IndexNotFound(_)) => {
                HealthStatus::Warn(format!("Index '{}' missing; run `cliniq ingest`", index_name))
            }
            Err(e) => HealthStatus::Fail(e.to_string()),
        };
        checks.push(HealthCheck::new("Case index", index));
    }

    checks
}

/// Exit code for setup needed
pub const EXIT_CODE_SETUP_NEEDED: i32 = 2;
