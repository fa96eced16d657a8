//! Error types for CliniQ
//!
//! A single error enum covers every pipeline stage. Provider failures are
//! fatal for the invocation that hit them and are never retried.

use thiserror::Error;

/// Which external collaborator produced a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Embedding,
    VectorStore,
    Completion,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Provider::Embedding => "embedding provider",
            Provider::VectorStore => "vector store",
            Provider::Completion => "completion provider",
        };
        f.write_str(name)
    }
}

/// Main error type for the clinical pipeline
#[derive(Error, Debug)]
pub enum ClinicalError {
    /// An external provider was unreachable or returned an error
    #[error("{provider} unavailable: {message}")]
    ProviderUnavailable { provider: Provider, message: String },

    /// Caller supplied an unusable case description
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Vector index has not been created
    #[error("Vector index not found: {0}")]
    IndexNotFound(String),

    /// Embedding length does not match the index dimension
    #[error("Vector dimension mismatch: index expects {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Dataset download or parsing failed during ingestion
    #[error("Dataset error: {0}")]
    Dataset(String),

    /// The invocation was cancelled before the stage completed
    #[error("Pipeline cancelled during {stage}")]
    Cancelled { stage: &'static str },

    /// A stage exceeded its deadline
    #[error("Stage {stage} timed out after {duration_ms}ms")]
    Timeout { stage: &'static str, duration_ms: u64 },

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP client errors
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic errors with context
    #[error("{0}")]
    Generic(String),
}

impl ClinicalError {
    pub fn embedding(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: Provider::Embedding,
            message: message.into(),
        }
    }

    pub fn vector_store(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: Provider::VectorStore,
            message: message.into(),
        }
    }

    pub fn completion(message: impl Into<String>) -> Self {
        Self::ProviderUnavailable {
            provider: Provider::Completion,
            message: message.into(),
        }
    }
}

/// Result type alias for pipeline operations
pub type Result<T> = std::result::Result<T, ClinicalError>;

/// Convert anyhow errors to ClinicalError
impl From<anyhow::Error> for ClinicalError {
    fn from(err: anyhow::Error) -> Self {
        ClinicalError::Generic(format!("{:#}", err))
    }
}
