//! Seams to the external collaborators
//!
//! The pipeline only talks to these traits. Concrete backends live in
//! `embedding`, `vector_db` and `completion`; tests plug in scripted stubs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::errors::Result;
use crate::types::{CaseRecord, RetrievalResult};

/// Maps text to a fixed-dimension vector. Inference is CPU-bound, so the
/// trait is synchronous and callers move it onto the blocking pool.
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single text
    fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed several texts in one forward pass
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        texts.iter().map(|text| self.embed(text)).collect()
    }

    /// Output dimension
    fn dimension(&self) -> usize;
}

/// Role of a chat turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One role-tagged chat turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }
}

/// Maps a conversation to a completion
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    async fn chat(&self, model: &str, messages: &[ChatMessage]) -> Result<String>;
}

/// Similarity metric configured on an index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    Cosine,
    Dot,
    Euclid,
}

/// Storage precision of indexed vectors
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Precision {
    Float32,
    Float16,
}

/// Parameters for creating an index
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexSpec {
    pub name: String,
    pub dimension: usize,
    pub metric: Metric,
    pub precision: Precision,
}

impl IndexSpec {
    /// Cosine, float32 index as used for the case corpus
    pub fn cosine(name: impl Into<String>, dimension: usize) -> Self {
        Self {
            name: name.into(),
            dimension,
            metric: Metric::Cosine,
            precision: Precision::Float32,
        }
    }
}

/// Result of a delete-if-exists call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

/// Handle to one named index
#[async_trait]
pub trait VectorIndex: Send + Sync {
    fn name(&self) -> &str;

    fn dimension(&self) -> usize;

    /// Insert or replace records keyed by id
    async fn upsert(&self, records: Vec<CaseRecord>) -> Result<()>;

    /// Top-k neighbours ordered by descending similarity
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>>;
}

/// Vector store client
#[async_trait]
pub trait VectorStore: Send + Sync {
    async fn create_index(&self, spec: &IndexSpec) -> Result<()>;

    /// Remove an index. A missing index is reported, not treated as failure.
    async fn delete_index_if_exists(&self, name: &str) -> Result<DeleteOutcome>;

    /// Obtain a handle to an existing index
    async fn open_index(&self, name: &str) -> Result<Arc<dyn VectorIndex>>;
}
