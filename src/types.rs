//! Core data model shared by ingestion, retrieval and generation

use serde::{Deserialize, Serialize};

/// Provenance label used when a record carries no `source` field
pub const UNKNOWN_SOURCE: &str = "Unknown Source";

fn unknown_source() -> String {
    UNKNOWN_SOURCE.to_string()
}

/// Payload stored alongside each indexed case
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseMetadata {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub answer: String,
    #[serde(default = "unknown_source")]
    pub source: String,
}

impl Default for CaseMetadata {
    fn default() -> Self {
        Self {
            text: String::new(),
            question: String::new(),
            answer: String::new(),
            source: unknown_source(),
        }
    }
}

/// A unit of indexed medical knowledge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub vector: Vec<f32>,
    pub metadata: CaseMetadata,
}

/// One nearest-neighbour match. `similarity` is index-defined and may fall
/// outside [0, 1].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalResult {
    pub id: String,
    pub similarity: f32,
    pub metadata: CaseMetadata,
}

/// Confidence label attached to a diagnosis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    High,
    Medium,
    Low,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::High => "high",
            Confidence::Medium => "medium",
            Confidence::Low => "low",
        }
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Retrieved case as shown to the caller; `case` is the 1-based rank
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceReference {
    pub case: usize,
    pub question: String,
    pub answer: String,
    pub similarity: f32,
    pub source: String,
}

/// Output of the grounded generation stage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnosis {
    pub diagnosis: String,
    pub confidence: Confidence,
    pub sources: Vec<SourceReference>,
}

/// Full result of one pipeline invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub diagnosis: String,
    pub confidence: Confidence,
    pub sources: Vec<SourceReference>,
    pub rewritten_query: String,
    pub hypothesis: String,
}

impl PipelineResult {
    pub fn from_parts(diagnosis: Diagnosis, rewritten_query: String, hypothesis: String) -> Self {
        Self {
            diagnosis: diagnosis.diagnosis,
            confidence: diagnosis.confidence,
            sources: diagnosis.sources,
            rewritten_query,
            hypothesis,
        }
    }
}
