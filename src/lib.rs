//! CliniQ - Evidence-grounded clinical decision support
//!
//! A four-stage retrieval-augmented pipeline over a corpus of medical QA
//! cases: rewrite the patient's description into clinical terminology,
//! generate a hypothetical exam question (HyDE), retrieve similar cases from
//! a vector store, and ask a local model for a diagnosis grounded only in
//! that evidence.
//!
//! # Architecture
//!
//! - **providers**: trait seams for embeddings, vector store, completions
//! - **embedding / vector_db / completion**: Candle, Qdrant and Ollama backends
//! - **rag**: the four stages and their orchestrator
//! - **ingest**: index rebuild from QA datasets

pub mod errors;
pub mod types;
pub mod providers;

// Re-export commonly used types
pub use errors::{ClinicalError, Result};
pub use types::{Confidence, PipelineResult, RetrievalResult, SourceReference};

// Backends
pub mod completion;
pub mod embedding;
pub mod vector_db;

// Pipeline
pub mod rag;
pub use rag::{ClinicalPipeline, PipelineConfig};

// Corpus ingestion
pub mod ingest;

// Interface layer
pub mod bootstrap;
pub mod cli;
pub mod telemetry;
