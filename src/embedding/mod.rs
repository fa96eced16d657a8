//! Sentence embeddings for case text and HyDE hypotheses

pub mod engine;

pub use engine::{EmbeddingEngine, DEFAULT_EMBEDDING_DIM, DEFAULT_MODEL_ID};
