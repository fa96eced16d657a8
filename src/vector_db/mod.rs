//! Vector store backends
//!
//! - Qdrant: networked store used in deployment
//! - In-memory: exact search for tests and small offline corpora

pub mod memory;
pub mod qdrant;

pub use memory::{cosine_similarity, InMemoryIndex, InMemoryVectorStore};
pub use qdrant::{QdrantIndex, QdrantVectorStore, DEFAULT_QDRANT_URL};
