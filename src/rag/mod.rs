// Clinical RAG pipeline
//
// Components:
// - Query Rewriter: patient language -> clinical terminology
// - Hypothesis Generator: HyDE exam-style question for retrieval
// - Retriever: embed hypothesis, nearest-neighbour query
// - Grounded Generator: evidence context, confidence, diagnosis
// - Pipeline: sequential orchestration of the four stages

pub mod generation;
pub mod hyde;
pub mod pipeline;
pub mod prompts;
pub mod retrieval;
pub mod rewrite;

pub use generation::{
    confidence_for, GroundedGenerator, HIGH_CONFIDENCE_THRESHOLD, INSUFFICIENT_EVIDENCE,
    SIMILARITY_THRESHOLD,
};
pub use hyde::HypothesisGenerator;
pub use pipeline::{ClinicalPipeline, PipelineConfig, DEFAULT_INDEX_NAME};
pub use retrieval::{Retriever, TOP_K};
pub use rewrite::QueryRewriter;

use crate::errors::Result;
use crate::providers::{ChatMessage, CompletionProvider};

/// Send `prompt` as a single user turn and return the trimmed reply
pub(crate) async fn complete(
    provider: &dyn CompletionProvider,
    model: &str,
    prompt: String,
) -> Result<String> {
    let reply = provider.chat(model, &[ChatMessage::user(prompt)]).await?;
    Ok(reply.trim().to_string())
}
