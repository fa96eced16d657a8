// HyDE: synthesize an exam-style question to embed instead of the raw query
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::providers::CompletionProvider;
use crate::rag::{complete, prompts};

/// Generates a hypothetical USMLE-style question for a clinical scenario.
///
/// The indexed corpus is written as exam questions with answers; a query in
/// the same register lands closer to relevant cases than the patient's own
/// words do.
pub struct HypothesisGenerator {
    completion: Arc<dyn CompletionProvider>,
    model: String,
}

impl HypothesisGenerator {
    pub fn new(completion: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    pub async fn hypothesize(&self, rewritten_query: &str) -> Result<String> {
        let hypothesis = complete(
            self.completion.as_ref(),
            &self.model,
            prompts::hyde_prompt(rewritten_query),
        )
        .await?;
        debug!(chars = hypothesis.len(), "generated HyDE hypothesis");
        Ok(hypothesis)
    }
}
