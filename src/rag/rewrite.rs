// Query rewriting: patient language -> clinical terminology
use std::sync::Arc;
use tracing::debug;

use crate::errors::Result;
use crate::providers::CompletionProvider;
use crate::rag::{complete, prompts};

/// Rewrites informal case descriptions into formal clinical terminology
pub struct QueryRewriter {
    completion: Arc<dyn CompletionProvider>,
    model: String,
}

impl QueryRewriter {
    pub fn new(completion: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    /// One completion call, no retries. Provider errors propagate.
    pub async fn rewrite(&self, query: &str) -> Result<String> {
        let rewritten = complete(
            self.completion.as_ref(),
            &self.model,
            prompts::rewrite_prompt(query),
        )
        .await?;
        debug!(rewritten = %rewritten, "rewrote query");
        Ok(rewritten)
    }
}
