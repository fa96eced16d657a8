// End-to-end clinical RAG pipeline: rewrite -> HyDE -> retrieve -> generate
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::completion::DEFAULT_MODEL;
use crate::errors::{ClinicalError, Result};
use crate::providers::{CompletionProvider, EmbeddingProvider, VectorStore};
use crate::rag::generation::GroundedGenerator;
use crate::rag::hyde::HypothesisGenerator;
use crate::rag::retrieval::{Retriever, TOP_K};
use crate::rag::rewrite::QueryRewriter;
use crate::types::PipelineResult;

/// Default vector index holding the case corpus
pub const DEFAULT_INDEX_NAME: &str = "cliniq";

/// Pipeline configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    /// Chat model used by every completion stage
    pub model: String,
    /// Vector index to query
    pub index_name: String,
    /// Neighbours fetched per query
    pub top_k: usize,
    /// Deadline applied to each stage separately
    pub stage_timeout: Option<Duration>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            index_name: DEFAULT_INDEX_NAME.to_string(),
            top_k: TOP_K,
            stage_timeout: None,
        }
    }
}

/// Four-stage clinical decision support pipeline.
///
/// Holds only shared read-only provider handles, so one instance can serve
/// concurrent invocations. Each invocation is independent.
pub struct ClinicalPipeline {
    rewriter: QueryRewriter,
    hypothesizer: HypothesisGenerator,
    retriever: Retriever,
    generator: GroundedGenerator,
    store: Arc<dyn VectorStore>,
    config: PipelineConfig,
}

impl ClinicalPipeline {
    pub fn new(
        embedder: Arc<dyn EmbeddingProvider>,
        store: Arc<dyn VectorStore>,
        completion: Arc<dyn CompletionProvider>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            rewriter: QueryRewriter::new(Arc::clone(&completion), config.model.clone()),
            hypothesizer: HypothesisGenerator::new(Arc::clone(&completion), config.model.clone()),
            retriever: Retriever::with_top_k(embedder, config.top_k),
            generator: GroundedGenerator::new(completion, config.model.clone()),
            store,
            config,
        }
    }

    /// Run the full pipeline for one case description
    pub async fn run(&self, query: &str) -> Result<PipelineResult> {
        self.run_with_cancel(query, &CancellationToken::new()).await
    }

    /// Run the pipeline, aborting at the current stage when `cancel` fires.
    ///
    /// Stages are strictly sequential; once a stage fails, is cancelled or
    /// times out, no later stage issues a provider call.
    pub async fn run_with_cancel(
        &self,
        query: &str,
        cancel: &CancellationToken,
    ) -> Result<PipelineResult> {
        if query.trim().is_empty() {
            return Err(ClinicalError::InvalidInput(
                "case description must not be empty".to_string(),
            ));
        }

        let started = Instant::now();
        info!(query, "processing case");

        let rewritten = self
            .stage("rewrite", cancel, self.rewriter.rewrite(query))
            .await?;

        let hypothesis = self
            .stage("hyde", cancel, self.hypothesizer.hypothesize(&rewritten))
            .await?;

        let results = self
            .stage("retrieve", cancel, async {
                let index = self.store.open_index(&self.config.index_name).await?;
                self.retriever.retrieve(&hypothesis, index.as_ref()).await
            })
            .await?;

        // Ground on the caller's own wording rather than the rewrite
        let diagnosis = self
            .stage("generate", cancel, self.generator.generate(query, &results))
            .await?;

        info!(
            confidence = %diagnosis.confidence,
            sources = diagnosis.sources.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "pipeline complete"
        );

        Ok(PipelineResult::from_parts(diagnosis, rewritten, hypothesis))
    }

    async fn stage<T, F>(&self, stage: &'static str, cancel: &CancellationToken, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        if cancel.is_cancelled() {
            return Err(ClinicalError::Cancelled { stage });
        }

        let started = Instant::now();
        let bounded = async {
            match self.config.stage_timeout {
                Some(limit) => tokio::time::timeout(limit, work)
                    .await
                    .map_err(|_| ClinicalError::Timeout {
                        stage,
                        duration_ms: limit.as_millis() as u64,
                    })?,
                None => work.await,
            }
        };

        let outcome = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ClinicalError::Cancelled { stage }),
            result = bounded => result,
        };

        info!(stage, elapsed_ms = started.elapsed().as_millis() as u64, ok = outcome.is_ok(), "stage finished");
        outcome
    }
}
