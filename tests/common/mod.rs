//! Scripted providers shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use cliniq::providers::{
    ChatMessage, CompletionProvider, DeleteOutcome, EmbeddingProvider, IndexSpec, VectorIndex,
    VectorStore,
};
use cliniq::types::{CaseMetadata, CaseRecord, RetrievalResult};
use cliniq::{ClinicalError, Result};

pub const DIM: usize = 32;

pub const REWRITE_REPLY: &str = "  50-year-old male with crushing substernal chest pain radiating to the mandible  ";
pub const HYPOTHESIS_REPLY: &str =
    "Question: A 50-year-old man presents with squeezing chest pain radiating to the jaw. What is the most likely diagnosis? Answer: Acute myocardial infarction";
pub const DIAGNOSIS_REPLY: &str = "\n1. Most likely diagnosis: Acute myocardial infarction\n2. ...\n3. ECG, troponin\n";

/// Completion provider that answers by stage and records every prompt
#[derive(Default)]
pub struct ScriptedCompletion {
    pub prompts: Mutex<Vec<String>>,
    pub fail_on_call: Option<usize>,
    pub cancel_after_first: Option<CancellationToken>,
    pub delay: Option<Duration>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn prompt(&self, idx: usize) -> String {
        self.prompts.lock().unwrap()[idx].clone()
    }
}

#[async_trait]
impl CompletionProvider for ScriptedCompletion {
    async fn chat(&self, _model: &str, messages: &[ChatMessage]) -> Result<String> {
        assert_eq!(messages.len(), 1, "pipeline sends exactly one turn");
        let prompt = messages[0].content.clone();
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.clone());
            prompts.len() - 1
        };

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_on_call == Some(call) {
            return Err(ClinicalError::completion("connection refused"));
        }
        if call == 0 {
            if let Some(token) = &self.cancel_after_first {
                token.cancel();
            }
        }

        let reply = if prompt.ends_with("Medical terminology:") {
            REWRITE_REPLY
        } else if prompt.ends_with("Hypothetical question:") {
            HYPOTHESIS_REPLY
        } else {
            DIAGNOSIS_REPLY
        };
        Ok(reply.to_string())
    }
}

/// Deterministic bag-of-words embedder
pub struct HashEmbedder;

impl EmbeddingProvider for HashEmbedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut vector = vec![0.0f32; DIM];
        for token in text.to_lowercase().split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = DefaultHasher::new();
            token.hash(&mut hasher);
            vector[(hasher.finish() % DIM as u64) as usize] += 1.0;
        }
        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            vector.iter_mut().for_each(|x| *x /= norm);
        }
        Ok(vector)
    }

    fn dimension(&self) -> usize {
        DIM
    }
}

/// Index that returns a fixed result list and counts queries
pub struct FixedIndex {
    pub results: Vec<RetrievalResult>,
    pub queries: AtomicUsize,
}

#[async_trait]
impl VectorIndex for FixedIndex {
    fn name(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        DIM
    }

    async fn upsert(&self, _records: Vec<CaseRecord>) -> Result<()> {
        Ok(())
    }

    async fn query(&self, _vector: &[f32], top_k: usize) -> Result<Vec<RetrievalResult>> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        Ok(self.results.iter().take(top_k).cloned().collect())
    }
}

/// Store exposing a single `FixedIndex` under any name
pub struct FixedStore {
    pub index: Arc<FixedIndex>,
}

impl FixedStore {
    pub fn with_scores(scores: &[f32]) -> Self {
        let results = scores
            .iter()
            .enumerate()
            .map(|(i, score)| hit(&format!("case_{}", i), *score))
            .collect();
        Self {
            index: Arc::new(FixedIndex {
                results,
                queries: AtomicUsize::new(0),
            }),
        }
    }

    pub fn queries(&self) -> usize {
        self.index.queries.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl VectorStore for FixedStore {
    async fn create_index(&self, _spec: &IndexSpec) -> Result<()> {
        Ok(())
    }

    async fn delete_index_if_exists(&self, _name: &str) -> Result<DeleteOutcome> {
        Ok(DeleteOutcome::NotFound)
    }

    async fn open_index(&self, _name: &str) -> Result<Arc<dyn VectorIndex>> {
        Ok(Arc::clone(&self.index) as Arc<dyn VectorIndex>)
    }
}

pub fn hit(id: &str, similarity: f32) -> RetrievalResult {
    RetrievalResult {
        id: id.to_string(),
        similarity,
        metadata: CaseMetadata {
            text: format!("Question: about {} Answer: something", id),
            question: format!("about {}", id),
            answer: "something".to_string(),
            source: "MedQA USMLE".to_string(),
        },
    }
}

pub fn case(id: &str, text: &str, embedder: &HashEmbedder) -> CaseRecord {
    CaseRecord {
        id: id.to_string(),
        vector: embedder.embed(text).unwrap(),
        metadata: CaseMetadata {
            text: text.to_string(),
            question: text.to_string(),
            answer: String::new(),
            source: "MedQA USMLE".to_string(),
        },
    }
}
