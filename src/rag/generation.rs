// Grounded generation: evidence context, confidence policy, diagnosis call
use std::sync::Arc;
use tracing::{debug, info};

use crate::errors::Result;
use crate::providers::CompletionProvider;
use crate::rag::{complete, prompts};
use crate::types::{Confidence, Diagnosis, RetrievalResult, SourceReference};

/// Top similarity below this is low confidence
pub const SIMILARITY_THRESHOLD: f32 = 0.15;

/// Top similarity at or above this is high confidence
pub const HIGH_CONFIDENCE_THRESHOLD: f32 = 0.6;

/// Returned when retrieval finds nothing
pub const INSUFFICIENT_EVIDENCE: &str = "Insufficient evidence to generate diagnosis.";

/// Confidence label for the top-ranked raw similarity.
///
/// Takes the unclamped score; a NaN score is low.
pub fn confidence_for(best: f32) -> Confidence {
    if !(best >= SIMILARITY_THRESHOLD) {
        Confidence::Low
    } else if best < HIGH_CONFIDENCE_THRESHOLD {
        Confidence::Medium
    } else {
        Confidence::High
    }
}

/// Similarity clamped into [0, 1] for display
pub fn display_similarity(score: f32) -> f32 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

fn round2(value: f32) -> f32 {
    (value * 100.0).round() / 100.0
}

/// Context block plus the parallel source list, both in rank order
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub context: String,
    pub sources: Vec<SourceReference>,
}

pub fn assemble_evidence(results: &[RetrievalResult]) -> Evidence {
    let mut context = String::new();
    let mut sources = Vec::with_capacity(results.len());

    for (idx, result) in results.iter().enumerate() {
        let rank = idx + 1;
        let shown = display_similarity(result.similarity);
        let meta = &result.metadata;

        context.push_str(&format!(
            "\nCase {} (similarity: {:.2}):\n{}\n",
            rank, shown, meta.text
        ));
        sources.push(SourceReference {
            case: rank,
            question: meta.question.clone(),
            answer: meta.answer.clone(),
            similarity: round2(shown),
            source: meta.source.clone(),
        });
    }

    Evidence { context, sources }
}

/// Produces a diagnosis grounded only in retrieved cases
pub struct GroundedGenerator {
    completion: Arc<dyn CompletionProvider>,
    model: String,
}

impl GroundedGenerator {
    pub fn new(completion: Arc<dyn CompletionProvider>, model: impl Into<String>) -> Self {
        Self {
            completion,
            model: model.into(),
        }
    }

    /// `original_query` is the caller's own wording, not the rewrite.
    /// Empty results short-circuit without a completion call.
    pub async fn generate(
        &self,
        original_query: &str,
        results: &[RetrievalResult],
    ) -> Result<Diagnosis> {
        let Some(top) = results.first() else {
            info!("no cases retrieved, skipping generation");
            return Ok(Diagnosis {
                diagnosis: INSUFFICIENT_EVIDENCE.to_string(),
                confidence: Confidence::Low,
                sources: Vec::new(),
            });
        };

        let evidence = assemble_evidence(results);
        let confidence = confidence_for(top.similarity);
        debug!(best = top.similarity, %confidence, "scored evidence");

        let prompt = prompts::diagnosis_prompt(original_query, &evidence.context);
        let diagnosis = complete(self.completion.as_ref(), &self.model, prompt).await?;

        Ok(Diagnosis {
            diagnosis,
            confidence,
            sources: evidence.sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::CaseMetadata;
    use quickcheck_macros::quickcheck;

    fn hit(similarity: f32, text: &str) -> RetrievalResult {
        RetrievalResult {
            id: text.to_string(),
            similarity,
            metadata: CaseMetadata {
                text: text.to_string(),
                question: format!("Q {}", text),
                answer: format!("A {}", text),
                source: "MedQA USMLE".to_string(),
            },
        }
    }

    #[test]
    fn test_confidence_boundaries() {
        assert_eq!(confidence_for(0.149999), Confidence::Low);
        assert_eq!(confidence_for(0.15), Confidence::Medium);
        assert_eq!(confidence_for(0.599999), Confidence::Medium);
        assert_eq!(confidence_for(0.6), Confidence::High);
    }

    #[test]
    fn test_confidence_out_of_range_scores() {
        assert_eq!(confidence_for(1.3), Confidence::High);
        assert_eq!(confidence_for(-0.4), Confidence::Low);
        assert_eq!(confidence_for(f32::NAN), Confidence::Low);
    }

    #[test]
    fn test_display_similarity_clamps() {
        assert_eq!(display_similarity(1.3), 1.0);
        assert_eq!(display_similarity(-0.2), 0.0);
        assert_eq!(display_similarity(0.42), 0.42);
    }

    #[test]
    fn test_evidence_ranks_are_one_based() {
        let results = vec![hit(0.9, "first"), hit(0.5, "second"), hit(0.1, "third")];
        let evidence = assemble_evidence(&results);

        let cases: Vec<usize> = evidence.sources.iter().map(|s| s.case).collect();
        assert_eq!(cases, vec![1, 2, 3]);
        assert_eq!(evidence.sources[1].question, "Q second");
        assert!(evidence.context.contains("Case 1 (similarity: 0.90):\nfirst"));
        assert!(evidence.context.contains("Case 3 (similarity: 0.10):\nthird"));
    }

    #[test]
    fn test_evidence_rounds_and_clamps_similarity() {
        let evidence = assemble_evidence(&[hit(1.3, "over"), hit(0.456, "mid")]);
        assert_eq!(evidence.sources[0].similarity, 1.0);
        assert_eq!(evidence.sources[1].similarity, 0.46);
        assert!(evidence.context.contains("Case 1 (similarity: 1.00)"));
    }

    #[quickcheck]
    fn prop_confidence_is_monotonic(a: f32, b: f32) -> bool {
        if a.is_nan() || b.is_nan() {
            return true;
        }
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        let rank = |c: Confidence| match c {
            Confidence::Low => 0,
            Confidence::Medium => 1,
            Confidence::High => 2,
        };
        rank(confidence_for(lo)) <= rank(confidence_for(hi))
    }

    #[quickcheck]
    fn prop_displayed_similarity_in_unit_range(score: f32) -> bool {
        let shown = display_similarity(score);
        (0.0..=1.0).contains(&shown)
    }
}
