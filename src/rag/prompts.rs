// Prompt templates for each completion stage

pub fn rewrite_prompt(query: &str) -> String {
    format!(
        "Convert the following patient description into formal \n\
clinical medical terminology. Return only the rewritten query, \n\
nothing else.\n\
\n\
Patient description: {}\n\
Medical terminology:",
        query
    )
}

pub fn hyde_prompt(rewritten_query: &str) -> String {
    format!(
        "Generate a hypothetical USMLE-style medical exam question \n\
that would match this clinical scenario. Return only the question, \n\
nothing else.\n\
\n\
Clinical scenario: {}\n\
Hypothetical question:",
        rewritten_query
    )
}

/// Grounding prompt: the model may only use the retrieved cases
pub fn diagnosis_prompt(original_query: &str, context: &str) -> String {
    format!(
        "You are a clinical decision support system.\n\
\n\
IMPORTANT: Answer ONLY using the retrieved medical cases below. \n\
Do not use outside knowledge. If the evidence is insufficient, say so explicitly.\n\
\n\
Patient presentation: {}\n\
\n\
Retrieved medical evidence:\n\
{}\n\
\n\
Based ONLY on the above evidence, provide:\n\
1. Most likely diagnosis\n\
2. Key supporting findings from the evidence\n\
3. Recommended next steps\n\
\n\
If evidence is insufficient, explicitly state that.",
        original_query, context
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_prompt_embeds_query() {
        let prompt = rewrite_prompt("tummy hurts after food");
        assert!(prompt.contains("Patient description: tummy hurts after food"));
        assert!(prompt.ends_with("Medical terminology:"));
        assert!(prompt.contains("Return only the rewritten query"));
    }

    #[test]
    fn test_hyde_prompt_embeds_scenario() {
        let prompt = hyde_prompt("Postprandial epigastric pain");
        assert!(prompt.contains("USMLE-style"));
        assert!(prompt.contains("Clinical scenario: Postprandial epigastric pain"));
        assert!(prompt.ends_with("Hypothetical question:"));
    }

    #[test]
    fn test_diagnosis_prompt_sections() {
        let prompt = diagnosis_prompt("chest pain", "Case 1 (similarity: 0.80):\nMI");
        assert!(prompt.starts_with("You are a clinical decision support system."));
        assert!(prompt.contains("Answer ONLY using the retrieved medical cases"));
        assert!(prompt.contains("Do not use outside knowledge"));
        assert!(prompt.contains("Patient presentation: chest pain"));
        assert!(prompt.contains("Case 1 (similarity: 0.80):\nMI"));
        assert!(prompt.contains("1. Most likely diagnosis"));
        assert!(prompt.contains("2. Key supporting findings from the evidence"));
        assert!(prompt.contains("3. Recommended next steps"));
    }
}
