//! ============================================================================
//! Prompt Composer - Search and chat prompt assembly
//! ============================================================================

use crate::types::Intent;

use super::profile::{format_profile_block, RetrievedProfile};

const SEARCH_PREAMBLE: &str = "You are an HR assistant analyzing CVs to answer recruitment questions.";

const SEARCH_RULES: &str = "Only use relevant candidate data. Ignore irrelevant information.";

const SEARCH_CLOSING: &str =
    "Provide a direct, focused short answer using only the candidate profiles above.";

const CHAT_PREAMBLE: &str = "You are a helpful HR assistant.";

const CHAT_CLOSING: &str = "Give a brief, friendly response.";

/// Compose the generator prompt.
///
/// Total over its inputs: the query text always appears verbatim, missing
/// profiles or context only omit their sections.
pub fn compose(
    query: &str,
    intent: Intent,
    profiles: Option<&[RetrievedProfile]>,
    context: Option<&str>,
) -> String {
    let mut prompt = String::new();

    if let Some(context) = context.filter(|c| !c.trim().is_empty()) {
        prompt.push_str(context);
        if !context.ends_with('\n') {
            prompt.push('\n');
        }
    }

    match intent {
        Intent::Search => {
            prompt.push_str(SEARCH_PREAMBLE);
            prompt.push_str("\nAnswer this question: ");
            prompt.push_str(query);
            prompt.push('\n');
            prompt.push_str(SEARCH_RULES);
            prompt.push_str("\n\nCANDIDATES:\n");

            let profiles = profiles.unwrap_or_default();
            if profiles.is_empty() {
                prompt.push_str("(no candidate profiles available)\n");
            }
            for (i, profile) in profiles.iter().enumerate() {
                prompt.push_str(&format_profile_block(i + 1, profile));
            }

            prompt.push('\n');
            prompt.push_str(SEARCH_CLOSING);
        }
        Intent::Chat => {
            prompt.push_str(CHAT_PREAMBLE);
            prompt.push_str(" User said: '");
            prompt.push_str(query);
            prompt.push_str("'. ");
            prompt.push_str(CHAT_CLOSING);
        }
    }

    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, RankedResult};
    use serde_json::json;

    fn profile(id: &str, name: &str, score: f32) -> RetrievedProfile {
        RetrievedProfile {
            result: RankedResult {
                profile_id: id.to_string(),
                owner_id: OwnerId::parse("owner").unwrap(),
                score,
                source_text: String::new(),
            },
            summary: Some(json!({ "Name": name })),
        }
    }

    #[test]
    fn test_search_prompt_layout() {
        let profiles = vec![profile("a", "Ada", 0.9), profile("b", "Grace", 0.7)];
        let prompt = compose(
            "find top 2 python developers",
            Intent::Search,
            Some(profiles.as_slice()),
            None,
        );

        assert!(prompt.starts_with(SEARCH_PREAMBLE));
        assert!(prompt.contains("Answer this question: find top 2 python developers\n"));
        let first = prompt.find("=== CANDIDATE 1 ===\nName: Ada").unwrap();
        let second = prompt.find("=== CANDIDATE 2 ===\nName: Grace").unwrap();
        assert!(first < second);
        assert!(prompt.ends_with(SEARCH_CLOSING));
    }

    #[test]
    fn test_context_is_prepended() {
        let context = "Previous conversation:\nUser: find java devs\nAssistant: Two match.\n\n";
        let prompt = compose("what about those two?", Intent::Search, Some(&[][..]), Some(context));
        assert!(prompt.starts_with(context));
        assert!(prompt.contains("what about those two?"));
        assert!(prompt.contains("(no candidate profiles available)"));
    }

    #[test]
    fn test_chat_prompt() {
        let prompt = compose("how are you today", Intent::Chat, None, Some("   "));
        assert_eq!(
            prompt,
            "You are a helpful HR assistant. User said: 'how are you today'. Give a brief, friendly response."
        );
    }

    #[test]
    fn test_compose_is_total_over_bare_records() {
        let bare = RetrievedProfile {
            result: RankedResult {
                profile_id: "x".to_string(),
                owner_id: OwnerId::parse("owner").unwrap(),
                score: 0.1,
                source_text: String::new(),
            },
            summary: Some(json!({})),
        };
        let query = "find engineers with {weird} 'quotes' and\nnewlines";
        let profiles = vec![bare];
        let prompt = compose(query, Intent::Search, Some(profiles.as_slice()), None);
        assert!(prompt.contains(query));
        assert!(prompt.contains("=== CANDIDATE 1 ===\n(Relevance Score: 0.100)"));
    }
}
