//! ============================================================================
//! Intent Classifier - Keyword routing for incoming queries
//! ============================================================================
//! Pure, deterministic heuristics over fixed keyword tables:
//! - search vs chat routing
//! - how many profiles to retrieve
//! - whether a query refers back to the conversation
//! - canned replies for bare greetings and thanks
//! ============================================================================

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::types::Intent;

/// Upper bound for an explicit count in the query text
pub const MAX_RESULT_COUNT: usize = 10;

/// Count used for "all"/"every" queries
pub const ALL_RESULT_COUNT: usize = 5;

/// Count used for "one"/"single"/"best"/"top" queries
pub const SINGLE_RESULT_COUNT: usize = 3;

/// Count used when the query gives no hint
pub const DEFAULT_RESULT_COUNT: usize = 4;

/// Candidate/skill/role terminology that routes a query to profile search
const SEARCH_KEYWORDS: &[&str] = &[
    "find", "show", "get", "best", "top", "candidates", "profiles", "cvs", "resumes",
    "engineers", "developers", "skills", "experience", "python", "java", "mechanical",
    "electrical", "software", "who",
];

/// Referential markers that make a query depend on earlier turns
const CONTEXT_MARKERS: &[&str] = &[
    "that", "this", "them", "those", "previous", "earlier", "before", "also", "too",
    "more", "another", "what about", "how about",
];

const ALL_MARKERS: &[&str] = &["all", "every"];

const SINGLE_MARKERS: &[&str] = &["one", "single", "best", "top"];

/// Literal phrases answered without calling the generator
const CANNED_REPLIES: &[(&str, &str)] = &[
    (
        "hi",
        "Hello! I'm your HR assistant. I can help you find candidates and answer questions about CVs. What would you like to know?",
    ),
    ("hello", "Hi there! How can I help you with candidate profiles today?"),
    (
        "help",
        "I can help you find candidates by searching through CVs. Try asking things like 'find Python developers' or 'show me mechanical engineers'.",
    ),
    ("thanks", "You're welcome! Feel free to ask about any candidates or profiles."),
    ("thank you", "You're welcome! Feel free to ask about any candidates or profiles."),
];

/// ASCII digits only; `\d` would also match other scripts' digits,
/// which `u64::from_str` rejects
static INTEGER_LITERAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b([0-9]+)\b").unwrap_or_else(|e| panic!("invalid integer pattern: {}", e))
});

/// Routing decision for one query
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    /// Number of profiles to retrieve (only meaningful for search)
    pub result_count: usize,
}

/// Classify a query. Same text always yields the same classification.
pub fn classify(text: &str) -> Classification {
    let intent = if is_search_query(text) {
        Intent::Search
    } else {
        Intent::Chat
    };

    Classification {
        intent,
        result_count: result_count(text),
    }
}

/// True if the text mentions any candidate/skill/role keyword
pub fn is_search_query(text: &str) -> bool {
    contains_any(&text.to_lowercase(), SEARCH_KEYWORDS)
}

/// Number of profiles to retrieve, in priority order:
/// explicit integer (capped), "all"/"every", "one"/"best"/"top", default.
pub fn result_count(text: &str) -> usize {
    let lower = text.to_lowercase();

    if let Some(captures) = INTEGER_LITERAL.captures(&lower) {
        // Digits too long for u64 are certainly above the cap
        return captures[1]
            .parse::<u64>()
            .map(|n| n.min(MAX_RESULT_COUNT as u64) as usize)
            .unwrap_or(MAX_RESULT_COUNT);
    }

    if contains_any(&lower, ALL_MARKERS) {
        ALL_RESULT_COUNT
    } else if contains_any(&lower, SINGLE_MARKERS) {
        SINGLE_RESULT_COUNT
    } else {
        DEFAULT_RESULT_COUNT
    }
}

/// True if the text refers back to earlier conversation
pub fn needs_context(text: &str) -> bool {
    contains_any(&text.to_lowercase(), CONTEXT_MARKERS)
}

/// Canned reply when the whole message is a bare greeting/thanks phrase.
/// Surrounding whitespace and trailing punctuation are ignored.
pub fn canned_reply(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    let normalized = lower
        .trim()
        .trim_end_matches(|c: char| c.is_ascii_punctuation() || c.is_whitespace());

    CANNED_REPLIES
        .iter()
        .find(|(phrase, _)| *phrase == normalized)
        .map(|(_, reply)| *reply)
}

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    needles.iter().any(|needle| haystack.contains(needle))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_routing() {
        assert_eq!(classify("find top 2 python developers").intent, Intent::Search);
        assert_eq!(classify("Who knows Java?").intent, Intent::Search);
        assert_eq!(classify("SHOW ME RESUMES").intent, Intent::Search);
        assert_eq!(classify("how are you today").intent, Intent::Chat);
        assert_eq!(classify("hi").intent, Intent::Chat);
    }

    #[test]
    fn test_explicit_count_is_capped() {
        assert_eq!(result_count("find top 2 python developers"), 2);
        assert_eq!(result_count("show 7 candidates"), 7);
        assert_eq!(result_count("show 25 candidates"), 10);
        assert_eq!(result_count("show 0 candidates"), 0);
        assert_eq!(result_count("show 99999999999999999999999 candidates"), 10);
    }

    #[test]
    fn test_non_ascii_digits_are_not_counts() {
        // Arabic-Indic three and fullwidth three
        assert_eq!(result_count("find \u{0663} python developers"), DEFAULT_RESULT_COUNT);
        assert_eq!(result_count("find \u{FF13} python developers"), DEFAULT_RESULT_COUNT);
        assert_eq!(result_count("show every \u{0663} java developer"), ALL_RESULT_COUNT);
        assert_eq!(result_count("show \u{0663} candidates, then 2"), 2);
    }

    #[test]
    fn test_explicit_count_beats_markers() {
        // "all" and "top" are present but the literal wins
        assert_eq!(result_count("all 3 top engineers"), 3);
    }

    #[test]
    fn test_marker_defaults() {
        assert_eq!(result_count("show every java developer"), ALL_RESULT_COUNT);
        assert_eq!(result_count("who is the best engineer"), SINGLE_RESULT_COUNT);
        assert_eq!(result_count("find python developers"), DEFAULT_RESULT_COUNT);
    }

    #[test]
    fn test_classification_is_deterministic() {
        let text = "Give me the best mechanical engineers";
        assert_eq!(classify(text), classify(text));
    }

    #[test]
    fn test_needs_context() {
        assert!(needs_context("What about their Java skills?"));
        assert!(needs_context("tell me more"));
        assert!(needs_context("Is THAT candidate available?"));
        assert!(!needs_context("find python developers"));
    }

    #[test]
    fn test_canned_reply_exact_phrases() {
        assert!(canned_reply("hi").is_some());
        assert!(canned_reply("  Hello! ").is_some());
        assert!(canned_reply("Thank you.").is_some());
        assert_eq!(canned_reply("thanks"), canned_reply("thank you"));
    }

    #[test]
    fn test_canned_reply_ignores_embedded_phrases() {
        assert!(canned_reply("which one is this").is_none());
        assert!(canned_reply("hi, can you explain the ranking?").is_none());
        assert!(canned_reply("").is_none());
    }
}
