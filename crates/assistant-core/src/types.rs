//! ============================================================================
//! Core Types for the HR Assistant
//! ============================================================================
//! Owner identity, stored profile vectors, ranked search results and the
//! records exchanged with callers and the chat log.
//! ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::AssistantError;

/// Maximum length of an owner identifier
const MAX_OWNER_ID_LEN: usize = 128;

/// Authenticated principal whose profiles and history are isolated from
/// every other owner.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct OwnerId(String);

impl OwnerId {
    /// Validate and wrap an owner identifier.
    ///
    /// Rejects empty ids, ids longer than 128 chars, and ids containing `:`
    /// or control characters (`:` separates the owner prefix in store keys).
    pub fn parse(raw: &str) -> Result<Self, AssistantError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(AssistantError::InvalidOwner("owner id is empty".to_string()));
        }
        if trimmed.chars().count() > MAX_OWNER_ID_LEN {
            return Err(AssistantError::InvalidOwner(format!(
                "owner id longer than {} characters",
                MAX_OWNER_ID_LEN
            )));
        }
        if trimmed.chars().any(|c| c == ':' || c.is_control()) {
            return Err(AssistantError::InvalidOwner(format!(
                "owner id '{}' contains a reserved character",
                trimmed.escape_debug()
            )));
        }
        Ok(Self(trimmed.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for OwnerId {
    type Err = AssistantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for OwnerId {
    type Error = AssistantError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<OwnerId> for String {
    fn from(owner: OwnerId) -> Self {
        owner.0
    }
}

/// Query intent: profile search or general conversation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Search,
    Chat,
}

impl Intent {
    /// Label stored alongside chat log entries
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "cv_search",
            Intent::Chat => "general_chat",
        }
    }
}

impl std::fmt::Display for Intent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One stored embedding for an owner's profile.
/// Immutable once stored; re-indexing replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileVector {
    pub profile_id: String,
    pub owner_id: OwnerId,
    pub vector: Vec<f32>,
    /// Text the vector was computed from
    pub source_text: String,
}

/// A profile as persisted by the profile store: its vector plus the
/// structured summary it was derived from.
#[derive(Debug, Clone)]
pub struct ProfileRecord {
    pub vector: ProfileVector,
    /// Structured (possibly partial) summary, e.g. `{"Name": .., "Skills": [..]}`
    pub summary: Option<serde_json::Value>,
    pub updated_at: i64,
}

/// A profile scored against one query. Exists for a single search call and
/// in the chat log audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedResult {
    pub profile_id: String,
    pub owner_id: OwnerId,
    /// Cosine similarity in [-1, 1]
    pub score: f32,
    pub source_text: String,
}

/// Caller-facing projection of one ranked profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateMatch {
    /// 1-based rank in the result list
    pub rank: usize,
    pub profile_id: String,
    pub score: f32,
    pub candidate_name: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
}

/// Listing row for one indexed candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateSummary {
    pub profile_id: String,
    pub candidate_name: Option<String>,
    pub email: Option<String>,
    pub skills: Vec<String>,
    pub experience: Vec<String>,
    pub education: Vec<String>,
    /// Unix seconds of the last (re)index
    pub updated_at: i64,
}

/// Everything stored for one candidate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub candidate: CandidateSummary,
    /// Structured summary as indexed
    pub summary: Option<serde_json::Value>,
    /// Start of the indexed text, ellipsized past the preview length
    pub text_preview: String,
}

/// Result of `Assistant::process_query`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response_text: String,
    pub intent: Intent,
    /// Ranked profiles in descending score order; `None` for chat queries
    pub ranked_results: Option<Vec<RankedResult>>,
    /// Display projection of `ranked_results`
    #[serde(default)]
    pub results: Vec<CandidateMatch>,
}

/// One persisted query/response pair
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatExchange {
    pub query: String,
    pub response_text: String,
    pub intent: Intent,
    /// Ranked set the answer was grounded on (search intent only)
    pub ranked_results: Option<Vec<RankedResult>>,
    pub created_at: i64,
}

impl ChatExchange {
    pub fn new(
        query: String,
        response_text: String,
        intent: Intent,
        ranked_results: Option<Vec<RankedResult>>,
    ) -> Self {
        Self {
            query,
            response_text,
            intent,
            ranked_results,
            created_at: chrono::Utc::now().timestamp_micros(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_id_trims_and_accepts() {
        let owner = OwnerId::parse("  user-42 ").unwrap();
        assert_eq!(owner.as_str(), "user-42");
        assert_eq!(owner.to_string(), "user-42");
    }

    #[test]
    fn test_owner_id_rejects_invalid() {
        assert!(OwnerId::parse("").is_err());
        assert!(OwnerId::parse("   ").is_err());
        assert!(OwnerId::parse("a:b").is_err());
        assert!(OwnerId::parse("bad\nid").is_err());
        assert!(OwnerId::parse(&"x".repeat(129)).is_err());
        assert!(OwnerId::parse(&"x".repeat(128)).is_ok());
    }

    #[test]
    fn test_owner_id_serde_validates() {
        let owner: OwnerId = serde_json::from_str("\"alice\"").unwrap();
        assert_eq!(owner.as_str(), "alice");
        assert!(serde_json::from_str::<OwnerId>("\"a:b\"").is_err());
    }

    #[test]
    fn test_intent_labels() {
        assert_eq!(Intent::Search.as_str(), "cv_search");
        assert_eq!(Intent::Chat.to_string(), "general_chat");
    }
}
