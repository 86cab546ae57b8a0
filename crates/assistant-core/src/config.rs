//! ============================================================================
//! Configuration
//! ============================================================================
//! Defaults plus environment overrides (loaded from `.env` by the binary).
//! ============================================================================

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::warn;

/// Default number of exchanges kept in conversation history
pub const DEFAULT_MAX_HISTORY_EXCHANGES: usize = 10;

/// Default number of turns rendered into a prompt context block
pub const DEFAULT_CONTEXT_WINDOW_TURNS: usize = 6;

/// Default per-turn character budget in the rendered context
pub const DEFAULT_CONTEXT_TURN_CHARS: usize = 100;

/// Default generator timeout (7 minutes, local models can be slow)
pub const DEFAULT_GENERATION_TIMEOUT_SECS: u64 = 420;

/// Assistant configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    /// Database file path (None = HR_ASSISTANT_DB_PATH or ~/.hr-assistant)
    pub db_path: Option<String>,
    /// OpenAI-compatible embeddings endpoint
    pub embedding_base_url: String,
    pub embedding_api_key: Option<String>,
    pub embedding_model: String,
    pub embedding_dim: usize,
    /// Ollama server for response generation
    pub ollama_url: String,
    pub generation_model: String,
    pub generation_timeout_secs: u64,
    pub max_history_exchanges: usize,
    pub context_window_turns: usize,
    pub context_turn_chars: usize,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            embedding_base_url: "http://localhost:11434/v1".to_string(),
            embedding_api_key: None,
            embedding_model: "all-minilm".to_string(),
            embedding_dim: 384,
            ollama_url: "http://localhost:11434".to_string(),
            generation_model: "llama3.2:3b".to_string(),
            generation_timeout_secs: DEFAULT_GENERATION_TIMEOUT_SECS,
            max_history_exchanges: DEFAULT_MAX_HISTORY_EXCHANGES,
            context_window_turns: DEFAULT_CONTEXT_WINDOW_TURNS,
            context_turn_chars: DEFAULT_CONTEXT_TURN_CHARS,
        }
    }
}

impl AssistantConfig {
    /// Defaults overridden by any environment variables that are set
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(v) = lookup("HR_ASSISTANT_DB_PATH") {
            config.db_path = Some(v);
        }
        if let Some(v) = lookup("EMBEDDING_BASE_URL") {
            config.embedding_base_url = v;
        }
        if let Some(v) = lookup("EMBEDDING_API_KEY").filter(|k| !k.is_empty()) {
            config.embedding_api_key = Some(v);
        }
        if let Some(v) = lookup("EMBEDDING_MODEL") {
            config.embedding_model = v;
        }
        if let Some(v) = lookup("OLLAMA_URL") {
            config.ollama_url = v;
        }
        if let Some(v) = lookup("GENERATION_MODEL") {
            config.generation_model = v;
        }

        parse_into(&lookup, "EMBEDDING_DIM", &mut config.embedding_dim);
        parse_into(&lookup, "GENERATION_TIMEOUT_SECS", &mut config.generation_timeout_secs);
        parse_into(&lookup, "MAX_HISTORY_EXCHANGES", &mut config.max_history_exchanges);
        parse_into(&lookup, "CONTEXT_WINDOW_TURNS", &mut config.context_window_turns);
        parse_into(&lookup, "CONTEXT_TURN_CHARS", &mut config.context_turn_chars);

        config
    }

    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.generation_timeout_secs)
    }

    pub fn history(&self) -> HistoryConfig {
        HistoryConfig {
            max_exchanges: self.max_history_exchanges,
            context_window_turns: self.context_window_turns,
            context_turn_chars: self.context_turn_chars,
        }
    }
}

/// Conversation history limits
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// N: history holds at most 2N turns
    pub max_exchanges: usize,
    /// Turns included in a rendered context block
    pub context_window_turns: usize,
    /// Characters kept per turn in a rendered context block
    pub context_turn_chars: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_exchanges: DEFAULT_MAX_HISTORY_EXCHANGES,
            context_window_turns: DEFAULT_CONTEXT_WINDOW_TURNS,
            context_turn_chars: DEFAULT_CONTEXT_TURN_CHARS,
        }
    }
}

impl HistoryConfig {
    pub fn max_turns(&self) -> usize {
        self.max_exchanges * 2
    }
}

fn parse_into<F, T>(lookup: &F, key: &str, target: &mut T)
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    if let Some(raw) = lookup(key) {
        match raw.trim().parse::<T>() {
            Ok(value) => *target = value,
            Err(_) => warn!("Ignoring invalid value '{}' for {}, keeping default", raw, key),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = AssistantConfig::default();
        assert_eq!(config.max_history_exchanges, 10);
        assert_eq!(config.history().max_turns(), 20);
        assert_eq!(config.generation_timeout(), Duration::from_secs(420));
    }

    #[test]
    fn test_env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("GENERATION_MODEL", "llama3"),
            ("MAX_HISTORY_EXCHANGES", "4"),
            ("EMBEDDING_DIM", "not-a-number"),
            ("EMBEDDING_API_KEY", ""),
        ]
        .into_iter()
        .collect();

        let config = AssistantConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(config.generation_model, "llama3");
        assert_eq!(config.max_history_exchanges, 4);
        assert_eq!(config.embedding_dim, 384);
        assert!(config.embedding_api_key.is_none());
    }
}
