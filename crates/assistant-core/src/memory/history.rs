//! ============================================================================
//! Conversation History - Bounded per-owner turn sequence
//! ============================================================================
//! Holds at most 2N turns (N = max exchanges), evicting the oldest first.
//! `render_context` is a lossy prompt projection, never the canonical history.
//! ============================================================================

use std::collections::VecDeque;

use crate::config::HistoryConfig;
use crate::types::ChatExchange;

use super::types::ConversationTurn;

/// Chronological conversation history for one owner
#[derive(Debug, Clone)]
pub struct ConversationHistory {
    turns: VecDeque<ConversationTurn>,
    config: HistoryConfig,
}

impl ConversationHistory {
    /// Create an empty history
    pub fn new(config: HistoryConfig) -> Self {
        Self {
            turns: VecDeque::with_capacity(config.max_turns()),
            config,
        }
    }

    /// Rebuild from chat log entries ordered most-recent-first.
    /// Only the newest N exchanges are kept, replayed oldest first.
    pub fn from_recent(recent_first: &[ChatExchange], config: HistoryConfig) -> Self {
        let mut history = Self::new(config);
        for exchange in recent_first.iter().take(config.max_exchanges).rev() {
            history.append(&exchange.query, &exchange.response_text);
        }
        history
    }

    /// Push a user/assistant pair, evicting oldest turns beyond 2N
    pub fn append(&mut self, user_text: &str, assistant_text: &str) {
        self.turns.push_back(ConversationTurn::user(user_text));
        self.turns.push_back(ConversationTurn::assistant(assistant_text));

        let max = self.config.max_turns();
        while self.turns.len() > max {
            self.turns.pop_front();
        }
    }

    pub fn turns(&self) -> impl Iterator<Item = &ConversationTurn> {
        self.turns.iter()
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    pub fn clear(&mut self) {
        self.turns.clear();
    }

    pub fn config(&self) -> &HistoryConfig {
        &self.config
    }

    /// Context block over the configured window and per-turn budget
    pub fn render_context(&self) -> String {
        self.render_window(self.config.context_window_turns, self.config.context_turn_chars)
    }

    /// Context block over the last `window` turns, each cut to `max_chars`.
    /// Empty history renders as an empty string.
    pub fn render_window(&self, window: usize, max_chars: usize) -> String {
        if self.turns.is_empty() || window == 0 {
            return String::new();
        }

        let skip = self.turns.len().saturating_sub(window);
        let mut context = String::from("Previous conversation:\n");
        for turn in self.turns.iter().skip(skip) {
            context.push_str(turn.role.display_name());
            context.push_str(": ");
            context.push_str(&truncate_chars(&turn.content, max_chars));
            context.push('\n');
        }
        context.push('\n');
        context
    }
}

/// Cut to `max_chars` characters, marking the cut with "..."
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => format!("{}...", &text[..byte_idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::Role;
    use crate::types::Intent;

    fn config(max_exchanges: usize) -> HistoryConfig {
        HistoryConfig {
            max_exchanges,
            ..HistoryConfig::default()
        }
    }

    #[test]
    fn test_append_evicts_oldest_first() {
        let mut history = ConversationHistory::new(config(10));
        for i in 0..11 {
            history.append(&format!("question {}", i), &format!("answer {}", i));
        }

        assert_eq!(history.len(), 20);
        let first = history.turns().next().unwrap();
        assert_eq!(first.role, Role::User);
        assert_eq!(first.content, "question 1");
        assert_eq!(history.turns().last().unwrap().content, "answer 10");
    }

    #[test]
    fn test_never_exceeds_cap() {
        let mut history = ConversationHistory::new(config(3));
        for i in 0..50 {
            history.append(&i.to_string(), &i.to_string());
            assert!(history.len() <= 6);
        }
    }

    #[test]
    fn test_from_recent_reorders_chronologically() {
        let recent_first: Vec<ChatExchange> = (0..5)
            .rev()
            .map(|i| ChatExchange::new(format!("q{}", i), format!("a{}", i), Intent::Chat, None))
            .collect();

        let history = ConversationHistory::from_recent(&recent_first, config(3));
        let contents: Vec<_> = history.turns().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["q2", "a2", "q3", "a3", "q4", "a4"]);
    }

    #[test]
    fn test_render_window_bounds_turns_and_chars() {
        let mut history = ConversationHistory::new(config(10));
        history.append("old question", "old answer");
        history.append(&"x".repeat(150), "short");

        let rendered = history.render_window(2, 100);
        assert!(rendered.starts_with("Previous conversation:\n"));
        assert!(!rendered.contains("old question"));
        assert!(rendered.contains(&format!("User: {}...\n", "x".repeat(100))));
        assert!(rendered.contains("Assistant: short\n"));
        assert!(rendered.ends_with("\n\n"));
    }

    #[test]
    fn test_render_empty_history() {
        let history = ConversationHistory::new(config(10));
        assert_eq!(history.render_context(), "");
    }

    #[test]
    fn test_truncate_chars_is_utf8_safe() {
        assert_eq!(truncate_chars("héllo wörld", 5), "héllo...");
        assert_eq!(truncate_chars("short", 10), "short");
    }
}
