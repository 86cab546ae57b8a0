//! ============================================================================
//! Memory Module - Per-owner conversation context
//! ============================================================================
//! Keeps a bounded, chronological history per owner and renders it into
//! prompts when a query needs it.
//!
//! ## Architecture
//! ```text
//! Chat Log (most-recent-first) → load → ConversationHistory (chronological)
//!                                              ↓
//!                                render_context → Prompt Composer
//!                                              ↑
//!                         append(query, response) after each exchange
//! ```
//!
//! ## Usage
//! ```rust,ignore
//! use assistant_core::memory::SessionRegistry;
//!
//! let sessions = SessionRegistry::new(chat_log, config.history());
//! let session = sessions.session(&owner).await;
//! let mut history = session.lock().await;
//! history.append("find python developers", "Here are three candidates...");
//! ```
//! ============================================================================

mod history;
mod session;
mod types;

pub use history::ConversationHistory;
pub(crate) use history::truncate_chars;
pub use session::{load_history, SessionHandle, SessionRegistry};
pub use types::{ConversationTurn, Role};

use crate::types::Intent;

/// Whether history should be injected into the prompt for this query.
///
/// Search queries get context only when they refer back to the
/// conversation; chat queries always get it when there is any.
pub fn should_inject_context(intent: Intent, query: &str, history: &ConversationHistory) -> bool {
    if history.is_empty() {
        return false;
    }
    match intent {
        Intent::Search => crate::intent::needs_context(query),
        Intent::Chat => true,
    }
}
