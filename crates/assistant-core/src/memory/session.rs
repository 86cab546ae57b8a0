//! ============================================================================
//! Session Registry - Per-owner conversation state
//! ============================================================================
//! Sessions are loaded lazily from the chat log on first use. Each owner has
//! its own async lock; the registry map lock is never held across an await.
//! ============================================================================

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::config::HistoryConfig;
use crate::store::ChatLogStore;
use crate::types::OwnerId;

use super::history::ConversationHistory;

/// Maximum number of cached sessions before idle ones are dropped
const MAX_SESSIONS: usize = 1000;

/// Shared handle to one owner's history
pub type SessionHandle = Arc<AsyncMutex<ConversationHistory>>;

/// Lazily-populated map of owner sessions
pub struct SessionRegistry {
    sessions: Mutex<HashMap<OwnerId, SessionHandle>>,
    chat_log: Arc<dyn ChatLogStore>,
    config: HistoryConfig,
}

impl SessionRegistry {
    pub fn new(chat_log: Arc<dyn ChatLogStore>, config: HistoryConfig) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            chat_log,
            config,
        }
    }

    /// Session for `owner`, loading it from the chat log if not cached
    pub async fn session(&self, owner: &OwnerId) -> SessionHandle {
        let cached = self.lock_sessions().get(owner).cloned();
        if let Some(existing) = cached {
            return existing;
        }

        let history = load_history(self.chat_log.as_ref(), owner, self.config).await;

        let mut sessions = self.lock_sessions();
        if sessions.len() >= MAX_SESSIONS {
            evict_idle(&mut sessions);
        }
        // A concurrent load for the same owner may have won; keep the first
        Arc::clone(
            sessions
                .entry(owner.clone())
                .or_insert_with(|| Arc::new(AsyncMutex::new(history))),
        )
    }

    /// Drop the cached session; the next access reloads from the chat log
    pub fn evict(&self, owner: &OwnerId) -> bool {
        self.lock_sessions().remove(owner).is_some()
    }

    pub fn len(&self) -> usize {
        self.lock_sessions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_sessions().is_empty()
    }

    fn lock_sessions(&self) -> std::sync::MutexGuard<'_, HashMap<OwnerId, SessionHandle>> {
        // Map mutations cannot leave it inconsistent, so a poisoned lock is usable
        self.sessions.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Load an owner's recent history. Storage failures fall back to an empty
/// history so the assistant stays usable.
pub async fn load_history(
    chat_log: &dyn ChatLogStore,
    owner: &OwnerId,
    config: HistoryConfig,
) -> ConversationHistory {
    match chat_log.load_recent(owner, config.max_exchanges).await {
        Ok(recent) => {
            let history = ConversationHistory::from_recent(&recent, config);
            info!(
                "Loaded {} conversation exchanges for owner {}",
                history.len() / 2,
                owner
            );
            history
        }
        Err(e) => {
            warn!(
                "Could not load conversation history for owner {}: {} - starting empty",
                owner, e
            );
            ConversationHistory::new(config)
        }
    }
}

fn evict_idle(sessions: &mut HashMap<OwnerId, SessionHandle>) {
    let before = sessions.len();
    sessions.retain(|_, handle| Arc::strong_count(handle) > 1);
    debug!("Evicted {} idle sessions", before - sessions.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingChatLog, MemoryStore};
    use crate::types::{ChatExchange, Intent};

    fn owner(id: &str) -> OwnerId {
        OwnerId::parse(id).unwrap()
    }

    #[tokio::test]
    async fn test_session_loads_from_chat_log() {
        let store = Arc::new(MemoryStore::default());
        store
            .append(
                &owner("alice"),
                &ChatExchange::new("q".into(), "a".into(), Intent::Chat, None),
            )
            .await
            .unwrap();

        let registry = SessionRegistry::new(store, HistoryConfig::default());
        let session = registry.session(&owner("alice")).await;
        assert_eq!(session.lock().await.len(), 2);

        let other = registry.session(&owner("bob")).await;
        assert!(other.lock().await.is_empty());
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn test_session_is_cached() {
        let registry =
            SessionRegistry::new(Arc::new(MemoryStore::default()), HistoryConfig::default());
        let first = registry.session(&owner("alice")).await;
        first.lock().await.append("hello there", "hi");

        let second = registry.session(&owner("alice")).await;
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.lock().await.len(), 2);

        assert!(registry.evict(&owner("alice")));
        assert!(!registry.evict(&owner("alice")));
    }

    #[tokio::test]
    async fn test_load_failure_falls_back_to_empty() {
        let registry = SessionRegistry::new(Arc::new(FailingChatLog), HistoryConfig::default());
        let session = registry.session(&owner("alice")).await;
        assert!(session.lock().await.is_empty());
    }
}
