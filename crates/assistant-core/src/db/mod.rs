// ============================================================================
// AssistantDb — Embedded Database (redb)
// ============================================================================
// Persistent local storage for profile vectors and the chat log.
// Default path: ~/.hr-assistant/assistant.redb (override via HR_ASSISTANT_DB_PATH)
// Keys are owner-prefixed, so every read is a range scan over one owner.
// ============================================================================

pub mod types;

pub use types::{DbStats, StoredProfile};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use redb::{Database, ReadableTable, TableDefinition};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::store::{ChatLogStore, ProfileStore};
use crate::types::{ChatExchange, OwnerId, ProfileRecord, ProfileVector};

// Table definitions
const PROFILES: TableDefinition<&str, &[u8]> = TableDefinition::new("profiles");
const CHATS: TableDefinition<&str, &[u8]> = TableDefinition::new("chats");

/// Embedded database for profiles and conversations
pub struct AssistantDb {
    db: Database,
    path: PathBuf,
    dimension: usize,
}

fn owner_prefix(owner: &OwnerId) -> String {
    format!("{}:", owner)
}

/// Exclusive upper bound of an owner's keys (`;` sorts right after `:`)
fn owner_range_end(owner: &OwnerId) -> String {
    format!("{};", owner)
}

fn profile_key(owner: &OwnerId, profile_id: &str) -> String {
    format!("{}:{}", owner, profile_id)
}

/// Chat keys sort by timestamp, then by a sequence number that orders
/// exchanges sharing one microsecond in insertion order.
fn chat_stamp(owner: &OwnerId, created_at: i64) -> String {
    format!("{}:{:020}:", owner, created_at.max(0))
}

fn chat_sequence(key: &str) -> Option<u64> {
    key.rsplit(':').next()?.parse().ok()
}

impl AssistantDb {
    /// Open (or create) the database at the given path.
    /// If `path` is None, uses HR_ASSISTANT_DB_PATH env var or ~/.hr-assistant/assistant.redb.
    /// `dimension` is the embedding length every stored vector must have.
    pub fn open(path: Option<&str>, dimension: usize) -> Result<Self> {
        let db_path = if let Some(p) = path {
            PathBuf::from(p)
        } else if let Ok(env_path) = std::env::var("HR_ASSISTANT_DB_PATH") {
            PathBuf::from(env_path)
        } else {
            let home = dirs::home_dir().ok_or_else(|| anyhow!("Cannot determine home directory"))?;
            let data_dir = home.join(".hr-assistant");
            std::fs::create_dir_all(&data_dir)
                .map_err(|e| anyhow!("Failed to create .hr-assistant directory: {}", e))?;
            data_dir.join("assistant.redb")
        };

        info!("Opening database at: {}", db_path.display());

        let db = Database::create(&db_path)
            .map_err(|e| anyhow!("Failed to open database: {}", e))?;

        // Ensure tables exist by doing a write transaction
        let write_txn = db
            .begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let _ = write_txn
                .open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to create profiles table: {}", e))?;
            let _ = write_txn
                .open_table(CHATS)
                .map_err(|e| anyhow!("Failed to create chats table: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit init: {}", e))?;

        info!("Database ready (embedding dimension {})", dimension);

        Ok(Self {
            db,
            path: db_path,
            dimension,
        })
    }

    /// Get the database file path
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    // ========================================================================
    // Profile Operations
    // ========================================================================

    /// Insert or replace a profile
    pub fn store_profile(&self, record: &ProfileRecord) -> Result<()> {
        let vector = &record.vector;
        if vector.profile_id.trim().is_empty() {
            return Err(anyhow!("Cannot store profile without an id"));
        }
        if vector.vector.len() != self.dimension {
            return Err(anyhow!(
                "Profile {} has dimension {}, database expects {}",
                vector.profile_id,
                vector.vector.len(),
                self.dimension
            ));
        }

        let key = profile_key(&vector.owner_id, &vector.profile_id);
        let stored = StoredProfile::from_record(record)?;
        let value = bincode::serialize(&stored)
            .map_err(|e| anyhow!("Failed to serialize profile: {}", e))?;

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;
            table.insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert profile: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored profile {} for owner {}", vector.profile_id, vector.owner_id);
        Ok(())
    }

    pub fn get_profile(&self, owner: &OwnerId, profile_id: &str) -> Result<Option<StoredProfile>> {
        let key = profile_key(owner, profile_id);

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(PROFILES)
            .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;

        match table.get(key.as_str()).map_err(|e| anyhow!("Failed to get profile: {}", e))? {
            Some(value) => {
                let profile: StoredProfile = bincode::deserialize(value.value())
                    .map_err(|e| anyhow!("Failed to deserialize profile: {}", e))?;
                Ok(Some(profile))
            }
            None => Ok(None),
        }
    }

    /// All profiles of one owner, in key order
    pub fn list_owner_profiles(&self, owner: &OwnerId) -> Result<Vec<StoredProfile>> {
        let (start, end) = (owner_prefix(owner), owner_range_end(owner));

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(PROFILES)
            .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;

        let mut results = Vec::new();
        let iter = table.range::<&str>(start.as_str()..end.as_str())
            .map_err(|e| anyhow!("Failed to iterate profiles: {}", e))?;
        for entry in iter {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let profile: StoredProfile = bincode::deserialize(value.value())
                .map_err(|e| anyhow!("Failed to deserialize profile: {}", e))?;
            results.push(profile);
        }
        Ok(results)
    }

    pub fn remove_profile(&self, owner: &OwnerId, profile_id: &str) -> Result<bool> {
        let key = profile_key(owner, profile_id);

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        let removed;
        {
            let mut table = write_txn.open_table(PROFILES)
                .map_err(|e| anyhow!("Failed to open profiles table: {}", e))?;
            removed = table.remove(key.as_str())
                .map_err(|e| anyhow!("Failed to remove profile: {}", e))?
                .is_some();
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit delete: {}", e))?;

        if removed {
            debug!("Deleted profile {} for owner {}", profile_id, owner);
        }
        Ok(removed)
    }

    // ========================================================================
    // Chat Log Operations
    // ========================================================================

    pub fn append_chat(&self, owner: &OwnerId, exchange: &ChatExchange) -> Result<()> {
        let stamp = chat_stamp(owner, exchange.created_at);
        let stamp_end = format!("{};", stamp.trim_end_matches(':'));
        let value = bincode::serialize(exchange)
            .map_err(|e| anyhow!("Failed to serialize chat: {}", e))?;

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(CHATS)
                .map_err(|e| anyhow!("Failed to open chats table: {}", e))?;

            // Write transactions are serialized, so the sequence is race-free
            let last = table.range::<&str>(stamp.as_str()..stamp_end.as_str())
                .map_err(|e| anyhow!("Failed to iterate chats: {}", e))?
                .next_back()
                .transpose()
                .map_err(|e| anyhow!("Failed to read entry: {}", e))?
                .and_then(|(key, _)| chat_sequence(key.value()));
            let key = format!("{}{:010}", stamp, last.map_or(0, |seq| seq + 1));

            table.insert(key.as_str(), value.as_slice())
                .map_err(|e| anyhow!("Failed to insert chat: {}", e))?;
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit: {}", e))?;

        debug!("Stored {} exchange for owner {}", exchange.intent, owner);
        Ok(())
    }

    /// Up to `limit` exchanges, most recent first.
    /// Scans backwards, so only the returned entries are decoded.
    pub fn recent_chats(&self, owner: &OwnerId, limit: usize) -> Result<Vec<ChatExchange>> {
        let (start, end) = (owner_prefix(owner), owner_range_end(owner));

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(CHATS)
            .map_err(|e| anyhow!("Failed to open chats table: {}", e))?;

        let mut results = Vec::with_capacity(limit.min(64));
        let iter = table.range::<&str>(start.as_str()..end.as_str())
            .map_err(|e| anyhow!("Failed to iterate chats: {}", e))?;
        for entry in iter.rev().take(limit) {
            let (_key, value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            let chat: ChatExchange = bincode::deserialize(value.value())
                .map_err(|e| anyhow!("Failed to deserialize chat: {}", e))?;
            results.push(chat);
        }
        Ok(results)
    }

    pub fn chat_count(&self, owner: &OwnerId) -> Result<usize> {
        Ok(self.chat_keys(owner)?.len())
    }

    /// Chronological chat keys for one owner
    fn chat_keys(&self, owner: &OwnerId) -> Result<Vec<String>> {
        let (start, end) = (owner_prefix(owner), owner_range_end(owner));

        let read_txn = self.db.begin_read()
            .map_err(|e| anyhow!("Failed to begin read: {}", e))?;
        let table = read_txn.open_table(CHATS)
            .map_err(|e| anyhow!("Failed to open chats table: {}", e))?;

        let mut keys = Vec::new();
        let iter = table.range::<&str>(start.as_str()..end.as_str())
            .map_err(|e| anyhow!("Failed to iterate chats: {}", e))?;
        for entry in iter {
            let (key, _value) = entry.map_err(|e| anyhow!("Failed to read entry: {}", e))?;
            keys.push(key.value().to_string());
        }
        Ok(keys)
    }

    // ========================================================================
    // Pruning Operations
    // ========================================================================

    /// Delete all but the newest `keep` exchanges of one owner.
    /// Returns the number of exchanges deleted.
    pub fn prune_chats(&self, owner: &OwnerId, keep: usize) -> Result<usize> {
        let keys = self.chat_keys(owner)?;
        let excess = keys.len().saturating_sub(keep);
        if excess == 0 {
            return Ok(0);
        }

        let write_txn = self.db.begin_write()
            .map_err(|e| anyhow!("Failed to begin write: {}", e))?;
        {
            let mut table = write_txn.open_table(CHATS)
                .map_err(|e| anyhow!("Failed to open chats table: {}", e))?;
            for key in keys.iter().take(excess) {
                table.remove(key.as_str())
                    .map_err(|e| anyhow!("Failed to remove chat: {}", e))?;
            }
        }
        write_txn.commit().map_err(|e| anyhow!("Failed to commit prune: {}", e))?;

        info!("Pruned {} old exchanges for owner {}", excess, owner);
        Ok(excess)
    }

    // ========================================================================
    // Statistics
    // ========================================================================

    pub fn stats(&self, owner: &OwnerId) -> Result<DbStats> {
        let profiles = self.list_owner_profiles(owner)?;

        Ok(DbStats {
            owner_id: owner.to_string(),
            total_profiles: profiles.len(),
            profiles_with_summary: profiles
                .iter()
                .filter(|p| p.summary_json.is_some())
                .count(),
            total_chats: self.chat_count(owner)?,
            embedding_dimension: self.dimension,
        })
    }
}

#[async_trait]
impl ProfileStore for AssistantDb {
    async fn get_vectors(&self, owner: &OwnerId) -> Result<Vec<ProfileVector>> {
        self.list_owner_profiles(owner)?
            .iter()
            .map(StoredProfile::to_vector)
            .collect()
    }

    async fn get_summary(
        &self,
        profile_id: &str,
        owner: &OwnerId,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self
            .get_profile(owner, profile_id)?
            .and_then(|profile| profile.summary()))
    }

    async fn get_record(
        &self,
        owner: &OwnerId,
        profile_id: &str,
    ) -> Result<Option<ProfileRecord>> {
        self.get_profile(owner, profile_id)?
            .map(|profile| profile.to_record())
            .transpose()
    }

    async fn put_profile(&self, record: ProfileRecord) -> Result<()> {
        self.store_profile(&record)
    }

    async fn delete_profile(&self, owner: &OwnerId, profile_id: &str) -> Result<bool> {
        self.remove_profile(owner, profile_id)
    }

    async fn list_profiles(&self, owner: &OwnerId) -> Result<Vec<ProfileRecord>> {
        self.list_owner_profiles(owner)?
            .iter()
            .map(StoredProfile::to_record)
            .collect()
    }
}

#[async_trait]
impl ChatLogStore for AssistantDb {
    async fn append(&self, owner: &OwnerId, exchange: &ChatExchange) -> Result<()> {
        self.append_chat(owner, exchange)
    }

    async fn load_recent(&self, owner: &OwnerId, limit: usize) -> Result<Vec<ChatExchange>> {
        self.recent_chats(owner, limit)
    }

    async fn count(&self, owner: &OwnerId) -> Result<usize> {
        self.chat_count(owner)
    }
}
