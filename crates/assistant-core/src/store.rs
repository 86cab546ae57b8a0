//! ============================================================================
//! Store Interfaces - Profile vectors and chat log persistence
//! ============================================================================
//! Every method is scoped to exactly one owner. `AssistantDb` (redb) is the
//! shipped implementation.
//! ============================================================================

use anyhow::Result;
use async_trait::async_trait;

use crate::types::{ChatExchange, OwnerId, ProfileRecord, ProfileVector};

/// Persistence for profile embeddings and their structured summaries
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// All vectors stored for one owner, in a stable order
    async fn get_vectors(&self, owner: &OwnerId) -> Result<Vec<ProfileVector>>;

    /// Structured summary of one profile, if present and owned by `owner`
    async fn get_summary(
        &self,
        profile_id: &str,
        owner: &OwnerId,
    ) -> Result<Option<serde_json::Value>>;

    /// One stored record, if present and owned by `owner`
    async fn get_record(
        &self,
        owner: &OwnerId,
        profile_id: &str,
    ) -> Result<Option<ProfileRecord>>;

    /// Insert or replace a profile record
    async fn put_profile(&self, record: ProfileRecord) -> Result<()>;

    /// Delete a profile; returns whether it existed
    async fn delete_profile(&self, owner: &OwnerId, profile_id: &str) -> Result<bool>;

    /// Every stored record for one owner
    async fn list_profiles(&self, owner: &OwnerId) -> Result<Vec<ProfileRecord>>;
}

/// Append-only log of query/response exchanges
#[async_trait]
pub trait ChatLogStore: Send + Sync {
    async fn append(&self, owner: &OwnerId, exchange: &ChatExchange) -> Result<()>;

    /// Up to `limit` exchanges, most recent first
    async fn load_recent(&self, owner: &OwnerId, limit: usize) -> Result<Vec<ChatExchange>>;

    async fn count(&self, owner: &OwnerId) -> Result<usize>;
}
