//! ============================================================================
//! Database Types - Serializable records for redb storage
//! ============================================================================

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use crate::types::{OwnerId, ProfileRecord, ProfileVector};

/// Profile record as stored in the `profiles` table.
/// The summary is kept as JSON text: bincode cannot decode `serde_json::Value`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredProfile {
    pub profile_id: String,
    pub owner_id: String,
    pub vector: Vec<f32>,
    pub source_text: String,
    pub summary_json: Option<String>,
    pub updated_at: i64,
}

impl StoredProfile {
    pub fn from_record(record: &ProfileRecord) -> Result<Self> {
        let summary_json = record
            .summary
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| anyhow!("Failed to serialize profile summary: {}", e))?;

        Ok(Self {
            profile_id: record.vector.profile_id.clone(),
            owner_id: record.vector.owner_id.to_string(),
            vector: record.vector.vector.clone(),
            source_text: record.vector.source_text.clone(),
            summary_json,
            updated_at: record.updated_at,
        })
    }

    pub fn owner(&self) -> Result<OwnerId> {
        OwnerId::parse(&self.owner_id)
            .map_err(|e| anyhow!("Corrupt owner id in profile {}: {}", self.profile_id, e))
    }

    pub fn to_vector(&self) -> Result<ProfileVector> {
        Ok(ProfileVector {
            profile_id: self.profile_id.clone(),
            owner_id: self.owner()?,
            vector: self.vector.clone(),
            source_text: self.source_text.clone(),
        })
    }

    /// Parsed summary; unparseable JSON is treated as absent
    pub fn summary(&self) -> Option<serde_json::Value> {
        self.summary_json
            .as_deref()
            .and_then(|json| serde_json::from_str(json).ok())
    }

    pub fn to_record(&self) -> Result<ProfileRecord> {
        Ok(ProfileRecord {
            vector: self.to_vector()?,
            summary: self.summary(),
            updated_at: self.updated_at,
        })
    }
}

/// Per-owner database statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DbStats {
    pub owner_id: String,
    pub total_profiles: usize,
    pub profiles_with_summary: usize,
    pub total_chats: usize,
    pub embedding_dimension: usize,
}
