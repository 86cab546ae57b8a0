//! ============================================================================
//! Profile Indexer - Summary → embedding text → stored vector
//! ============================================================================

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::embeddings::EmbeddingProvider;
use crate::error::AssistantError;
use crate::prompt::field;
use crate::store::ProfileStore;
use crate::types::{OwnerId, ProfileRecord, ProfileVector};

/// Characters of the `raw` fallback kept for embedding
const RAW_TEXT_LIMIT: usize = 1000;

/// Text that represents a profile summary for embedding.
/// Returns None when the summary carries nothing indexable.
pub fn embedding_text(summary: &Value) -> Option<String> {
    let mut parts: Vec<String> = Vec::new();

    if let Some(name) = field(summary, "Name").and_then(plain_text) {
        parts.push(format!("Name: {}", name));
    }

    if let Some(skills) = field(summary, "Skills") {
        let text = match skills {
            Value::Array(items) => items
                .iter()
                .filter_map(plain_text)
                .collect::<Vec<_>>()
                .join(" "),
            other => plain_text(other).unwrap_or_default(),
        };
        if !text.is_empty() {
            parts.push(format!("Skills: {}", text));
        }
    }

    let experience = entries_text(
        field(summary, "Experience"),
        &["Role", "Company", "Description"],
    );
    if let Some(text) = experience {
        parts.push(format!("Experience: {}", text));
    }

    let education = entries_text(field(summary, "Education"), &["Degree", "School", "Field"]);
    if let Some(text) = education {
        parts.push(format!("Education: {}", text));
    }

    let combined = parts.join(" | ");
    if !combined.trim().is_empty() {
        return Some(combined);
    }

    let raw = field(summary, "raw").and_then(plain_text)?;
    Some(raw.chars().take(RAW_TEXT_LIMIT).collect())
}

fn plain_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Null => return None,
        other => other.to_string(),
    };
    (!text.is_empty()).then_some(text)
}

/// `Key: value | Key: value` per entry, entries joined with ` || `
fn entries_text(value: Option<&Value>, keys: &[&str]) -> Option<String> {
    let render = |entry: &Value| -> Option<String> {
        if entry.is_object() {
            let labelled: Vec<String> = keys
                .iter()
                .filter_map(|key| {
                    field(entry, key)
                        .and_then(plain_text)
                        .map(|v| format!("{}: {}", key, v))
                })
                .collect();
            (!labelled.is_empty()).then(|| labelled.join(" | "))
        } else {
            plain_text(entry)
        }
    };

    let text = match value? {
        Value::Array(items) => items.iter().filter_map(render).collect::<Vec<_>>().join(" || "),
        other => render(other)?,
    };
    (!text.is_empty()).then_some(text)
}

/// Embeds profile summaries and writes them to the profile store
pub struct ProfileIndexer {
    embeddings: Arc<dyn EmbeddingProvider>,
    profiles: Arc<dyn ProfileStore>,
}

impl ProfileIndexer {
    pub fn new(embeddings: Arc<dyn EmbeddingProvider>, profiles: Arc<dyn ProfileStore>) -> Self {
        Self {
            embeddings,
            profiles,
        }
    }

    /// Embed and store one profile, replacing any previous vector for it.
    /// Returns false if the summary has no indexable content.
    pub async fn index_profile(
        &self,
        owner: &OwnerId,
        profile_id: &str,
        summary: Value,
    ) -> Result<bool, AssistantError> {
        let Some(text) = embedding_text(&summary) else {
            warn!("Profile {} for owner {} has no usable content", profile_id, owner);
            return Ok(false);
        };

        let vector = self.embeddings.embed(&text).await?;
        self.profiles
            .put_profile(ProfileRecord {
                vector: ProfileVector {
                    profile_id: profile_id.to_string(),
                    owner_id: owner.clone(),
                    vector,
                    source_text: text,
                },
                summary: Some(summary),
                updated_at: chrono::Utc::now().timestamp(),
            })
            .await?;

        info!("Indexed profile {} for owner {}", profile_id, owner);
        Ok(true)
    }

    /// Re-embed every stored profile of one owner from its summary.
    /// Returns the number rebuilt; individual failures are skipped.
    pub async fn rebuild(&self, owner: &OwnerId) -> Result<usize, AssistantError> {
        let records = self.profiles.list_profiles(owner).await?;
        let total = records.len();
        let mut rebuilt = 0;

        for record in records {
            let profile_id = record.vector.profile_id.clone();
            let Some(summary) = record.summary else {
                debug!("Skipping profile {} without summary", profile_id);
                continue;
            };
            match self.index_profile(owner, &profile_id, summary).await {
                Ok(true) => rebuilt += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    "Failed to rebuild profile {} for owner {}: {}",
                    profile_id, owner, e
                ),
            }
        }

        info!("Rebuilt {}/{} profiles for owner {}", rebuilt, total, owner);
        Ok(rebuilt)
    }

    pub async fn remove_profile(
        &self,
        owner: &OwnerId,
        profile_id: &str,
    ) -> Result<bool, AssistantError> {
        let removed = self.profiles.delete_profile(owner, profile_id).await?;
        if removed {
            info!("Removed profile {} for owner {}", profile_id, owner);
        }
        Ok(removed)
    }
}
