//! ============================================================================
//! Test Doubles - In-memory stores, a keyword embedder, a scripted generator
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use crate::embeddings::{zero_vector, EmbeddingProvider};
use crate::error::GenerationError;
use crate::generator::{GenerationOptions, ResponseGenerator};
use crate::store::{ChatLogStore, ProfileStore};
use crate::types::{ChatExchange, OwnerId, ProfileRecord, ProfileVector};

/// Both stores over plain vectors
#[derive(Default)]
pub(crate) struct MemoryStore {
    profiles: Mutex<Vec<ProfileRecord>>,
    chats: Mutex<Vec<(OwnerId, ChatExchange)>>,
}

impl MemoryStore {
    pub fn chat_len(&self) -> usize {
        self.chats.lock().unwrap().len()
    }
}

#[async_trait]
impl ProfileStore for MemoryStore {
    async fn get_vectors(&self, owner: &OwnerId) -> Result<Vec<ProfileVector>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.vector.owner_id == owner)
            .map(|r| r.vector.clone())
            .collect())
    }

    async fn get_summary(
        &self,
        profile_id: &str,
        owner: &OwnerId,
    ) -> Result<Option<serde_json::Value>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.vector.owner_id == owner && r.vector.profile_id == profile_id)
            .and_then(|r| r.summary.clone()))
    }

    async fn get_record(
        &self,
        owner: &OwnerId,
        profile_id: &str,
    ) -> Result<Option<ProfileRecord>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|r| &r.vector.owner_id == owner && r.vector.profile_id == profile_id)
            .cloned())
    }

    async fn put_profile(&self, record: ProfileRecord) -> Result<()> {
        let mut profiles = self.profiles.lock().unwrap();
        profiles.retain(|r| {
            !(r.vector.owner_id == record.vector.owner_id
                && r.vector.profile_id == record.vector.profile_id)
        });
        profiles.push(record);
        Ok(())
    }

    async fn delete_profile(&self, owner: &OwnerId, profile_id: &str) -> Result<bool> {
        let mut profiles = self.profiles.lock().unwrap();
        let before = profiles.len();
        profiles.retain(|r| !(&r.vector.owner_id == owner && r.vector.profile_id == profile_id));
        Ok(profiles.len() != before)
    }

    async fn list_profiles(&self, owner: &OwnerId) -> Result<Vec<ProfileRecord>> {
        Ok(self
            .profiles
            .lock()
            .unwrap()
            .iter()
            .filter(|r| &r.vector.owner_id == owner)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ChatLogStore for MemoryStore {
    async fn append(&self, owner: &OwnerId, exchange: &ChatExchange) -> Result<()> {
        self.chats
            .lock()
            .unwrap()
            .push((owner.clone(), exchange.clone()));
        Ok(())
    }

    async fn load_recent(&self, owner: &OwnerId, limit: usize) -> Result<Vec<ChatExchange>> {
        Ok(self
            .chats
            .lock()
            .unwrap()
            .iter()
            .rev()
            .filter(|(o, _)| o == owner)
            .take(limit)
            .map(|(_, c)| c.clone())
            .collect())
    }

    async fn count(&self, owner: &OwnerId) -> Result<usize> {
        Ok(self.chats.lock().unwrap().iter().filter(|(o, _)| o == owner).count())
    }
}

/// Chat log whose every call fails
pub(crate) struct FailingChatLog;

#[async_trait]
impl ChatLogStore for FailingChatLog {
    async fn append(&self, _owner: &OwnerId, _exchange: &ChatExchange) -> Result<()> {
        Err(anyhow!("chat log offline"))
    }

    async fn load_recent(&self, _owner: &OwnerId, _limit: usize) -> Result<Vec<ChatExchange>> {
        Err(anyhow!("chat log offline"))
    }

    async fn count(&self, _owner: &OwnerId) -> Result<usize> {
        Err(anyhow!("chat log offline"))
    }
}

/// Profile store whose every call fails
pub(crate) struct FailingProfileStore;

#[async_trait]
impl ProfileStore for FailingProfileStore {
    async fn get_vectors(&self, _owner: &OwnerId) -> Result<Vec<ProfileVector>> {
        Err(anyhow!("profile store offline"))
    }

    async fn get_summary(
        &self,
        _profile_id: &str,
        _owner: &OwnerId,
    ) -> Result<Option<serde_json::Value>> {
        Err(anyhow!("profile store offline"))
    }

    async fn get_record(
        &self,
        _owner: &OwnerId,
        _profile_id: &str,
    ) -> Result<Option<ProfileRecord>> {
        Err(anyhow!("profile store offline"))
    }

    async fn put_profile(&self, _record: ProfileRecord) -> Result<()> {
        Err(anyhow!("profile store offline"))
    }

    async fn delete_profile(&self, _owner: &OwnerId, _profile_id: &str) -> Result<bool> {
        Err(anyhow!("profile store offline"))
    }

    async fn list_profiles(&self, _owner: &OwnerId) -> Result<Vec<ProfileRecord>> {
        Err(anyhow!("profile store offline"))
    }
}

/// Deterministic bag-of-words embedder: each lowercase token bumps one
/// hashed dimension, so texts sharing words score higher.
pub(crate) struct KeywordEmbedder {
    dimension: usize,
    fail: bool,
    calls: AtomicUsize,
}

impl KeywordEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(dimension: usize) -> Self {
        Self {
            fail: true,
            ..Self::new(dimension)
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vector = zero_vector(self.dimension);
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            // FNV-1a
            let mut hash: u64 = 0xcbf29ce484222325;
            for byte in token.bytes() {
                hash ^= u64::from(byte);
                hash = hash.wrapping_mul(0x100000001b3);
            }
            vector[(hash % self.dimension as u64) as usize] += 1.0;
        }
        vector
    }
}

#[async_trait]
impl EmbeddingProvider for KeywordEmbedder {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(anyhow!("embedding service offline"));
        }
        Ok(self.embed_sync(text))
    }
}

/// Generator returning a fixed reply and recording every prompt
pub(crate) struct ScriptedGenerator {
    reply: Result<String, GenerationError>,
    delay: Option<Duration>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            delay: None,
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: GenerationError) -> Self {
        Self {
            reply: Err(error),
            ..Self::replying("")
        }
    }

    pub fn slow(text: &str, delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::replying(text)
        }
    }

    pub fn calls(&self) -> usize {
        self.prompts.lock().unwrap().len()
    }

    pub fn last_prompt(&self) -> Option<String> {
        self.prompts.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl ResponseGenerator for ScriptedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.reply.clone()
    }
}

/// Generator that parks every call until the test opens the gate for it
pub(crate) struct GatedGenerator {
    gate: tokio::sync::Semaphore,
    prompts: Mutex<Vec<String>>,
}

impl GatedGenerator {
    pub fn closed() -> Self {
        Self {
            gate: tokio::sync::Semaphore::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Let `calls` more parked or future calls complete
    pub fn open(&self, calls: usize) {
        self.gate.add_permits(calls);
    }

    /// Prompts of every call that has started, in arrival order
    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    pub async fn wait_started(&self, calls: usize) {
        for _ in 0..400 {
            if self.prompts.lock().unwrap().len() >= calls {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("generator never reached {} calls", calls);
    }
}

#[async_trait]
impl ResponseGenerator for GatedGenerator {
    async fn generate(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        let call = {
            let mut prompts = self.prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        self.gate
            .acquire()
            .await
            .map_err(|e| GenerationError::Unavailable(e.to_string()))?
            .forget();
        Ok(format!("reply {}", call))
    }
}
