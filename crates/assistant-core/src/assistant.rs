//! ============================================================================
//! Assistant - Query orchestration
//! ============================================================================
//! classify → (search: embed, rank, fetch summaries) → compose → generate
//!          → append history → respond
//!
//! Collaborator failures never reach the caller: each one is logged and
//! replaced by a fixed user-facing message. Only an invalid owner id is
//! rejected. An owner's session lock is held for the whole pipeline, so
//! queries from one owner are serialized while other owners run freely.
//! ============================================================================

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::config::AssistantConfig;
use crate::embeddings::EmbeddingProvider;
use crate::error::{AssistantError, GenerationError};
use crate::generator::{GenerationOptions, ResponseGenerator};
use crate::indexer::ProfileIndexer;
use crate::intent;
use crate::memory::{should_inject_context, ConversationHistory, SessionRegistry};
use crate::prompt::{
    candidate_detail, candidate_match, candidate_summary, compose, RetrievedProfile,
};
use crate::ranker::rank_for_owner;
use crate::store::{ChatLogStore, ProfileStore};
use crate::types::{
    CandidateDetail, CandidateSummary, ChatExchange, Intent, OwnerId, QueryResponse,
    RankedResult,
};

pub const EMPTY_QUERY_RESPONSE: &str = "Please ask me something!";

pub const NO_MATCHES_RESPONSE: &str = "I couldn't find any relevant CVs for your query.";

pub const SEARCH_EMPTY_FALLBACK: &str =
    "I found the profiles but couldn't generate a response. Please try rephrasing your query.";

pub const SEARCH_ERROR_FALLBACK: &str = "Sorry, I encountered an error processing your request.";

pub const CHAT_EMPTY_FALLBACK: &str =
    "I'm here to help with HR and candidate questions. What would you like to know?";

pub const CHAT_ERROR_FALLBACK: &str = "I'm here to help! Try asking me about candidates or CVs.";

/// The HR assistant: one instance per process, shared across owners
pub struct Assistant {
    embeddings: Arc<dyn EmbeddingProvider>,
    profiles: Arc<dyn ProfileStore>,
    chat_log: Arc<dyn ChatLogStore>,
    generator: Arc<dyn ResponseGenerator>,
    sessions: SessionRegistry,
    indexer: ProfileIndexer,
    generation_timeout: Duration,
}

/// Outcome of the search or chat branch, before history is written
struct Answer {
    text: String,
    ranked: Option<Vec<RankedResult>>,
    retrieved: Vec<RetrievedProfile>,
}

impl Answer {
    fn chat(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ranked: None,
            retrieved: Vec::new(),
        }
    }

    fn search_failed() -> Self {
        Self {
            text: SEARCH_ERROR_FALLBACK.to_string(),
            ranked: None,
            retrieved: Vec::new(),
        }
    }
}

impl Assistant {
    pub fn new(
        embeddings: Arc<dyn EmbeddingProvider>,
        profiles: Arc<dyn ProfileStore>,
        chat_log: Arc<dyn ChatLogStore>,
        generator: Arc<dyn ResponseGenerator>,
        config: &AssistantConfig,
    ) -> Self {
        Self {
            indexer: ProfileIndexer::new(Arc::clone(&embeddings), Arc::clone(&profiles)),
            sessions: SessionRegistry::new(Arc::clone(&chat_log), config.history()),
            embeddings,
            profiles,
            chat_log,
            generator,
            generation_timeout: config.generation_timeout(),
        }
    }

    /// Profile ingestion over the same embedder and store
    pub fn indexer(&self) -> &ProfileIndexer {
        &self.indexer
    }

    /// Answer one query for one owner.
    ///
    /// Errors only when `owner_id` is invalid; every collaborator failure is
    /// converted into a fallback response.
    pub async fn process_query(
        &self,
        owner_id: &str,
        text: &str,
    ) -> Result<QueryResponse, AssistantError> {
        let owner = OwnerId::parse(owner_id)?;
        let query = text.trim();

        if query.is_empty() {
            return Ok(QueryResponse {
                response_text: EMPTY_QUERY_RESPONSE.to_string(),
                intent: Intent::Chat,
                ranked_results: None,
                results: Vec::new(),
            });
        }

        let classification = intent::classify(query);
        info!(
            "Processing {} query for owner {} (k={})",
            classification.intent, owner, classification.result_count
        );

        let session = self.sessions.session(&owner).await;
        let mut history = session.lock().await;

        let answer = match classification.intent {
            Intent::Search => {
                self.answer_search(&owner, query, classification.result_count, &history)
                    .await
            }
            Intent::Chat => self.answer_chat(&owner, query, &history).await,
        };

        history.append(query, &answer.text);
        let exchange = ChatExchange::new(
            query.to_string(),
            answer.text.clone(),
            classification.intent,
            answer.ranked.clone(),
        );
        if let Err(e) = self.chat_log.append(&owner, &exchange).await {
            warn!("Failed to persist exchange for owner {}: {}", owner, e);
        }
        drop(history);

        let results = answer
            .retrieved
            .iter()
            .enumerate()
            .map(|(i, profile)| candidate_match(i + 1, profile))
            .collect();

        Ok(QueryResponse {
            response_text: answer.text,
            intent: classification.intent,
            ranked_results: answer.ranked,
            results,
        })
    }

    async fn answer_search(
        &self,
        owner: &OwnerId,
        query: &str,
        k: usize,
        history: &ConversationHistory,
    ) -> Answer {
        let query_vector = match self.embeddings.embed(query).await {
            Ok(v) => v,
            Err(e) => {
                error!("Embedding failed for owner {}: {}", owner, e);
                return Answer::search_failed();
            }
        };

        let candidates = match self.profiles.get_vectors(owner).await {
            Ok(c) => c,
            Err(e) => {
                error!("Failed to load profile vectors for owner {}: {}", owner, e);
                return Answer::search_failed();
            }
        };

        let ranked = rank_for_owner(owner, &query_vector, &candidates, k);
        if ranked.is_empty() {
            info!("No matching profiles for owner {}", owner);
            return Answer {
                text: NO_MATCHES_RESPONSE.to_string(),
                ranked: Some(ranked),
                retrieved: Vec::new(),
            };
        }

        let mut retrieved = Vec::with_capacity(ranked.len());
        for result in &ranked {
            let summary = match self.profiles.get_summary(&result.profile_id, owner).await {
                Ok(summary) => summary,
                Err(e) => {
                    warn!(
                        "Summary lookup failed for profile {} (owner {}): {}",
                        result.profile_id, owner, e
                    );
                    None
                }
            };
            retrieved.push(RetrievedProfile {
                result: result.clone(),
                summary,
            });
        }

        let context = should_inject_context(Intent::Search, query, history)
            .then(|| history.render_context());
        let prompt = compose(query, Intent::Search, Some(retrieved.as_slice()), context.as_deref());

        let text = match self.generate(owner, &prompt, &GenerationOptions::search()).await {
            Ok(text) if text.trim().is_empty() => SEARCH_EMPTY_FALLBACK.to_string(),
            Ok(text) => text,
            Err(_) => SEARCH_ERROR_FALLBACK.to_string(),
        };

        Answer {
            text,
            ranked: Some(ranked),
            retrieved,
        }
    }

    async fn answer_chat(
        &self,
        owner: &OwnerId,
        query: &str,
        history: &ConversationHistory,
    ) -> Answer {
        if let Some(reply) = intent::canned_reply(query) {
            debug!("Canned reply for owner {}", owner);
            return Answer::chat(reply);
        }

        let context = should_inject_context(Intent::Chat, query, history)
            .then(|| history.render_context());
        let prompt = compose(query, Intent::Chat, None, context.as_deref());

        match self.generate(owner, &prompt, &GenerationOptions::chat()).await {
            Ok(text) if text.trim().is_empty() => Answer::chat(CHAT_EMPTY_FALLBACK),
            Ok(text) => Answer::chat(text),
            Err(_) => Answer::chat(CHAT_ERROR_FALLBACK),
        }
    }

    async fn generate(
        &self,
        owner: &OwnerId,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        debug!("Prompt for owner {} ({} chars)", owner, prompt.len());

        let result = match tokio::time::timeout(
            self.generation_timeout,
            self.generator.generate(prompt, options),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.generation_timeout)),
        };

        if let Err(e) = &result {
            error!("Generation failed for owner {}: {}", owner, e);
        }
        result
    }

    /// Up to `limit` persisted exchanges, most recent first
    pub async fn history(
        &self,
        owner_id: &str,
        limit: usize,
    ) -> Result<Vec<ChatExchange>, AssistantError> {
        let owner = OwnerId::parse(owner_id)?;
        Ok(self.chat_log.load_recent(&owner, limit).await?)
    }

    /// Forget the cached session; the next query reloads from the chat log
    pub fn reset_session(&self, owner_id: &str) -> Result<bool, AssistantError> {
        let owner = OwnerId::parse(owner_id)?;
        Ok(self.sessions.evict(&owner))
    }

    /// An owner's indexed candidates, most recently indexed first.
    ///
    /// `search` keeps candidates whose name, email or profile id contains
    /// it, ignoring case; blank searches match everything.
    pub async fn candidates(
        &self,
        owner_id: &str,
        search: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CandidateSummary>, AssistantError> {
        let owner = OwnerId::parse(owner_id)?;
        let needle = search
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty());

        let mut candidates: Vec<CandidateSummary> = self
            .profiles
            .list_profiles(&owner)
            .await?
            .iter()
            .map(candidate_summary)
            .filter(|c| needle.as_deref().map_or(true, |n| candidate_matches(c, n)))
            .collect();

        candidates.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.profile_id.cmp(&b.profile_id))
        });
        candidates.truncate(limit);

        debug!("Listed {} candidates for owner {}", candidates.len(), owner);
        Ok(candidates)
    }

    /// Full stored view of one candidate, if it belongs to the owner
    pub async fn candidate(
        &self,
        owner_id: &str,
        profile_id: &str,
    ) -> Result<Option<CandidateDetail>, AssistantError> {
        let owner = OwnerId::parse(owner_id)?;
        let record = self.profiles.get_record(&owner, profile_id.trim()).await?;
        Ok(record.map(candidate_detail))
    }
}

fn candidate_matches(candidate: &CandidateSummary, needle: &str) -> bool {
    [
        candidate.candidate_name.as_deref(),
        candidate.email.as_deref(),
        Some(candidate.profile_id.as_str()),
    ]
    .into_iter()
    .flatten()
    .any(|text| text.to_lowercase().contains(needle))
}
