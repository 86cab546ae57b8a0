//! ============================================================================
//! ASSISTANT-CORE: HR Assistant Retrieval Core
//! ============================================================================
//! This crate answers recruiter questions over an owner's indexed CVs:
//! - Keyword intent routing and result-count heuristics
//! - Cosine ranking of per-owner profile embeddings
//! - Bounded per-owner conversation memory
//! - Prompt composition and generation via a local Ollama server
//! - Embedded redb storage for profiles and the chat log
//! ============================================================================

pub mod assistant;
pub mod config;
pub mod db;
pub mod embeddings;
pub mod error;
pub mod generator;
pub mod indexer;
pub mod intent;
pub mod memory;
pub mod prompt;
pub mod ranker;
pub mod store;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use types::*;
pub use assistant::Assistant;
pub use config::{AssistantConfig, HistoryConfig};
pub use db::{AssistantDb, DbStats};
pub use embeddings::{EmbeddingProvider, EmbeddingService};
pub use error::{AssistantError, GenerationError};
pub use generator::{GenerationOptions, OllamaGenerator, ResponseGenerator};
pub use indexer::ProfileIndexer;
pub use store::{ChatLogStore, ProfileStore};
