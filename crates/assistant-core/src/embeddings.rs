//! ============================================================================
//! Embedding Service - Text vectors for profile similarity search
//! ============================================================================
//! Generates embeddings through an OpenAI-compatible `/embeddings` endpoint.
//! The default targets a local Ollama server running all-minilm (384 dims).
//! ============================================================================

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::AssistantConfig;

/// Default embedding model (sentence-transformers all-MiniLM-L6-v2)
pub const DEFAULT_EMBEDDING_MODEL: &str = "all-minilm";

/// Dimension of the default embedding model
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Maps text to a fixed-dimension vector
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Length of every vector this provider returns
    fn dimension(&self) -> usize;

    /// Embed one text. Empty or whitespace-only text maps to the zero vector.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}

/// Embedding service for generating text vectors
pub struct EmbeddingService {
    client: Client,
    api_key: Option<String>,
    base_url: String,
    model: String,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest {
    model: String,
    input: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
    #[serde(default)]
    model: Option<String>,
    usage: Option<EmbeddingUsage>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct EmbeddingUsage {
    prompt_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct ErrorDetail {
    message: String,
    #[serde(rename = "type")]
    error_type: Option<String>,
}

impl EmbeddingService {
    /// Local Ollama server with the default model
    pub fn new_local() -> Self {
        Self::new_custom(
            None,
            "http://localhost:11434/v1".to_string(),
            DEFAULT_EMBEDDING_MODEL.to_string(),
            DEFAULT_EMBEDDING_DIM,
        )
    }

    /// Create with custom base URL, model and dimension
    pub fn new_custom(
        api_key: Option<String>,
        base_url: String,
        model: String,
        dimension: usize,
    ) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimension,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new_custom(
            config.embedding_api_key.clone(),
            config.embedding_base_url.clone(),
            config.embedding_model.clone(),
            config.embedding_dim,
        )
    }

    /// Generate embeddings for multiple texts, in input order
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        debug!("Generating embeddings for {} texts", texts.len());

        let expected = texts.len();
        let request = EmbeddingRequest {
            model: self.model.clone(),
            input: texts,
        };

        let mut builder = self
            .client
            .post(format!("{}/embeddings", self.base_url))
            .header("Content-Type", "application/json")
            .json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {}", key));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| anyhow!("Failed to send embedding request: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| anyhow!("Failed to read response body: {}", e))?;

        if !status.is_success() {
            if let Ok(error) = serde_json::from_str::<ErrorResponse>(&body) {
                return Err(anyhow!(
                    "Embedding API error ({}): {}",
                    status,
                    error.error.message
                ));
            }
            return Err(anyhow!("Embedding API error ({}): {}", status, body));
        }

        let embeddings = parse_embedding_response(&body, self.dimension)?;
        if embeddings.len() != expected {
            return Err(anyhow!(
                "Embedding API returned {} vectors for {} inputs",
                embeddings.len(),
                expected
            ));
        }
        Ok(embeddings)
    }

    /// Get the current model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl EmbeddingProvider for EmbeddingService {
    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let text = text.trim();
        if text.is_empty() {
            return Ok(zero_vector(self.dimension));
        }

        self.embed_batch(vec![text.to_string()])
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| anyhow!("No embedding returned"))
    }
}

/// The vector assigned to empty text
pub fn zero_vector(dimension: usize) -> Vec<f32> {
    vec![0.0; dimension]
}

/// Decode a response body, restoring input order and checking dimensions
fn parse_embedding_response(body: &str, dimension: usize) -> Result<Vec<Vec<f32>>> {
    let embedding_response: EmbeddingResponse = serde_json::from_str(body)
        .map_err(|e| anyhow!("Failed to parse embedding response: {} - body: {}", e, body))?;

    if let Some(usage) = &embedding_response.usage {
        debug!(
            "Embedding tokens used: {} (model: {})",
            usage.total_tokens,
            embedding_response.model.as_deref().unwrap_or("unknown")
        );
    }

    let mut embeddings: Vec<(usize, Vec<f32>)> = embedding_response
        .data
        .into_iter()
        .map(|d| (d.index, d.embedding))
        .collect();
    embeddings.sort_by_key(|(idx, _)| *idx);

    embeddings
        .into_iter()
        .map(|(idx, embedding)| {
            if embedding.len() == dimension {
                Ok(embedding)
            } else {
                Err(anyhow!(
                    "Embedding {} has dimension {}, expected {}",
                    idx,
                    embedding.len(),
                    dimension
                ))
            }
        })
        .collect()
}
