//! ============================================================================
//! Response Generator - Text completion via a local Ollama server
//! ============================================================================
//! Uses the non-streaming `/api/generate` endpoint. Generation can take
//! minutes on CPU, so every request carries an explicit timeout.
//! ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::config::AssistantConfig;
use crate::error::GenerationError;

/// Timeout for model listing / health checks
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(10);

/// Sampling options for one generation call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub max_tokens: u32,
    pub temperature: f32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub top_p: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repeat_penalty: Option<f32>,
}

impl GenerationOptions {
    /// Grounded answers over retrieved profiles
    pub fn search() -> Self {
        Self {
            max_tokens: 600,
            temperature: 0.7,
            top_p: None,
            repeat_penalty: None,
        }
    }

    /// Short conversational replies
    pub fn chat() -> Self {
        Self {
            max_tokens: 150,
            temperature: 0.8,
            top_p: None,
            repeat_penalty: None,
        }
    }
}

/// Executes a text completion for a composed prompt
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError>;
}

/// Generator backed by Ollama's REST API
pub struct OllamaGenerator {
    client: reqwest::Client,
    base_url: String,
    model: String,
    timeout: Duration,
}

impl OllamaGenerator {
    pub fn new(base_url: &str, model: &str, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            timeout,
        }
    }

    pub fn from_config(config: &AssistantConfig) -> Self {
        Self::new(
            &config.ollama_url,
            &config.generation_model,
            config.generation_timeout(),
        )
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Names of the models installed on the server
    pub async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.base_url))
            .timeout(HEALTH_CHECK_TIMEOUT)
            .send()
            .await
            .map_err(|e| map_request_error(e, HEALTH_CHECK_TIMEOUT))?;

        if !response.status().is_success() {
            return Err(GenerationError::Unavailable(format!(
                "HTTP {} from /api/tags",
                response.status()
            )));
        }

        let tags: TagsResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    /// Whether the server answers at all
    pub async fn is_available(&self) -> bool {
        match self.list_models().await {
            Ok(_) => true,
            Err(e) => {
                warn!("Ollama health check failed: {}", e);
                false
            }
        }
    }

    /// Whether a model whose tag contains `name` is installed
    pub async fn has_model(&self, name: &str) -> Result<bool, GenerationError> {
        Ok(self.list_models().await?.iter().any(|m| m.contains(name)))
    }
}

#[async_trait]
impl ResponseGenerator for OllamaGenerator {
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, GenerationError> {
        debug!(
            "Calling Ollama model {} with {} chars",
            self.model,
            prompt.len()
        );

        let request = GenerateRequest {
            model: &self.model,
            prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: options.max_tokens,
                temperature: options.temperature,
                top_p: options.top_p,
                repeat_penalty: options.repeat_penalty,
            },
        };

        let response = self
            .client
            .post(format!("{}/api/generate", self.base_url))
            .timeout(self.timeout)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(GenerationError::ModelNotFound(self.model.clone()));
        }
        if !status.is_success() {
            return Err(GenerationError::Unavailable(format!("HTTP {}: {}", status, body)));
        }

        let text = parse_generate_response(&body)?;
        info!("Ollama generation completed ({} chars)", text.len());
        Ok(text)
    }
}

fn map_request_error(e: reqwest::Error, timeout: Duration) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout(timeout)
    } else if e.is_decode() {
        GenerationError::MalformedResponse(e.to_string())
    } else {
        GenerationError::Unavailable(e.to_string())
    }
}

fn parse_generate_response(body: &str) -> Result<String, GenerationError> {
    let parsed: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| GenerationError::MalformedResponse(format!("{} - body: {}", e, body)))?;

    match (parsed.response, parsed.error) {
        (Some(text), _) => Ok(text.trim().to_string()),
        (None, Some(error)) => Err(GenerationError::Unavailable(error)),
        (None, None) => Err(GenerationError::MalformedResponse(
            "missing 'response' field".to_string(),
        )),
    }
}

// ============================================================================
// API Types
// ============================================================================

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    top_p: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    repeat_penalty: Option<f32>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: Option<String>,
    error: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    name: String,
}
