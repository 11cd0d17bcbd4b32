/// Completion client: the single point of entry for all LLM calls.
///
/// ARCHITECTURAL RULE: No other module may call a completion API directly.
/// Every stage goes through `CompletionClient::complete`.
///
/// One call per action: no retry, no streaming. Every failure comes back as a
/// `CompletionError` value; nothing panics past this boundary.
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::config::{CompletionProvider, Config};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const REQUEST_TIMEOUT_SECS: u64 = 120;

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service unreachable: {0}")]
    Unreachable(String),

    #[error("completion service rejected the credential: {0}")]
    Authentication(String),

    #[error("completion quota exhausted: {0}")]
    Quota(String),

    #[error("completion API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("completion service returned an unreadable body: {0}")]
    Decode(String),

    #[error("completion service returned empty content")]
    EmptyContent,
}

impl From<reqwest::Error> for CompletionError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            CompletionError::Decode(e.to_string())
        } else {
            CompletionError::Unreachable(e.to_string())
        }
    }
}

/// Maps a non-success HTTP status to the failure taxonomy.
fn classify_status(status: StatusCode, message: String) -> CompletionError {
    match status.as_u16() {
        401 | 403 => CompletionError::Authentication(message),
        429 => CompletionError::Quota(message),
        code => CompletionError::Api {
            status: code,
            message,
        },
    }
}

/// The completion seam. Carried in `AppState` as `Arc<dyn CompletionClient>`.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(&self, prompt: &str, model_id: &str) -> Result<String, CompletionError>;
}

/// Sampling settings shared by both HTTP backends.
#[derive(Debug, Clone, Copy)]
pub struct SamplingParams {
    pub max_tokens: u32,
    pub temperature: f32,
}

fn http_client() -> Result<Client, CompletionError> {
    Client::builder()
        .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
        .build()
        .map_err(|e| CompletionError::Unreachable(format!("failed to build HTTP client: {e}")))
}

/// Builds the backend selected in config.
pub fn client_from_config(
    config: &Config,
) -> Result<std::sync::Arc<dyn CompletionClient>, CompletionError> {
    let params = SamplingParams {
        max_tokens: config.max_tokens,
        temperature: config.temperature,
    };
    Ok(match config.provider {
        CompletionProvider::Anthropic => std::sync::Arc::new(AnthropicClient::new(
            config.api_key.clone(),
            config.completion_base_url.clone(),
            params,
        )?),
        CompletionProvider::OpenAi => std::sync::Arc::new(OpenAiClient::new(
            config.api_key.clone(),
            config.completion_base_url.clone(),
            params,
        )?),
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Anthropic Messages API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}

impl AnthropicResponse {
    fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

fn error_message(body: String) -> String {
    serde_json::from_str::<ApiErrorEnvelope>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

#[derive(Clone)]
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    url: String,
    params: SamplingParams,
}

impl AnthropicClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        params: SamplingParams,
    ) -> Result<Self, CompletionError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            url: base_url.unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
            params,
        })
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, prompt: &str, model_id: &str) -> Result<String, CompletionError> {
        let request_body = AnthropicRequest {
            model: model_id,
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(&self.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_message(body)));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                "Completion succeeded: model={model_id} input_tokens={} output_tokens={}",
                usage.input_tokens, usage.output_tokens
            );
        }

        match parsed.text() {
            Some(text) if !text.trim().is_empty() => Ok(text.to_string()),
            _ => Err(CompletionError::EmptyContent),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// OpenAI-compatible Chat Completions API
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ChatCompletionsRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionsResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Clone)]
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    base_url: String,
    params: SamplingParams,
}

impl OpenAiClient {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        params: SamplingParams,
    ) -> Result<Self, CompletionError> {
        Ok(Self {
            client: http_client()?,
            api_key,
            base_url: base_url.unwrap_or_else(|| OPENAI_API_URL.to_string()),
            params,
        })
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn complete(&self, prompt: &str, model_id: &str) -> Result<String, CompletionError> {
        let request_body = ChatCompletionsRequest {
            model: model_id,
            messages: vec![Message {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.params.max_tokens,
            temperature: self.params.temperature,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request_body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(classify_status(status, error_message(body)));
        }

        let parsed: ChatCompletionsResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Decode(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(CompletionError::EmptyContent)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Model catalog
// ────────────────────────────────────────────────────────────────────────────

/// A selectable model: display name shown to the user and the id sent upstream.
#[derive(Debug, Clone, Serialize)]
pub struct ModelChoice {
    pub name: &'static str,
    pub id: &'static str,
}

const ANTHROPIC_MODELS: &[ModelChoice] = &[
    ModelChoice {
        name: "Claude 3.5 Sonnet",
        id: "claude-3-5-sonnet-20241022",
    },
    ModelChoice {
        name: "Claude 3.5 Haiku",
        id: "claude-3-5-haiku-20241022",
    },
];

const OPENAI_MODELS: &[ModelChoice] = &[
    ModelChoice {
        name: "GPT-4o",
        id: "gpt-4o",
    },
    ModelChoice {
        name: "GPT-4o mini",
        id: "gpt-4o-mini",
    },
];

/// Models offered for the configured provider plus the configured default.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    pub default_model: String,
    pub choices: &'static [ModelChoice],
}

impl ModelCatalog {
    pub fn for_provider(provider: CompletionProvider, default_model: String) -> Self {
        let choices = match provider {
            CompletionProvider::Anthropic => ANTHROPIC_MODELS,
            CompletionProvider::OpenAi => OPENAI_MODELS,
        };
        Self {
            default_model,
            choices,
        }
    }

    /// Resolves a requested model (display name or id) to an upstream id.
    /// `None` means the configured default. Unknown names resolve to `None`.
    pub fn resolve(&self, requested: Option<&str>) -> Option<String> {
        let Some(requested) = requested.map(str::trim).filter(|r| !r.is_empty()) else {
            return Some(self.default_model.clone());
        };
        if requested == self.default_model {
            return Some(self.default_model.clone());
        }
        self.choices
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(requested) || c.id == requested)
            .map(|c| c.id.to_string())
    }
}

/// Strips ```json ... ``` or ``` ... ``` code fences from LLM output.
pub fn strip_json_fences(text: &str) -> &str {
    let text = text.trim();
    if let Some(stripped) = text.strip_prefix("```json") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else if let Some(stripped) = text.strip_prefix("```") {
        stripped
            .trim_start()
            .strip_suffix("```")
            .map(|s| s.trim())
            .unwrap_or(stripped.trim_start())
    } else {
        text
    }
}

/// In-memory client for pipeline and route tests.
#[cfg(test)]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;

    /// Replays queued outcomes in order and records every prompt it receives.
    #[derive(Default)]
    pub struct ScriptedClient {
        outcomes: Mutex<VecDeque<Result<String, CompletionError>>>,
        pub prompts: Mutex<Vec<(String, String)>>,
    }

    impl ScriptedClient {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn respond(self, text: impl Into<String>) -> Self {
            self.outcomes.lock().unwrap().push_back(Ok(text.into()));
            self
        }

        pub fn fail(self, error: CompletionError) -> Self {
            self.outcomes.lock().unwrap().push_back(Err(error));
            self
        }

        pub fn prompt_count(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }

        pub fn last_prompt(&self) -> Option<String> {
            self.prompts.lock().unwrap().last().map(|(p, _)| p.clone())
        }
    }

    #[async_trait]
    impl CompletionClient for ScriptedClient {
        async fn complete(&self, prompt: &str, model_id: &str) -> Result<String, CompletionError> {
            self.prompts
                .lock()
                .unwrap()
                .push((prompt.to_string(), model_id.to_string()));
            self.outcomes
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Err(CompletionError::EmptyContent))
        }
    }
}
