//! LLM provider abstraction.
//!
//! The pipeline consumes exactly one operation, "complete one chat turn": a
//! single user-role prompt goes in, free text comes out. All structure is
//! recovered afterwards by text post-processing (see [`crate::parse`]).
//!
//! # Providers
//!
//! - **[`OpenAiClient`]**: `POST {base_url}/chat/completions` with retry and backoff.
//! - **[`DisabledClient`]**: always errors; used when `llm.provider = "disabled"`.
//!
//! # Retry Strategy
//!
//! HTTP 429 and 5xx responses and network errors are retried with exponential
//! backoff (1s, 2s, 4s, ... capped at 32s) up to `llm.max_retries` times.
//! Other 4xx responses fail immediately.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("LLM provider is disabled")]
    Disabled,

    #[error("missing API key: environment variable {0} is not set")]
    MissingApiKey(String),

    #[error("communication error: {0}")]
    Communication(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A chat-completion backend shared by every pipeline stage.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Model identifier sent with every request (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Sends `prompt` as a single user turn and returns the reply text.
    async fn complete(&self, prompt: &str) -> Result<String, LlmError>;
}

/// Builds the configured client. Called once at startup.
pub fn create_client(config: &LlmConfig) -> Result<Arc<dyn LlmClient>, LlmError> {
    let client: Arc<dyn LlmClient> = match config.provider.as_str() {
        "openai" => Arc::new(OpenAiClient::new(config)?),
        _ => Arc::new(DisabledClient),
    };
    Ok(client)
}

// ============ Disabled ============

pub struct DisabledClient;

#[async_trait]
impl LlmClient for DisabledClient {
    fn model_name(&self) -> &str {
        "disabled"
    }

    async fn complete(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::Disabled)
    }
}

// ============ OpenAI ============

/// OpenAI-compatible Chat Completions client.
///
/// Holds one `reqwest::Client` (connection pool) for the life of the process.
pub struct OpenAiClient {
    http: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: String,
    max_retries: u32,
}

impl OpenAiClient {
    /// Reads the API key from the environment variable named by `llm.api_key_env`.
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = std::env::var(&config.api_key_env)
            .map_err(|_| LlmError::MissingApiKey(config.api_key_env.clone()))?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::Communication(e.to_string()))?;

        Ok(Self {
            http,
            api_key,
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            max_retries: config.max_retries,
        })
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
        });

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s, 4s, 8s, ...
                let delay = Duration::from_secs(1 << (attempt - 1).min(5));
                debug!(attempt, ?delay, "retrying chat completion");
                tokio::time::sleep(delay).await;
            }

            let resp = self
                .http
                .post(&self.endpoint)
                .bearer_auth(&self.api_key)
                .json(&body)
                .send()
                .await;

            match resp {
                Ok(response) => {
                    let status = response.status();

                    if status.is_success() {
                        let json: serde_json::Value = response
                            .json()
                            .await
                            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
                        return parse_chat_response(&json);
                    }

                    let body_text = response.text().await.unwrap_or_default();
                    let err = LlmError::Api {
                        status: status.as_u16(),
                        body: body_text,
                    };

                    // Rate limited or server error: retry
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(%status, attempt, "chat completion failed, will retry");
                        last_err = Some(err);
                        continue;
                    }

                    return Err(err);
                }
                Err(e) => {
                    warn!(error = %e, attempt, "chat completion request error");
                    last_err = Some(LlmError::Communication(e.to_string()));
                    continue;
                }
            }
        }

        Err(last_err.unwrap_or_else(|| LlmError::Communication("retries exhausted".to_string())))
    }
}

/// Extracts `choices[0].message.content` and trims it.
fn parse_chat_response(json: &serde_json::Value) -> Result<String, LlmError> {
    json.pointer("/choices/0/message/content")
        .and_then(|c| c.as_str())
        .map(|c| c.trim().to_string())
        .ok_or_else(|| LlmError::InvalidResponse("missing choices[0].message.content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_first_choice_content() {
        let json = serde_json::json!({
            "choices": [
                { "message": { "role": "assistant", "content": "  [1, 2]\n" } },
                { "message": { "role": "assistant", "content": "ignored" } }
            ]
        });
        assert_eq!(parse_chat_response(&json).unwrap(), "[1, 2]");
    }

    #[test]
    fn missing_content_is_invalid() {
        let json = serde_json::json!({ "choices": [] });
        assert!(matches!(
            parse_chat_response(&json),
            Err(LlmError::InvalidResponse(_))
        ));
    }

    #[tokio::test]
    async fn disabled_client_always_errors() {
        let client = DisabledClient;
        assert!(matches!(client.complete("hi").await, Err(LlmError::Disabled)));
        assert_eq!(client.model_name(), "disabled");
    }

    #[test]
    fn openai_client_requires_key() {
        let config = LlmConfig {
            api_key_env: "RPROF_TEST_KEY_THAT_IS_NEVER_SET".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            OpenAiClient::new(&config),
            Err(LlmError::MissingApiKey(_))
        ));
    }
}

/// Canned clients for unit tests elsewhere in the crate.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replies with queued answers in order; errors once the queue is empty.
    pub(crate) struct ScriptedClient {
        replies: Mutex<VecDeque<String>>,
        pub(crate) prompts: Mutex<Vec<String>>,
    }

    impl ScriptedClient {
        pub(crate) fn new<I, S>(replies: I) -> Arc<Self>
        where
            I: IntoIterator<Item = S>,
            S: Into<String>,
        {
            Arc::new(Self {
                replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.prompts.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl LlmClient for ScriptedClient {
        fn model_name(&self) -> &str {
            "scripted"
        }

        async fn complete(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| LlmError::Communication("no scripted reply left".to_string()))
        }
    }
}
