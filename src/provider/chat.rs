//! OpenAI-compatible chat completions (Perplexity, OpenAI, Ollama, vLLM, ...)

use super::{ProviderOutput, Runner};
use crate::config::ChatApiConfig;
use crate::error::ProviderError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

pub struct ChatApiRunner {
    http: Client,
    config: ChatApiConfig,
}

impl ChatApiRunner {
    pub fn new(config: ChatApiConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl Runner for ChatApiRunner {
    fn name(&self) -> &'static str {
        "chat_api"
    }

    async fn execute(
        &self,
        prompt: &str,
        timeout: Duration,
    ) -> Result<ProviderOutput, ProviderError> {
        let api_key = std::env::var(&self.config.api_key_env)
            .map_err(|_| ProviderError::MissingApiKey(self.config.api_key_env.clone()))?;

        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.config.max_tokens,
            stream: false,
        };

        debug!(
            "POST {} ({} byte prompt)",
            self.config.base_url,
            prompt.len()
        );

        let start = std::time::Instant::now();

        let response = self
            .http
            .post(&self.config.base_url)
            .bearer_auth(api_key)
            .timeout(timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ProviderError::Timeout(timeout)
                } else {
                    ProviderError::Http(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown".to_string());
            return Err(ProviderError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(ProviderError::EmptyResponse)?;

        Ok(ProviderOutput {
            stdout: content,
            stderr: String::new(),
            duration: start.elapsed(),
            exit_code: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_api_key() {
        let runner = ChatApiRunner::new(ChatApiConfig {
            api_key_env: "POLYGRADE_TEST_KEY_THAT_IS_NOT_SET".to_string(),
            ..ChatApiConfig::default()
        });
        let result = runner.execute("hi", Duration::from_secs(1)).await;
        assert!(matches!(
            result,
            Err(ProviderError::MissingApiKey(name)) if name == "POLYGRADE_TEST_KEY_THAT_IS_NOT_SET"
        ));
    }

    #[test]
    fn test_response_shape() {
        let raw = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"feedback\":\"ok\",\"score\":7}"}}]}"#;
        let parsed: ChatResponse = serde_json::from_str(raw).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some(r#"{"feedback":"ok","score":7}"#)
        );
    }
}
