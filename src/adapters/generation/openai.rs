//! OpenAI chat-completions answer generator.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::{render_grounded_prompt, GenerationConfig};
use crate::domain::ports::AnswerGenerator;
use crate::infrastructure::config::OPENAI_API_KEY_ENV;
use crate::infrastructure::logging::scrub;

const PROVIDER: &str = "openai";

/// Configuration for the chat-completions generator.
#[derive(Debug, Clone)]
pub struct OpenAiChatConfig {
    /// API key. Falls back to `OPENAI_API_KEY` env var.
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// HTTP-level timeout; the pipeline applies its own per-call deadline too.
    pub timeout_secs: u64,
}

impl Default for OpenAiChatConfig {
    fn default() -> Self {
        Self::from(&GenerationConfig::default())
    }
}

impl From<&GenerationConfig> for OpenAiChatConfig {
    fn from(config: &GenerationConfig) -> Self {
        Self {
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_secs: config.timeout_secs,
        }
    }
}

impl OpenAiChatConfig {
    fn get_api_key(&self) -> DomainResult<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var(OPENAI_API_KEY_ENV).ok())
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                DomainError::generation(
                    PROVIDER,
                    "API key not set. Set OPENAI_API_KEY or configure generation.api_key",
                )
            })
    }
}

/// Answers questions through an OpenAI-compatible `/chat/completions` API
pub struct OpenAiAnswerGenerator {
    config: OpenAiChatConfig,
    client: Client,
}

impl OpenAiAnswerGenerator {
    pub fn new(config: OpenAiChatConfig) -> DomainResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| DomainError::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    fn build_request<'a>(&'a self, prompt: String) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.config.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt,
            }],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        }
    }
}

#[async_trait]
impl AnswerGenerator for OpenAiAnswerGenerator {
    fn name(&self) -> &'static str {
        PROVIDER
    }

    async fn answer(&self, question: &str, context: &str) -> DomainResult<String> {
        let api_key = self.config.get_api_key()?;
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let request = self.build_request(render_grounded_prompt(question, context));

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::generation(PROVIDER, format!("request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "unable to read response body".to_string());
            return Err(DomainError::generation(
                PROVIDER,
                format!("API returned {status}: {}", scrub(&body)),
            ));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| DomainError::generation(PROVIDER, format!("malformed response: {e}")))?;

        if let Some(usage) = &parsed.usage {
            debug!(
                model = %self.config.model,
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "Generated answer"
            );
        }

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| DomainError::generation(PROVIDER, "response contained no answer"))
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::{Matcher, Server};

    fn generator(base_url: String) -> OpenAiAnswerGenerator {
        OpenAiAnswerGenerator::new(OpenAiChatConfig {
            api_key: Some("sk-test-key".to_string()),
            base_url,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_build_request_carries_prompt() {
        let generator = generator("http://localhost".to_string());
        let request = generator.build_request(render_grounded_prompt("why?", "because"));
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 1024);
        let content = json["messages"][0]["content"].as_str().unwrap();
        assert!(content.contains("Context:\nbecause"));
        assert!(content.contains("Question:\nwhy?"));
    }

    #[tokio::test]
    async fn test_answer_returns_first_choice() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test-key")
            .match_body(Matcher::Regex("are cats mammals\\?".to_string()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "Yes, cats are mammals."}}],
                    "usage": {"prompt_tokens": 40, "completion_tokens": 6}
                })
                .to_string(),
            )
            .create_async()
            .await;

        let answer = generator(server.url())
            .answer("are cats mammals?", "Cats are mammals.")
            .await
            .unwrap();

        assert_eq!(answer, "Yes, cats are mammals.");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_maps_to_generation_unavailable() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = generator(server.url()).answer("q", "c").await.unwrap_err();
        match err {
            DomainError::GenerationUnavailable { provider, reason } => {
                assert_eq!(provider, "openai");
                assert!(reason.contains("503"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let mut server = Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        assert!(generator(server.url()).answer("q", "c").await.is_err());
    }
}
