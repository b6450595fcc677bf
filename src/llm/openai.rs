//! OpenAI-compatible API Provider.
//!
//! Implements the `LLMProvider` trait for any Chat Completions endpoint that
//! speaks the OpenAI wire format (Groq, OpenAI, OpenRouter).

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::provider::{LLMProvider, ModelMetadata};
use super::types::{CompletionResponse, Message, SamplingParams, Usage};
use crate::config::Config;
use crate::error::CompletionError;

/// OpenAI-compatible provider configuration and state.
pub struct OpenAIProvider {
    client: Client,
    provider: String,
    base_url: String,
    api_key: Option<String>,
    model: String,
    sampling: SamplingParams,
}

impl OpenAIProvider {
    pub fn new(
        provider: impl Into<String>,
        base_url: impl Into<String>,
        api_key: Option<String>,
        model: impl Into<String>,
        sampling: SamplingParams,
        timeout: Duration,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        let base_url: String = base_url.into();

        Ok(Self {
            client,
            provider: provider.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
            model: model.into(),
            sampling,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            config.provider.name(),
            config.base_url(),
            config.api_key.clone(),
            config.model(),
            config.sampling,
            Duration::from_secs(config.request_timeout_secs),
        )
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LLMProvider for OpenAIProvider {
    fn metadata(&self) -> ModelMetadata {
        ModelMetadata {
            provider: self.provider.clone(),
            id: self.model.clone(),
        }
    }

    async fn completion(&self, messages: &[Message]) -> Result<CompletionResponse, CompletionError> {
        let request = ChatRequest {
            model: &self.model,
            messages: messages.iter().map(ApiMessage::from).collect(),
            temperature: self.sampling.temperature,
            top_p: self.sampling.top_p,
            max_tokens: self.sampling.max_tokens,
        };

        let mut builder = self.client.post(self.endpoint()).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(CompletionError::from_status(status.as_u16(), &body));
        }

        parse_response(&body)
    }
}

/// Decode a successful response body. A missing choice or null content is an
/// empty reply, not an error.
fn parse_response(body: &str) -> Result<CompletionResponse, CompletionError> {
    let chat_response: ChatResponse =
        serde_json::from_str(body).map_err(|e| CompletionError::Decode(e.to_string()))?;

    let content = chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message)
        .and_then(|message| message.content)
        .unwrap_or_default();

    Ok(CompletionResponse {
        content,
        usage: chat_response.usage.map(Usage::from).unwrap_or_default(),
    })
}

// -----------------------------------------------------------------------------
// OpenAI DTOs (Data Transfer Objects)
// -----------------------------------------------------------------------------

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    top_p: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'static str,
    content: &'a str,
}

impl<'a> From<&'a Message> for ApiMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        Self {
            role: msg.role.as_str(),
            content: &msg.content,
        }
    }
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ApiResponseMessage>,
}

#[derive(Deserialize)]
struct ApiResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: usize,
    #[serde(default)]
    completion_tokens: usize,
    #[serde(default)]
    total_tokens: usize,
}

impl From<ApiUsage> for Usage {
    fn from(u: ApiUsage) -> Self {
        Self {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u.total_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;
    use serde_json::json;

    fn provider(base_url: &str) -> OpenAIProvider {
        OpenAIProvider::new(
            "groq",
            base_url,
            Some("gsk_test".to_string()),
            "llama-3.1-8b-instant",
            SamplingParams::default(),
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[test]
    fn test_parse_first_choice() {
        let body = json!({
            "choices": [
                {"message": {"role": "assistant", "content": "  Vâng ạ Sensei!  "}},
                {"message": {"role": "assistant", "content": "ignored"}}
            ],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
        .to_string();

        let resp = parse_response(&body).unwrap();
        assert_eq!(resp.content, "  Vâng ạ Sensei!  ");
        assert_eq!(resp.usage.total_tokens, 15);
    }

    #[test]
    fn test_parse_null_content_is_empty() {
        let body = json!({"choices": [{"message": {"content": null}}]}).to_string();
        assert_eq!(parse_response(&body).unwrap().content, "");

        let body = json!({"choices": []}).to_string();
        assert_eq!(parse_response(&body).unwrap().content, "");
    }

    #[test]
    fn test_parse_garbage_is_decode_error() {
        let err = parse_response("<html>gateway</html>").unwrap_err();
        assert!(matches!(err, CompletionError::Decode(_)));
    }

    #[tokio::test]
    async fn test_completion_sends_openai_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer gsk_test")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama-3.1-8b-instant",
                "max_tokens": 220,
                "messages": [
                    {"role": "system", "content": "persona"},
                    {"role": "user", "content": "xin chào"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(json!({"choices": [{"message": {"content": "Chào Sensei!"}}]}).to_string())
            .create_async()
            .await;

        let messages = vec![Message::system("persona"), Message::user("xin chào")];
        let resp = provider(&server.url()).completion(&messages).await.unwrap();

        assert_eq!(resp.content, "Chào Sensei!");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_completion_maps_rate_limit() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_body("rate limit reached")
            .create_async()
            .await;

        let err = provider(&server.url())
            .completion(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::RateLimited { .. }));
    }

    #[tokio::test]
    async fn test_completion_maps_server_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let err = provider(&format!("{}/", server.url()))
            .completion(&[Message::user("hi")])
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert!(err.to_string().contains("overloaded"));
    }
}
