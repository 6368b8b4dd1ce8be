//! OpenAI-compatible Chat Completions generator

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{ContentError, ContentSource, Message};
use std::time::Duration;

use super::{LlmConfig, build_generation_prompt, transport_error, with_retries};
use crate::http;

/// Works with OpenAI and any provider exposing `/chat/completions`
pub struct OpenAiCompatGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl OpenAiCompatGenerator {
    /// `base_url` includes the version segment, e.g. `https://api.openai.com/v1`
    pub fn new(api_key: SecretString, base_url: String, config: LlmConfig) -> reqwest::Result<Self> {
        let client = http::build_client(Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            client,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            config,
        })
    }

    async fn call_api(&self, prompt: &str) -> Result<String, ContentError> {
        let request = ChatCompletionRequest {
            model: &self.config.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.config.prompt,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: Some(self.config.temperature),
            max_tokens: Some(self.config.max_output_tokens),
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if response.status() == 429 {
            return Err(ContentError::RateLimited);
        }

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ContentError::Generator(format!(
                "API returned {}: {}",
                status, body
            )));
        }

        let api_response: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ContentError::Generator(e.to_string()))?;

        Ok(api_response
            .choices
            .into_iter()
            .filter_map(|c| c.message.content)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl ContentSource for OpenAiCompatGenerator {
    async fn next_message(&self) -> Result<Message, ContentError> {
        let prompt = build_generation_prompt(self.config.max_chars);
        with_retries(self.config.retries, || self.call_api(&prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn completion(text: &str) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [ { "message": { "role": "assistant", "content": text } } ]
        }))
    }

    #[tokio::test]
    async fn test_generates_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("Authorization", "Bearer sk-compat"))
            .respond_with(completion("Refactoring is a love letter to future you."))
            .mount(&mock_server)
            .await;

        let generator = OpenAiCompatGenerator::new(
            SecretString::new("sk-compat".into()),
            format!("{}/v1/", mock_server.uri()),
            LlmConfig {
                retries: 0,
                ..LlmConfig::default()
            },
        )
        .unwrap();

        let message = generator.next_message().await.unwrap();
        assert_eq!(message.text(), "Refactoring is a love letter to future you.");
    }

    #[tokio::test]
    async fn test_server_error_is_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
            .up_to_n_times(1)
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(completion("Recovered"))
            .mount(&mock_server)
            .await;

        let generator = OpenAiCompatGenerator::new(
            SecretString::new("sk-compat".into()),
            format!("{}/v1", mock_server.uri()),
            LlmConfig {
                retries: 1,
                ..LlmConfig::default()
            },
        )
        .unwrap();

        let message = generator.next_message().await.unwrap();
        assert_eq!(message.text(), "Recovered");
    }
}
