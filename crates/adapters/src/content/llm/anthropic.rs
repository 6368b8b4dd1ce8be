//! Anthropic Messages API generator

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use social_daemon_domain::{ContentError, ContentSource, Message};
use std::time::Duration;

use super::{LlmConfig, build_generation_prompt, transport_error, with_retries};
use crate::http;

pub struct AnthropicGenerator {
    client: Client,
    api_key: SecretString,
    base_url: String,
    config: LlmConfig,
}

impl AnthropicGenerator {
    pub fn new(api_key: SecretString, config: LlmConfig) -> reqwest::Result<Self> {
        Self::with_base_url(api_key, "https://api.anthropic.com".to_string(), config)
    }

    pub fn with_base_url(
        api_key: SecretString,
        base_url: String,
        config: LlmConfig,
    ) -> reqwest::Result<Self> {
        let client = http::build_client(Duration::from_secs(config.timeout_secs))?;

        Ok(Self {
            client,
            api_key,
            base_url,
            config,
        })
    }

    async fn call_api(&self, prompt: &str) -> Result<String, ContentError> {
        let request = AnthropicRequest {
            model: &self.config.model,
            max_tokens: self.config.max_output_tokens,
            messages: vec![ChatTurn {
                role: "user",
                content: prompt,
            }],
            system: Some(&self.config.prompt),
            temperature: Some(self.config.temperature),
        };

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", "2023-06-01")
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

        let api_response: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| ContentError::Generator(e.to_string()))?;

        Ok(api_response
            .content
            .into_iter()
            .filter(|c| c.r#type == "text")
            .map(|c| c.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}

#[derive(Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    messages: Vec<ChatTurn<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
}

#[derive(Serialize)]
struct ChatTurn<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct AnthropicResponse {
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    r#type: String,
    #[serde(default)]
    text: String,
}

#[async_trait]
impl ContentSource for AnthropicGenerator {
    async fn next_message(&self) -> Result<Message, ContentError> {
        let prompt = build_generation_prompt(self.config.max_chars);
        with_retries(self.config.retries, || self.call_api(&prompt)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config(retries: u32) -> LlmConfig {
        LlmConfig {
            model: "test-model".to_string(),
            prompt: "You are a test account.".to_string(),
            retries,
            ..LlmConfig::default()
        }
    }

    #[tokio::test]
    async fn test_generates_message() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "sk-test"))
            .and(header("anthropic-version", "2023-06-01"))
            .and(body_partial_json(serde_json::json!({
                "model": "test-model",
                "system": "You are a test account."
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    { "type": "text", "text": "\"Small commits, calm deploys.\"" }
                ]
            })))
            .mount(&mock_server)
            .await;

        let generator = AnthropicGenerator::with_base_url(
            SecretString::new("sk-test".into()),
            mock_server.uri(),
            config(0),
        )
        .unwrap();

        let message = generator.next_message().await.unwrap();
        assert_eq!(message.text(), "Small commits, calm deploys.");
    }

    #[tokio::test]
    async fn test_rate_limit_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(429))
            .expect(1)
            .mount(&mock_server)
            .await;

        let generator = AnthropicGenerator::with_base_url(
            SecretString::new("sk-test".into()),
            mock_server.uri(),
            config(2),
        )
        .unwrap();

        assert!(matches!(
            generator.next_message().await,
            Err(ContentError::RateLimited)
        ));
    }

    #[tokio::test]
    async fn test_empty_completion_is_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": []
            })))
            .mount(&mock_server)
            .await;

        let generator = AnthropicGenerator::with_base_url(
            SecretString::new("sk-test".into()),
            mock_server.uri(),
            config(0),
        )
        .unwrap();

        assert!(matches!(
            generator.next_message().await,
            Err(ContentError::Empty)
        ));
    }
}
