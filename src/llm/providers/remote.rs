use crate::config::LlmConfig;
use crate::llm::{ChatModel, ChatRequest, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// OpenAI-compatible `/chat/completions` client.
pub struct RemoteLlmProvider {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct PromptRequest<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct PromptResponse {
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

impl RemoteLlmProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let api_key = config.api_key.clone().ok_or_else(|| {
            LlmError::ConfigError("API key is required for remote LLM provider".to_string())
        })?;

        let api_url = config
            .api_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        Ok(Self {
            client,
            api_url,
            api_key,
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for RemoteLlmProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let body = PromptRequest {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
        };

        debug!("Sending {} request to {} ({})", request.purpose, self.api_url, self.model);

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response.text().await.unwrap_or_default();
            error!("LLM API responded with status code: {} - {}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "API responded with status code: {status}"
            )));
        }

        let prompt_response: PromptResponse = response
            .json()
            .await
            .map_err(|e| LlmError::ResponseError(e.to_string()))?;

        let choice = prompt_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::ResponseError("No choices in response".to_string()))?;

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::ChatPurpose;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> RemoteLlmProvider {
        let config = LlmConfig {
            api_key: Some("sk-test".to_string()),
            api_url: Some(format!("{}/v1/chat/completions", server.uri())),
            ..AppConfig::default().llm
        };
        RemoteLlmProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn sends_system_and_user_messages_and_returns_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .and(body_partial_json(serde_json::json!({
                "model": "gpt-4",
                "messages": [
                    {"role": "system", "content": "be brief"},
                    {"role": "user", "content": "total sales?"}
                ]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "SELECT 1"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(ChatPurpose::SqlGeneration, "be brief", "total sales?");
        let answer = provider_for(&server).complete(&request).await.unwrap();

        assert_eq!(answer, "SELECT 1");
    }

    #[tokio::test]
    async fn error_status_is_a_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("rate limited"))
            .mount(&server)
            .await;

        let request = ChatRequest::new(ChatPurpose::Summary, "s", "u");
        let err = provider_for(&server).complete(&request).await.unwrap_err();

        assert!(matches!(err, LlmError::ResponseError(msg) if msg.contains("429")));
    }

    #[tokio::test]
    async fn null_content_is_returned_as_empty_text() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        let request = ChatRequest::new(ChatPurpose::Summary, "s", "u");
        let answer = provider_for(&server).complete(&request).await.unwrap();

        assert!(answer.is_empty());
    }
}
