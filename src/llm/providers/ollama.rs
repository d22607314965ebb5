use crate::config::LlmConfig;
use crate::llm::{ChatModel, ChatRequest, LlmError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, info};

const DEFAULT_API_URL: &str = "http://localhost:11434/api/generate";

pub struct OllamaProvider {
    client: reqwest::Client,
    api_url: String,
    model: String,
}

#[derive(Serialize, Debug)]
struct OllamaRequest<'a> {
    model: &'a str,
    system: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize, Debug)]
struct OllamaOptions {
    temperature: f32,
}

#[derive(Deserialize, Debug)]
struct OllamaResponse {
    response: String,
    #[serde(default)]
    done: Option<bool>,
}

impl OllamaProvider {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
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
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl ChatModel for OllamaProvider {
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        info!("Sending {} request to Ollama with model: {}", request.purpose, self.model);
        debug!("API URL: {}", self.api_url);

        let body = OllamaRequest {
            model: &self.model,
            system: &request.system,
            prompt: &request.user,
            stream: false, // one JSON object instead of NDJSON chunks
            options: OllamaOptions {
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&self.api_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::ConnectionError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = match response.text().await {
                Ok(body) => format!(" - Response body: {}", body),
                Err(_) => String::new(),
            };

            error!("Ollama API responded with status code: {}{}", status, error_body);
            return Err(LlmError::ResponseError(format!(
                "Ollama API responded with status code: {}{}",
                status, error_body
            )));
        }

        // Get the raw text response first for diagnostics
        let response_text = response
            .text()
            .await
            .map_err(|e| LlmError::ResponseError(format!("Failed to read response body: {}", e)))?;

        debug!("Raw response from Ollama: {}", response_text);

        let ollama_response = serde_json::from_str::<OllamaResponse>(&response_text).map_err(|e| {
            error!("Failed to parse Ollama response: {} - Response was: {}", e, response_text);
            LlmError::ResponseError(format!("Failed to parse Ollama response: {}", e))
        })?;

        if ollama_response.done == Some(false) {
            debug!("Ollama reported an unfinished generation; using partial output");
        }

        Ok(ollama_response.response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::llm::ChatPurpose;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OllamaProvider {
        let config = LlmConfig {
            backend: "ollama".to_string(),
            model: "llama3".to_string(),
            api_url: Some(format!("{}/api/generate", server.uri())),
            ..AppConfig::default().llm
        };
        OllamaProvider::new(&config).unwrap()
    }

    #[tokio::test]
    async fn posts_non_streaming_generate_request() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .and(body_partial_json(serde_json::json!({
                "model": "llama3",
                "system": "classify",
                "prompt": "sales by region",
                "stream": false
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "model": "llama3",
                "response": "{\"allowed\": true, \"reason\": \"\"}",
                "done": true
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request = ChatRequest::new(ChatPurpose::Validation, "classify", "sales by region");
        let answer = provider_for(&server).complete(&request).await.unwrap();

        assert_eq!(answer, "{\"allowed\": true, \"reason\": \"\"}");
    }

    #[tokio::test]
    async fn malformed_body_is_a_response_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let request = ChatRequest::new(ChatPurpose::Summary, "s", "u");
        let err = provider_for(&server).complete(&request).await.unwrap_err();

        assert!(matches!(err, LlmError::ResponseError(_)));
    }
}
