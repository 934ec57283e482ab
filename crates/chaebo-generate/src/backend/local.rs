//! Local model server backend (Ollama `/api/generate` protocol).

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::{http_client, map_request_error, BackendConfig, GenerationBackend, GenerationRequest};
use crate::error::{excerpt, GenerationError, GenerationResult};

/// Default local server URL.
pub const LOCAL_ENDPOINT: &str = "http://localhost:11434";

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    stream: bool,
    #[serde(skip_serializing_if = "Options::is_empty")]
    options: Options,
}

#[derive(Debug, Default, Serialize)]
struct Options {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

impl Options {
    fn is_empty(&self) -> bool {
        self.temperature.is_none() && self.num_predict.is_none()
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Client for a local model server.
#[derive(Debug, Clone)]
pub struct LocalBackend {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: Option<f32>,
    max_output_tokens: Option<u32>,
    timeout: Duration,
}

impl LocalBackend {
    /// Creates a backend from configuration.
    pub fn new(config: &BackendConfig) -> GenerationResult<Self> {
        Ok(Self {
            client: http_client(config.timeout)?,
            endpoint: config
                .endpoint
                .clone()
                .unwrap_or_else(|| LOCAL_ENDPOINT.to_string())
                .trim_end_matches('/')
                .to_string(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn url(&self) -> String {
        format!("{}/api/generate", self.endpoint)
    }

    fn body<'a>(&'a self, request: &'a GenerationRequest) -> GenerateBody<'a> {
        GenerateBody {
            model: &self.model,
            prompt: &request.prompt,
            system: request.system_instruction.as_deref(),
            stream: false,
            options: Options {
                temperature: self.temperature,
                num_predict: self.max_output_tokens,
            },
        }
    }
}

impl GenerationBackend for LocalBackend {
    fn name(&self) -> &str {
        "local"
    }

    async fn complete(&self, request: &GenerationRequest) -> GenerationResult<String> {
        let response = self
            .client
            .post(self.url())
            .json(&self.body(request))
            .send()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| map_request_error(e, self.timeout))?;
        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: excerpt(&text),
            });
        }

        let parsed: GenerateResponse = serde_json::from_str(&text)
            .map_err(|e| GenerationError::malformed(format!("{}: {}", e, excerpt(&text))))?;
        if let Some(error) = parsed.error {
            return Err(GenerationError::malformed(error));
        }
        parsed
            .response
            .ok_or_else(|| GenerationError::malformed("response field missing"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn local(config: BackendConfig) -> LocalBackend {
        LocalBackend::new(&config).unwrap()
    }

    #[test]
    fn test_request_body_shape() {
        let b = local(BackendConfig {
            model: "llama3".to_string(),
            max_output_tokens: Some(4096),
            ..BackendConfig::default()
        });
        let request =
            GenerationRequest::new("chart please").with_system_instruction(Some("sys".to_string()));
        assert_eq!(
            serde_json::to_value(b.body(&request)).unwrap(),
            json!({
                "model": "llama3",
                "prompt": "chart please",
                "system": "sys",
                "stream": false,
                "options": {"num_predict": 4096}
            })
        );
    }

    #[test]
    fn test_default_endpoint() {
        let b = local(BackendConfig::default());
        assert_eq!(b.url(), "http://localhost:11434/api/generate");
        let b = local(BackendConfig {
            endpoint: Some("http://gpu-box:8080/".to_string()),
            ..BackendConfig::default()
        });
        assert_eq!(b.url(), "http://gpu-box:8080/api/generate");
    }

    #[test]
    fn test_response_parsing() {
        let parsed: GenerateResponse =
            serde_json::from_value(json!({"model": "llama3", "response": "[]", "done": true}))
                .unwrap();
        assert_eq!(parsed.response.as_deref(), Some("[]"));
    }

    #[tokio::test]
    async fn test_unreachable_server_is_transport_error() {
        let b = local(BackendConfig {
            endpoint: Some("http://127.0.0.1:9".to_string()),
            timeout: Duration::from_secs(5),
            ..BackendConfig::default()
        });
        let err = b.complete(&GenerationRequest::new("p")).await.unwrap_err();
        assert!(
            matches!(
                err,
                GenerationError::Transport { .. } | GenerationError::Timeout { .. }
            ),
            "{:?}",
            err
        );
    }
}
