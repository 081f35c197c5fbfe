use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;

use crate::config::ProviderConfig;
use crate::error::ProviderError;
use crate::llm_manager::{CompletionRequest, LLMProvider};

const PROVIDER_NAME: &str = "Gemini";

/// Gemini API provider, spoken to through its OpenAI-compatible endpoint.
pub struct GeminiProvider {
    api_key: Option<String>,
    key_vars: Vec<String>,
    model: String,
    base_url: String,
    client: Client,
    max_tokens: Option<usize>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GeminiRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<usize>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ResponseFormat<'a> {
    #[serde(rename = "type")]
    format_type: &'static str,
    json_schema: JsonSchemaFormat<'a>,
}

#[derive(Debug, Serialize)]
struct JsonSchemaFormat<'a> {
    name: &'a str,
    schema: &'a Value,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChatMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: usize,
    completion_tokens: usize,
    total_tokens: usize,
}

#[derive(Debug, Deserialize)]
struct GeminiError {
    error: GeminiErrorDetails,
}

#[derive(Debug, Deserialize)]
struct GeminiErrorDetails {
    message: String,
    #[serde(default)]
    status: Option<String>,
}

impl GeminiProvider {
    /// Build the provider from configuration, reading the API key from the
    /// first configured environment variable that is set.
    ///
    /// A missing key is not an error here; the first call reports it.
    pub fn from_config(config: &ProviderConfig) -> Self {
        let api_key = config
            .api_key_env
            .iter()
            .find_map(|var| env::var(var).ok().filter(|v| !v.trim().is_empty()));
        if api_key.is_none() {
            warn!(
                "No Gemini API key found in {}",
                config.api_key_env.join(", ")
            );
        }
        Self {
            api_key,
            key_vars: config.api_key_env.clone(),
            model: config.model.clone(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }

    /// Create a provider with an explicit key and model.
    #[cfg(test)]
    pub fn with_config(api_key: String, model: String) -> Self {
        let defaults = ProviderConfig::default();
        Self {
            api_key: Some(api_key),
            key_vars: defaults.api_key_env,
            model,
            base_url: defaults.base_url,
            client: Client::new(),
            max_tokens: defaults.max_tokens,
            temperature: defaults.temperature,
        }
    }

    /// Set custom base URL (for API-compatible services)
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_request<'a>(&'a self, request: &'a CompletionRequest) -> GeminiRequest<'a> {
        GeminiRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(request.system.clone()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(request.user.clone()),
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            response_format: request.response_schema.as_ref().map(|s| ResponseFormat {
                format_type: "json_schema",
                json_schema: JsonSchemaFormat {
                    name: &s.name,
                    schema: &s.schema,
                },
            }),
            stream: false,
        }
    }

    fn api_error(status: u16, body: &str) -> ProviderError {
        // The compatibility endpoint wraps errors either in an object or a
        // one-element array.
        let details = serde_json::from_str::<GeminiError>(body)
            .map(|e| e.error)
            .or_else(|_| {
                serde_json::from_str::<Vec<GeminiError>>(body)
                    .ok()
                    .and_then(|v| v.into_iter().next())
                    .map(|e| e.error)
                    .ok_or(())
            });
        let message = match details {
            Ok(d) => match d.status {
                Some(s) => format!("{} ({})", d.message, s),
                None => d.message,
            },
            Err(()) => body.trim().to_string(),
        };
        ProviderError::Api {
            provider: PROVIDER_NAME.to_string(),
            status,
            message,
        }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::MissingCredential {
                vars: self.key_vars.join(", "),
            })?;

        let body = self.build_request(request);

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER_NAME.to_string(),
                source,
            })?;

        let status = response.status();
        let response_text = response
            .text()
            .await
            .map_err(|source| ProviderError::Transport {
                provider: PROVIDER_NAME.to_string(),
                source,
            })?;
        debug!("Raw Gemini response: {}", response_text);

        if !status.is_success() {
            return Err(Self::api_error(status.as_u16(), &response_text));
        }

        let gemini_response: GeminiResponse =
            serde_json::from_str(&response_text).map_err(|e| ProviderError::InvalidResponse {
                provider: PROVIDER_NAME.to_string(),
                message: e.to_string(),
            })?;

        let choice = gemini_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: PROVIDER_NAME.to_string(),
            })?;

        if let Some(finish_reason) = &choice.finish_reason {
            if finish_reason == "length" || finish_reason == "max_tokens" {
                warn!("Gemini response was truncated by the token limit. Response may be incomplete.");
            }
        }

        if let Some(usage) = gemini_response.usage {
            info!(
                "Gemini token usage - Prompt: {}, Completion: {}, Total: {}",
                usage.prompt_tokens, usage.completion_tokens, usage.total_tokens
            );
        }

        Ok(choice.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;

    fn provider_for(server: &MockServer) -> GeminiProvider {
        GeminiProvider::with_config("test-key".to_string(), "gemini-2.5-flash-lite".to_string())
            .with_base_url(server.base_url())
    }

    fn completion(content: &str) -> Value {
        json!({
            "choices": [{
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }],
            "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
        })
    }

    #[tokio::test]
    async fn test_structured_request_carries_schema() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .header("Authorization", "Bearer test-key")
                    .json_body_partial(
                        r#"{
                            "model": "gemini-2.5-flash-lite",
                            "temperature": 0.7,
                            "response_format": {
                                "type": "json_schema",
                                "json_schema": {"name": "daily_activity"}
                            }
                        }"#,
                    );
                then.status(200).json_body(completion(r#"{"kcal": 450}"#));
            })
            .await;

        let request = CompletionRequest::new("system text", "j'ai couru 5 km")
            .with_schema("daily_activity", json!({"type": "object"}));
        let reply = provider_for(&server).complete(&request).await.unwrap();

        mock.assert_async().await;
        assert_eq!(reply, r#"{"kcal": 450}"#);
    }

    #[tokio::test]
    async fn test_free_text_request_has_no_response_format() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/chat/completions")
                    .matches(|req| {
                        let body: Value =
                            serde_json::from_slice(req.body.as_deref().unwrap_or_default())
                                .unwrap_or_default();
                        body.get("response_format").is_none()
                            && body["messages"][0]["role"] == "system"
                            && body["messages"][1]["content"] == "bonjour"
                    });
                then.status(200).json_body(completion("Bravo !"));
            })
            .await;

        let reply = provider_for(&server)
            .complete(&CompletionRequest::new("coach", "bonjour"))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(reply, "Bravo !");
    }

    #[tokio::test]
    async fn test_error_body_is_mapped() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(429).json_body(json!([{
                    "error": {"code": 429, "message": "Quota exceeded", "status": "RESOURCE_EXHAUSTED"}
                }]));
            })
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();

        assert!(err.is_transient());
        match err {
            ProviderError::Api { status, message, .. } => {
                assert_eq!(status, 429);
                assert_eq!(message, "Quota exceeded (RESOURCE_EXHAUSTED)");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_empty_choices_is_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(json!({"choices": []}));
            })
            .await;

        let err = provider_for(&server)
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::EmptyResponse { .. }));
    }

    #[tokio::test]
    async fn test_missing_key_fails_before_any_request() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/chat/completions");
                then.status(200).json_body(completion("unused"));
            })
            .await;

        let mut provider = provider_for(&server);
        provider.api_key = None;
        let err = provider
            .complete(&CompletionRequest::new("s", "u"))
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::MissingCredential { .. }));
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
        mock.assert_hits_async(0).await;
    }
}
