use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;

use crate::error::ProviderError;

/// JSON Schema the reply must conform to.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseSchema {
    pub name: String,
    pub schema: Value,
}

/// A single system + user exchange, optionally constrained to a schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: String,
    pub response_schema: Option<ResponseSchema>,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            user: user.into(),
            response_schema: None,
        }
    }

    pub fn with_schema(mut self, name: impl Into<String>, schema: Value) -> Self {
        self.response_schema = Some(ResponseSchema {
            name: name.into(),
            schema,
        });
        self
    }

    pub fn is_structured(&self) -> bool {
        self.response_schema.is_some()
    }
}

/// Trait representing an LLM provider.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Name of the provider.
    fn name(&self) -> &str;

    /// Model name of the provider.
    fn model_name(&self) -> &str {
        "Unknown"
    }

    /// Send the request and return the raw text of the first choice.
    async fn complete(&self, request: &CompletionRequest) -> Result<String, ProviderError>;
}

/// Completion client shared by every invoker of a session.
///
/// Owns the provider and the one retry policy of the program: transient
/// faults are retried up to `max_retries` times.
pub struct LLMManager {
    provider: Box<dyn LLMProvider>,
    max_retries: u32,
    retry_delay: Duration,
}

impl LLMManager {
    pub fn new(provider: Box<dyn LLMProvider>, max_retries: u32, retry_delay: Duration) -> Self {
        Self {
            provider,
            max_retries,
            retry_delay,
        }
    }

    /// Get the active provider.
    pub fn provider(&self) -> &dyn LLMProvider {
        &*self.provider
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Send a request, retrying transient faults.
    pub async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        let provider = &self.provider;
        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            info!(
                "Calling {} ({}), attempt {}, structured: {}",
                provider.name(),
                provider.model_name(),
                attempt,
                request.is_structured()
            );
            match provider.complete(request).await {
                Ok(text) => return Ok(text),
                Err(err) if err.is_transient() && attempt <= self.max_retries => {
                    warn!(
                        "{} call failed ({}), retrying ({}/{})",
                        provider.name(),
                        err,
                        attempt,
                        self.max_retries
                    );
                    if !self.retry_delay.is_zero() {
                        tokio::time::sleep(self.retry_delay.saturating_mul(attempt)).await;
                    }
                }
                Err(err) => return Err(err.into()),
            }
        }
    }
}
