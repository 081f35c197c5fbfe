use thiserror::Error;

/// Faults raised by a completion backend.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("No API key found (looked for {vars})")]
    MissingCredential { vars: String },

    #[error("Request to {provider} failed: {source}")]
    Transport {
        provider: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{provider} API error (status {status}): {message}")]
    Api {
        provider: String,
        status: u16,
        message: String,
    },

    #[error("{provider} returned no completion choices")]
    EmptyResponse { provider: String },

    #[error("Failed to parse {provider} response: {message}")]
    InvalidResponse { provider: String, message: String },
}

impl ProviderError {
    /// Whether a retry has a chance of succeeding.
    pub fn is_transient(&self) -> bool {
        match self {
            ProviderError::Transport { source, .. } => {
                source.is_timeout() || source.is_connect() || source.is_request()
            }
            ProviderError::Api { status, .. } => *status == 429 || *status >= 500,
            ProviderError::MissingCredential { .. }
            | ProviderError::EmptyResponse { .. }
            | ProviderError::InvalidResponse { .. } => false,
        }
    }
}
