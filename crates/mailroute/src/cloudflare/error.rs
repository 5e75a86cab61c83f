//! Cloudflare gateway error types.

use thiserror::Error;

/// Errors from calls to the Cloudflare REST API.
#[derive(Error, Debug)]
pub enum GatewayError {
    /// Cloudflare answered but rejected the request.
    #[error("{message}")]
    Remote { status: u16, message: String },

    /// The request never produced a response.
    #[error("Cloudflare API unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    /// The configured API root cannot be turned into a request URL.
    #[error("Invalid Cloudflare API base: {0}")]
    Endpoint(String),

    /// A successful response did not have the expected shape.
    #[error("Unexpected Cloudflare API response: {0}")]
    Decode(String),
}

impl GatewayError {
    /// HTTP status returned by Cloudflare, if a response was received.
    pub fn remote_status(&self) -> Option<u16> {
        match self {
            GatewayError::Remote { status, .. } => Some(*status),
            GatewayError::Transport(e) => e.status().map(|s| s.as_u16()),
            GatewayError::Endpoint(_) | GatewayError::Decode(_) => None,
        }
    }
}

/// Result type for gateway operations.
pub type Result<T> = std::result::Result<T, GatewayError>;
