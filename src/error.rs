use thiserror::Error;

use crate::types::TextGenerationResponse;

/// Errors that can occur when using the modelbridge library.
#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Platform {0} not registered")]
    NotRegistered(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("{provider} does not support {operation}")]
    Unsupported {
        provider: String,
        operation: &'static str,
    },

    #[error("{provider} API error: status {}, code {}, message: {message}",
        .status.map_or_else(|| "-".to_string(), |s| s.to_string()),
        .code.as_deref().unwrap_or("-"))]
    Api {
        provider: String,
        status: Option<u16>,
        code: Option<String>,
        error_type: Option<String>,
        message: String,
    },

    #[error("Provider error: {provider} - {message}")]
    Provider { provider: String, message: String },

    #[error("Failed to decode {provider} payload: {source}. Data: {payload}")]
    Decode {
        provider: String,
        payload: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Streaming error: {0}")]
    Streaming(String),

    #[error("{provider} stream ended before the [DONE] sentinel")]
    StreamTruncated {
        provider: String,
        partial: Box<TextGenerationResponse>,
    },

    #[error("Request cancelled")]
    Cancelled,
}

/// Category of an [`Error`], used to handle failures without matching on
/// individual variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Missing or invalid setup; fatal at construction.
    Configuration,
    /// No handler constructor exists for the requested platform.
    NotRegistered,
    /// Malformed caller input.
    InvalidRequest,
    /// The selected platform does not implement the operation.
    Unsupported,
    /// Non-2xx status, provider error envelope or transport failure.
    Platform,
    /// Encode/decode failure on our side.
    Internal,
    /// The stream closed before the termination sentinel.
    Truncated,
    Timeout,
    Cancelled,
}

/// Longest payload fragment kept inside a [`Error::Decode`].
const MAX_PAYLOAD_FRAGMENT: usize = 512;

impl Error {
    pub fn provider(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Provider {
            provider: provider.into(),
            message: message.into(),
        }
    }

    pub fn config(message: impl Into<String>) -> Self {
        Error::Config(message.into())
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Error::InvalidRequest(message.into())
    }

    pub fn unsupported(provider: impl Into<String>, operation: &'static str) -> Self {
        Error::Unsupported {
            provider: provider.into(),
            operation,
        }
    }

    pub fn streaming(message: impl Into<String>) -> Self {
        Error::Streaming(message.into())
    }

    /// Build a decode error, keeping only a bounded fragment of the payload.
    pub fn decode(provider: impl Into<String>, payload: &str, source: serde_json::Error) -> Self {
        let payload = match payload.char_indices().nth(MAX_PAYLOAD_FRAGMENT) {
            Some((cut, _)) => format!("{}...", &payload[..cut]),
            None => payload.to_string(),
        };
        Error::Decode {
            provider: provider.into(),
            payload,
            source,
        }
    }

    /// The category this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Http(e) if e.is_timeout() => ErrorKind::Timeout,
            Error::Http(e) if e.is_builder() => ErrorKind::Configuration,
            Error::Http(_) | Error::Io(_) => ErrorKind::Platform,
            Error::Api { .. } | Error::Provider { .. } => ErrorKind::Platform,
            Error::Decode { .. } | Error::Streaming(_) => ErrorKind::Internal,
            Error::Config(_) => ErrorKind::Configuration,
            Error::NotRegistered(_) => ErrorKind::NotRegistered,
            Error::InvalidRequest(_) => ErrorKind::InvalidRequest,
            Error::Unsupported { .. } => ErrorKind::Unsupported,
            Error::StreamTruncated { .. } => ErrorKind::Truncated,
            Error::Cancelled => ErrorKind::Cancelled,
        }
    }

    /// The partial response of a stream that closed early, if this is one.
    pub fn partial_response(&self) -> Option<&TextGenerationResponse> {
        match self {
            Error::StreamTruncated { partial, .. } => Some(partial),
            _ => None,
        }
    }

    /// HTTP status reported by the platform, when there was one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => *status,
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}
