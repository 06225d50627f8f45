use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum StonkieError {
    /// Network-related errors
    #[error("Network error: {0}")]
    Network(reqwest::Error),
    /// Transport failures reported by a non-reqwest byte source
    #[error("Transport error: {0}")]
    Transport(String),
    /// Non-2xx response from the backend
    #[error("Request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    /// The response carries no streaming body
    #[error("Response has no readable body")]
    MissingBody,
    /// No chunk arrived within the configured idle timeout
    #[error("No data received for {0:?}")]
    Timeout(Duration),
    /// A single frame could not be decoded. Never fatal to the stream.
    #[error("Failed to decode frame `{line}`: {source}")]
    Decode {
        line: String,
        #[source]
        source: serde_json::Error,
    },
    /// A stream failed after its handler already reported it
    #[error("Stream failed: {0}")]
    StreamFailed(String),
    /// Response parsing errors (missing fields, invalid format)
    #[error("Failed to parse response: {0}")]
    ResponseFormat(String),
    /// Authentication-specific errors
    #[error("Authentication error: {0}")]
    Authentication(String),
    /// Rate limiting by the backend
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),
    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),
    /// Server error
    #[error("Server error: {0}")]
    ServerError(String),
    /// I/O error
    #[error("I/O error: {0}")]
    IOError(String),
    /// Configuration error
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl StonkieError {
    /// Whether the error ends the stream it was raised on.
    ///
    /// Only per-frame decode failures are recoverable; everything else is a
    /// transport or setup failure.
    pub const fn is_fatal(&self) -> bool {
        !matches!(self, Self::Decode { .. })
    }
}

impl From<std::convert::Infallible> for StonkieError {
    fn from(never: std::convert::Infallible) -> Self {
        match never {}
    }
}

impl From<std::io::Error> for StonkieError {
    fn from(err: std::io::Error) -> Self {
        Self::IOError(err.to_string())
    }
}

impl From<reqwest::Error> for StonkieError {
    fn from(err: reqwest::Error) -> Self {
        // If the error has a status code, map it to a more specific error
        if let Some(status) = err.status() {
            match status.as_u16() {
                401 | 403 => Self::Authentication(format!("Authentication failed: {err}")),
                404 => Self::NotFound(format!("Resource not found: {err}")),
                429 => Self::RateLimited(err.to_string()),
                500..=599 => Self::ServerError(err.to_string()),
                _ => Self::Network(err),
            }
        } else {
            Self::Network(err)
        }
    }
}
