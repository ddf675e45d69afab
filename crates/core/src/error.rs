//! Error types for the Handsfree domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error variant.

use thiserror::Error;

/// The top-level error type for all Handsfree operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Executor errors ---
    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    // --- Input classifier errors ---
    #[error("Classifier error: {0}")]
    Classifier(#[from] ClassifierError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // --- Generic ---
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError {
        status_code: u16,
        message: String,
    },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

impl ProviderError {
    /// Whether a retry with backoff has a chance of succeeding.
    ///
    /// Auth failures and unknown models are permanent; transient network
    /// trouble, rate limits, timeouts, server-side 5xx responses, and
    /// malformed payloads are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        match self {
            ProviderError::RateLimited { .. }
            | ProviderError::Timeout(_)
            | ProviderError::Network(_)
            | ProviderError::MalformedResponse(_) => true,
            ProviderError::ApiError { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum ExecutorError {
    #[error("Coordinate ({x}, {y}) outside target bounds {width}x{height}")]
    InvalidCoordinate {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
    },

    #[error("OS action failed: {action} — {reason}")]
    Os { action: String, reason: String },

    #[error("Screenshot capture failed: {0}")]
    CaptureFailed(String),

    #[error("Command timed out: {command} after {timeout_secs}s")]
    Timeout { command: String, timeout_secs: u64 },

    #[error("Missing dependency: {0}")]
    MissingDependency(String),
}

#[derive(Debug, Clone, Error)]
pub enum ClassifierError {
    #[error("{modality} classifier unavailable: {reason}")]
    Unavailable { modality: String, reason: String },

    #[error("Failed to decode classifier output: {0}")]
    Decode(String),

    #[error("Classifier process terminated: {0}")]
    Terminated(String),

    #[error("Audio capture failed: {0}")]
    CaptureFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn executor_error_displays_correctly() {
        let err = Error::Executor(ExecutorError::InvalidCoordinate {
            x: 1400,
            y: 0,
            width: 1366,
            height: 768,
        });
        assert!(err.to_string().contains("1400"));
        assert!(err.to_string().contains("1366x768"));
    }

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 429,
            message: "Too many requests".into(),
        });
        assert!(err.to_string().contains("429"));
        assert!(err.to_string().contains("Too many requests"));
    }

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::RateLimited { retry_after_secs: 5 }.is_retryable());
        assert!(ProviderError::Network("connection reset".into()).is_retryable());
        assert!(ProviderError::ApiError { status_code: 503, message: "overloaded".into() }
            .is_retryable());
        assert!(!ProviderError::AuthenticationFailed("bad key".into()).is_retryable());
        assert!(!ProviderError::ApiError { status_code: 400, message: "bad request".into() }
            .is_retryable());
    }
}
