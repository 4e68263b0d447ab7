//! Error types for the LLM backend boundary.
//!
//! Uses `thiserror` for ergonomic error definitions. Transport faults are
//! terminal for the request that hit them: a dead connection will not
//! self-heal across same-process retries, so the pipeline never treats a
//! `ProviderError` as a retryable contract failure.

use thiserror::Error;

/// Errors produced by an [`crate::LlmClient`] implementation.
#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Stream interrupted: {0}")]
    StreamInterrupted(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}
