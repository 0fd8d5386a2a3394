// Error types for memofetch.
// Covers fetch failures, shared-store failures, and configuration errors.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum MemoError {
    #[error("HTTP fetch failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Fetch failed: {0}")]
    Fetch(String),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Shared cache store unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, MemoError>;
