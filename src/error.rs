//! Error types at the forge and configuration seams.
//!
//! Application layers wrap these in `anyhow` with context; the typed variants
//! exist so callers can tell an unexpected status apart from a dead connection.
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForgeError {
    #[error("{method} {url} returned {status}: {body}")]
    Status {
        method: &'static str,
        url: String,
        status: u16,
        body: String,
    },
    #[error("{method} {url} failed: {source}")]
    Transport {
        method: &'static str,
        url: String,
        #[source]
        source: Box<ureq::Error>,
    },
    #[error("decode response from {url}: {reason}")]
    Decode { url: String, reason: String },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} not found in environment variables")]
    MissingEnv(&'static str),
    #[error("{0} is required")]
    MissingValue(&'static str),
    #[error("{0}")]
    Invalid(String),
}
