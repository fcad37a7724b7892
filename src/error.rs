//! Error types for feedcache.

use thiserror::Error;

/// Common error type for feedcache.
#[derive(Error, Debug)]
pub enum FeedCacheError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The live feed could not be fetched or parsed.
    #[error("fetch error: {0}")]
    Fetch(String),

    /// Prior cache content is not a readable feed document.
    #[error("cache parse error: {0}")]
    CacheParse(String),

    /// Output artifacts could not be persisted.
    #[error("write error: {0}")]
    Write(String),

    /// Template error.
    #[error("template error: {0}")]
    Template(#[from] crate::template::TemplateError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Validation error for configuration or input values.
    #[error("validation error: {0}")]
    Validation(String),
}

/// Result type alias for feedcache operations.
pub type Result<T> = std::result::Result<T, FeedCacheError>;
