//! # BlogError
//!
//! Centralized error handling for the blog crates.
//! Every variant except `Internal` is a user-facing validation failure.

use thiserror::Error;

/// The primary error type for all gb-core operations.
#[derive(Error, Debug)]
pub enum BlogError {
    /// Resource not found (e.g., Post, Comment, Website)
    #[error("{0} not found with ID {1}")]
    NotFound(String, String),

    /// Validation failure (e.g., missing title, inactive website)
    #[error("validation error: {0}")]
    ValidationError(String),

    /// Posts are never removed, a 404 would follow
    #[error("you can not delete posts because their URLs would return 404 Not Found; disable the active field instead")]
    DeletionForbidden,

    #[error("unknown file mime \"{file_name}\"")]
    UnknownMimeType { file_name: String },

    #[error("\"{file_name}\" file mime is not an image (jpg, png or gif)")]
    UnsupportedImageType { file_name: String },

    #[error("could not generate thumbnail for \"{file_name}\": {reason}")]
    ThumbnailGenerationFailed { file_name: String, reason: String },

    /// Infrastructure failure (e.g., DB down, disk full)
    #[error("internal service error: {0}")]
    Internal(String),
}

impl From<anyhow::Error> for BlogError {
    fn from(err: anyhow::Error) -> Self {
        BlogError::Internal(format!("{:#}", err))
    }
}

/// A specialized Result type for blog logic.
pub type Result<T> = std::result::Result<T, BlogError>;
