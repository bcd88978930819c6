//! Error taxonomy for the access pipeline.
//!
//! Every stage of the pipeline fails with an [`AccessError`]. The variants
//! carry diagnostic detail for the logs; what a client is allowed to see is
//! limited to [`AccessError::status`] and [`AccessError::public_message`].

use std::io;

use thiserror::Error;

/// Failure of any pipeline stage, from path validation to file delivery.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The request path failed validation (bad grammar or character set).
    #[error("invalid filename")]
    InvalidFilename,

    /// The principal is authenticated but no role authorizes the path.
    #[error("no role authorizes access to this path")]
    Forbidden,

    /// The file does not exist, is not a regular file, or resolves outside
    /// the vault root. Deliberately indistinguishable to clients.
    #[error("file not found")]
    NotFound,

    /// The file exceeds the configured maximum size.
    #[error("file size {size} exceeds limit of {limit} bytes")]
    TooLarge { size: u64, limit: u64 },

    /// An I/O failure while stating, opening, or reading the file.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl AccessError {
    /// HTTP status code for this error.
    pub fn status(&self) -> u16 {
        match self {
            AccessError::InvalidFilename => 400,
            AccessError::Forbidden => 403,
            AccessError::NotFound => 404,
            AccessError::TooLarge { .. } => 413,
            AccessError::Io(_) => 500,
        }
    }

    /// The exact body text clients receive. Never includes paths, sizes,
    /// or I/O detail.
    pub fn public_message(&self) -> &'static str {
        match self {
            AccessError::InvalidFilename => "Invalid filename",
            AccessError::Forbidden => "Forbidden",
            AccessError::NotFound => "not found",
            AccessError::TooLarge { .. } => "File too large",
            AccessError::Io(_) => "Internal server error",
        }
    }
}
