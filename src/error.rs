//! Error handling for the tracker

use std::fmt;
use thiserror::Error;

/// Unified error type for tracker operations
#[derive(Error, Debug)]
pub enum Error {
    /// Table service errors
    #[error("Database error: {0}")]
    Database(#[from] tst_postgrest::PostgrestError),

    /// Bucket errors
    #[error("Storage error: {0}")]
    Storage(#[from] tst_storage::StorageError),

    /// JSON serialization or deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Session marker could not be issued or verified
    #[error("Session error: {0}")]
    Session(#[from] jsonwebtoken::errors::Error),

    /// Login or session restore rejected
    #[error("Authentication error: {0}")]
    Auth(String),

    /// Input rejected before anything was written
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    NotFound(String),

    /// A row with the same key already exists
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Configuration error: {0}")]
    Config(String),

    /// Spreadsheet generation errors
    #[error("Export error: {0}")]
    Export(String),

    /// Page rendering errors
    #[error("Template error: {0}")]
    Template(#[from] tera::Error),
}

impl Error {
    pub fn auth<T: fmt::Display>(msg: T) -> Self {
        Error::Auth(msg.to_string())
    }

    pub fn validation<T: fmt::Display>(msg: T) -> Self {
        Error::Validation(msg.to_string())
    }

    pub fn not_found<T: fmt::Display>(msg: T) -> Self {
        Error::NotFound(msg.to_string())
    }

    pub fn conflict<T: fmt::Display>(msg: T) -> Self {
        Error::Conflict(msg.to_string())
    }

    pub fn config<T: fmt::Display>(msg: T) -> Self {
        Error::Config(msg.to_string())
    }

    pub fn export<T: fmt::Display>(msg: T) -> Self {
        Error::Export(msg.to_string())
    }

    /// Errors caused by the user's input rather than by the backend
    pub fn is_user_facing(&self) -> bool {
        match self {
            Error::Auth(_) | Error::Validation(_) | Error::NotFound(_) | Error::Conflict(_) => true,
            // the bucket refused the file itself: wrong type, too large, duplicate name
            Error::Storage(e) => e.status().is_some_and(|s| (400..500).contains(&s)),
            _ => false,
        }
    }
}

impl From<rust_xlsxwriter::XlsxError> for Error {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        Error::Export(err.to_string())
    }
}

impl From<csv::Error> for Error {
    fn from(err: csv::Error) -> Self {
        Error::Export(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
