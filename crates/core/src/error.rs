//! Error types for the Slate core crate.

use thiserror::Error;

/// Top-level error type for all Slate core operations.
///
/// Connectors classify errors at the record boundary: [`SlateError::Validation`]
/// and [`SlateError::MissingMapping`] are per-record conditions caught inside
/// batch loops, while [`SlateError::Auth`] and [`SlateError::Bundle`] indicate
/// the batch itself cannot proceed.
#[derive(Debug, Error)]
pub enum SlateError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("missing mapping: {0}")]
    MissingMapping(String),

    #[error("sync error: {0}")]
    Sync(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication error: {0}")]
    Auth(String),

    #[error("provider error: {0}")]
    Provider(String),

    #[error("bundle error: {0}")]
    Bundle(String),
}

/// A convenience Result alias that defaults to [`SlateError`].
pub type Result<T> = std::result::Result<T, SlateError>;
