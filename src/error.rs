//! Error types for the ADL trend engine

use crate::config::ConfigError;
use thiserror::Error;

/// Errors that can occur during computation
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Failed to parse vendor payload: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Date parse error: {0}")]
    DateParseError(String),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Insufficient events for computation: {0}")]
    InsufficientEvents(String),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Report store error: {0}")]
    Store(String),
}

/// Input-shape problems detected before computation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Sleep sessions span {found} calendar dates, at most {max} are supported")]
    TooManyDates { found: usize, max: usize },

    #[error("Interval stops before it starts: {start} > {stop}")]
    InvertedInterval { start: String, stop: String },
}
