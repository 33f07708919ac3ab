//! Error types.
//!
//! `AppError` is what the binary sees: a message plus a process exit code.
//! Components return typed errors (`LoadError`, `FitError`) so callers can
//! tell recoverable conditions apart from fatal ones before converting.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised while loading one snapshot file.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file does not exist. Callers treat the metric as unavailable.
    #[error("snapshot file not found: {}", path.display())]
    MissingFile { path: PathBuf },

    /// The file exists but could not be read.
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    /// Required header markers are absent or a row does not fit the header.
    #[error("unexpected format in {}: {reason}", path.display())]
    Format { path: PathBuf, reason: String },

    /// A value cell is not a base-10 integer.
    #[error("invalid value '{value}' in {} line {line}, column '{column}'", path.display())]
    InvalidValue {
        path: PathBuf,
        line: usize,
        column: String,
        value: String,
    },
}

impl LoadError {
    pub fn is_missing(&self) -> bool {
        matches!(self, LoadError::MissingFile { .. })
    }
}

impl From<LoadError> for AppError {
    fn from(err: LoadError) -> Self {
        AppError::new(2, err.to_string())
    }
}

/// Errors raised by a single growth fit.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("fit window must span at least 2 days (got {days_fit})")]
    InvalidWindow { days_fit: usize },

    #[error("need {needed} values to fit, series has {got}")]
    TooShort { needed: usize, got: usize },

    /// `ln` is undefined at or below zero.
    #[error("non-positive value {value} at index {index} in fit window")]
    NonPositive { index: usize, value: f64 },

    #[error("least squares system could not be solved")]
    Singular,
}
