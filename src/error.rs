//! Error handling for labrec-rs
//!
//! This module defines custom error types and a Result alias for use
//! throughout the crate.

use thiserror::Error;

/// Main error type for labrec-rs operations
#[derive(Error, Debug)]
pub enum LabRecError {
    /// IO errors from data, info or snapshot files
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Errors serializing or deserializing session state
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Errors loading/saving experiment configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors from device adapters (EEG remote, eye tracker)
    #[error("Device error: {0}")]
    Device(String),

    /// An operation was called in a session state that does not allow it
    #[error("Invalid session state for {operation}: session is {state}")]
    InvalidState {
        operation: &'static str,
        state: &'static str,
    },

    /// Errors validating a tracker-side data filename
    #[error("Invalid EDF filename: {0}")]
    EdfName(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<LabRecError>,
    },
}

impl LabRecError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        LabRecError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

impl From<serde_json::Error> for LabRecError {
    fn from(err: serde_json::Error) -> Self {
        LabRecError::Serialization(err.to_string())
    }
}

/// Result type alias for labrec-rs operations
pub type Result<T> = std::result::Result<T, LabRecError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| LabRecError::from(e).with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| LabRecError::from(e).with_context(f()))
    }
}
