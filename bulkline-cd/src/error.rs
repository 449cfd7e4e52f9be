//! Error types for bulkline-cd
//!
//! Defines module-specific error types using thiserror for clear error propagation.
//!
//! Per-contact failures (element waits, confirmation timeouts) are captured into
//! the contact's outcome record by the dispatch loop and never cross the loop
//! boundary; only pre-loop failures (parse, session acquisition) surface here
//! as campaign-level errors.

use thiserror::Error;

/// Main error type for bulkline-cd
#[derive(Error, Debug)]
pub enum Error {
    /// Contact list could not be read or has no usable header row
    #[error("Contact list parse error: {0}")]
    Parse(String),

    /// Automation session could not be created or revived
    #[error("Session unavailable: {0}")]
    SessionUnavailable(String),

    /// A required page element was not located
    #[error("Element not found: {0}")]
    ElementNotFound(String),

    /// A bounded wait elapsed
    #[error("Timed out: {0}")]
    Timeout(String),

    /// DevTools protocol transport or command error
    #[error("CDP error: {0}")]
    Cdp(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Another campaign currently owns the automation session
    #[error("Dispatch busy: {0}")]
    Busy(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using bulkline-cd Error
pub type Result<T> = std::result::Result<T, Error>;
