//! crates/storywriter_client/src/error.rs
//!
//! Error types of the client library.

use storywriter_core::ports::PortError;

/// Failures of calls made through the generation client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The backend answered with a non-success status. Never retried.
    #[error("API Error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Network failure or timeout on every allowed attempt.
    #[error("Unable to reach the AI backend. Start the proxy service and try again.")]
    Unreachable,

    /// The backend answered 2xx with a body that could not be decoded.
    #[error("Invalid response from the AI backend: {0}")]
    Decode(String),

    /// The request could not be built (e.g. a malformed base URL).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Message must not be empty")]
    EmptyMessage,

    /// The queue worker is gone, so the request was never dispatched.
    #[error("Request queue is closed")]
    QueueClosed,
}

/// Failures of the local key-value storage.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Storage IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Storage serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Outcome of a background history synchronization task.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("Remote history call failed: {0}")]
    Remote(#[from] PortError),
    #[error("Synchronization was cancelled")]
    Cancelled,
    #[error("Synchronization task aborted: {0}")]
    Aborted(String),
}

/// Failures of local signup and login.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Name, email, and password are required.")]
    MissingSignupFields,
    #[error("Email and password are required.")]
    MissingLoginFields,
    #[error("Password must be at least 6 characters.")]
    PasswordTooShort,
    #[error("An account with this email already exists. Please log in.")]
    EmailTaken,
    #[error("No account found for this email. Please sign up first.")]
    UnknownEmail,
    #[error("Incorrect password. Please try again.")]
    WrongPassword,
    #[error("Password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Storage(#[from] StoreError),
}
