//! Error types for the skill dispatch core.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while routing and answering a skill event.
#[derive(Error, Debug)]
pub enum Error {
    /// No registered handler accepted the event
    #[error("No handler matched event {kind} (intent: {intent})")]
    UnmatchedEvent { kind: String, intent: String },

    /// A handler action failed while building its response
    #[error("Handler failed: {0}")]
    Action(String),

    /// A message from the web app was not a JSON object
    #[error("Malformed client payload: {0}")]
    MalformedClientPayload(String),

    /// The platform request envelope could not be understood
    #[error("Invalid request envelope: {0}")]
    Envelope(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The web app tried to talk to the skill before initialization finished
    #[error("Client not ready: {0}")]
    ClientNotReady(String),

    /// The web app client was initialized twice
    #[error("Client already initialized")]
    AlreadyInitialized,
}

impl Error {
    /// Short machine-readable code, handy as a log field.
    pub fn code(&self) -> &'static str {
        match self {
            Error::UnmatchedEvent { .. } => "UNMATCHED_EVENT",
            Error::Action(_) => "ACTION_FAILURE",
            Error::MalformedClientPayload(_) => "MALFORMED_CLIENT_PAYLOAD",
            Error::Envelope(_) => "INVALID_ENVELOPE",
            Error::Config(_) => "CONFIG",
            Error::Serialization(_) => "SERIALIZATION",
            Error::ClientNotReady(_) => "CLIENT_NOT_READY",
            Error::AlreadyInitialized => "ALREADY_INITIALIZED",
        }
    }
}
