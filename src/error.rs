//! Error types and handling for the `plan-activity` client

use thiserror::Error;

/// Main error type for the `plan-activity` client
#[derive(Error, Debug)]
pub enum PlannerError {
    /// Free-text submission with nothing but whitespace
    #[error("Empty input")]
    EmptyInput,

    /// Free-text submission that is not valid JSON
    #[error("Malformed JSON: {message}")]
    MalformedJson { message: String },

    /// The request never produced a usable response
    #[error("Network error: {message}")]
    Network { message: String },

    /// The backend answered outside the 2xx range
    #[error("API error: status {status}")]
    Api { status: u16 },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// I/O operation errors
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl PlannerError {
    /// Create a new malformed JSON error
    pub fn malformed_json<S: Into<String>>(message: S) -> Self {
        Self::MalformedJson {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Text shown in the error slot
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            PlannerError::EmptyInput => "Paste valid JSON before sending.".to_string(),
            PlannerError::MalformedJson { message } => {
                format!("Failed to parse JSON: {message}")
            }
            PlannerError::Network { message } => format!("Network error: {message}"),
            PlannerError::Api { status } => {
                format!("API error (status {status}). See the details below.")
            }
            PlannerError::Config { message } => format!("Configuration error: {message}"),
            PlannerError::Io { source } => format!("File operation failed: {source}"),
        }
    }
}
