// ABOUTME: Error type for session creation and runtime configuration.
// ABOUTME: InvalidArgument fails fast; collaborator failures wrap their anyhow source.

use thiserror::Error;

/// Errors surfaced while building sessions or applying configuration.
///
/// Operations on an existing session return the controller's own
/// `anyhow::Error` untouched; this type only covers creation paths.
#[derive(Debug, Error)]
pub enum ChatSessionError {
    #[error("Invalid argument: {message}")]
    InvalidArgument {
        message: String,
        /// The offending value, when there was one
        value: Option<String>,
    },

    #[error("Failed to create chat client: {0}")]
    Client(#[source] anyhow::Error),

    #[error("Failed to create chat controller: {0}")]
    Controller(#[source] anyhow::Error),

    #[error("Invalid configuration: {0}")]
    Config(#[source] anyhow::Error),
}

impl ChatSessionError {
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            value: None,
        }
    }

    pub fn invalid_value(message: impl Into<String>, value: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
            value: Some(value.into()),
        }
    }

    pub fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument { .. })
    }
}

pub type Result<T, E = ChatSessionError> = std::result::Result<T, E>;
