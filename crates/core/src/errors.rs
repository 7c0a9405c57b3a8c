use thiserror::Error;

use crate::formatter::{GENERIC_FAILURE_MESSAGE, NO_ANSWER_MESSAGE};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RemoteApiError {
    #[error("request to `{endpoint}` failed: {message}")]
    Transport { endpoint: String, message: String },
    #[error("`{endpoint}` returned status {status}: {body}")]
    Status { endpoint: String, status: u16, body: String },
    #[error("could not decode response from `{endpoint}`: {message}")]
    Decode { endpoint: String, message: String },
}

impl RemoteApiError {
    pub fn endpoint(&self) -> &str {
        match self {
            Self::Transport { endpoint, .. }
            | Self::Status { endpoint, .. }
            | Self::Decode { endpoint, .. } => endpoint,
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("storage failure: {0}")]
pub struct StorageError(pub String);

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolViolation {
    #[error("selection arrived for thread `{thread_id}` with no pending question")]
    MissingPendingQuestion { thread_id: String },
    #[error("action id `{action_id}` is not a knowledge-base selection")]
    UnrecognizedAction { action_id: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatPlatformError {
    #[error("chat platform request `{method}` failed: {message}")]
    Transport { method: String, message: String },
    #[error("chat platform rejected `{method}`: {error}")]
    Api { method: String, error: String },
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum RelayError {
    #[error(transparent)]
    RemoteApi(#[from] RemoteApiError),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Protocol(#[from] ProtocolViolation),
    #[error(transparent)]
    ChatPlatform(#[from] ChatPlatformError),
}

impl RelayError {
    /// Plain-text reply posted to the originating thread when this error ends an event.
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Protocol(_) => NO_ANSWER_MESSAGE,
            Self::RemoteApi(_) | Self::Storage(_) | Self::ChatPlatform(_) => GENERIC_FAILURE_MESSAGE,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::RemoteApi(_) => "remote_api",
            Self::Storage(_) => "storage",
            Self::Protocol(_) => "protocol_violation",
            Self::ChatPlatform(_) => "chat_platform",
        }
    }
}
