use std::io;

use thiserror::Error;

/// How a failure is handled at the cycle and session boundaries.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// The session is unusable; log in again from scratch.
    Transient,
    /// Confined to the current cycle; log it and carry on.
    CycleLocal,
}

#[derive(Debug, Error)]
pub enum BotError {
    #[error("access token expired")]
    AccessTokenExpired,

    #[error("malformed response from {method}: {reason}")]
    MalformedResponse { method: String, reason: String },

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("missing field `{field}` in {method} response")]
    MissingField { method: String, field: String },

    #[error("invalid response from {method}: {reason}")]
    InvalidResponse { method: String, reason: String },

    #[error("request to {method} timed out")]
    Timeout { method: String },

    #[error("{method} rejected: {reason}")]
    Rejected { method: String, reason: String },

    #[error("transport failure calling {method}: {reason}")]
    Transport { method: String, reason: String },

    #[error("config: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl BotError {
    pub fn kind(&self) -> ErrorClass {
        match self {
            BotError::AccessTokenExpired
            | BotError::MalformedResponse { .. }
            | BotError::InvalidArgument(_)
            | BotError::MissingField { .. }
            | BotError::InvalidResponse { .. }
            | BotError::Timeout { .. } => ErrorClass::Transient,
            BotError::Rejected { .. }
            | BotError::Transport { .. }
            | BotError::Config(_)
            | BotError::Io(_) => ErrorClass::CycleLocal,
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind() == ErrorClass::Transient
    }

    pub fn rejected(method: &str, reason: impl Into<String>) -> Self {
        BotError::Rejected {
            method: method.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_response(method: &str, reason: impl Into<String>) -> Self {
        BotError::InvalidResponse {
            method: method.to_string(),
            reason: reason.into(),
        }
    }
}

pub type BotResult<T> = Result<T, BotError>;
