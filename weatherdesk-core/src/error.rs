use thiserror::Error;

use crate::model::LocationId;

pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Every failure a lookup or sync operation can surface to its caller.
#[derive(Debug, Error)]
pub enum Error {
    /// Bad local input, rejected before any request is sent.
    #[error("invalid input: {0}")]
    Validation(String),

    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The endpoint answered with a non-2xx status.
    #[error("request failed with status {status}: {message}")]
    Remote { status: u16, message: String },

    /// The endpoint answered, but the body was not what we expected.
    #[error("malformed response: {0}")]
    Parse(String),

    #[error("no saved location with id {0}")]
    NotFound(LocationId),

    #[error("a saved location with id {0} already exists")]
    DuplicateId(LocationId),
}

impl Error {
    /// Short message suitable for showing to the user.
    pub fn user_message(&self) -> &'static str {
        match self {
            Error::Validation(_) => "Please check your input and try again.",
            Error::Network(_) => "Could not reach the server. Check your connection.",
            Error::Remote { .. } => "The server rejected the request.",
            Error::Parse(_) => "The server sent an unexpected response.",
            Error::NotFound(_) => "That saved location no longer exists.",
            Error::DuplicateId(_) => "That saved location is already in your list.",
        }
    }

    /// HTTP status for remote failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Remote { status, .. } => Some(*status),
            _ => None,
        }
    }
}
