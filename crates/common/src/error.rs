use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// A [`MessageEvent`](crate::MessageEvent) invariant was violated.
    #[error("invalid message event: {0}")]
    InvalidEvent(String),
}

impl Error {
    #[must_use]
    pub fn invalid_event(message: impl Into<String>) -> Self {
        Self::InvalidEvent(message.into())
    }
}

pub type Result<T> = std::result::Result<T, Error>;
