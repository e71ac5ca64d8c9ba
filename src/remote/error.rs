//! Remote service error types

use thiserror::Error;

/// Remote call failure with classification
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    /// HTTP status when the server answered
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteError {
    pub fn new(kind: RemoteErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Network, message)
    }

    pub fn status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: RemoteErrorKind::Status,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(RemoteErrorKind::Decode, message)
    }
}

impl From<reqwest::Error> for RemoteError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            Self::decode(format!("Malformed response body: {e}"))
        } else if let Some(status) = e.status() {
            Self::status(status.as_u16(), e.to_string())
        } else {
            Self::network(e.to_string())
        }
    }
}

/// Failure classification.
///
/// Callers collapse every kind into the same fallback; the distinction only
/// shows up in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteErrorKind {
    /// Connection refused, reset, DNS, timeout
    Network,
    /// Server answered with a non-success status
    Status,
    /// Server answered 2xx with a body we could not parse
    Decode,
}

impl RemoteErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Network => "network",
            Self::Status => "status",
            Self::Decode => "decode",
        }
    }
}
