use thiserror::Error;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TransportErrorKind {
    /// Connection refused, DNS failure, reset mid-body.
    Network,
    Timeout,
    /// The service answered with a non-2xx status.
    Status,
    /// The body was not valid JSON or did not match the expected shape.
    Decode,
    /// The request could not be built (bad base URL, bad path).
    Request,
}

/// Failure of a single request/response exchange.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("{message}")]
pub struct TransportError {
    pub kind: TransportErrorKind,
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(kind: TransportErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            status: None,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Network, message)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Timeout, message)
    }

    pub fn http_status(status: u16, message: impl Into<String>) -> Self {
        Self {
            kind: TransportErrorKind::Status,
            status: Some(status),
            message: message.into(),
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Decode, message)
    }

    pub fn request(message: impl Into<String>) -> Self {
        Self::new(TransportErrorKind::Request, message)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn from_reqwest(context: &str, err: reqwest::Error) -> Self {
        let status = err.status().map(|s| s.as_u16());
        let kind = if err.is_timeout() {
            TransportErrorKind::Timeout
        } else if err.is_decode() {
            TransportErrorKind::Decode
        } else if err.is_builder() {
            TransportErrorKind::Request
        } else {
            TransportErrorKind::Network
        };
        Self {
            kind,
            status,
            message: format!("{context}: {err}"),
        }
    }
}

/// Failure of the push subscription. Never fatal: the connector reconnects.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum StreamError {
    #[error("failed to open event stream: {0}")]
    Connect(String),
    #[error("event stream rejected with status {0}")]
    Status(u16),
    #[error("event stream interrupted: {0}")]
    Interrupted(String),
}
