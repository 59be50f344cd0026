use std::error::Error;
use std::fmt::{self, Display};

/// The kind of error that occurred while talking to the completion
/// endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The endpoint responded with HTTP 429.
    RateLimited,
    /// The endpoint responded with any other non-2xx status.
    Endpoint,
    /// No response was received (connection failure, DNS failure,
    /// timeout, broken body stream, etc).
    Transport,
    /// A response was received but its shape is not the expected one.
    Decode,
}

impl Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::RateLimited => write!(f, "Rate limited"),
            ErrorKind::Endpoint => write!(f, "Endpoint error"),
            ErrorKind::Transport => write!(f, "Transport error"),
            ErrorKind::Decode => write!(f, "Decode error"),
        }
    }
}

/// The error type for a transport.
///
/// Transport errors mean that no HTTP response is available. Responses
/// with an error status are not transport errors, they are returned as
/// regular [`crate::TransportResponse`]s and classified by the caller.
pub trait TransportError: Error + Send + Sync + 'static {
    /// Returns `true` if the error was caused by a timeout.
    fn is_timeout(&self) -> bool {
        false
    }
}
