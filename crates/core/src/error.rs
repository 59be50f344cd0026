use std::error::Error as StdError;
use std::fmt::{self, Display};

use chat_panel_model::{ErrorKind, TransportError};

type BoxedSource = Box<dyn StdError + Send + Sync + 'static>;

/// Error returned by the request operations of
/// [`ConversationClient`](crate::ConversationClient).
///
/// Use [`Error::kind`] to tell the failure classes apart. Rate limiting
/// has its own kind so that callers can show a "try again later" hint.
#[derive(Debug)]
pub struct Error {
    kind: ErrorKind,
    message: String,
    status: Option<u16>,
    body: Option<String>,
    timeout: bool,
    source: Option<BoxedSource>,
}

impl Error {
    fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
            body: None,
            timeout: false,
            source: None,
        }
    }

    pub(crate) fn rate_limited(body: String) -> Self {
        Self {
            status: Some(429),
            body: Some(body),
            ..Self::new(
                ErrorKind::RateLimited,
                "Rate limit exceeded. Please try again later.",
            )
        }
    }

    pub(crate) fn endpoint(status: u16, body: String) -> Self {
        Self {
            status: Some(status),
            message: format!("API Error: {status} - {body}"),
            body: Some(body),
            ..Self::new(ErrorKind::Endpoint, "")
        }
    }

    pub(crate) fn transport<E: TransportError>(err: E) -> Self {
        Self {
            timeout: err.is_timeout(),
            ..Self::new(ErrorKind::Transport, format!("{err}"))
        }
        .with_source(err)
    }

    pub(crate) fn timed_out() -> Self {
        Self {
            timeout: true,
            ..Self::new(ErrorKind::Transport, "request timed out")
        }
    }

    pub(crate) fn decode(
        reason: impl Into<String>,
        body: Option<String>,
    ) -> Self {
        Self {
            body,
            ..Self::new(ErrorKind::Decode, reason)
        }
    }

    fn with_source<E: StdError + Send + Sync + 'static>(
        mut self,
        source: E,
    ) -> Self {
        self.source = Some(Box::new(source));
        self
    }

    /// Returns the kind of this error.
    #[inline]
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the HTTP status, if the endpoint responded at all.
    #[inline]
    pub fn status(&self) -> Option<u16> {
        self.status
    }

    /// Returns the raw response body, kept for diagnostics.
    #[inline]
    pub fn body(&self) -> Option<&str> {
        self.body.as_deref()
    }

    /// Returns `true` if the endpoint rejected the request with HTTP 429.
    #[inline]
    pub fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }

    /// Returns `true` if the request ran out of time, either because the
    /// deadline passed or because the transport timed out.
    #[inline]
    pub fn is_timeout(&self) -> bool {
        self.timeout
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_deref().map(|err| err as _)
    }
}
