use std::fmt::{self, Debug};
use std::pin::Pin;
use std::task::{self, Poll};

use bytes::Bytes;

use crate::error::TransportError;

/// A JSON `POST` to the completion endpoint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct TransportRequest {
    /// The full URL to post to.
    pub url: String,
    /// Sent as `Authorization: Bearer <token>`.
    pub bearer_token: String,
    /// The serialized JSON body, sent as `application/json`.
    pub body: Bytes,
    /// Whether the caller expects an event stream back.
    pub streaming: bool,
}

impl Debug for TransportRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TransportRequest")
            .field("url", &self.url)
            .field("bearer_token", &"<redacted>")
            .field("body", &String::from_utf8_lossy(&self.body))
            .field("streaming", &self.streaming)
            .finish()
    }
}

/// The head of an HTTP response together with its (unread) body.
#[derive(Debug)]
pub struct TransportResponse<B> {
    /// The HTTP status code.
    pub status: u16,
    /// The raw `Content-Type` header, if any.
    pub content_type: Option<String>,
    /// The body, read incrementally.
    pub body: B,
}

impl<B> TransportResponse<B> {
    /// Returns `true` if the status is in the `2xx` range.
    #[inline]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// A response body that yields raw byte chunks as they arrive.
///
/// Chunk boundaries are arbitrary, they are not aligned to lines or to
/// UTF-8 character boundaries.
pub trait ResponseBody: Send + 'static {
    /// The error type that may be returned while reading.
    type Error: TransportError;

    /// Attempts to pull out the next chunk of the body.
    ///
    /// # Return value
    ///
    /// - `Poll::Pending` means that the next chunk is not available yet.
    ///   Implementations will ensure that the current task will be
    ///   notified when it may be ready.
    /// - `Poll::Ready(Ok(Some(chunk)))` means a chunk is available, and
    ///   further chunks may follow.
    /// - `Poll::Ready(Ok(None))` means the body has been fully read.
    /// - `Poll::Ready(Err(error))` means the connection broke while
    ///   reading.
    ///
    /// Calling this method after completion should always return `None`.
    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut task::Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>>;
}

/// The HTTP collaborator of a conversation client.
///
/// Implementations only move bytes: they don't inspect the status code or
/// the body, classifying responses is up to the caller. A transport should
/// behave like a stateless object and may be shared by many conversations.
pub trait Transport: Send + Sync {
    /// The error type returned when no response could be obtained.
    type Error: TransportError;

    /// The body type of the responses.
    type Body: ResponseBody<Error = Self::Error>;

    /// Posts a request and resolves once the response head is available.
    fn post(
        &self,
        req: &TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, Self::Error>>
    + Send
    + 'static;
}
