//! A scripted in-memory transport for testing conversation clients.

mod preset;

use std::collections::VecDeque;
use std::error::Error as StdError;
use std::fmt::{self, Display, Formatter};
use std::future::{Future, ready};
use std::pin::Pin;
use std::sync::{Arc, Mutex, PoisonError};
use std::task::{Context, Poll, ready};
use std::time::Duration;

use bytes::Bytes;
use chat_panel_model::{
    ResponseBody, Transport, TransportError, TransportRequest,
    TransportResponse,
};
use pin_project_lite::pin_project;
use serde_json::Value;
use tokio::time::{Sleep, sleep};

pub use preset::*;
use preset::Outcome;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Error {
    message: String,
}

impl Error {
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {}

impl TransportError for Error {}

pin_project! {
    /// Body of a preset reply.
    #[derive(Debug)]
    pub struct TestBody {
        chunks: VecDeque<Bytes>,
        broken: bool,
        delay: Option<Duration>,
        #[pin]
        sleep: Option<Sleep>,
    }
}

impl ResponseBody for TestBody {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let mut this = self.project();
        if let Some(delay) = *this.delay {
            if this.sleep.is_none() && !this.chunks.is_empty() {
                this.sleep.set(Some(sleep(delay)));
            }
        }
        if let Some(sleep) = this.sleep.as_mut().as_pin_mut() {
            ready!(sleep.poll(cx));
            this.sleep.set(None);
        }

        if let Some(chunk) = this.chunks.pop_front() {
            return Poll::Ready(Ok(Some(chunk)));
        }
        if *this.broken {
            *this.broken = false;
            return Poll::Ready(Err(Error::new("connection reset by peer")));
        }
        Poll::Ready(Ok(None))
    }
}

#[derive(Default)]
struct Inner {
    script: Mutex<VecDeque<PresetReply>>,
    requests: Mutex<Vec<TransportRequest>>,
}

/// A transport that answers requests from a script.
///
/// Replies are consumed in the order they were pushed, one per request.
/// If the script runs out, the request fails with a transport error.
/// Every request is recorded so tests can inspect what was sent.
///
/// Clones share the same script and records, so a test can keep one
/// clone while a client owns another.
#[derive(Clone, Default)]
pub struct TestTransport {
    inner: Arc<Inner>,
}

impl TestTransport {
    /// Appends a reply to the script.
    #[inline]
    pub fn push_reply(&self, reply: PresetReply) {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(reply);
    }

    /// Returns every request received so far.
    #[inline]
    pub fn requests(&self) -> Vec<TransportRequest> {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Returns the body of the last request, parsed as JSON.
    pub fn last_request_json(&self) -> Option<Value> {
        let requests = self.requests();
        let req = requests.last()?;
        serde_json::from_slice(&req.body).ok()
    }

    /// Returns the number of replies that haven't been used yet.
    #[inline]
    pub fn remaining_replies(&self) -> usize {
        self.inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

impl Transport for TestTransport {
    type Error = crate::Error;
    type Body = TestBody;

    fn post(
        &self,
        req: &TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, Self::Error>>
    + Send
    + 'static {
        self.inner
            .requests
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(req.clone());

        let reply = self
            .inner
            .script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop_front();
        let result = match reply {
            None => Err(Error::new("no more preset replies")),
            Some(PresetReply {
                outcome: Outcome::Fail(message),
                ..
            }) => Err(Error::new(message)),
            Some(PresetReply {
                outcome:
                    Outcome::Respond {
                        status,
                        content_type,
                        chunks,
                        broken,
                    },
                chunk_delay,
            }) => Ok(TransportResponse {
                status,
                content_type,
                body: TestBody {
                    chunks: chunks.into(),
                    broken,
                    delay: chunk_delay,
                    sleep: None,
                },
            }),
        };
        ready(result)
    }
}

#[cfg(test)]
mod tests {
    use std::future::poll_fn;
    use std::pin::pin;

    use super::*;

    async fn collect_body(body: TestBody) -> Result<Vec<u8>, Error> {
        let mut body = pin!(body);
        let mut buf = Vec::new();
        while let Some(chunk) =
            poll_fn(|cx| body.as_mut().poll_next_chunk(cx)).await?
        {
            buf.extend_from_slice(&chunk);
        }
        Ok(buf)
    }

    fn request(body: &'static str) -> TransportRequest {
        TransportRequest {
            url: "http://localhost/chat".to_owned(),
            bearer_token: "key".to_owned(),
            body: Bytes::from_static(body.as_bytes()),
            streaming: false,
        }
    }

    #[tokio::test]
    async fn test_scripted_replies() {
        let transport = TestTransport::default();
        transport.push_reply(PresetReply::json(200, "{}"));
        transport.push_reply(PresetReply::json(429, "slow down"));

        let resp = transport.post(&request(r#"{"n":1}"#)).await.unwrap();
        assert!(resp.is_success());
        assert_eq!(collect_body(resp.body).await.unwrap(), b"{}");

        let resp = transport.post(&request(r#"{"n":2}"#)).await.unwrap();
        assert_eq!(resp.status, 429);
        assert_eq!(collect_body(resp.body).await.unwrap(), b"slow down");

        let err = transport.post(&request("{}")).await.unwrap_err();
        assert_eq!(err.to_string(), "no more preset replies");

        assert_eq!(transport.requests().len(), 3);
        assert_eq!(transport.last_request_json(), Some(serde_json::json!({})));
    }

    #[tokio::test]
    async fn test_broken_body() {
        let transport = TestTransport::default();
        transport.push_reply(
            PresetReply::event_stream(["data: x"])
                .broken()
                .with_chunk_delay(Duration::from_millis(1)),
        );
        let resp = transport.post(&request("{}")).await.unwrap();
        assert!(collect_body(resp.body).await.is_err());
    }

    #[tokio::test]
    async fn test_failure() {
        let transport = TestTransport::default();
        transport.push_reply(PresetReply::failure("connection refused"));
        let err = transport.post(&request("{}")).await.unwrap_err();
        assert_eq!(err.to_string(), "connection refused");
        assert_eq!(transport.remaining_replies(), 0);
    }
}
