//! A [`Transport`] that talks HTTP(S) through `reqwest`.

#[macro_use]
extern crate tracing;

mod body;

use std::error::Error as StdError;
use std::fmt::{self, Display};

use chat_panel_model::{
    Transport, TransportError, TransportRequest, TransportResponse,
};
use reqwest::{Client, header};

pub use body::HttpBody;

/// Error type for [`HttpTransport`].
#[derive(Debug)]
pub struct Error {
    message: String,
    source: Option<reqwest::Error>,
}

impl Error {
    fn from_reqwest(err: reqwest::Error) -> Self {
        Self {
            message: format!("{err}"),
            source: Some(err),
        }
    }

    /// Returns the error message.
    #[inline]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.source.as_ref().map(|err| err as _)
    }
}

impl TransportError for Error {
    #[inline]
    fn is_timeout(&self) -> bool {
        self.source
            .as_ref()
            .map(reqwest::Error::is_timeout)
            .unwrap_or(false)
    }
}

/// HTTP transport backed by a shared `reqwest` client.
///
/// Every request is a `POST` to the URL it names, with bearer
/// authorization and a JSON body. The status code is passed through
/// untouched, error statuses are not turned into errors here.
#[derive(Clone, Debug, Default)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Creates a transport with a default `reqwest` client.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a transport that sends requests through `client`.
    ///
    /// Use this to share a connection pool or to configure proxies and
    /// connect timeouts.
    #[inline]
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Transport for HttpTransport {
    type Error = Error;
    type Body = HttpBody;

    fn post(
        &self,
        req: &TransportRequest,
    ) -> impl Future<Output = Result<TransportResponse<Self::Body>, Self::Error>>
    + Send
    + 'static {
        let mut builder = self
            .client
            .post(req.url.as_str())
            .header(
                header::AUTHORIZATION,
                format!("Bearer {}", req.bearer_token),
            )
            .header(header::CONTENT_TYPE, "application/json")
            .body(req.body.clone());
        if req.streaming {
            builder = builder.header(header::ACCEPT, "text/event-stream");
        }
        let resp_fut = builder.send();
        let url = req.url.clone();

        async move {
            let resp = match resp_fut.await {
                Ok(resp) => resp,
                Err(err) => {
                    debug!("request to {url} failed: {err}");
                    return Err(Error::from_reqwest(err));
                }
            };

            let status = resp.status().as_u16();
            let content_type = resp
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(ToOwned::to_owned);
            debug!("got response from {url}: {status} ({content_type:?})");

            Ok(TransportResponse {
                status,
                content_type,
                body: HttpBody::from_response(resp),
            })
        }
    }
}
