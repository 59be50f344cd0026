use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use chat_panel_model::ResponseBody;
use pin_project_lite::pin_project;
use reqwest::Response;

use crate::Error;

type PinnedFuture<T> = Pin<Box<dyn Future<Output = T> + Send>>;
type NextChunk = (Result<Option<Bytes>, reqwest::Error>, Response);

pin_project! {
    /// The body of an HTTP response, read chunk by chunk as it arrives.
    pub struct HttpBody {
        next_chunk_fut: Option<PinnedFuture<NextChunk>>,
    }
}

impl std::fmt::Debug for HttpBody {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpBody").finish_non_exhaustive()
    }
}

impl HttpBody {
    #[inline]
    pub(crate) fn from_response(resp: Response) -> Self {
        Self {
            next_chunk_fut: Some(Box::pin(next_chunk(resp))),
        }
    }
}

impl ResponseBody for HttpBody {
    type Error = crate::Error;

    fn poll_next_chunk(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Result<Option<Bytes>, Self::Error>> {
        let this = self.project();
        let Some(next_chunk_fut) = this.next_chunk_fut else {
            return Poll::Ready(Ok(None));
        };
        let (chunk, resp) = ready!(next_chunk_fut.as_mut().poll(cx));
        match chunk {
            Ok(Some(chunk)) => {
                trace!("got a body chunk of {} bytes", chunk.len());
                // More data may follow, create a new future for the next
                // chunk.
                *this.next_chunk_fut = Some(Box::pin(next_chunk(resp)));
                Poll::Ready(Ok(Some(chunk)))
            }
            Ok(None) => {
                *this.next_chunk_fut = None;
                Poll::Ready(Ok(None))
            }
            Err(err) => {
                *this.next_chunk_fut = None;
                Poll::Ready(Err(Error::from_reqwest(err)))
            }
        }
    }
}

async fn next_chunk(mut resp: Response) -> NextChunk {
    let chunk = resp.chunk().await;
    (chunk, resp)
}
