mod lines;
mod utf8;

use std::future::poll_fn;

use chat_panel_model::ResponseBody;

pub use lines::Lines;
pub use utf8::Utf8Decoder;

/// Reads a response body to the end.
pub async fn read_body<B: ResponseBody>(body: B) -> Result<Vec<u8>, B::Error> {
    let mut body = Box::pin(body);
    let mut buf = Vec::new();
    while let Some(chunk) =
        poll_fn(|cx| body.as_mut().poll_next_chunk(cx)).await?
    {
        buf.extend_from_slice(&chunk);
    }
    Ok(buf)
}
