use std::future::poll_fn;
use std::mem;
use std::pin::Pin;

use chat_panel_model::ResponseBody;

use super::Utf8Decoder;

/// A type for reading text lines from a response body.
///
/// Lines end with a line feed, an optional preceding carriage return is
/// dropped. Chunk boundaries may fall anywhere, including in the middle
/// of a line or a character. Text left without a line feed at the end of
/// the body is returned as the last line.
pub struct Lines<B> {
    body: Pin<Box<B>>,
    decoder: Utf8Decoder,
    buf: String,
    finished: bool,
}

impl<B: ResponseBody> Lines<B> {
    #[inline]
    pub fn new(body: B) -> Self {
        Self {
            body: Box::pin(body),
            decoder: Utf8Decoder::default(),
            buf: String::new(),
            finished: false,
        }
    }

    pub async fn next_line(&mut self) -> Result<Option<String>, B::Error> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if self.finished {
                if self.buf.is_empty() {
                    return Ok(None);
                }
                let mut line = mem::take(&mut self.buf);
                if line.ends_with('\r') {
                    line.pop();
                }
                return Ok(Some(line));
            }

            // Not enough data for a complete line, read more.
            let body = &mut self.body;
            match poll_fn(|cx| body.as_mut().poll_next_chunk(cx)).await? {
                Some(bytes) => self.decoder.decode(&bytes, &mut self.buf),
                None => {
                    self.decoder.finish(&mut self.buf);
                    self.finished = true;
                }
            }
        }
    }

    fn take_line(&mut self) -> Option<String> {
        let eol_idx = self.buf.find('\n')?;
        let mut line: String = self.buf.drain(..=eol_idx).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}
