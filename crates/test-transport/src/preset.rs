use std::time::Duration;

use bytes::Bytes;

/// How the test transport answers one request.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PresetReply {
    pub(crate) outcome: Outcome,
    pub(crate) chunk_delay: Option<Duration>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) enum Outcome {
    Respond {
        status: u16,
        content_type: Option<String>,
        chunks: Vec<Bytes>,
        // When set, reading the body fails after all chunks are delivered.
        broken: bool,
    },
    Fail(String),
}

impl PresetReply {
    /// A response with arbitrary status, content type and body chunks.
    #[inline]
    pub fn with_chunks(
        status: u16,
        content_type: Option<&str>,
        chunks: impl IntoIterator<Item = Bytes>,
    ) -> Self {
        Self {
            outcome: Outcome::Respond {
                status,
                content_type: content_type.map(ToOwned::to_owned),
                chunks: chunks.into_iter().collect(),
                broken: false,
            },
            chunk_delay: None,
        }
    }

    /// A JSON response delivered in one chunk.
    #[inline]
    pub fn json(status: u16, body: impl Into<String>) -> Self {
        Self::with_chunks(
            status,
            Some("application/json"),
            [Bytes::from(body.into())],
        )
    }

    /// A successful one-shot completion whose first choice is an
    /// assistant message with the given content.
    pub fn completion(content: &str) -> Self {
        let body = serde_json::json!({
            "id": "chatcmpl-test",
            "object": "chat.completion",
            "choices": [{
                "index": 0,
                "message": { "role": "assistant", "content": content },
                "finish_reason": "stop"
            }]
        });
        Self::json(200, body.to_string())
    }

    /// A successful event stream, one chunk per line.
    ///
    /// Each line gets a trailing line feed.
    pub fn event_stream<S: AsRef<str>>(
        lines: impl IntoIterator<Item = S>,
    ) -> Self {
        let chunks = lines
            .into_iter()
            .map(|line| Bytes::from(format!("{}\n", line.as_ref())));
        Self::with_chunks(200, Some("text/event-stream"), chunks)
    }

    /// A successful event stream carrying one `data: ` event per
    /// fragment, followed by the `[DONE]` sentinel.
    pub fn deltas<S: AsRef<str>>(
        fragments: impl IntoIterator<Item = S>,
    ) -> Self {
        let mut lines: Vec<String> = fragments
            .into_iter()
            .map(|fragment| {
                let event = serde_json::json!({
                    "choices": [{ "index": 0, "delta": { "content": fragment.as_ref() } }]
                });
                format!("data: {event}")
            })
            .collect();
        lines.push("data: [DONE]".to_owned());
        Self::event_stream(lines)
    }

    /// No response at all, the request fails with the given message.
    #[inline]
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            outcome: Outcome::Fail(message.into()),
            chunk_delay: None,
        }
    }

    /// Delays each chunk of the body by `delay`.
    #[inline]
    pub fn with_chunk_delay(mut self, delay: Duration) -> Self {
        self.chunk_delay = Some(delay);
        self
    }

    /// Makes the body fail after its last chunk instead of ending.
    #[inline]
    pub fn broken(mut self) -> Self {
        if let Outcome::Respond { broken, .. } = &mut self.outcome {
            *broken = true;
        }
        self
    }
}
