mod builder;
mod stream;
#[cfg(test)]
mod tests;

use std::sync::{Mutex, MutexGuard, PoisonError};

use bytes::Bytes;
use chat_panel_model::{
    Message, ProviderConfig, RequestOptions, Transport, TransportRequest,
    TransportResponse,
};
use mime::Mime;
use tokio::sync::Mutex as AsyncMutex;
use tokio::time::{Instant, timeout_at};
use tracing::Instrument;

use crate::error::Error;
use crate::io::{self, Lines};
use crate::proto::{self, ChatCompletion};
use crate::stats::{DecodeCounters, DecodeStats};
pub use builder::ConversationClientBuilder;
pub use stream::ReplyStream;
use stream::PendingTurn;

/// What happens to the user message of a request that didn't complete.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum FailurePolicy {
    /// The user message stays in the transcript and is replayed with the
    /// next request.
    #[default]
    KeepUserMessage,
    /// The user message is removed, the transcript looks as if the
    /// request never happened.
    RollBack,
}

#[derive(Debug, Default)]
struct Transcript {
    messages: Vec<Message>,
    // Bumped by every reset, so that turns started before a reset don't
    // write into the new conversation.
    generation: u64,
}

/// A stateful client for one conversation with a completion endpoint.
///
/// The client owns the transcript: every request appends the user
/// message first, replays the whole transcript to the endpoint, and
/// appends the assistant reply once it has been fully received.
///
/// # Concurrency
///
/// A conversation has a single writer. Requests issued concurrently on
/// the same client are queued, each one runs from "append user message"
/// to "append assistant message" before the next one starts. Reading the
/// transcript or resetting it never waits for an in-flight request.
///
/// # Cancel safety
///
/// Dropping the future of a request cancels it. The assistant message is
/// only appended when the reply is complete, and the user message is
/// handled according to the [`FailurePolicy`].
pub struct ConversationClient<T> {
    transport: T,
    config: ProviderConfig,
    failure_policy: FailurePolicy,
    transcript: Mutex<Transcript>,
    turn: AsyncMutex<()>,
    decode_counters: DecodeCounters,
}

impl<T: Transport> ConversationClient<T> {
    /// Creates a client, seeding the transcript with `system_prompt` if
    /// it is given and not empty.
    #[inline]
    pub fn new(
        transport: T,
        config: ProviderConfig,
        system_prompt: Option<String>,
    ) -> Self {
        let mut builder = ConversationClientBuilder::new(transport, config);
        if let Some(prompt) = system_prompt {
            builder = builder.with_system_prompt(prompt);
        }
        builder.build()
    }

    /// Returns a builder for more options.
    #[inline]
    pub fn builder(
        transport: T,
        config: ProviderConfig,
    ) -> ConversationClientBuilder<T> {
        ConversationClientBuilder::new(transport, config)
    }

    /// Returns the provider configuration.
    #[inline]
    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Returns the failure policy.
    #[inline]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }

    /// Sends a message and waits for the complete reply.
    ///
    /// The reply message is appended to the transcript as returned by the
    /// endpoint, and its content is returned. If `options.stream` is set,
    /// the reply is received as a stream and assembled before returning.
    pub async fn send_message(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<String, Error> {
        if options.stream == Some(true) {
            let mut stream = self.stream_message(text, options).await?;
            while stream.next_fragment().await?.is_some() {}
            return Ok(stream.into_content());
        }

        let deadline = deadline_of(options);
        async move {
            let turn = self.begin_turn(text, deadline).await?;
            let req = self.build_request(options, false)?;
            let resp = self.post(&req, deadline).await?;
            let body = within(deadline, io::read_body(resp.body))
                .await?
                .map_err(Error::transport)?;
            let msg = decode_completion(&body)?;
            let content = msg.content.clone();
            turn.commit(msg);
            Ok(content)
        }
        .instrument(trace_span!("send message"))
        .await
    }

    /// Sends a message and streams the reply, invoking `on_chunk` with
    /// each text fragment as soon as it is decoded.
    ///
    /// The concatenation of all fragments is appended to the transcript
    /// as one assistant message when the stream ends.
    pub async fn send_streaming_message(
        &self,
        text: &str,
        mut on_chunk: impl FnMut(&str),
        options: &RequestOptions,
    ) -> Result<(), Error> {
        let mut stream = self.stream_message(text, options).await?;
        while let Some(fragment) = stream.next_fragment().await? {
            on_chunk(&fragment);
        }
        Ok(())
    }

    /// Sends a message and returns a [`ReplyStream`] to pull the reply
    /// from, fragment by fragment.
    ///
    /// The conversation stays busy until the stream is exhausted, fails,
    /// or is dropped.
    pub async fn stream_message(
        &self,
        text: &str,
        options: &RequestOptions,
    ) -> Result<ReplyStream<'_, T>, Error> {
        let deadline = deadline_of(options);
        async move {
            let turn = self.begin_turn(text, deadline).await?;
            let req = self.build_request(options, true)?;
            let resp = self.post(&req, deadline).await?;
            check_event_stream(resp.content_type.as_deref());
            Ok(ReplyStream::new(turn, Lines::new(resp.body), deadline))
        }
        .instrument(trace_span!("stream message"))
        .await
    }

    /// Returns a copy of the transcript.
    #[inline]
    pub fn transcript(&self) -> Vec<Message> {
        self.lock_transcript().messages.clone()
    }

    /// Clears the transcript, including the system message.
    ///
    /// A request in flight while resetting will not write its reply into
    /// the cleared transcript.
    pub fn reset(&self) {
        let mut transcript = self.lock_transcript();
        transcript.messages.clear();
        transcript.generation += 1;
        debug!("conversation reset");
    }

    /// Clears the transcript and seeds it with a new system message.
    pub fn reset_with_system_prompt<S: Into<String>>(&self, prompt: S) {
        let mut transcript = self.lock_transcript();
        transcript.messages.clear();
        transcript.messages.push(Message::system(prompt));
        transcript.generation += 1;
        debug!("conversation reset with a new system prompt");
    }

    /// Returns the decode counters accumulated over all streamed replies.
    #[inline]
    pub fn decode_stats(&self) -> DecodeStats {
        self.decode_counters.snapshot()
    }
}

impl<T: Transport> ConversationClient<T> {
    fn from_parts(
        transport: T,
        config: ProviderConfig,
        failure_policy: FailurePolicy,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            transport,
            config,
            failure_policy,
            transcript: Mutex::new(Transcript {
                messages,
                generation: 0,
            }),
            turn: AsyncMutex::new(()),
            decode_counters: DecodeCounters::default(),
        }
    }

    #[inline]
    fn lock_transcript(&self) -> MutexGuard<'_, Transcript> {
        self.transcript
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    async fn begin_turn(
        &self,
        text: &str,
        deadline: Option<Instant>,
    ) -> Result<PendingTurn<'_, T>, Error> {
        let guard = within(deadline, self.turn.lock()).await?;
        let mut transcript = self.lock_transcript();
        let mark = transcript.messages.len();
        transcript.messages.push(Message::user(text));
        trace!("appended user message at {mark}");
        Ok(PendingTurn::new(self, guard, mark, transcript.generation))
    }

    fn build_request(
        &self,
        options: &RequestOptions,
        stream: bool,
    ) -> Result<TransportRequest, Error> {
        let messages = self.transcript();
        debug!(
            "sending {} messages to {} (stream: {stream})",
            messages.len(),
            self.config.endpoint()
        );
        let req =
            proto::create_request(messages, options, &self.config, stream);
        let body = serde_json::to_vec(&req).map_err(|err| {
            Error::decode(format!("failed to encode request: {err}"), None)
        })?;
        Ok(TransportRequest {
            url: self.config.endpoint().to_owned(),
            bearer_token: self.config.credential().to_owned(),
            body: Bytes::from(body),
            streaming: stream,
        })
    }

    /// Posts the request and classifies non-2xx responses.
    async fn post(
        &self,
        req: &TransportRequest,
        deadline: Option<Instant>,
    ) -> Result<TransportResponse<T::Body>, Error> {
        let resp = match within(deadline, self.transport.post(req)).await? {
            Ok(resp) => resp,
            Err(err) => {
                error!("transport failed: {err}");
                return Err(Error::transport(err));
            }
        };
        if resp.is_success() {
            return Ok(resp);
        }

        let status = resp.status;
        // The body is only diagnostics here, the status decides the error.
        let body = match within(deadline, io::read_body(resp.body)).await {
            Ok(Ok(body)) => String::from_utf8_lossy(&body).into_owned(),
            _ => String::new(),
        };
        error!("endpoint responded with {status}: {body}");
        if status == 429 {
            Err(Error::rate_limited(body))
        } else {
            Err(Error::endpoint(status, body))
        }
    }

    fn commit_turn(&self, mark: usize, generation: u64, msg: Message) {
        let mut transcript = self.lock_transcript();
        if transcript.generation != generation {
            debug!("conversation was reset, dropping the reply");
            return;
        }
        trace!("appended {} message after {mark}", msg.role);
        transcript.messages.push(msg);
    }

    fn abandon_turn(&self, mark: usize, generation: u64) {
        if self.failure_policy != FailurePolicy::RollBack {
            return;
        }
        let mut transcript = self.lock_transcript();
        if transcript.generation != generation {
            return;
        }
        debug!("rolling back the transcript to {mark} messages");
        transcript.messages.truncate(mark);
    }

    #[inline]
    fn record_decode_stats(&self, stats: DecodeStats) {
        self.decode_counters.add(stats);
    }
}

fn decode_completion(body: &[u8]) -> Result<Message, Error> {
    let lossy_body = || String::from_utf8_lossy(body).into_owned();
    let completion = serde_json::from_slice::<ChatCompletion>(body)
        .map_err(|err| Error::decode(format!("{err}"), Some(lossy_body())))?;
    let Some(choice) = completion.choices.into_iter().next() else {
        return Err(Error::decode(
            "response has no choices",
            Some(lossy_body()),
        ));
    };
    Ok(choice.message)
}

fn check_event_stream(content_type: Option<&str>) {
    let Some(content_type) = content_type else {
        return;
    };
    let is_event_stream = content_type
        .parse::<Mime>()
        .map(|m| m.essence_str() == mime::TEXT_EVENT_STREAM.essence_str())
        .unwrap_or(false);
    if !is_event_stream {
        warn!("unexpected content type for a streamed reply: {content_type}");
    }
}

#[inline]
fn deadline_of(options: &RequestOptions) -> Option<Instant> {
    options.timeout.map(|timeout| Instant::now() + timeout)
}

/// Runs `fut` to completion, or fails once `deadline` has passed.
async fn within<F: Future>(
    deadline: Option<Instant>,
    fut: F,
) -> Result<F::Output, Error> {
    match deadline {
        Some(deadline) => timeout_at(deadline, fut).await.map_err(|_| {
            warn!("request deadline exceeded");
            Error::timed_out()
        }),
        None => Ok(fut.await),
    }
}
