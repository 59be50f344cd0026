use chat_panel_model::{Message, Transport};
use tokio::sync::MutexGuard;
use tokio::time::Instant;

use super::{ConversationClient, within};
use crate::error::Error;
use crate::io::Lines;
use crate::proto::{self, LineEvent};
use crate::stats::DecodeStats;

/// A request that has appended its user message and holds the
/// conversation until it is committed or dropped.
pub(crate) struct PendingTurn<'a, T: Transport> {
    client: &'a ConversationClient<T>,
    _guard: MutexGuard<'a, ()>,
    mark: usize,
    generation: u64,
    committed: bool,
}

impl<'a, T: Transport> PendingTurn<'a, T> {
    #[inline]
    pub fn new(
        client: &'a ConversationClient<T>,
        guard: MutexGuard<'a, ()>,
        mark: usize,
        generation: u64,
    ) -> Self {
        Self {
            client,
            _guard: guard,
            mark,
            generation,
            committed: false,
        }
    }

    /// Appends the reply and releases the conversation.
    pub fn commit(mut self, msg: Message) {
        self.client.commit_turn(self.mark, self.generation, msg);
        self.committed = true;
    }
}

impl<T: Transport> Drop for PendingTurn<'_, T> {
    fn drop(&mut self) {
        if !self.committed {
            debug!("turn ended without a reply");
            self.client.abandon_turn(self.mark, self.generation);
        }
    }
}

/// A reply being streamed from the endpoint.
///
/// Call [`ReplyStream::next_fragment`] until it returns `None`, at which
/// point the assembled reply has been appended to the transcript.
/// Dropping the stream before that abandons the reply.
pub struct ReplyStream<'a, T: Transport> {
    turn: Option<PendingTurn<'a, T>>,
    lines: Lines<T::Body>,
    deadline: Option<Instant>,
    content: String,
    stats: DecodeStats,
}

impl<'a, T: Transport> ReplyStream<'a, T> {
    pub(crate) fn new(
        turn: PendingTurn<'a, T>,
        lines: Lines<T::Body>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            turn: Some(turn),
            lines,
            deadline,
            content: String::new(),
            stats: DecodeStats::default(),
        }
    }

    /// Waits for the next text fragment of the reply.
    ///
    /// Returns `Ok(None)` once the stream has ended and the reply has been
    /// committed, and keeps returning it afterwards. Lines that can't be
    /// decoded are skipped. After an error the reply is abandoned and
    /// further calls return `Ok(None)`.
    ///
    /// # Cancel safety
    ///
    /// This method is not cancel safe: a fragment being decoded when the
    /// future is dropped may be lost.
    pub async fn next_fragment(&mut self) -> Result<Option<String>, Error> {
        if self.turn.is_none() {
            return Ok(None);
        }

        loop {
            let line = within(self.deadline, self.lines.next_line())
                .await
                .and_then(|line| line.map_err(Error::transport));
            let line = match line {
                Ok(Some(line)) => line,
                Ok(None) => {
                    self.finish();
                    return Ok(None);
                }
                Err(err) => {
                    error!("reading the reply failed: {err}");
                    self.abandon();
                    return Err(err);
                }
            };
            trace!("got line: {line}");

            match proto::parse_event_line(&line) {
                LineEvent::Ignored => {}
                LineEvent::Malformed => {
                    debug!("skipped malformed event: {line}");
                    self.stats.data_lines += 1;
                    self.stats.malformed += 1;
                }
                LineEvent::Empty => {
                    self.stats.data_lines += 1;
                }
                LineEvent::Fragment(fragment) => {
                    self.stats.data_lines += 1;
                    self.stats.fragments += 1;
                    self.content.push_str(&fragment);
                    return Ok(Some(fragment));
                }
            }
        }
    }

    /// Returns the text received so far.
    #[inline]
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Returns the decode counters of this reply.
    #[inline]
    pub fn stats(&self) -> DecodeStats {
        self.stats
    }

    /// Consumes the stream, returning the text received so far.
    #[inline]
    pub fn into_content(mut self) -> String {
        std::mem::take(&mut self.content)
    }

    fn finish(&mut self) {
        let Some(turn) = self.turn.take() else {
            return;
        };
        trace!("reply finished with {} fragments", self.stats.fragments);
        turn.client.record_decode_stats(self.stats);
        turn.commit(Message::assistant(self.content.clone()));
    }

    fn abandon(&mut self) {
        if let Some(turn) = self.turn.take() {
            turn.client.record_decode_stats(self.stats);
        }
    }
}

impl<T: Transport> Drop for ReplyStream<'_, T> {
    fn drop(&mut self) {
        self.abandon();
    }
}
