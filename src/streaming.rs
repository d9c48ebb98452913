//! Decoding of incremental (SSE) text generation responses into [`StreamChunk`]s.
//!
//! The transport is read one line at a time. Lines carrying a `data:` prefix
//! hold either a JSON chunk or the `[DONE]` sentinel; every other line is
//! framing and is skipped. A malformed chunk or an error envelope inside a
//! chunk fails the whole stream, since a delta cannot be dropped without
//! corrupting the text that follows it.

use crate::sse_stream::LineStream;
use crate::types::{FinishReason, StreamChunk, Usage};
use crate::Error;
use futures_util::{Stream, StreamExt};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::marker::PhantomData;
use std::pin::Pin;
use std::task::{ready, Context, Poll};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// SSE field prefix carrying event payloads.
pub const DATA_PREFIX: &str = "data:";

/// Payload marking the clean end of a stream.
pub const DONE_SENTINEL: &str = "[DONE]";

/// The parts of one wire chunk the decoder cares about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkFrame {
    pub id: Option<String>,
    /// Index of the first choice, if the chunk had any.
    pub index: Option<u32>,
    pub delta: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<Usage>,
}

/// A provider's streaming chunk payload.
pub trait WireChunk: DeserializeOwned {
    /// Extract the frame, or the provider error embedded in the chunk.
    fn into_frame(self, provider: &str) -> Result<ChunkFrame, Error>;
}

/// What a single transport line amounted to.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    /// Blank line or framing unrelated to the payload.
    Skip,
    Chunk(StreamChunk),
    /// The termination sentinel.
    Done,
}

/// Strip a `data:` prefix, with or without the following space.
pub fn strip_data_prefix(line: &str) -> Option<&str> {
    let rest = line.strip_prefix(DATA_PREFIX)?;
    Some(rest.strip_prefix(' ').unwrap_or(rest))
}

/// Line-level decoder holding the state that spans chunks.
pub struct ChunkDecoder<C> {
    provider: String,
    /// Fixed by the first chunk that carries one.
    response_id: Option<String>,
    _wire: PhantomData<fn() -> C>,
}

impl<C: WireChunk> ChunkDecoder<C> {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            response_id: None,
            _wire: PhantomData,
        }
    }

    /// Response id captured so far (empty until a chunk carries one).
    pub fn response_id(&self) -> &str {
        self.response_id.as_deref().unwrap_or_default()
    }

    /// Decode one transport line.
    pub fn decode_line(&mut self, line: &str) -> Result<LineEvent, Error> {
        let Some(payload) = strip_data_prefix(line) else {
            return Ok(LineEvent::Skip);
        };

        if payload == DONE_SENTINEL {
            tracing::debug!(provider = %self.provider, id = %self.response_id(), "stream sentinel received");
            return Ok(LineEvent::Done);
        }

        let chunk: C = serde_json::from_str(payload)
            .map_err(|e| Error::decode(self.provider.clone(), payload, e))?;
        let frame = chunk.into_frame(&self.provider)?;

        if let Some(id) = frame.id.filter(|id| !id.is_empty()) {
            if self.response_id.is_none() {
                self.response_id = Some(id);
            } else if self.response_id() != id {
                tracing::warn!(
                    provider = %self.provider,
                    expected = %self.response_id(),
                    received = %id,
                    "stream chunk id differs from the first chunk; keeping the first"
                );
            }
        }

        Ok(LineEvent::Chunk(StreamChunk {
            id: self.response_id().to_string(),
            index: frame.index,
            delta: frame.delta.unwrap_or_default(),
            finish_reason: frame
                .finish_reason
                .filter(|reason| !reason.is_empty())
                .map(|reason| FinishReason::from(reason.as_str())),
            usage: frame.usage,
            is_final: false,
        }))
    }

    /// The chunk emitted for the sentinel.
    pub fn terminal_chunk(&self) -> StreamChunk {
        StreamChunk::terminal(self.response_id())
    }
}

/// A lazy, forward-only stream of [`StreamChunk`]s decoded from an SSE byte stream.
///
/// Yields chunks in transport order. On the sentinel it yields one chunk with
/// `is_final` set and ends; if the transport closes first it simply ends, so
/// consumers can tell a truncated stream from a completed one. After an error
/// the stream yields nothing further.
pub struct ChunkStream<S, C> {
    lines: LineStream<S>,
    decoder: ChunkDecoder<C>,
    cancelled: Option<Pin<Box<WaitForCancellationFutureOwned>>>,
    finished: bool,
}

impl<S, C: WireChunk> ChunkStream<S, C> {
    /// Create a chunk stream for `provider` over a byte stream.
    pub fn new(stream: S, provider: impl Into<String>) -> Self {
        Self {
            lines: LineStream::new(stream),
            decoder: ChunkDecoder::new(provider),
            cancelled: None,
            finished: false,
        }
    }

    /// Abort with [`Error::Cancelled`] as soon as `token` is cancelled, even while
    /// waiting on the transport.
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancelled = Some(Box::pin(token.cancelled_owned()));
        self
    }
}

impl<S, E, C> Stream for ChunkStream<S, C>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Error>,
    C: WireChunk,
{
    type Item = Result<StreamChunk, Error>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        if this.finished {
            return Poll::Ready(None);
        }

        if let Some(cancelled) = this.cancelled.as_mut() {
            if cancelled.as_mut().poll(cx).is_ready() {
                this.finished = true;
                return Poll::Ready(Some(Err(Error::Cancelled)));
            }
        }

        loop {
            let line = match ready!(this.lines.poll_next_unpin(cx)) {
                Some(Ok(line)) => line,
                Some(Err(e)) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
                None => {
                    this.finished = true;
                    tracing::debug!(
                        id = %this.decoder.response_id(),
                        "event stream closed without sentinel"
                    );
                    return Poll::Ready(None);
                }
            };

            match this.decoder.decode_line(&line) {
                Ok(LineEvent::Skip) => continue,
                Ok(LineEvent::Chunk(chunk)) => return Poll::Ready(Some(Ok(chunk))),
                Ok(LineEvent::Done) => {
                    // Anything after the sentinel is never read
                    this.finished = true;
                    return Poll::Ready(Some(Ok(this.decoder.terminal_chunk())));
                }
                Err(e) => {
                    this.finished = true;
                    return Poll::Ready(Some(Err(e)));
                }
            }
        }
    }
}
