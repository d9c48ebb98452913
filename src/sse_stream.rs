//! Stream adapter splitting an SSE byte stream into lines.

use crate::Error;
use futures_util::{Stream, StreamExt};
use memchr::memchr;
use std::collections::VecDeque;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

/// Largest incomplete line kept in the buffer before the stream is failed.
const MAX_LINE_BYTES: usize = 1_000_000;

/// A stream adapter that yields the lines of a byte stream.
/// Maintains internal state to handle lines split across chunks.
///
/// Line terminators (`\n` or `\r\n`) are stripped. A final line without a
/// terminator is still yielded when the underlying stream ends.
pub struct LineStream<S> {
    /// The underlying byte stream
    inner: S,
    /// Bytes of the current, not yet terminated line
    buffer: Vec<u8>,
    /// Complete lines ready to be yielded
    lines: VecDeque<String>,
    /// Underlying stream returned `None` or an error
    finished: bool,
    /// Error to yield once the lines split before it are drained
    pending_error: Option<Error>,
}

impl<S> LineStream<S> {
    /// Create a new line stream from a byte stream.
    pub fn new(stream: S) -> Self {
        Self {
            inner: stream,
            buffer: Vec::new(),
            lines: VecDeque::new(),
            finished: false,
            pending_error: None,
        }
    }

    /// Move every complete line out of the buffer.
    fn split_buffer(&mut self) -> Result<(), Error> {
        let mut start = 0;

        while let Some(pos) = memchr(b'\n', &self.buffer[start..]) {
            let line_end = start + pos;
            let line = Self::decode_line(&self.buffer[start..line_end])?;
            self.lines.push_back(line);
            start = line_end + 1;
        }

        if start > 0 {
            self.buffer.drain(..start);
        }

        Ok(())
    }

    /// Invalid UTF-8 is fatal only on `data:` lines; comments and other
    /// framing lines are decoded lossily.
    fn decode_line(bytes: &[u8]) -> Result<String, Error> {
        let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
        match std::str::from_utf8(bytes) {
            Ok(line) => Ok(line.to_string()),
            Err(e) if bytes.starts_with(b"data:") => Err(Error::streaming(format!(
                "Invalid UTF-8 in event stream: {e}"
            ))),
            Err(_) => Ok(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Stop reading and yield `error` after the lines already queued.
    fn fail(&mut self, error: Error) {
        self.finished = true;
        self.buffer.clear();
        self.pending_error = Some(error);
    }
}

impl<S, E> Stream for LineStream<S>
where
    S: Stream<Item = Result<bytes::Bytes, E>> + Unpin,
    E: Into<Error>,
{
    type Item = Result<String, Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // First, yield any already-split lines (FIFO order)
            if let Some(line) = self.lines.pop_front() {
                return Poll::Ready(Some(Ok(line)));
            }

            if let Some(error) = self.pending_error.take() {
                return Poll::Ready(Some(Err(error)));
            }

            if self.finished {
                return Poll::Ready(None);
            }

            let chunk = match ready!(self.inner.poll_next_unpin(cx)) {
                Some(Ok(chunk)) => chunk,
                Some(Err(e)) => {
                    self.fail(e.into());
                    continue;
                }
                None => {
                    self.finished = true;
                    if self.buffer.is_empty() {
                        return Poll::Ready(None);
                    }
                    // Stream ended mid-line: the remainder is the last line
                    let rest = std::mem::take(&mut self.buffer);
                    return Poll::Ready(Some(Self::decode_line(&rest)));
                }
            };

            self.buffer.extend_from_slice(&chunk);

            if let Err(e) = self.split_buffer() {
                self.fail(e);
            } else if self.buffer.len() > MAX_LINE_BYTES {
                self.fail(Error::streaming("event stream line exceeded maximum size"));
            }
        }
    }
}

/// Extension trait to add line splitting to byte streams.
pub trait LineStreamExt: Stream {
    /// Split this byte stream into lines.
    fn lines(self) -> LineStream<Self>
    where
        Self: Sized,
    {
        LineStream::new(self)
    }
}

impl<S: Stream> LineStreamExt for S {}
