//! Streaming text generation responses.

use crate::accumulator::{Aggregate, ResponseAccumulator};
use crate::types::{StreamChunk, TextGenerationResponse};
use crate::Error;
use futures_util::stream::Stream;
use futures_util::StreamExt;
use std::pin::Pin;

/// Boxed stream of chunks as produced by a platform handler.
pub type ChunkResultStream = Pin<Box<dyn Stream<Item = Result<StreamChunk, Error>> + Send>>;

/// A streaming text generation response.
///
/// Consume it either live with [`TextStream::stream`], or reduced to a single
/// response with [`TextStream::aggregate`] / [`TextStream::response`]. The
/// underlying stream is single-pass.
pub struct TextStream {
    provider: String,
    stream: ChunkResultStream,
}

impl TextStream {
    /// Create a new response from a stream of chunks.
    pub fn from_stream<S>(provider: impl Into<String>, stream: S) -> Self
    where
        S: Stream<Item = Result<StreamChunk, Error>> + Send + 'static,
    {
        Self {
            provider: provider.into(),
            stream: Box::pin(stream),
        }
    }

    /// Name of the platform producing this stream.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Stream the chunks as they arrive.
    pub fn stream(self) -> ChunkResultStream {
        self.stream
    }

    /// Consume the whole stream and fold it into an [`Aggregate`].
    ///
    /// Any error in the stream discards the partial result.
    pub async fn aggregate(mut self) -> Result<Aggregate, Error> {
        let mut accumulator = ResponseAccumulator::new();

        while let Some(chunk) = self.stream.next().await {
            let chunk = chunk?;
            let is_final = chunk.is_final;
            accumulator.process_chunk(chunk);
            if is_final {
                break;
            }
        }

        accumulator.finalize(&self.provider)
    }

    /// Consume the stream into a response, failing with
    /// [`Error::StreamTruncated`] if it ended before the sentinel.
    pub async fn response(self) -> Result<TextGenerationResponse, Error> {
        let provider = self.provider.clone();
        self.aggregate().await?.into_response(&provider)
    }

    /// Get just the generated text (convenience method).
    pub async fn text(self) -> Result<String, Error> {
        Ok(self.response().await?.generated_text)
    }
}

impl std::fmt::Debug for TextStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextStream")
            .field("provider", &self.provider)
            .finish_non_exhaustive()
    }
}
