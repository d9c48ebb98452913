//! Folding of streamed chunks into a single response.

use crate::types::{FinishReason, StreamChunk, Termination, TextGenerationResponse, Usage};
use crate::Error;

/// A response reconstructed from a chunk stream, with how the stream ended.
#[derive(Debug, Clone, PartialEq)]
pub struct Aggregate {
    pub response: TextGenerationResponse,
    pub termination: Termination,
}

impl Aggregate {
    pub fn is_complete(&self) -> bool {
        self.termination == Termination::Completed
    }

    /// The response of a completed stream; a truncated stream becomes
    /// [`Error::StreamTruncated`] carrying the partial response.
    pub fn into_response(self, provider: &str) -> Result<TextGenerationResponse, Error> {
        match self.termination {
            Termination::Completed => Ok(self.response),
            Termination::TruncatedByTransport => Err(Error::StreamTruncated {
                provider: provider.to_string(),
                partial: Box::new(self.response),
            }),
        }
    }
}

/// Accumulates streaming chunks into a complete response.
#[derive(Debug, Default)]
pub struct ResponseAccumulator {
    /// First non-empty response id seen.
    id: Option<String>,
    /// Deltas concatenated in arrival order.
    text: String,
    /// Last non-empty finish reason.
    finish_reason: Option<FinishReason>,
    /// Last usage snapshot.
    usage: Option<Usage>,
    /// At least one chunk carried a choice entry.
    saw_choice: bool,
    /// The terminal chunk was processed.
    terminated: bool,
}

impl ResponseAccumulator {
    /// Create a new response accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk into the accumulation.
    pub fn process_chunk(&mut self, chunk: StreamChunk) {
        if self.terminated {
            tracing::warn!(id = %chunk.id, "ignoring chunk received after the terminal chunk");
            return;
        }

        if self.id.is_none() && !chunk.id.is_empty() {
            self.id = Some(chunk.id);
        }
        self.text.push_str(&chunk.delta);
        if chunk.finish_reason.is_some() {
            self.finish_reason = chunk.finish_reason;
        }
        if let Some(usage) = chunk.usage {
            self.usage = Some(usage.normalized());
        }
        self.saw_choice |= chunk.index.is_some();
        self.terminated = chunk.is_final;
    }

    /// Get the text accumulated so far.
    pub fn current_text(&self) -> &str {
        &self.text
    }

    /// Whether the terminal chunk has been processed.
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Finalize the accumulation.
    ///
    /// A completed stream in which no chunk carried a choice is rejected the
    /// same way as a non-streaming response with zero choices.
    pub fn finalize(self, provider: &str) -> Result<Aggregate, Error> {
        if self.terminated && !self.saw_choice {
            return Err(Error::provider(provider, NO_RESULT_ENTRIES));
        }

        let termination = if self.terminated {
            Termination::Completed
        } else {
            Termination::TruncatedByTransport
        };

        Ok(Aggregate {
            response: TextGenerationResponse {
                id: self.id.unwrap_or_default(),
                generated_text: self.text,
                finish_reason: self.finish_reason,
                usage: self.usage,
            },
            termination,
        })
    }
}

/// Message of the error returned for a response without any result entries.
pub(crate) const NO_RESULT_ENTRIES: &str = "no result entries (zero choices) in response";
