//! Types for streaming responses.

use crate::types::{FinishReason, Usage};

/// One incremental unit of a streaming text generation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamChunk {
    /// Id of the response this chunk belongs to (first id seen on the stream).
    pub id: String,
    /// Choice index the delta came from; `None` when the frame had no choices.
    pub index: Option<u32>,
    /// Partial text.
    pub delta: String,
    pub finish_reason: Option<FinishReason>,
    /// Usage snapshot, usually only on the last content frame.
    pub usage: Option<Usage>,
    /// Set only on the chunk emitted for the termination sentinel.
    pub is_final: bool,
}

impl StreamChunk {
    /// The terminal chunk emitted once the sentinel is seen.
    pub fn terminal(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            is_final: true,
            ..Default::default()
        }
    }
}

/// How a chunk stream ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The `[DONE]` sentinel was received.
    Completed,
    /// The transport closed before the sentinel.
    TruncatedByTransport,
}
