//! A unified abstraction over large-model inference platforms.
//!
//! Callers submit provider-agnostic requests (text generation, image
//! generation, embedding) and a handler resolved from a [`HandlerRegistry`]
//! translates them to one platform's wire protocol. Streaming text generation
//! is decoded incrementally and can be consumed live or aggregated.

pub mod accumulator;
pub mod client;
pub mod config;
pub mod context;
pub mod error;
pub mod provider;
pub mod providers;
pub mod registry;
pub mod response;
pub mod sse_stream;
pub mod streaming;
pub mod types;

// Re-export core types for easy usage
pub use accumulator::{Aggregate, ResponseAccumulator};
pub use client::{Client, ModelRequest, ModelResponse};
pub use config::{HandlerOptions, ProviderConfig, API_KEY_CREDENTIAL};
pub use context::InvokeContext;
pub use error::{Error, ErrorKind};
pub use provider::PlatformHandler;
pub use registry::{HandlerConstructor, HandlerRegistry};
pub use response::{ChunkResultStream, TextStream};
pub use types::*;
