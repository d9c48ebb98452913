//! Shared handler for platforms exposing an OpenAI-compatible API
//! (`/chat/completions`, `/embeddings`, `/images/generations`).

pub mod client;
pub mod types;

pub use client::{
    ChatCompletionsHandler, PlatformProfile, PARAM_INCLUDE_USAGE, PARAM_INCLUDE_USAGE_VOLC, PARAM_USER,
};
