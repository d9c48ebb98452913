//! Platform handler implementations.

pub mod alibaba;
pub mod chat_completions;
pub mod volcengine;

pub use chat_completions::{ChatCompletionsHandler, PlatformProfile};
