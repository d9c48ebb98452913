//! Alibaba DashScope in OpenAI-compatible mode. Image generation is not
//! offered through this endpoint.

use super::chat_completions::{ChatCompletionsHandler, PlatformProfile};
use crate::{Error, HandlerRegistry, PlatformHandler, ProviderConfig};
use std::time::Duration;

pub const NAME: &str = "alibaba";

pub const BASE_URL: &str = "https://dashscope.aliyuncs.com/compatible-mode/v1";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const PROFILE: PlatformProfile = PlatformProfile {
    name: NAME,
    base_url: BASE_URL,
    default_timeout: DEFAULT_TIMEOUT,
    supports_images: false,
    supports_embeddings: true,
};

pub fn handler(config: &ProviderConfig) -> Result<ChatCompletionsHandler, Error> {
    ChatCompletionsHandler::new(PROFILE, config)
}

/// Register the Alibaba constructor under [`NAME`].
pub fn register(registry: &mut HandlerRegistry) {
    registry.register(NAME, |config: &ProviderConfig| {
        Ok(Box::new(handler(config)?) as Box<dyn PlatformHandler>)
    });
}
