//! Volcengine Ark.

use super::chat_completions::{ChatCompletionsHandler, PlatformProfile};
use crate::{Error, HandlerRegistry, PlatformHandler, ProviderConfig};
use std::time::Duration;

/// Registered platform name.
pub const NAME: &str = "volcengine";

pub const BASE_URL: &str = "https://ark.cn-beijing.volces.com/api/v3";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

pub const PROFILE: PlatformProfile = PlatformProfile {
    name: NAME,
    base_url: BASE_URL,
    default_timeout: DEFAULT_TIMEOUT,
    supports_images: true,
    supports_embeddings: true,
};

/// Model ids served by Ark.
pub mod models {
    // Text generation
    pub const DOUBAO_PRO_32K: &str = "doubao-1.5-pro-32k-250115";
    pub const DOUBAO_PRO_32K_CHARACTER: &str = "doubao-1.5-pro-32k-character-250228";
    pub const DOUBAO_PRO_256K: &str = "doubao-1.5-pro-256k-250115";
    pub const DOUBAO_LITE_32K: &str = "doubao-1.5-lite-32k-250115";
    pub const DEEPSEEK_V3_250324: &str = "deepseek-v3-250324";
    pub const DEEPSEEK_V3_241226: &str = "deepseek-v3-241226";

    // Image generation
    pub const DOUBAO_SEEDREAM_3_0_T2I: &str = "doubao-seedream-3-0-t2i-250415";

    // Video generation
    pub const DOUBAO_SEEDANCE_1_0_LITE_T2V: &str = "doubao-seedance-1-0-lite-t2v-250428";
    pub const WAN2_1_14B_T2V: &str = "wan2-1-14b-t2v-250225";
    pub const WAN2_1_14B_I2V: &str = "wan2-1-14b-i2v-250225";
    pub const WAN2_1_14B_FLF2V: &str = "wan2-1-14b-flf2v-250417";

    /// Text embedding, up to 4096 dimensions.
    pub const DOUBAO_EMBEDDING_LARGE_TEXT_240915: &str = "doubao-embedding-large-text-240915";
    /// Text embedding, up to 2560 dimensions.
    pub const DOUBAO_EMBEDDING_TEXT_240715: &str = "doubao-embedding-text-240715";
    /// Text embedding, up to 2560 dimensions.
    pub const DOUBAO_EMBEDDING_TEXT_240515: &str = "doubao-embedding-text-240515";

    // Image-text embedding
    pub const DOUBAO_EMBEDDING_VISION_250328: &str = "doubao-embedding-vision-250328";
    pub const DOUBAO_EMBEDDING_VISION_241215: &str = "doubao-embedding-vision-241215";
}

/// Create a Volcengine handler from configuration.
pub fn handler(config: &ProviderConfig) -> Result<ChatCompletionsHandler, Error> {
    ChatCompletionsHandler::new(PROFILE, config)
}

/// Register the Volcengine constructor under [`NAME`].
pub fn register(registry: &mut HandlerRegistry) {
    registry.register(NAME, |config: &ProviderConfig| {
        Ok(Box::new(handler(config)?) as Box<dyn PlatformHandler>)
    });
}
