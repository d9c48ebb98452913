use super::{PlatformConfig, PlatformTestSetup, TEST_API_KEY};
use modelbridge::providers::volcengine::{self, models};
use modelbridge::{PlatformHandler, ProviderConfig};
use std::time::Duration;

pub struct VolcengineTestSetup;

impl PlatformTestSetup for VolcengineTestSetup {
    fn get_config() -> PlatformConfig {
        PlatformConfig {
            name: volcengine::NAME,
            text_model: models::DOUBAO_PRO_32K,
            embedding_model: models::DOUBAO_EMBEDDING_TEXT_240715,
            image_model: models::DOUBAO_SEEDREAM_3_0_T2I,
            supports_images: true,
        }
    }

    fn create_handler(base_url: &str) -> Box<dyn PlatformHandler> {
        let config = ProviderConfig::with_api_key(volcengine::NAME, TEST_API_KEY).base_url(base_url);
        Box::new(volcengine::handler(&config).expect("Failed to create Volcengine handler"))
    }

    fn create_handler_with_timeout(base_url: &str, timeout: Duration) -> Box<dyn PlatformHandler> {
        let config = ProviderConfig::with_api_key(volcengine::NAME, TEST_API_KEY)
            .base_url(base_url)
            .timeout(timeout);
        Box::new(volcengine::handler(&config).expect("Failed to create Volcengine handler"))
    }
}
