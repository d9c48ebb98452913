pub mod volcengine;

use modelbridge::PlatformHandler;
use wiremock::ResponseTemplate;

pub const TEST_API_KEY: &str = "test-api-key";

/// Platform configuration for cross-platform testing
#[derive(Debug, Clone)]
pub struct PlatformConfig {
    pub name: &'static str,
    pub text_model: &'static str,
    pub embedding_model: &'static str,
    pub image_model: &'static str,
    pub supports_images: bool,
}

/// Trait for platform-specific test setup
pub trait PlatformTestSetup {
    fn get_config() -> PlatformConfig;

    /// Create a handler pointed at the mock server
    fn create_handler(base_url: &str) -> Box<dyn PlatformHandler>;

    /// Create a handler pointed at the mock server with a short timeout
    fn create_handler_with_timeout(
        base_url: &str,
        timeout: std::time::Duration,
    ) -> Box<dyn PlatformHandler>;
}

/// Load test fixture from file
pub fn load_fixture(filename: &str) -> String {
    let path = format!(
        "{}/tests/cross_platform/fixtures/{filename}",
        env!("CARGO_MANIFEST_DIR")
    );
    std::fs::read_to_string(&path).unwrap_or_else(|_| panic!("Failed to load test fixture: {path}"))
}

/// A 200 response carrying an event stream fixture
pub fn sse_response(fixture: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_raw(load_fixture(fixture), "text/event-stream")
        .insert_header("cache-control", "no-cache")
}

/// Install a test subscriber so `RUST_LOG=modelbridge=debug` shows library events.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
