use crate::{
    EmbeddingRequest, EmbeddingResponse, Error, ImageGenerationRequest, ImageGenerationResponse,
    InvokeContext, TextGenerationRequest, TextGenerationResponse, TextStream,
};

/// A handler speaking one platform's wire protocol.
///
/// Every invocation issues exactly one HTTP request. Operations a platform
/// does not offer return [`Error::Unsupported`], so handlers can be added
/// before they cover every capability.
#[async_trait::async_trait]
pub trait PlatformHandler: Send + Sync + 'static {
    /// Registered name of the platform.
    fn provider(&self) -> &str;

    /// Generate text. When `request.stream` is set the response is streamed
    /// and aggregated before returning.
    async fn text_generation(
        &self,
        request: &TextGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<TextGenerationResponse, Error>;

    /// Generate text as a live chunk stream, regardless of `request.stream`.
    async fn text_generation_stream(
        &self,
        _request: &TextGenerationRequest,
        _ctx: &InvokeContext,
    ) -> Result<TextStream, Error> {
        Err(Error::unsupported(self.provider(), "streaming text generation"))
    }

    async fn image_generation(
        &self,
        _request: &ImageGenerationRequest,
        _ctx: &InvokeContext,
    ) -> Result<ImageGenerationResponse, Error> {
        Err(Error::unsupported(self.provider(), "image generation"))
    }

    async fn embedding(
        &self,
        _request: &EmbeddingRequest,
        _ctx: &InvokeContext,
    ) -> Result<EmbeddingResponse, Error> {
        Err(Error::unsupported(self.provider(), "embedding"))
    }
}
