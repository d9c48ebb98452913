//! Unified client over a single configured platform.

use crate::{
    EmbeddingRequest, EmbeddingResponse, Error, HandlerRegistry, ImageGenerationRequest,
    ImageGenerationResponse, InvokeContext, PlatformHandler, ProviderConfig,
    TextGenerationRequest, TextGenerationResponse, TextStream,
};

/// Characters of a prompt kept in log events.
const LOG_PREVIEW_CHARS: usize = 30;

/// A request of any supported kind, for generic dispatch via [`Client::invoke`].
#[derive(Debug, Clone, PartialEq)]
pub enum ModelRequest {
    TextGeneration(TextGenerationRequest),
    ImageGeneration(ImageGenerationRequest),
    Embedding(EmbeddingRequest),
}

/// The response matching a [`ModelRequest`] variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelResponse {
    TextGeneration(TextGenerationResponse),
    ImageGeneration(ImageGenerationResponse),
    Embedding(EmbeddingResponse),
}

impl From<TextGenerationRequest> for ModelRequest {
    fn from(request: TextGenerationRequest) -> Self {
        ModelRequest::TextGeneration(request)
    }
}

impl From<ImageGenerationRequest> for ModelRequest {
    fn from(request: ImageGenerationRequest) -> Self {
        ModelRequest::ImageGeneration(request)
    }
}

impl From<EmbeddingRequest> for ModelRequest {
    fn from(request: EmbeddingRequest) -> Self {
        ModelRequest::Embedding(request)
    }
}

/// Client bound to one platform handler.
///
/// ```no_run
/// use modelbridge::{Client, HandlerRegistry, InvokeContext, ProviderConfig, TextGenerationRequest};
///
/// # async fn run() -> Result<(), modelbridge::Error> {
/// let registry = HandlerRegistry::with_builtin_providers();
/// let client = Client::new(&ProviderConfig::from_env()?, &registry)?;
///
/// let request = TextGenerationRequest::new("doubao-1.5-pro-32k-250115", "Hello");
/// let response = client.text_generation(&request, &InvokeContext::new()).await?;
/// println!("{}", response.generated_text);
/// # Ok(())
/// # }
/// ```
pub struct Client {
    handler: Box<dyn PlatformHandler>,
}

impl Client {
    /// Resolve the handler named by `config.provider` from `registry`.
    pub fn new(config: &ProviderConfig, registry: &HandlerRegistry) -> Result<Self, Error> {
        tracing::info!(provider = %config.provider, "initializing client");

        match registry.resolve_config(config) {
            Ok(handler) => {
                tracing::info!(provider = %config.provider, "client initialized");
                Ok(Self { handler })
            }
            Err(e) => {
                tracing::error!(
                    provider = %config.provider,
                    kind = ?e.kind(),
                    error = %e,
                    "failed to create platform handler"
                );
                Err(e)
            }
        }
    }

    /// Wrap an already constructed handler.
    pub fn from_handler(handler: Box<dyn PlatformHandler>) -> Self {
        Self { handler }
    }

    /// Name of the platform this client talks to.
    pub fn provider(&self) -> &str {
        self.handler.provider()
    }

    pub async fn text_generation(
        &self,
        request: &TextGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<TextGenerationResponse, Error> {
        tracing::debug!(
            provider = self.provider(),
            request_id = %ctx.request_id(),
            model = %request.model,
            stream = request.stream,
            prompt = %truncate_for_log(&request.prompt, LOG_PREVIEW_CHARS),
            "executing text generation"
        );
        let result = self.handler.text_generation(request, ctx).await;
        self.log_failure("text generation", ctx, result)
    }

    /// Generate text as a live stream of chunks.
    pub async fn text_generation_stream(
        &self,
        request: &TextGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<TextStream, Error> {
        tracing::debug!(
            provider = self.provider(),
            request_id = %ctx.request_id(),
            model = %request.model,
            prompt = %truncate_for_log(&request.prompt, LOG_PREVIEW_CHARS),
            "executing streaming text generation"
        );
        let result = self.handler.text_generation_stream(request, ctx).await;
        self.log_failure("streaming text generation", ctx, result)
    }

    pub async fn image_generation(
        &self,
        request: &ImageGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<ImageGenerationResponse, Error> {
        tracing::debug!(
            provider = self.provider(),
            request_id = %ctx.request_id(),
            model = %request.model,
            prompt = %truncate_for_log(&request.prompt, LOG_PREVIEW_CHARS),
            "executing image generation"
        );
        let result = self.handler.image_generation(request, ctx).await;
        self.log_failure("image generation", ctx, result)
    }

    pub async fn embedding(
        &self,
        request: &EmbeddingRequest,
        ctx: &InvokeContext,
    ) -> Result<EmbeddingResponse, Error> {
        let first_input = request.input.first().map(String::as_str).unwrap_or_default();
        tracing::debug!(
            provider = self.provider(),
            request_id = %ctx.request_id(),
            model = %request.model,
            inputs = request.input.len(),
            first_input = %truncate_for_log(first_input, LOG_PREVIEW_CHARS),
            "executing embedding"
        );
        let result = self.handler.embedding(request, ctx).await;
        self.log_failure("embedding", ctx, result)
    }

    /// Dispatch a request of any kind to the matching operation.
    pub async fn invoke(
        &self,
        request: ModelRequest,
        ctx: &InvokeContext,
    ) -> Result<ModelResponse, Error> {
        match request {
            ModelRequest::TextGeneration(request) => self
                .text_generation(&request, ctx)
                .await
                .map(ModelResponse::TextGeneration),
            ModelRequest::ImageGeneration(request) => self
                .image_generation(&request, ctx)
                .await
                .map(ModelResponse::ImageGeneration),
            ModelRequest::Embedding(request) => self
                .embedding(&request, ctx)
                .await
                .map(ModelResponse::Embedding),
        }
    }

    fn log_failure<T>(
        &self,
        operation: &str,
        ctx: &InvokeContext,
        result: Result<T, Error>,
    ) -> Result<T, Error> {
        if let Err(e) = &result {
            tracing::warn!(
                provider = self.provider(),
                request_id = %ctx.request_id(),
                kind = ?e.kind(),
                error = %e,
                "{operation} failed"
            );
        }
        result
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("provider", &self.provider())
            .finish()
    }
}

/// Shorten `s` to at most `max_chars` characters, ending in "..." when cut.
fn truncate_for_log(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    let keep = max_chars.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
