use super::types::{
    ChatCompletionChunk, ChatMessage, ChatRequest, ChatResponse, EmbeddingsRequest,
    EmbeddingsResponse, ErrorEnvelope, ImagesRequest, ImagesResponse, StreamOptions,
};
use crate::accumulator::NO_RESULT_ENTRIES;
use crate::config::API_KEY_CREDENTIAL;
use crate::provider::PlatformHandler;
use crate::streaming::ChunkStream;
use crate::types::{
    Embedding, EmbeddingRequest, EmbeddingResponse, EmbeddingUsage, FinishReason, Image,
    ImageGenerationRequest, ImageGenerationResponse, PlatformParams, TextGenerationRequest,
    TextGenerationResponse, Usage,
};
use crate::{Error, InvokeContext, ProviderConfig, TextStream};
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;

/// Override key: request a usage snapshot at the end of a stream (bool).
pub const PARAM_INCLUDE_USAGE: &str = "stream_options_include_usage";

/// Volcengine-prefixed spelling of [`PARAM_INCLUDE_USAGE`], also accepted.
pub const PARAM_INCLUDE_USAGE_VOLC: &str = "volc_stream_options_include_usage";

/// Override key: end-user identifier forwarded to the platform (string).
pub const PARAM_USER: &str = "user";

/// Static description of a platform speaking the chat completions protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlatformProfile {
    /// Registered platform name.
    pub name: &'static str,
    /// Endpoint root; operation paths are appended to it.
    pub base_url: &'static str,
    pub default_timeout: Duration,
    pub supports_images: bool,
    pub supports_embeddings: bool,
}

/// Handler for platforms exposing an OpenAI-compatible chat completions API.
pub struct ChatCompletionsHandler {
    profile: PlatformProfile,
    client: Client,
    api_key: String,
    base_url: String,
}

impl ChatCompletionsHandler {
    /// Create a handler for `profile`.
    ///
    /// Fails with a configuration error when the `apiKey` credential is
    /// missing or empty.
    pub fn new(profile: PlatformProfile, config: &ProviderConfig) -> Result<Self, Error> {
        let api_key = config.get_credential(API_KEY_CREDENTIAL).ok_or_else(|| {
            Error::config(format!(
                "{} handler: API key not found or empty in credentials",
                profile.name
            ))
        })?;

        let timeout = config.options.timeout.unwrap_or(profile.default_timeout);
        let client = Client::builder().timeout(timeout).build()?;

        let base_url = config
            .options
            .base_url
            .as_deref()
            .unwrap_or(profile.base_url)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            profile,
            client,
            api_key: api_key.to_string(),
            base_url,
        })
    }

    pub fn profile(&self) -> &PlatformProfile {
        &self.profile
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn validate_text_request(request: &TextGenerationRequest) -> Result<(), Error> {
        if request.model.trim().is_empty() {
            return Err(Error::invalid_request("text generation requires a model"));
        }
        if request.prompt.is_empty() {
            return Err(Error::invalid_request("text generation requires a prompt"));
        }
        Ok(())
    }

    /// Convert a text generation request to the chat completions format.
    fn convert_request(request: &TextGenerationRequest, stream: bool) -> ChatRequest {
        let include_usage = stream
            && [PARAM_INCLUDE_USAGE, PARAM_INCLUDE_USAGE_VOLC].iter().any(|key| {
                request
                    .platform_params
                    .get(*key)
                    .and_then(serde_json::Value::as_bool)
                    .unwrap_or(false)
            });

        ChatRequest {
            model: request.model.clone(),
            // The prompt is sent as a single user message
            messages: vec![ChatMessage::user(request.prompt.clone())],
            stream: stream.then_some(true),
            stream_options: include_usage.then_some(StreamOptions {
                include_usage: true,
            }),
            user: user_param(&request.platform_params),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            top_p: request.top_p,
            stop: request.stop_sequences.clone(),
        }
    }

    /// POST `body` to `path`, returning the response once its status is known to be 2xx.
    async fn post<T: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &T,
        accept: &str,
        ctx: &InvokeContext,
    ) -> Result<reqwest::Response, Error> {
        let url = format!("{}{}", self.base_url, path);
        tracing::debug!(
            provider = self.profile.name,
            request_id = %ctx.request_id(),
            %url,
            accept,
            "sending request"
        );

        let send = async {
            self.client
                .post(&url)
                .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
                .header(CONTENT_TYPE, "application/json")
                .header(ACCEPT, accept)
                .json(body)
                .send()
                .await
                .map_err(Error::from)
        };
        let response = ctx.guard(send).await?;

        if !response.status().is_success() {
            return Err(self.error_from_response(response, ctx).await);
        }

        Ok(response)
    }

    /// Build an error from a non-2xx response: structured if the body holds an
    /// error envelope, otherwise the raw body.
    async fn error_from_response(&self, response: reqwest::Response, ctx: &InvokeContext) -> Error {
        let status = response.status().as_u16();
        let body = match ctx.guard(async { response.text().await.map_err(Error::from) }).await {
            Ok(body) => body,
            Err(e) => return e,
        };

        tracing::warn!(
            provider = self.profile.name,
            request_id = %ctx.request_id(),
            status,
            "platform returned an error status"
        );

        // Both streaming and non-streaming errors use the same `error` object
        if let Ok(ErrorEnvelope { error: Some(error) }) = serde_json::from_str(&body) {
            return error.into_error(self.profile.name, Some(status));
        }

        Error::Api {
            provider: self.profile.name.to_string(),
            status: Some(status),
            code: None,
            error_type: None,
            message: body,
        }
    }

    /// Read the whole body and decode it as JSON.
    async fn read_json<T: DeserializeOwned>(
        &self,
        response: reqwest::Response,
        ctx: &InvokeContext,
    ) -> Result<T, Error> {
        let body = ctx
            .guard(async { response.text().await.map_err(Error::from) })
            .await?;
        serde_json::from_str(&body).map_err(|e| Error::decode(self.profile.name, &body, e))
    }

    fn no_result_entries(&self) -> Error {
        Error::provider(self.profile.name, NO_RESULT_ENTRIES)
    }
}

fn user_param(params: &PlatformParams) -> Option<String> {
    params
        .get(PARAM_USER)
        .and_then(serde_json::Value::as_str)
        .map(str::to_string)
}

#[async_trait::async_trait]
impl PlatformHandler for ChatCompletionsHandler {
    fn provider(&self) -> &str {
        self.profile.name
    }

    async fn text_generation(
        &self,
        request: &TextGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<TextGenerationResponse, Error> {
        if request.stream {
            return self
                .text_generation_stream(request, ctx)
                .await?
                .response()
                .await;
        }

        Self::validate_text_request(request)?;
        let chat_request = Self::convert_request(request, false);
        let response = self
            .post("/chat/completions", &chat_request, "application/json", ctx)
            .await?;
        let chat: ChatResponse = self.read_json(response, ctx).await?;

        if let Some(error) = chat.error {
            return Err(error.into_error(self.profile.name, None));
        }

        let choice = chat
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| self.no_result_entries())?;

        Ok(TextGenerationResponse {
            id: chat.id.unwrap_or_default(),
            generated_text: choice.message.content.unwrap_or_default(),
            finish_reason: choice
                .finish_reason
                .filter(|reason| !reason.is_empty())
                .map(|reason| FinishReason::from(reason.as_str())),
            usage: chat.usage.map(Usage::from),
        })
    }

    async fn text_generation_stream(
        &self,
        request: &TextGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<TextStream, Error> {
        Self::validate_text_request(request)?;
        let chat_request = Self::convert_request(request, true);
        let response = self
            .post("/chat/completions", &chat_request, "text/event-stream", ctx)
            .await?;

        let chunks = ChunkStream::<_, ChatCompletionChunk>::new(
            Box::pin(response.bytes_stream()),
            self.profile.name,
        )
        .with_cancellation(ctx.cancellation().clone());

        Ok(TextStream::from_stream(self.profile.name, chunks))
    }

    async fn image_generation(
        &self,
        request: &ImageGenerationRequest,
        ctx: &InvokeContext,
    ) -> Result<ImageGenerationResponse, Error> {
        if !self.profile.supports_images {
            return Err(Error::unsupported(self.profile.name, "image generation"));
        }
        if request.model.trim().is_empty() || request.prompt.is_empty() {
            return Err(Error::invalid_request(
                "image generation requires a model and a prompt",
            ));
        }

        let images_request = ImagesRequest {
            model: request.model.clone(),
            prompt: request.prompt.clone(),
            n: request.n,
            size: request.size.clone(),
            quality: request.quality.clone(),
            style: request.style.clone(),
            user: user_param(&request.platform_params),
        };
        let response = self
            .post("/images/generations", &images_request, "application/json", ctx)
            .await?;
        let images: ImagesResponse = self.read_json(response, ctx).await?;

        if let Some(error) = images.error {
            return Err(error.into_error(self.profile.name, None));
        }
        if images.data.is_empty() {
            return Err(self.no_result_entries());
        }

        Ok(ImageGenerationResponse {
            id: images
                .id
                .unwrap_or_else(|| ctx.request_id().to_string()),
            images: images
                .data
                .into_iter()
                .map(|image| Image {
                    url: image.url,
                    base64: image.b64_json,
                    revised_prompt: image.revised_prompt,
                })
                .collect(),
        })
    }

    async fn embedding(
        &self,
        request: &EmbeddingRequest,
        ctx: &InvokeContext,
    ) -> Result<EmbeddingResponse, Error> {
        if !self.profile.supports_embeddings {
            return Err(Error::unsupported(self.profile.name, "embedding"));
        }
        if request.model.trim().is_empty() {
            return Err(Error::invalid_request("embedding requires a model"));
        }
        if request.input.is_empty() {
            return Err(Error::invalid_request("embedding requires at least one input"));
        }

        let embeddings_request = EmbeddingsRequest {
            model: request.model.clone(),
            input: request.input.clone(),
            encoding_format: request.encoding_format.clone(),
            user: user_param(&request.platform_params),
        };
        let response = self
            .post("/embeddings", &embeddings_request, "application/json", ctx)
            .await?;
        let embeddings: EmbeddingsResponse = self.read_json(response, ctx).await?;

        if let Some(error) = embeddings.error {
            return Err(error.into_error(self.profile.name, None));
        }
        if embeddings.data.is_empty() {
            return Err(self.no_result_entries());
        }

        let mut data: Vec<Embedding> = embeddings
            .data
            .into_iter()
            .map(|item| Embedding {
                index: item.index,
                embedding: item.embedding,
            })
            .collect();
        data.sort_by_key(|item| item.index);

        Ok(EmbeddingResponse {
            id: embeddings
                .id
                .unwrap_or_else(|| ctx.request_id().to_string()),
            embeddings: data,
            usage: embeddings.usage.map(|usage| EmbeddingUsage {
                prompt_tokens: usage.prompt_tokens,
                total_tokens: usage.total_tokens,
            }),
        })
    }
}
