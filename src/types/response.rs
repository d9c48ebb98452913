use serde::{Deserialize, Serialize};

/// Token usage reported by the platform.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl Usage {
    /// Usage with `total_tokens = prompt_tokens + completion_tokens`.
    pub fn new(prompt_tokens: u32, completion_tokens: u32) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }

    /// Fill in a missing total from its parts.
    pub(crate) fn normalized(self) -> Self {
        if self.total_tokens == 0 {
            Self::new(self.prompt_tokens, self.completion_tokens)
        } else {
            self
        }
    }
}

/// Reason why generation finished.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    ToolCalls,
    ContentFilter,
    /// A reason this library has no variant for.
    #[serde(untagged)]
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(reason: &str) -> Self {
        match reason {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            "tool_calls" => FinishReason::ToolCalls,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

/// Result of a text generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextGenerationResponse {
    /// Platform-assigned response id.
    pub id: String,
    pub generated_text: String,
    pub finish_reason: Option<FinishReason>,
    pub usage: Option<Usage>,
}

/// A generated image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base64: Option<String>,
    /// The prompt as rewritten by the platform, if it did so.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revised_prompt: Option<String>,
}

/// Result of an image generation request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ImageGenerationResponse {
    pub id: String,
    pub images: Vec<Image>,
}

/// One embedding vector, matched to its input by `index`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Embedding {
    pub index: usize,
    pub embedding: Vec<f32>,
}

/// Token usage of an embedding request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmbeddingUsage {
    pub prompt_tokens: u32,
    pub total_tokens: u32,
}

/// Result of an embedding request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmbeddingResponse {
    pub id: String,
    pub embeddings: Vec<Embedding>,
    pub usage: Option<EmbeddingUsage>,
}
