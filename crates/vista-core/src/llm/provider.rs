//! Caption provider trait and request/response types.

use async_trait::async_trait;

use crate::cost::Resolution;
use crate::error::CaptionError;
use crate::pipeline::encode::EncodedImage;
use crate::types::{ImageSource, TokenUsage};

/// How the image reaches the model.
#[derive(Debug, Clone)]
pub enum ImageReference {
    /// The API fetches the image itself
    Url(String),
    /// Image bytes embedded in the request
    Inline(EncodedImage),
}

impl ImageReference {
    /// URL to put in the `image_url` content part.
    pub fn url(&self) -> String {
        match self {
            Self::Url(url) => url.clone(),
            Self::Inline(image) => image.data_url(),
        }
    }
}

/// One captioning request, built just before dispatch.
#[derive(Debug, Clone)]
pub struct CaptionRequest {
    /// Source this request was built from
    pub source: ImageSource,
    /// Instruction text sent alongside the image
    pub instruction: String,
    /// Remote URL or encoded payload
    pub image: ImageReference,
    /// Bound the payload was resized to (local sources only)
    pub resolution: Resolution,
    /// Output token budget
    pub max_tokens: u32,
}

/// The response from a captioning call.
#[derive(Debug, Clone)]
pub struct CaptionResponse {
    /// Generated caption, trimmed
    pub text: String,
    /// Model identifier used
    pub model: String,
    /// Token counters reported by the API
    pub usage: TokenUsage,
    /// Round-trip latency in milliseconds
    pub latency_ms: u64,
}

/// Trait that all captioning backends implement.
///
/// Uses `async_trait` because native async fn in trait is not object-safe
/// (we need `Arc<dyn CaptionProvider>` shared across workers).
#[async_trait]
pub trait CaptionProvider: Send + Sync {
    /// Provider name for logging.
    fn name(&self) -> &str;

    /// Generate a caption for the given request.
    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, CaptionError>;
}

/// Resolve `${ENV_VAR}` references in config strings.
pub fn resolve_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        std::env::var(var_name).ok().filter(|v| !v.is_empty())
    } else if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
