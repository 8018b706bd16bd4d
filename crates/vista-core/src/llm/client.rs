//! Single-item captioning: prepare the payload, call the provider with a
//! deadline and retries, and turn the outcome into a [`CaptionResult`].
//!
//! Nothing in here returns an error to the caller. Every failure mode is
//! folded into [`CaptionOutcome::Failure`] so the orchestrator can count it.
//!
//! [`CaptionOutcome::Failure`]: crate::types::CaptionOutcome::Failure

use std::sync::Arc;
use std::time::Duration;

use super::provider::{CaptionProvider, CaptionRequest, CaptionResponse, ImageReference};
use super::retry;
use crate::cost::Resolution;
use crate::error::CaptionError;
use crate::pipeline::encode::ImageEncoder;
use crate::types::{CaptionResult, ImageSource, RunConfiguration};

/// Per-request behavior of the [`CaptionClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Deadline for a single provider call
    pub timeout: Duration,
    /// Extra attempts after the first, for transient errors only
    pub retry_attempts: u32,
    /// Base backoff delay in milliseconds
    pub retry_delay_ms: u64,
    /// Output token budget per request
    pub max_tokens: u32,
    /// Bound applied when encoding local images
    pub resolution: Resolution,
    /// Caption prefixes that mark an error-shaped response
    pub error_patterns: Vec<String>,
}

impl ClientOptions {
    pub fn from_run(run: &RunConfiguration) -> Self {
        Self {
            timeout: run.request_timeout,
            retry_attempts: run.retry_attempts,
            retry_delay_ms: run.retry_delay_ms,
            max_tokens: run.max_tokens,
            resolution: run.resolution,
            error_patterns: run.error_patterns.clone(),
        }
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self::from_run(&RunConfiguration::default())
    }
}

/// Captions one source at a time against a shared provider.
pub struct CaptionClient {
    provider: Arc<dyn CaptionProvider>,
    encoder: ImageEncoder,
    options: ClientOptions,
}

impl CaptionClient {
    pub fn new(provider: Arc<dyn CaptionProvider>, options: ClientOptions) -> Self {
        Self {
            provider,
            encoder: ImageEncoder::new(options.resolution),
            options,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Caption a single source. Never fails; errors become a failure outcome.
    ///
    /// A response rejected by the error-prefix check still carries the usage
    /// the API billed for it.
    pub async fn caption(&self, source: &ImageSource, instruction: &str) -> CaptionResult {
        let response = match self.request_caption(source, instruction).await {
            Ok(response) => response,
            Err(e) => {
                tracing::error!("Error processing {}: {}", source, e);
                return CaptionResult::failure(source.clone(), e.to_string());
            }
        };

        if let Err(e) = self.check_response(&response) {
            tracing::error!("Error processing {}: {}", source, e);
            return CaptionResult::billed_failure(source.clone(), e.to_string(), response.usage);
        }

        tracing::debug!(
            "Captioned {} in {}ms ({} tokens)",
            source,
            response.latency_ms,
            response.usage.total_tokens
        );
        CaptionResult::success(source.clone(), response.text, response.usage)
    }

    async fn request_caption(
        &self,
        source: &ImageSource,
        instruction: &str,
    ) -> Result<CaptionResponse, CaptionError> {
        let request = self.prepare(source, instruction).await?;
        self.call_with_retry(&request).await
    }

    /// Build the request: remote sources pass their URL through, local ones
    /// are downscaled and inlined.
    pub async fn prepare(
        &self,
        source: &ImageSource,
        instruction: &str,
    ) -> Result<CaptionRequest, CaptionError> {
        let image = match source.local_path() {
            None => ImageReference::Url(source.origin.clone()),
            Some(path) => {
                if !path.exists() {
                    return Err(CaptionError::NotFound(path.to_path_buf()));
                }
                ImageReference::Inline(self.encoder.encode(path).await?)
            }
        };

        Ok(CaptionRequest {
            source: source.clone(),
            instruction: instruction.to_string(),
            image,
            resolution: self.options.resolution,
            max_tokens: self.options.max_tokens,
        })
    }

    async fn call_with_retry(
        &self,
        request: &CaptionRequest,
    ) -> Result<CaptionResponse, CaptionError> {
        let timeout_ms = self.options.timeout.as_millis() as u64;
        let backoff = retry::Backoff::new(self.options.retry_delay_ms);
        let mut last_error = CaptionError::Timeout { timeout_ms };

        for attempt in 0..=self.options.retry_attempts {
            if attempt > 0 {
                let delay = backoff.delay(attempt);
                tracing::debug!(
                    "Retry {attempt}/{} for {} after {delay:?}",
                    self.options.retry_attempts,
                    request.source
                );
                tokio::time::sleep(delay).await;
            }

            match tokio::time::timeout(self.options.timeout, self.provider.caption(request)).await
            {
                Ok(Ok(response)) => return Ok(response),
                Ok(Err(e)) => {
                    let transient = retry::is_transient(&e);
                    last_error = e;
                    if !transient {
                        break;
                    }
                }
                Err(_) => {
                    last_error = CaptionError::Timeout { timeout_ms };
                }
            }
        }

        Err(last_error)
    }

    /// Reject captions that are really refusals or error text.
    fn check_response(&self, response: &CaptionResponse) -> Result<(), CaptionError> {
        let text = &response.text;
        if self
            .options
            .error_patterns
            .iter()
            .any(|prefix| !prefix.is_empty() && text.starts_with(prefix.as_str()))
        {
            return Err(CaptionError::api(format!(
                "Error-shaped response: {text}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use crate::types::{CaptionOutcome, TokenUsage};
    use std::sync::atomic::Ordering;

    fn options() -> ClientOptions {
        ClientOptions {
            timeout: Duration::from_secs(5),
            retry_attempts: 2,
            retry_delay_ms: 1,
            ..ClientOptions::default()
        }
    }

    fn client(provider: MockProvider, options: ClientOptions) -> CaptionClient {
        CaptionClient::new(Arc::new(provider), options)
    }

    #[tokio::test]
    async fn test_remote_success() {
        let provider = MockProvider::success("A lighthouse at dusk.");
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        let source = ImageSource::parse("https://x/lighthouse.jpg");
        let result = client.caption(&source, "Describe").await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        match result.outcome {
            CaptionOutcome::Success { caption, usage } => {
                assert_eq!(caption, "A lighthouse at dusk.");
                assert_eq!(usage, MockProvider::USAGE);
            }
            other => panic!("expected success, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_missing_local_file_is_not_found_without_api_call() {
        let provider = MockProvider::success("unused");
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        let source = ImageSource::parse("/nonexistent/ghost.png");
        let result = client.caption(&source, "Describe").await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        match result.outcome {
            CaptionOutcome::Failure { error, .. } => assert!(error.contains("File not found")),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_local_image_is_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tiny.png");
        image::DynamicImage::new_rgb8(8, 8).save(&path).unwrap();

        let client = client(MockProvider::success("ok"), options());
        let source = ImageSource::parse(path.to_string_lossy());
        let request = client.prepare(&source, "Describe").await.unwrap();

        assert!(matches!(request.image, ImageReference::Inline(_)));
        assert!(request.image.url().starts_with("data:image/jpeg;base64,"));
        assert_eq!(request.max_tokens, 300);
    }

    #[tokio::test]
    async fn test_undecodable_local_file_fails_without_api_call() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.jpg");
        std::fs::write(&path, b"not an image").unwrap();

        let provider = MockProvider::success("unused");
        let calls = provider.call_count_handle();
        let client = client(provider, options());
        let result = client
            .caption(&ImageSource::parse(path.to_string_lossy()), "Describe")
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert!(!result.is_success());
    }

    #[tokio::test]
    async fn test_error_shaped_response_is_failure() {
        let client = client(
            MockProvider::success("I'm sorry, I can't help with that."),
            options(),
        );
        let result = client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        match result.outcome {
            CaptionOutcome::Failure { error, usage } => {
                assert!(error.contains("I'm sorry, I can't help with that."));
                // The API billed the refusal
                assert_eq!(usage, MockProvider::USAGE);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_pattern_only_matches_prefix() {
        let client = client(
            MockProvider::success("A sign that reads \"I'm sorry\"."),
            options(),
        );
        let result = client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        assert!(result.is_success());
    }

    #[tokio::test]
    async fn test_retries_transient_error_then_succeeds() {
        let provider = MockProvider::fail_then_succeed(Some(503), "overloaded", "A dog.");
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        let result = client
            .caption(&ImageSource::parse("https://x/dog.jpg"), "Describe")
            .await;
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_does_not_retry_auth_error() {
        let provider = MockProvider::failing(Some(401), "unauthorized");
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        let result = client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        assert!(!result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_retries_connection_error() {
        let provider = MockProvider::new(|_, idx| {
            if idx < 2 {
                Err(CaptionError::Connection {
                    message: "error sending request: connection refused".to_string(),
                })
            } else {
                Ok(crate::testing::response("A harbor."))
            }
        });
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        let result = client
            .caption(&ImageSource::parse("https://x/harbor.jpg"), "Describe")
            .await;
        assert!(result.is_success());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_transport_failure_carries_no_usage() {
        let client = client(MockProvider::failing(Some(503), "overloaded"), options());
        let result = client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        match result.outcome {
            CaptionOutcome::Failure { usage, .. } => assert_eq!(usage, TokenUsage::default()),
            other => panic!("expected failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_retry_budget_is_respected() {
        let provider = MockProvider::failing(Some(500), "boom");
        let calls = provider.call_count_handle();
        let client = client(provider, options());

        client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_timeout_becomes_failure() {
        let provider = MockProvider::success("late").with_delay(Duration::from_millis(200));
        let client = client(
            provider,
            ClientOptions {
                timeout: Duration::from_millis(20),
                retry_attempts: 0,
                ..options()
            },
        );
        let result = client
            .caption(&ImageSource::parse("https://x/a.jpg"), "Describe")
            .await;
        match result.outcome {
            CaptionOutcome::Failure { error, .. } => assert!(error.contains("Timeout after 20ms")),
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
