//! Test doubles shared by unit tests across the crate.

use async_trait::async_trait;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::error::CaptionError;
use crate::llm::{CaptionProvider, CaptionRequest, CaptionResponse};
use crate::types::TokenUsage;

type ResponseFn =
    Box<dyn Fn(&CaptionRequest, u32) -> Result<CaptionResponse, CaptionError> + Send + Sync>;
type DelayFn = Box<dyn Fn(&CaptionRequest) -> Duration + Send + Sync>;

/// A configurable mock provider.
///
/// Each call invokes the response factory with the request and the current
/// call index, so tests can script per-source or per-attempt behavior.
pub(crate) struct MockProvider {
    response_fn: ResponseFn,
    /// How many times `caption` was called
    call_count: Arc<AtomicU32>,
    /// Optional delay before returning
    delay: Option<DelayFn>,
    /// (in_flight, max_concurrent)
    in_flight: (Arc<AtomicU32>, Arc<AtomicU32>),
}

impl MockProvider {
    pub(crate) const USAGE: TokenUsage = TokenUsage {
        prompt_tokens: 100,
        completion_tokens: 20,
        total_tokens: 120,
    };

    pub(crate) fn new(
        response_fn: impl Fn(&CaptionRequest, u32) -> Result<CaptionResponse, CaptionError>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            response_fn: Box::new(response_fn),
            call_count: Arc::new(AtomicU32::new(0)),
            delay: None,
            in_flight: (Arc::new(AtomicU32::new(0)), Arc::new(AtomicU32::new(0))),
        }
    }

    pub(crate) fn success(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_, _| Ok(response(&text)))
    }

    pub(crate) fn failing(status_code: Option<u16>, message: &str) -> Self {
        let message = message.to_string();
        Self::new(move |_, _| {
            Err(CaptionError::Api {
                message: message.clone(),
                status_code,
            })
        })
    }

    /// First call returns an error, subsequent calls succeed.
    pub(crate) fn fail_then_succeed(
        status_code: Option<u16>,
        error_msg: &str,
        success_text: &str,
    ) -> Self {
        let error_msg = error_msg.to_string();
        let success_text = success_text.to_string();
        Self::new(move |_, idx| {
            if idx == 0 {
                Err(CaptionError::Api {
                    message: error_msg.clone(),
                    status_code,
                })
            } else {
                Ok(response(&success_text))
            }
        })
    }

    /// Succeeds with `caption of <origin>` unless the origin contains "fail".
    pub(crate) fn by_origin() -> Self {
        Self::new(|request, _| {
            let origin = &request.source.origin;
            if origin.contains("fail") {
                Err(CaptionError::Api {
                    message: format!("HTTP 400: cannot fetch {origin}"),
                    status_code: Some(400),
                })
            } else {
                Ok(response(&format!("caption of {origin}")))
            }
        })
    }

    pub(crate) fn with_delay(self, delay: Duration) -> Self {
        self.with_delay_fn(move |_| delay)
    }

    /// Per-request delay, e.g. to make later sources finish first.
    pub(crate) fn with_delay_fn(
        mut self,
        delay: impl Fn(&CaptionRequest) -> Duration + Send + Sync + 'static,
    ) -> Self {
        self.delay = Some(Box::new(delay));
        self
    }

    pub(crate) fn call_count_handle(&self) -> Arc<AtomicU32> {
        self.call_count.clone()
    }

    pub(crate) fn max_concurrent_handle(&self) -> Arc<AtomicU32> {
        self.in_flight.1.clone()
    }
}

pub(crate) fn response(text: &str) -> CaptionResponse {
    CaptionResponse {
        text: text.to_string(),
        model: "mock-v1".to_string(),
        usage: MockProvider::USAGE,
        latency_ms: 10,
    }
}

#[async_trait]
impl CaptionProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    async fn caption(&self, request: &CaptionRequest) -> Result<CaptionResponse, CaptionError> {
        let idx = self.call_count.fetch_add(1, Ordering::SeqCst);
        let (in_flight, max_concurrent) = &self.in_flight;
        let current = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        max_concurrent.fetch_max(current, Ordering::SeqCst);
        if let Some(delay) = &self.delay {
            tokio::time::sleep(delay(request)).await;
        }
        let result = (self.response_fn)(request, idx);
        in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}
