//! When a failed captioning call is worth another attempt, and how long to
//! wait before it.
//!
//! Classification works on the error variant and HTTP status only. The
//! provider decides at the call site whether a failure happened before any
//! response arrived and reports it as [`CaptionError::Connection`].

use crate::error::CaptionError;
use std::time::Duration;

/// Longest wait between two attempts.
pub(crate) const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Whether the failure may go away on its own.
pub(crate) fn is_transient(error: &CaptionError) -> bool {
    match error {
        CaptionError::Timeout { .. } | CaptionError::Connection { .. } => true,
        CaptionError::Api {
            status_code: Some(code),
            ..
        } => is_transient_status(*code),
        _ => false,
    }
}

/// Rate limiting and server-side errors.
pub(crate) fn is_transient_status(code: u16) -> bool {
    code == 429 || (500..=599).contains(&code)
}

/// Exponential backoff schedule: `base`, `2 * base`, `4 * base`, ... capped
/// at [`MAX_BACKOFF`].
#[derive(Debug, Clone, Copy)]
pub(crate) struct Backoff {
    base_ms: u64,
}

impl Backoff {
    pub(crate) fn new(base_ms: u64) -> Self {
        Self { base_ms }
    }

    /// Wait before retry number `retry`, counting from 1.
    pub(crate) fn delay(&self, retry: u32) -> Duration {
        let factor = 2u64.saturating_pow(retry.saturating_sub(1));
        Duration::from_millis(self.base_ms.saturating_mul(factor)).min(MAX_BACKOFF)
    }
}
