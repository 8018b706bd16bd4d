//! Core data types for the captioning pipeline.
//!
//! Sources flow in as [`ImageSource`]s, each dispatch yields one
//! [`CaptionResult`], and a run is governed by one immutable
//! [`RunConfiguration`].

use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::config::{Config, PricingConfig};
use crate::cost::Resolution;
use crate::error::ConfigError;
use crate::tier::TierLimits;

/// URL schemes that mark a source as remote.
pub const REMOTE_SCHEMES: [&str; 3] = ["http://", "https://", "ftp://"];

/// Fallback stem when a source has no usable file name (e.g. `https://host/`).
const FALLBACK_STEM: &str = "image";

/// Whether a source is fetched by the API or read from disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SourceKind {
    Remote,
    Local,
}

/// A single input item, exactly as the user supplied it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageSource {
    /// Raw input string (URL or filesystem path)
    pub origin: String,
    /// Classification derived from `origin`
    pub kind: SourceKind,
}

impl ImageSource {
    /// Classify a raw input string.
    pub fn parse(origin: impl Into<String>) -> Self {
        let origin = origin.into();
        let kind = if is_url(&origin) {
            SourceKind::Remote
        } else {
            SourceKind::Local
        };
        Self { origin, kind }
    }

    pub fn is_remote(&self) -> bool {
        self.kind == SourceKind::Remote
    }

    /// Filesystem path for local sources.
    pub fn local_path(&self) -> Option<&Path> {
        match self.kind {
            SourceKind::Local => Some(Path::new(&self.origin)),
            SourceKind::Remote => None,
        }
    }

    /// Last path segment of the origin, undecoded. Used in failure reports.
    pub fn file_name(&self) -> &str {
        let trimmed = match self.kind {
            SourceKind::Remote => strip_query(&self.origin),
            SourceKind::Local => &self.origin,
        };
        trimmed
            .rsplit(|c: char| c == '/' || std::path::is_separator(c))
            .next()
            .unwrap_or(trimmed)
    }

    /// Name used for caption files: percent-decoded file name without its
    /// final extension.
    pub fn stem(&self) -> String {
        let name = self.file_name();
        let decoded = urlencoding::decode(name)
            .map(|s| s.into_owned())
            .unwrap_or_else(|_| name.to_string());
        let stem = strip_extension(&decoded);
        if stem.is_empty() {
            FALLBACK_STEM.to_string()
        } else {
            stem.to_string()
        }
    }

    /// `<dir of source>/<stem>.txt` for local sources.
    pub fn sibling_caption_path(&self) -> Option<PathBuf> {
        let path = self.local_path()?;
        let dir = path.parent().unwrap_or_else(|| Path::new(""));
        Some(dir.join(format!("{}.txt", self.stem())))
    }
}

impl std::fmt::Display for ImageSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.origin)
    }
}

/// Whether the string starts with a recognized remote scheme.
pub fn is_url(origin: &str) -> bool {
    REMOTE_SCHEMES.iter().any(|scheme| origin.starts_with(scheme))
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Drop the final extension; names made only of leading dots keep theirs
/// (`.hidden` stays `.hidden`, `a.tar.gz` becomes `a.tar`).
fn strip_extension(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if name[..idx].chars().any(|c| c != '.') => &name[..idx],
        _ => name,
    }
}

/// Token counters reported by the API for one call, or summed over a run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, rhs: Self) {
        self.prompt_tokens += rhs.prompt_tokens;
        self.completion_tokens += rhs.completion_tokens;
        self.total_tokens += rhs.total_tokens;
    }
}

/// Outcome of one captioning request. Exactly one variant is populated.
#[derive(Debug, Clone, PartialEq)]
pub enum CaptionOutcome {
    Success { caption: String, usage: TokenUsage },
    /// `usage` is non-zero when the API answered and billed the call but
    /// the answer was rejected
    Failure { error: String, usage: TokenUsage },
}

/// A source paired with its outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionResult {
    pub source: ImageSource,
    pub outcome: CaptionOutcome,
}

impl CaptionResult {
    pub fn success(source: ImageSource, caption: String, usage: TokenUsage) -> Self {
        Self {
            source,
            outcome: CaptionOutcome::Success { caption, usage },
        }
    }

    pub fn failure(source: ImageSource, error: impl Into<String>) -> Self {
        Self::billed_failure(source, error, TokenUsage::default())
    }

    /// A failure for a call that still consumed tokens.
    pub fn billed_failure(
        source: ImageSource,
        error: impl Into<String>,
        usage: TokenUsage,
    ) -> Self {
        Self {
            source,
            outcome: CaptionOutcome::Failure {
                error: error.into(),
                usage,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self.outcome, CaptionOutcome::Success { .. })
    }
}

/// How requests are dispatched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConcurrencyMode {
    /// One in-flight request at a time, in input order
    Sequential,
    /// A pool of this many workers, results retired in submission order
    BoundedParallel { workers: usize },
}

/// Where and how captions are persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePolicy {
    pub save_individual: bool,
    pub save_next_to_source: bool,
    pub overwrite: bool,
}

impl WritePolicy {
    /// Apply the flag dependencies: "next to source" requires individual
    /// files, and overwrite only matters for files next to the source.
    pub fn normalized(self) -> Self {
        let save_next_to_source = self.save_individual && self.save_next_to_source;
        Self {
            save_individual: self.save_individual,
            save_next_to_source,
            overwrite: self.overwrite || !save_next_to_source,
        }
    }

    /// Whether existing sibling captions cause a local source to be skipped.
    pub fn skips_existing(&self) -> bool {
        self.save_next_to_source && !self.overwrite
    }
}

impl Default for WritePolicy {
    fn default() -> Self {
        Self {
            save_individual: true,
            save_next_to_source: false,
            overwrite: true,
        }
    }
}

/// Immutable snapshot of policy choices for one run.
#[derive(Debug, Clone)]
pub struct RunConfiguration {
    pub mode: ConcurrencyMode,
    pub resolution: Resolution,
    pub tier: TierLimits,
    pub write: WritePolicy,
    /// Breaker threshold; zero or negative disables it
    pub max_consecutive_failures: i32,
    pub request_timeout: Duration,
    pub retry_attempts: u32,
    pub retry_delay_ms: u64,
    pub max_tokens: u32,
    pub error_patterns: Vec<String>,
    pub pricing: PricingConfig,
}

impl RunConfiguration {
    /// Build the run snapshot from loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let tier = *config.current_tier().ok_or_else(|| {
            ConfigError::ValidationError(format!("Unknown tier '{}'", config.run.tier))
        })?;
        let resolution = Resolution::from_pixels(config.run.resolution).ok_or_else(|| {
            ConfigError::ValidationError(format!(
                "Unsupported resolution {}",
                config.run.resolution
            ))
        })?;
        let mode = if config.run.batch {
            ConcurrencyMode::BoundedParallel {
                workers: tier.max_workers(),
            }
        } else {
            ConcurrencyMode::Sequential
        };
        let write = WritePolicy {
            save_individual: config.run.save_individual,
            save_next_to_source: config.run.save_local,
            overwrite: config.run.overwrite,
        }
        .normalized();

        Ok(Self {
            mode,
            resolution,
            tier,
            write,
            max_consecutive_failures: config.run.max_consecutive_errors,
            request_timeout: Duration::from_millis(config.limits.request_timeout_ms),
            retry_attempts: config.retry.attempts,
            retry_delay_ms: config.retry.delay_ms,
            max_tokens: config.captions.max_tokens,
            error_patterns: config.captions.error_patterns.clone(),
            pricing: config.pricing,
        })
    }

    /// Breaker threshold, if enabled.
    pub fn breaker_threshold(&self) -> Option<u32> {
        u32::try_from(self.max_consecutive_failures)
            .ok()
            .filter(|&t| t > 0)
    }
}

impl Default for RunConfiguration {
    fn default() -> Self {
        let config = Config::default();
        Self {
            mode: ConcurrencyMode::Sequential,
            resolution: Resolution::Mid,
            tier: TierLimits::new(3, 200, 40_000, 0),
            write: WritePolicy::default(),
            max_consecutive_failures: config.run.max_consecutive_errors,
            request_timeout: Duration::from_millis(config.limits.request_timeout_ms),
            retry_attempts: config.retry.attempts,
            retry_delay_ms: config.retry.delay_ms,
            max_tokens: config.captions.max_tokens,
            error_patterns: config.captions.error_patterns,
            pricing: config.pricing,
        }
    }
}
