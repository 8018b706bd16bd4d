//! Sub-configuration structs with their defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Root folder for dated run folders
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("./output"),
        }
    }
}

/// Defaults for a captioning run, overridable per invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RunDefaults {
    /// Longest-edge bound for local images (512, 1024 or 2048)
    pub resolution: u32,

    /// Name of the rate-limit tier (must exist under `[tiers]`)
    pub tier: String,

    /// Dispatch requests concurrently instead of one at a time
    pub batch: bool,

    /// One caption file per image instead of a consolidated `captions.txt`
    pub save_individual: bool,

    /// Write caption files next to local sources
    pub save_local: bool,

    /// Overwrite caption files that already exist next to local sources
    pub overwrite: bool,

    /// Abort after this many back-to-back failures; 0 or negative disables
    pub max_consecutive_errors: i32,

    /// Instruction used by the previous run
    pub last_prompt: String,
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            resolution: 1024,
            tier: "Free".to_string(),
            batch: false,
            save_individual: true,
            save_local: false,
            overwrite: true,
            max_consecutive_errors: 5,
            last_prompt: String::new(),
        }
    }
}

/// Request limits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Per-request timeout for the captioning call, in milliseconds
    pub request_timeout_ms: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: 60_000,
        }
    }
}

/// Retry policy for transient API failures.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    pub attempts: u32,

    /// Base backoff delay in milliseconds
    pub delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 2,
            delay_ms: 1000,
        }
    }
}

/// Per-token prices (USD) for the run report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct PricingConfig {
    /// Price of one prompt token
    pub input_per_token: f64,

    /// Price of one completion token
    pub output_per_token: f64,
}

impl Default for PricingConfig {
    fn default() -> Self {
        // gpt-4o-mini: $0.150 / 1M input, $0.600 / 1M output
        Self {
            input_per_token: 0.000_000_15,
            output_per_token: 0.000_000_60,
        }
    }
}

/// OpenAI-compatible chat completions endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// Full chat completions URL
    pub endpoint: String,

    /// Model name
    pub model: String,

    /// API key (supports ${ENV_VAR} syntax)
    pub api_key: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            api_key: "${OPENAI_API_KEY}".to_string(),
        }
    }
}

/// Caption request/response settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionsConfig {
    /// Output token budget per caption
    pub max_tokens: u32,

    /// Captions starting with one of these are treated as API failures
    pub error_patterns: Vec<String>,
}

impl Default for CaptionsConfig {
    fn default() -> Self {
        Self {
            max_tokens: 300,
            error_patterns: default_error_patterns(),
        }
    }
}

/// Refusal and error openers the model returns with HTTP 200.
pub fn default_error_patterns() -> Vec<String> {
    [
        "I'm sorry",
        "I am sorry",
        "I cannot",
        "I can't",
        "I'm unable",
        "I am unable",
        "Error:",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: error, warn, info, debug, trace
    pub level: String,

    /// Log format: "pretty" or "json"
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
