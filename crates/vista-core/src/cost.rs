//! Pre-flight cost estimation.
//!
//! A flat per-image vision cost plus a rough token model for the prompt and
//! the expected response, scaled by an empirical per-resolution factor. The
//! constants are calibrated against observed billing and must stay as they are.

use serde::{Deserialize, Serialize};

use crate::types::ImageSource;

/// Characters per token in the rough input-token approximation.
const CHARS_PER_TOKEN: f64 = 4.0;

/// Assumed completion tokens per image.
const AVERAGE_OUTPUT_TOKENS_PER_IMAGE: f64 = 120.0;

/// USD per 1000 input tokens.
const COST_PER_1K_INPUT_TOKENS: f64 = 0.01;

/// USD per 1000 output tokens.
const COST_PER_1K_OUTPUT_TOKENS: f64 = 0.03;

/// Longest-edge bound applied to local images before upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Resolution {
    /// 512 px
    Low,
    /// 1024 px
    Mid,
    /// 2048 px
    High,
}

impl Resolution {
    /// Parse a pixel bound; only 512, 1024 and 2048 are supported.
    pub fn from_pixels(pixels: u32) -> Option<Self> {
        match pixels {
            512 => Some(Self::Low),
            1024 => Some(Self::Mid),
            2048 => Some(Self::High),
            _ => None,
        }
    }

    pub fn pixels(self) -> u32 {
        match self {
            Self::Low => 512,
            Self::Mid => 1024,
            Self::High => 2048,
        }
    }

    /// Flat vision cost per image.
    pub fn base_cost_per_image(self) -> f64 {
        match self {
            Self::Low => 0.00138,
            Self::Mid => 0.00393,
            Self::High => 0.00563,
        }
    }

    /// Correction factor applied to the whole estimate.
    pub fn correction_factor(self) -> f64 {
        match self {
            Self::Low => 0.3,
            Self::Mid => 0.45,
            Self::High => 0.55,
        }
    }
}

impl std::fmt::Display for Resolution {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pixels())
    }
}

/// Estimate the USD cost of captioning `count` images.
///
/// Input tokens are approximated as a quarter of the character count of the
/// instruction followed by the space-joined sources. Returns 0 when `count`
/// is 0.
pub fn estimate_cost(
    count: usize,
    resolution: Resolution,
    instruction: &str,
    sources: &[ImageSource],
) -> f64 {
    if count == 0 {
        return 0.0;
    }
    let n = count as f64;

    let vision_cost = n * resolution.base_cost_per_image();

    let input_chars = instruction.chars().count()
        + sources.iter().map(|s| s.origin.chars().count()).sum::<usize>()
        + sources.len().saturating_sub(1);
    let input_tokens = input_chars as f64 / CHARS_PER_TOKEN;
    let output_tokens = AVERAGE_OUTPUT_TOKENS_PER_IMAGE * n;

    let input_cost = input_tokens / 1000.0 * COST_PER_1K_INPUT_TOKENS;
    let output_cost = output_tokens / 1000.0 * COST_PER_1K_OUTPUT_TOKENS;

    (vision_cost + input_cost + output_cost) * resolution.correction_factor()
}
