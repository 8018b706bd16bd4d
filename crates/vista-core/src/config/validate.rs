//! Configuration validation with range checks.

use crate::cost::Resolution;
use crate::error::ConfigError;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if Resolution::from_pixels(self.run.resolution).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "run.resolution must be 512, 1024 or 2048 (got {})",
                self.run.resolution
            )));
        }
        if self.current_tier().is_none() {
            return Err(ConfigError::ValidationError(format!(
                "run.tier '{}' is not defined under [tiers]",
                self.run.tier
            )));
        }
        if let Some((name, _)) = self.tiers.iter().find(|(_, limits)| limits.rpm == 0) {
            return Err(ConfigError::ValidationError(format!(
                "tiers.\"{name}\".rpm must be > 0"
            )));
        }
        if self.limits.request_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "limits.request_timeout_ms must be > 0".into(),
            ));
        }
        if self.captions.max_tokens == 0 {
            return Err(ConfigError::ValidationError(
                "captions.max_tokens must be > 0".into(),
            ));
        }
        if self.pricing.input_per_token < 0.0 || self.pricing.output_per_token < 0.0 {
            return Err(ConfigError::ValidationError(
                "pricing values must not be negative".into(),
            ));
        }
        Ok(())
    }
}
