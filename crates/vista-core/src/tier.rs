//! Rate-limit tiers.
//!
//! A tier is a named profile of API limits. The only limit the pipeline acts on
//! is requests-per-minute, which bounds the worker pool in parallel mode; the
//! rest are carried for display.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hard cap on parallel workers regardless of tier.
pub const MAX_PARALLEL_WORKERS: usize = 10;

/// API limits for one tier. A zero means "no limit published".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TierLimits {
    /// Requests per minute
    pub rpm: u32,
    /// Requests per day
    #[serde(default)]
    pub rpd: u32,
    /// Tokens per minute
    #[serde(default)]
    pub tpm: u64,
    /// Batch queue limit (tokens)
    #[serde(default)]
    pub batch_limit: u64,
}

impl TierLimits {
    pub const fn new(rpm: u32, rpd: u32, tpm: u64, batch_limit: u64) -> Self {
        Self {
            rpm,
            rpd,
            tpm,
            batch_limit,
        }
    }

    /// Worker pool size for parallel mode: `min(rpm, 10)`, never below 1.
    pub fn max_workers(&self) -> usize {
        (self.rpm as usize).clamp(1, MAX_PARALLEL_WORKERS)
    }
}

/// Tier limits keyed by display name ("Free", "Tier 1", ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TierRegistry(BTreeMap<String, TierLimits>);

impl TierRegistry {
    pub fn get(&self, name: &str) -> Option<&TierLimits> {
        self.0.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TierLimits)> {
        self.0.iter()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for TierRegistry {
    /// Published gpt-4o-mini usage tiers.
    fn default() -> Self {
        let tiers = [
            ("Free", TierLimits::new(3, 200, 40_000, 0)),
            ("Tier 1", TierLimits::new(500, 10_000, 200_000, 2_000_000)),
            ("Tier 2", TierLimits::new(5_000, 0, 2_000_000, 20_000_000)),
            ("Tier 3", TierLimits::new(5_000, 0, 4_000_000, 40_000_000)),
            ("Tier 4", TierLimits::new(10_000, 0, 10_000_000, 1_000_000_000)),
            ("Tier 5", TierLimits::new(30_000, 0, 150_000_000, 15_000_000_000)),
        ];
        Self(
            tiers
                .into_iter()
                .map(|(name, limits)| (name.to_string(), limits))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_max_workers_capped_at_ten() {
        assert_eq!(TierLimits::new(500, 0, 0, 0).max_workers(), 10);
        assert_eq!(TierLimits::new(3, 200, 0, 0).max_workers(), 3);
        assert_eq!(TierLimits::new(10, 0, 0, 0).max_workers(), 10);
    }

    #[test]
    fn test_max_workers_never_zero() {
        assert_eq!(TierLimits::new(0, 0, 0, 0).max_workers(), 1);
    }

    #[test]
    fn test_default_registry_has_free_and_five_tiers() {
        let registry = TierRegistry::default();
        assert_eq!(registry.len(), 6);
        assert!(registry.get("Free").is_some());
        assert!(registry.get("Tier 5").is_some());
        assert!(registry.get("Tier 6").is_none());
    }

    #[test]
    fn test_names_are_sorted() {
        let registry = TierRegistry::default();
        let names: Vec<&str> = registry.names().collect();
        assert_eq!(names.first(), Some(&"Free"));
        assert_eq!(names.last(), Some(&"Tier 5"));
    }

    #[test]
    fn test_missing_optional_fields_deserialize_to_zero() {
        let limits: TierLimits = toml::from_str("rpm = 60").unwrap();
        assert_eq!(limits, TierLimits::new(60, 0, 0, 0));
    }
}
