//! Command implementations.

pub mod caption;
pub mod config;
pub mod presets;
pub mod theme;
pub mod tiers;
