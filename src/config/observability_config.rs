//! Observability configuration parsed from environment variables.
//!
//! This module handles loading the push-based metrics reporter settings.

use super::{Lookup, parse_or};
use anyhow::Result;

/// Observability environment configuration
#[derive(Debug, Clone)]
pub struct ObservabilityEnvConfig {
    pub enabled: bool,
    pub interval_seconds: u64,
}

impl Default for ObservabilityEnvConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_seconds: 60,
        }
    }
}

impl ObservabilityEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            enabled: parse_or(lookup, "OBSERVABILITY_ENABLED", defaults.enabled)?,
            interval_seconds: parse_or(
                lookup,
                "OBSERVABILITY_INTERVAL_SECS",
                defaults.interval_seconds,
            )?
            .max(1),
        })
    }
}
