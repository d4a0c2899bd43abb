//! Scheduler timing parsed from environment variables.

use super::{Lookup, parse_or};
use anyhow::Result;
use std::time::Duration;

/// Scheduler environment configuration
#[derive(Debug, Clone)]
pub struct ScheduleEnvConfig {
    pub fetch_interval: Duration,
    pub acquisition_timeout: Duration,
}

impl Default for ScheduleEnvConfig {
    fn default() -> Self {
        Self {
            fetch_interval: Duration::from_secs(300),
            acquisition_timeout: Duration::from_secs(30),
        }
    }
}

impl ScheduleEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let defaults = Self::default();
        Ok(Self {
            fetch_interval: Duration::from_secs(parse_or(
                lookup,
                "FETCH_INTERVAL_SECS",
                defaults.fetch_interval.as_secs(),
            )?),
            acquisition_timeout: Duration::from_secs(parse_or(
                lookup,
                "ACQUISITION_TIMEOUT_SECS",
                defaults.acquisition_timeout.as_secs(),
            )?),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.fetch_interval.is_zero() {
            anyhow::bail!("FETCH_INTERVAL_SECS must be > 0");
        }
        if self.acquisition_timeout.is_zero() {
            anyhow::bail!("ACQUISITION_TIMEOUT_SECS must be > 0");
        }
        if self.acquisition_timeout > self.fetch_interval {
            anyhow::bail!(
                "ACQUISITION_TIMEOUT_SECS ({}s) must not exceed FETCH_INTERVAL_SECS ({}s)",
                self.acquisition_timeout.as_secs(),
                self.fetch_interval.as_secs()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_longer_than_interval_is_invalid() {
        let config = ScheduleEnvConfig {
            fetch_interval: Duration::from_secs(10),
            acquisition_timeout: Duration::from_secs(20),
        };
        assert!(config.validate().is_err());
        assert!(ScheduleEnvConfig::default().validate().is_ok());
    }
}
