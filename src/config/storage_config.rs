//! Storage settings parsed from environment variables.

use super::{Lookup, parse_or};
use anyhow::Result;

/// Storage environment configuration
#[derive(Debug, Clone)]
pub struct StorageEnvConfig {
    /// Required; e.g. `sqlite://data/goldwatch.db`
    pub database_url: String,
    /// Number of auxiliary signals per observation
    pub auxiliary_arity: usize,
}

impl StorageEnvConfig {
    pub fn from_lookup(lookup: Lookup<'_>) -> Result<Self> {
        let database_url = lookup("DATABASE_URL")
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL is required"))?;

        Ok(Self {
            database_url,
            auxiliary_arity: parse_or(lookup, "AUXILIARY_ARITY", 2)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.database_url.starts_with("sqlite:") {
            anyhow::bail!(
                "DATABASE_URL must be a sqlite URL, got {}",
                self.database_url
            );
        }
        Ok(())
    }
}
