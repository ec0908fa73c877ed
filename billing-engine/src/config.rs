//! Engine configuration.

use config::{Config, Environment};
use serde::Deserialize;

use crate::error::BillingError;

/// Runtime knobs for the batch processor.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Upper bound on schedules processed in parallel during a billing run.
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    /// Deadline per schedule; a slow persistence call fails that schedule
    /// only, never the whole run.
    #[serde(default = "default_schedule_deadline_secs")]
    pub schedule_deadline_secs: u64,
}

fn default_batch_concurrency() -> usize {
    4
}

fn default_schedule_deadline_secs() -> u64 {
    30
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_concurrency: default_batch_concurrency(),
            schedule_deadline_secs: default_schedule_deadline_secs(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment (`BILLING_` prefix).
    pub fn load() -> Result<Self, BillingError> {
        dotenvy::dotenv().ok();

        let config = Config::builder()
            .add_source(Environment::with_prefix("BILLING").separator("__"))
            .build()?;

        Ok(config.try_deserialize()?)
    }
}
