use crate::config::parse_var;
use crate::core::{AppError, Result};
use serde::Deserialize;
use std::time::Duration;

/// Billing-cycle job settings
#[derive(Debug, Clone, Deserialize)]
pub struct ReconciliationConfig {
    /// Run the scheduler in this process
    pub enabled: bool,
    /// Hours between runs; 720 is a 30-day cycle
    pub interval_hours: u64,
    /// Undo a failed run's writes before reporting the error
    pub rollback_on_failure: bool,
}

impl ReconciliationConfig {
    pub fn from_source<F>(get: &F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            enabled: parse_var(get, "RECONCILIATION_ENABLED", true)?,
            interval_hours: parse_var(get, "RECONCILIATION_INTERVAL_HOURS", 720)?,
            rollback_on_failure: parse_var(get, "RECONCILIATION_ROLLBACK_ON_FAILURE", true)?,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if self.interval_hours == 0 {
            return Err(AppError::Configuration(
                "RECONCILIATION_INTERVAL_HOURS must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    pub fn period(&self) -> Duration {
        Duration::from_secs(self.interval_hours * 3600)
    }
}
