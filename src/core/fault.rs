use std::collections::HashMap;

use crate::core::{AppError, Result};

/// Failure injection for the in-memory repositories
///
/// An armed operation succeeds `successes` more times, then fails once with
/// `AppError::Persistence` and disarms, so compensating writes that follow
/// the failure go through.
#[derive(Debug, Default, Clone)]
pub struct FaultPlan {
    remaining: HashMap<&'static str, usize>,
}

impl FaultPlan {
    pub fn fail_after(&mut self, operation: &'static str, successes: usize) {
        self.remaining.insert(operation, successes);
    }

    pub fn clear(&mut self) {
        self.remaining.clear();
    }

    pub fn check(&mut self, operation: &'static str) -> Result<()> {
        let Some(left) = self.remaining.get_mut(operation) else {
            return Ok(());
        };

        if *left > 0 {
            *left -= 1;
            return Ok(());
        }

        self.remaining.remove(operation);
        Err(AppError::persistence(format!(
            "injected failure in {}",
            operation
        )))
    }
}
