use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, Mutex as StdMutex, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type Registry = Arc<StdMutex<HashMap<String, Arc<Mutex<()>>>>>;

/// Per-loan mutual exclusion keyed by loan id
///
/// Payments, status changes, deletes and the reconciliation run all mutate
/// `remaining_months` or the open-transaction count of a loan; each of them
/// holds the loan's guard for the whole read-modify-write sequence.
///
/// The registry map is only touched under a short synchronous lock and never
/// across an await. A guard removes its own entry on drop once nobody else
/// holds or waits for that loan.
#[derive(Debug, Default)]
pub struct LoanLocks {
    registry: Registry,
}

/// Held lock on a single loan; released on drop
#[derive(Debug)]
pub struct LoanGuard {
    loan_id: String,
    registry: Registry,
    guard: Option<OwnedMutexGuard<()>>,
}

impl LoanGuard {
    pub fn loan_id(&self) -> &str {
        &self.loan_id
    }
}

impl Drop for LoanGuard {
    fn drop(&mut self) {
        // Release first so the guard's own reference is gone
        drop(self.guard.take());

        let mut registry = self.registry.lock().unwrap_or_else(PoisonError::into_inner);
        let idle = registry
            .get(&self.loan_id)
            .is_some_and(|lock| Arc::strong_count(lock) == 1);
        if idle {
            registry.remove(&self.loan_id);
        }
    }
}

impl LoanLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a loan
    pub async fn acquire(&self, loan_id: &str) -> LoanGuard {
        let lock = self.lock_for(loan_id);
        LoanGuard {
            loan_id: loan_id.to_string(),
            registry: self.registry.clone(),
            guard: Some(lock.lock_owned().await),
        }
    }

    /// Acquire several loans at once, in sorted id order
    pub async fn acquire_many<I>(&self, loan_ids: I) -> Vec<LoanGuard>
    where
        I: IntoIterator<Item = String>,
    {
        let ordered: BTreeSet<String> = loan_ids.into_iter().collect();
        let mut guards = Vec::with_capacity(ordered.len());
        for loan_id in ordered {
            guards.push(self.acquire(&loan_id).await);
        }
        guards
    }

    /// Number of loans currently tracked by the registry
    pub fn tracked(&self) -> usize {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn lock_for(&self, loan_id: &str) -> Arc<Mutex<()>> {
        self.registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(loan_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
