use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::{AppError, FaultPlan, Result};
use crate::modules::loans::models::{Loan, LoanStatus};
use crate::modules::loans::repositories::LoanRepository;

#[derive(Debug, Default)]
struct LoanTable {
    rows: HashMap<String, Loan>,
    faults: FaultPlan,
    writes: usize,
}

impl LoanTable {
    fn sorted(&self, filter: impl Fn(&Loan) -> bool) -> Vec<Loan> {
        let mut loans: Vec<Loan> = self.rows.values().filter(|l| filter(*l)).cloned().collect();
        loans.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        loans
    }
}

/// Process-local loan store
///
/// Used when no database is configured and by the test suites. Clones share
/// the same table.
#[derive(Debug, Default, Clone)]
pub struct InMemoryLoanRepository {
    table: Arc<Mutex<LoanTable>>,
}

impl InMemoryLoanRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail after `successes` more successful calls
    pub async fn fail_after(&self, operation: &'static str, successes: usize) {
        self.table.lock().await.faults.fail_after(operation, successes);
    }

    pub async fn clear_failures(&self) {
        self.table.lock().await.faults.clear();
    }

    /// Successful create/update/delete calls so far
    pub async fn write_count(&self) -> usize {
        self.table.lock().await.writes
    }

    pub async fn len(&self) -> usize {
        self.table.lock().await.rows.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl LoanRepository for InMemoryLoanRepository {
    async fn create(&self, loan: &Loan) -> Result<Loan> {
        let mut table = self.table.lock().await;
        table.faults.check("create")?;

        if table.rows.contains_key(&loan.id) {
            return Err(AppError::persistence(format!(
                "Loan '{}' already exists",
                loan.id
            )));
        }

        table.rows.insert(loan.id.clone(), loan.clone());
        table.writes += 1;
        Ok(loan.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Loan>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_by_id")?;
        Ok(table.rows.get(id).cloned())
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Loan>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_by_user_id")?;
        Ok(table.sorted(|l| l.user_id == user_id))
    }

    async fn find_all_by_status(&self, statuses: &[LoanStatus]) -> Result<Vec<Loan>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_all_by_status")?;
        Ok(table.sorted(|l| statuses.contains(&l.status)))
    }

    async fn update(&self, loan: &Loan) -> Result<()> {
        let mut guard = self.table.lock().await;
        let table = &mut *guard;
        table.faults.check("update")?;

        match table.rows.get_mut(&loan.id) {
            Some(stored) => {
                *stored = loan.clone();
                table.writes += 1;
                Ok(())
            }
            None => Err(AppError::not_found(format!("Loan '{}' not found", loan.id))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut table = self.table.lock().await;
        table.faults.check("delete")?;

        match table.rows.remove(id) {
            Some(_) => {
                table.writes += 1;
                Ok(())
            }
            None => Err(AppError::not_found(format!("Loan '{}' not found", id))),
        }
    }
}
