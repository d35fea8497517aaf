use tracing::{error, warn};

use crate::core::Result;
use crate::modules::loans::models::Loan;
use crate::modules::loans::repositories::LoanRepository;
use crate::modules::transactions::models::Transaction;
use crate::modules::transactions::repositories::TransactionRepository;

/// Undo step for one completed write
#[derive(Debug, Clone)]
pub enum Compensation {
    /// Re-insert a transaction that was deleted
    RestoreTransaction(Transaction),
    /// Write back a transaction's previous state
    RevertTransaction(Transaction),
    /// Delete a transaction that was created
    RemoveTransaction(String),
    /// Write back a loan's previous state
    RevertLoan(Loan),
}

/// Ordered record of writes made by a multi-entity operation
///
/// On failure the operation replays the log newest-first so no partially
/// applied state survives.
#[derive(Debug, Default)]
pub struct CompensationLog {
    steps: Vec<Compensation>,
}

impl CompensationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, step: Compensation) {
        self.steps.push(step);
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Undo every recorded write, newest first
    ///
    /// Every step is attempted even if an earlier one fails. Returns the number
    /// of steps that could not be undone.
    pub async fn rollback(
        self,
        loans: &dyn LoanRepository,
        transactions: &dyn TransactionRepository,
    ) -> usize {
        let total = self.steps.len();
        let mut failed = 0;

        for step in self.steps.into_iter().rev() {
            if let Err(e) = Self::undo(&step, loans, transactions).await {
                failed += 1;
                error!(error = %e, step = ?step, "Compensation step failed");
            }
        }

        if total > 0 {
            warn!(steps = total, failed = failed, "Rolled back partial mutation");
        }

        failed
    }

    async fn undo(
        step: &Compensation,
        loans: &dyn LoanRepository,
        transactions: &dyn TransactionRepository,
    ) -> Result<()> {
        match step {
            Compensation::RestoreTransaction(transaction) => {
                transactions.create(transaction).await.map(|_| ())
            }
            Compensation::RevertTransaction(transaction) => transactions.update(transaction).await,
            Compensation::RemoveTransaction(id) => transactions.delete(id).await,
            Compensation::RevertLoan(loan) => loans.update(loan).await,
        }
    }
}
