// LoanService: loan CRUD and the installment/status state machine
//
// - Creation validates monetary and term fields and derives the status
// - Status changes re-derive the loan status and move the latest
//   transaction between Due and Suspended
// - Deletion removes the loan's transactions first, then the loan, and
//   restores the transactions if the loan delete fails

use std::sync::Arc;

use tracing::{error, info, warn};

use crate::core::{AppError, LoanLocks, Result};
use crate::modules::loans::models::{
    CreateLoanRequest, Loan, LoanPatch, LoanSummary, UserLoans,
};
use crate::modules::loans::repositories::LoanRepository;
use crate::modules::transactions::models::{Transaction, TransactionStatus};
use crate::modules::transactions::repositories::TransactionRepository;
use crate::modules::transactions::services::{Compensation, CompensationLog};

/// Service for loan business logic
pub struct LoanService {
    loan_repo: Arc<dyn LoanRepository>,
    transaction_repo: Arc<dyn TransactionRepository>,
    locks: Arc<LoanLocks>,
}

impl LoanService {
    /// Create a new loan service
    ///
    /// # Arguments
    /// * `loan_repo` - Loan persistence
    /// * `transaction_repo` - Transaction persistence, for status side effects and cascades
    /// * `locks` - Per-loan lock registry shared with `TransactionService`
    pub fn new(
        loan_repo: Arc<dyn LoanRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        locks: Arc<LoanLocks>,
    ) -> Self {
        Self {
            loan_repo,
            transaction_repo,
            locks,
        }
    }

    /// Create a loan for `user_id`
    ///
    /// # Business Rules
    /// - `monthly_expenses`, `interest_percentage` and `remaining_months` must be > 0
    /// - Nothing is written when validation fails
    pub async fn create_loan(&self, user_id: &str, request: CreateLoanRequest) -> Result<Loan> {
        let loan = Loan::new(user_id.to_string(), request).map_err(|e| {
            warn!(user_id = user_id, error = %e, "Loan rejected");
            e
        })?;

        let stored = self.loan_repo.create(&loan).await?;

        info!(
            loan_id = stored.id.as_str(),
            user_id = user_id,
            status = %stored.status,
            remaining_months = stored.remaining_months,
            "Loan created"
        );

        Ok(stored)
    }

    pub async fn get_loan_by_id(&self, id: &str) -> Result<Loan> {
        self.loan_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Loan '{}' not found", id)))
    }

    /// A user's loans with the summary over their In-Progress and Paused loans
    ///
    /// Fails with `NotFound` when the user has no loans at all.
    pub async fn get_loans_by_user_id(&self, user_id: &str) -> Result<UserLoans> {
        let loans = self.loan_repo.find_by_user_id(user_id).await?;
        if loans.is_empty() {
            return Err(AppError::not_found(format!(
                "No loans found for user '{}'",
                user_id
            )));
        }

        let active_ids: Vec<String> = loans
            .iter()
            .filter(|l| l.status.is_active())
            .map(|l| l.id.clone())
            .collect();

        let transactions = if active_ids.is_empty() {
            Vec::new()
        } else {
            self.transaction_repo.find_by_loan_ids(&active_ids).await?
        };

        let summary = LoanSummary::compute(&loans, &transactions);

        Ok(UserLoans { loans, summary })
    }

    /// Change a loan's installment enrollment (and optionally its name/type)
    ///
    /// # Business Rules
    /// - Status is re-derived: enrolled → In_Progress, not enrolled → Paused,
    ///   no monthly amount or no months left → Completed
    /// - The loan's latest open transaction follows: In_Progress → Due,
    ///   Paused → Suspended; a loan without transactions is not an error
    /// - A failing transaction write aborts before the loan is persisted
    pub async fn update_loan_status_by_id(&self, id: &str, patch: LoanPatch) -> Result<Loan> {
        let _guard = self.locks.acquire(id).await;

        let mut loan = self.get_loan_by_id(id).await?;
        let previous_status = loan.status;
        loan.apply_patch(patch)?;

        let touched = self.sync_latest_transaction(&loan).await?;

        if let Err(e) = self.loan_repo.update(&loan).await {
            error!(loan_id = id, error = %e, "Failed to persist loan status");
            if let Some(previous) = touched {
                let mut log = CompensationLog::new();
                log.record(Compensation::RevertTransaction(previous));
                log.rollback(self.loan_repo.as_ref(), self.transaction_repo.as_ref())
                    .await;
            }
            return Err(e);
        }

        info!(
            loan_id = id,
            from = %previous_status,
            to = %loan.status,
            installment = loan.installment,
            "Loan status updated"
        );

        Ok(loan)
    }

    /// Move the latest transaction to the state matching the loan status
    ///
    /// Returns the transaction's previous state when it was rewritten.
    async fn sync_latest_transaction(&self, loan: &Loan) -> Result<Option<Transaction>> {
        let Some(target) = TransactionStatus::for_loan(loan.status) else {
            return Ok(None);
        };

        let latest = match self.transaction_repo.find_latest_by_loan_id(&loan.id).await {
            Ok(Some(latest)) => latest,
            Ok(None) => return Ok(None),
            Err(e) => {
                warn!(
                    loan_id = loan.id.as_str(),
                    error = %e,
                    "Latest transaction lookup failed, leaving transactions untouched"
                );
                return Ok(None);
            }
        };

        // Settled cycles keep their Paid status
        if latest.status == TransactionStatus::Paid || latest.status == target {
            return Ok(None);
        }

        let previous = latest.clone();
        let mut updated = latest;
        updated.set_status(target);

        self.transaction_repo
            .update(&updated)
            .await
            .map_err(|e| AppError::state_update_failed(updated.id.clone(), e))?;

        info!(
            loan_id = loan.id.as_str(),
            transaction_id = updated.id.as_str(),
            from = %previous.status,
            to = %updated.status,
            "Latest transaction updated"
        );

        Ok(Some(previous))
    }

    /// Delete a loan and all of its transactions
    ///
    /// Transactions go first; if that fails the loan is untouched. If the loan
    /// delete then fails, the removed transactions are restored.
    pub async fn delete_loan_by_id(&self, id: &str) -> Result<()> {
        let _guard = self.locks.acquire(id).await;

        let loan = self.get_loan_by_id(id).await?;
        let transactions = self
            .transaction_repo
            .find_by_loan_ids(std::slice::from_ref(&loan.id))
            .await?;

        let removed = self.transaction_repo.delete_all_by_loan_id(id).await?;

        if let Err(e) = self.loan_repo.delete(id).await {
            error!(loan_id = id, error = %e, "Failed to delete loan, restoring transactions");
            let mut log = CompensationLog::new();
            for transaction in transactions {
                log.record(Compensation::RestoreTransaction(transaction));
            }
            log.rollback(self.loan_repo.as_ref(), self.transaction_repo.as_ref())
                .await;
            return Err(e);
        }

        info!(
            loan_id = id,
            user_id = loan.user_id.as_str(),
            transactions_removed = removed,
            "Loan deleted"
        );

        Ok(())
    }
}
