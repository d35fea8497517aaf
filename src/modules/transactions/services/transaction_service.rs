use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::core::{AppError, LoanLocks, Result};
use crate::modules::loans::models::{Loan, LoanStatus};
use crate::modules::loans::repositories::LoanRepository;
use crate::modules::notifications::NotificationSink;
use crate::modules::transactions::models::{
    PaymentOutcome, ReconcileAction, ReconciliationReport, Transaction, TransactionDetail,
};
use crate::modules::transactions::repositories::TransactionRepository;
use crate::modules::transactions::services::{Compensation, CompensationLog};

/// Service for billing cycles: batch reconciliation/generation and payments
///
/// # Concurrency
/// - One reconciliation run at a time; a second caller gets `Conflict`
/// - A run holds every billed loan's lock until it finishes
/// - A payment holds its loan's lock from the re-read to the loan update
pub struct TransactionService {
    transaction_repo: Arc<dyn TransactionRepository>,
    loan_repo: Arc<dyn LoanRepository>,
    notifier: Arc<dyn NotificationSink>,
    locks: Arc<LoanLocks>,
    run_guard: Mutex<()>,
    rollback_on_failure: bool,
}

impl TransactionService {
    /// Create a new transaction service
    ///
    /// Partial reconciliation runs are rolled back by default; see
    /// [`TransactionService::with_rollback_on_failure`].
    pub fn new(
        transaction_repo: Arc<dyn TransactionRepository>,
        loan_repo: Arc<dyn LoanRepository>,
        notifier: Arc<dyn NotificationSink>,
        locks: Arc<LoanLocks>,
    ) -> Self {
        Self {
            transaction_repo,
            loan_repo,
            notifier,
            locks,
            run_guard: Mutex::new(()),
            rollback_on_failure: true,
        }
    }

    /// When false, a failed run keeps the writes it completed before the failure
    pub fn with_rollback_on_failure(mut self, enabled: bool) -> Self {
        self.rollback_on_failure = enabled;
        self
    }

    /// Reconcile the previous cycle and generate the next one for every
    /// In-Progress or Paused loan
    ///
    /// # Business Rules
    /// - Paid and Suspended transactions are deleted
    /// - Due transactions become Overdue; Overdue ones are kept
    /// - After every loan is reconciled, each loan with fewer open
    ///   transactions than `remaining_months` gets one new transaction:
    ///   Due for In-Progress, Suspended for Paused
    ///
    /// # Errors
    /// - `NoLoansFound` when no loan qualifies (nothing is written)
    /// - `Conflict` when another run is in progress
    /// - The first persistence error; the run's writes are undone first
    ///   unless rollback is disabled
    pub async fn create_transactions_for_all_users(&self) -> Result<ReconciliationReport> {
        let _run = self.run_guard.try_lock().map_err(|_| {
            warn!("Reconciliation requested while a run is in progress");
            AppError::Conflict("A reconciliation run is already in progress".to_string())
        })?;

        let candidates = self.loan_repo.find_all_by_status(&LoanStatus::ACTIVE).await?;
        if candidates.is_empty() {
            return Err(AppError::NoLoansFound);
        }

        let _guards = self
            .locks
            .acquire_many(candidates.iter().map(|l| l.id.clone()))
            .await;
        let locked: HashSet<String> = candidates.into_iter().map(|l| l.id).collect();

        // Re-read under the locks; a loan may have been paid off or deleted
        // while we waited
        let loans: Vec<Loan> = self
            .loan_repo
            .find_all_by_status(&LoanStatus::ACTIVE)
            .await?
            .into_iter()
            .filter(|l| locked.contains(&l.id))
            .collect();
        if loans.is_empty() {
            return Err(AppError::NoLoansFound);
        }

        info!(loans = loans.len(), "Starting reconciliation run");

        let mut log = CompensationLog::new();
        match self.run_cycle(&loans, &mut log).await {
            Ok(report) => {
                info!(
                    loans_considered = report.loans_considered,
                    transactions_removed = report.transactions_removed,
                    transactions_marked_overdue = report.transactions_marked_overdue,
                    transactions_created = report.transactions_created,
                    loans_fully_scheduled = report.loans_fully_scheduled,
                    "Reconciliation run completed"
                );
                Ok(report)
            }
            Err(e) => {
                error!(error = %e, writes = log.len(), "Reconciliation run failed");
                if self.rollback_on_failure {
                    log.rollback(self.loan_repo.as_ref(), self.transaction_repo.as_ref())
                        .await;
                } else if !log.is_empty() {
                    warn!(writes = log.len(), "Keeping writes of the failed run");
                }
                Err(e)
            }
        }
    }

    async fn run_cycle(
        &self,
        loans: &[Loan],
        log: &mut CompensationLog,
    ) -> Result<ReconciliationReport> {
        let mut report = ReconciliationReport {
            loans_considered: loans.len(),
            ..Default::default()
        };

        let loan_ids: Vec<String> = loans.iter().map(|l| l.id.clone()).collect();
        let existing = self.transaction_repo.find_by_loan_ids(&loan_ids).await?;

        for transaction in existing {
            match transaction.reconcile_action() {
                ReconcileAction::Delete => {
                    self.transaction_repo.delete(&transaction.id).await?;
                    debug!(
                        transaction_id = transaction.id.as_str(),
                        status = %transaction.status,
                        "Removed resolved transaction"
                    );
                    log.record(Compensation::RestoreTransaction(transaction));
                    report.transactions_removed += 1;
                }
                ReconcileAction::MarkOverdue => {
                    let mut overdue = transaction.clone();
                    overdue.mark_as_overdue();
                    self.transaction_repo.update(&overdue).await?;
                    debug!(
                        transaction_id = overdue.id.as_str(),
                        loan_id = overdue.loan_id.as_str(),
                        "Transaction marked overdue"
                    );
                    log.record(Compensation::RevertTransaction(transaction));
                    report.transactions_marked_overdue += 1;
                }
                ReconcileAction::Keep => {}
            }
        }

        for loan in loans {
            let open = self.transaction_repo.count_by_loan_id(&loan.id).await?;
            if open >= i64::from(loan.remaining_months) {
                debug!(
                    loan_id = loan.id.as_str(),
                    open = open,
                    remaining_months = loan.remaining_months,
                    "Loan term already covered"
                );
                report.loans_fully_scheduled += 1;
                continue;
            }

            let Some(transaction) = Transaction::for_cycle(loan) else {
                continue;
            };

            let created = self.transaction_repo.create(&transaction).await?;
            log.record(Compensation::RemoveTransaction(created.id.clone()));
            report.transactions_created += 1;

            debug!(
                transaction_id = created.id.as_str(),
                loan_id = loan.id.as_str(),
                status = %created.status,
                "Transaction generated"
            );
        }

        Ok(report)
    }

    /// Settle a transaction and count it against its loan's term
    ///
    /// # Business Rules
    /// - Only the loan owner may pay (`Forbidden` otherwise)
    /// - Suspended and already Paid transactions are rejected with `NotPayable`
    /// - The payment that brings `remaining_months` to 0 completes the loan
    ///   and notifies its owner once
    /// - If the loan cannot be updated, the transaction is reverted
    pub async fn mark_transaction_paid(
        &self,
        transaction_id: &str,
        user_id: &str,
    ) -> Result<PaymentOutcome> {
        let loan_id = self.get_transaction(transaction_id).await?.loan_id;
        let _guard = self.locks.acquire(&loan_id).await;

        let mut transaction = self.get_transaction(transaction_id).await?;
        if transaction.user_id != user_id {
            warn!(
                transaction_id = transaction_id,
                user_id = user_id,
                "Payment rejected: transaction belongs to another user"
            );
            return Err(AppError::forbidden(format!(
                "Transaction '{}' does not belong to the caller",
                transaction_id
            )));
        }

        let previous = transaction.clone();
        transaction.mark_as_paid().map_err(|e| {
            warn!(
                transaction_id = transaction_id,
                status = %previous.status,
                "Payment rejected"
            );
            e
        })?;
        self.transaction_repo.update(&transaction).await?;

        let (loan, loan_completed) = match self.settle_loan(&transaction.loan_id).await {
            Ok(settled) => settled,
            Err(e) => {
                error!(
                    transaction_id = transaction_id,
                    loan_id = transaction.loan_id.as_str(),
                    error = %e,
                    "Failed to update loan after payment, reverting transaction"
                );
                let mut log = CompensationLog::new();
                log.record(Compensation::RevertTransaction(previous));
                log.rollback(self.loan_repo.as_ref(), self.transaction_repo.as_ref())
                    .await;
                return Err(e);
            }
        };

        info!(
            transaction_id = transaction_id,
            loan_id = loan.id.as_str(),
            remaining_months = loan.remaining_months,
            loan_status = %loan.status,
            "Transaction paid"
        );

        if loan_completed {
            self.notify_completion(&loan).await;
        }

        Ok(PaymentOutcome {
            transaction,
            loan,
            loan_completed,
        })
    }

    async fn settle_loan(&self, loan_id: &str) -> Result<(Loan, bool)> {
        let mut loan = self
            .loan_repo
            .find_by_id(loan_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Loan '{}' not found", loan_id)))?;

        let completed = loan.record_payment();
        self.loan_repo.update(&loan).await?;

        Ok((loan, completed))
    }

    async fn notify_completion(&self, loan: &Loan) {
        let message = format!("Your loan '{}' has been fully paid", loan.name);
        if let Err(e) = self.notifier.notify(&loan.user_id, &message).await {
            error!(
                loan_id = loan.id.as_str(),
                user_id = loan.user_id.as_str(),
                error = %e,
                "Failed to send loan completion notification"
            );
        }
    }

    pub async fn get_transaction(&self, id: &str) -> Result<Transaction> {
        self.transaction_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Transaction '{}' not found", id)))
    }

    /// A user's transactions, newest first, each joined with its loan
    ///
    /// Transactions whose loan no longer exists are left out.
    pub async fn get_transactions_by_user_id(
        &self,
        user_id: &str,
    ) -> Result<Vec<TransactionDetail>> {
        let transactions = self.transaction_repo.find_by_user_id(user_id).await?;
        if transactions.is_empty() {
            return Ok(Vec::new());
        }

        let loans: HashMap<String, Loan> = self
            .loan_repo
            .find_by_user_id(user_id)
            .await?
            .into_iter()
            .map(|l| (l.id.clone(), l))
            .collect();

        let details = transactions
            .iter()
            .filter_map(|t| match loans.get(&t.loan_id) {
                Some(loan) => Some(TransactionDetail::new(t, loan)),
                None => {
                    warn!(
                        transaction_id = t.id.as_str(),
                        loan_id = t.loan_id.as_str(),
                        "Skipping transaction without a loan"
                    );
                    None
                }
            })
            .collect();

        Ok(details)
    }
}
