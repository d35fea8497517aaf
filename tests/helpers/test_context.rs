// Service wiring over in-memory storage

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use loanledger::config::ReconciliationConfig;
use loanledger::core::{AppError, Result};
use loanledger::loans::repositories::{InMemoryLoanRepository, LoanRepository};
use loanledger::loans::{CreateLoanRequest, Loan, LoanService};
use loanledger::notifications::NotificationSink;
use loanledger::transactions::repositories::{
    InMemoryTransactionRepository, TransactionRepository,
};
use loanledger::transactions::{Transaction, TransactionService, TransactionStatus};
use loanledger::Services;

/// Notification sink that records every message and can be told to fail
#[derive(Debug, Default)]
pub struct RecordingNotificationSink {
    sent: Mutex<Vec<(String, String)>>,
    failing: AtomicBool,
}

impl RecordingNotificationSink {
    pub async fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().await.clone()
    }

    pub fn fail_deliveries(&self) {
        self.failing.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationSink for RecordingNotificationSink {
    async fn notify(&self, user_id: &str, message: &str) -> Result<()> {
        self.sent
            .lock()
            .await
            .push((user_id.to_string(), message.to_string()));

        if self.failing.load(Ordering::SeqCst) {
            return Err(AppError::internal("notification channel down"));
        }
        Ok(())
    }
}

pub struct TestContext {
    pub loan_repo: InMemoryLoanRepository,
    pub transaction_repo: InMemoryTransactionRepository,
    pub notifier: Arc<RecordingNotificationSink>,
    pub services: Services,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_rollback(true)
    }

    pub fn with_rollback(rollback_on_failure: bool) -> Self {
        let loan_repo = InMemoryLoanRepository::new();
        let transaction_repo = InMemoryTransactionRepository::new();
        let notifier = Arc::new(RecordingNotificationSink::default());

        let services = Services::new(
            Arc::new(loan_repo.clone()),
            Arc::new(transaction_repo.clone()),
            notifier.clone(),
            &ReconciliationConfig {
                enabled: true,
                interval_hours: 720,
                rollback_on_failure,
            },
        );

        Self {
            loan_repo,
            transaction_repo,
            notifier,
            services,
        }
    }

    pub fn loans(&self) -> &LoanService {
        &self.services.loans
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.services.transactions
    }

    pub async fn create_loan(&self, user_id: &str, request: CreateLoanRequest) -> Loan {
        self.loans()
            .create_loan(user_id, request)
            .await
            .expect("loan should be created")
    }

    /// Insert a transaction for `loan` directly into storage
    pub async fn seed_transaction(&self, loan: &Loan, status: TransactionStatus) -> Transaction {
        self.transaction_repo
            .create(&Transaction::new(loan, status))
            .await
            .expect("transaction should be stored")
    }

    /// Overwrite a stored loan without going through the service
    pub async fn store_loan(&self, loan: &Loan) {
        self.loan_repo
            .update(loan)
            .await
            .expect("loan should be updated");
    }

    pub async fn stored_loan(&self, id: &str) -> Loan {
        self.loan_repo
            .find_by_id(id)
            .await
            .expect("lookup should succeed")
            .expect("loan should exist")
    }

    pub async fn stored_transaction(&self, id: &str) -> Option<Transaction> {
        self.transaction_repo
            .find_by_id(id)
            .await
            .expect("lookup should succeed")
    }

    pub async fn transactions_of(&self, loan: &Loan) -> Vec<Transaction> {
        self.transaction_repo
            .find_by_loan_ids(std::slice::from_ref(&loan.id))
            .await
            .expect("lookup should succeed")
    }
}
