//! Service wiring and route registration shared by `main` and HTTP tests

use std::sync::Arc;

use actix_web::web;
use sqlx::MySqlPool;

use crate::config::ReconciliationConfig;
use crate::core::LoanLocks;
use crate::modules::health;
use crate::modules::loans::repositories::{
    InMemoryLoanRepository, LoanRepository, MySqlLoanRepository,
};
use crate::modules::loans::{self, LoanService};
use crate::modules::notifications::NotificationSink;
use crate::modules::transactions::repositories::{
    InMemoryTransactionRepository, MySqlTransactionRepository, TransactionRepository,
};
use crate::modules::transactions::{self, ReconciliationScheduler, TransactionService};

/// Both services over one pair of repositories and one lock registry
#[derive(Clone)]
pub struct Services {
    pub loans: Arc<LoanService>,
    pub transactions: Arc<TransactionService>,
}

impl Services {
    pub fn new(
        loan_repo: Arc<dyn LoanRepository>,
        transaction_repo: Arc<dyn TransactionRepository>,
        notifier: Arc<dyn NotificationSink>,
        reconciliation: &ReconciliationConfig,
    ) -> Self {
        let locks = Arc::new(LoanLocks::new());

        let loans = LoanService::new(loan_repo.clone(), transaction_repo.clone(), locks.clone());
        let transactions = TransactionService::new(transaction_repo, loan_repo, notifier, locks)
            .with_rollback_on_failure(reconciliation.rollback_on_failure);

        Self {
            loans: Arc::new(loans),
            transactions: Arc::new(transactions),
        }
    }

    /// Services backed by MySQL
    pub fn mysql(
        pool: MySqlPool,
        notifier: Arc<dyn NotificationSink>,
        reconciliation: &ReconciliationConfig,
    ) -> Self {
        Self::new(
            Arc::new(MySqlLoanRepository::new(pool.clone())),
            Arc::new(MySqlTransactionRepository::new(pool)),
            notifier,
            reconciliation,
        )
    }

    /// Services backed by process-local storage
    pub fn in_memory(
        notifier: Arc<dyn NotificationSink>,
        reconciliation: &ReconciliationConfig,
    ) -> Self {
        Self::new(
            Arc::new(InMemoryLoanRepository::new()),
            Arc::new(InMemoryTransactionRepository::new()),
            notifier,
            reconciliation,
        )
    }

    pub fn scheduler(&self, reconciliation: &ReconciliationConfig) -> ReconciliationScheduler {
        ReconciliationScheduler::new(self.transactions.clone(), reconciliation.period())
    }

    /// Register app data and every route
    pub fn configure(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(web::Data::new(self.loans.clone()))
            .app_data(web::Data::new(self.transactions.clone()))
            .app_data(web::JsonConfig::default().error_handler(|err, _req| {
                let message = err.to_string();
                crate::core::AppError::validation("body", message).into()
            }))
            .configure(health::controllers::configure)
            .service(
                web::scope("/api")
                    .configure(loans::controllers::configure)
                    .configure(transactions::controllers::configure),
            );
    }
}
