use std::sync::Arc;
use std::time::Duration;

use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{error, info};

use crate::core::AppError;
use crate::modules::transactions::models::ReconciliationReport;
use crate::modules::transactions::services::TransactionService;

/// Background job running the billing-cycle reconciliation on a fixed period
///
/// The first run happens one period after startup; operators can trigger an
/// immediate run through `POST /api/transactions/reconcile`.
pub struct ReconciliationScheduler {
    service: Arc<TransactionService>,
    period: Duration,
}

impl ReconciliationScheduler {
    pub fn new(service: Arc<TransactionService>, period: Duration) -> Self {
        Self { service, period }
    }

    /// Start the scheduler loop; spawn this as a tokio task
    pub async fn start(self: Arc<Self>) {
        info!(
            period_secs = self.period.as_secs(),
            "Starting reconciliation scheduler"
        );

        let mut ticker = interval_at(Instant::now() + self.period, self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            ticker.tick().await;
            self.run_once().await;
        }
    }

    /// Run one reconciliation and log its outcome
    pub async fn run_once(&self) -> Option<ReconciliationReport> {
        match self.service.create_transactions_for_all_users().await {
            Ok(report) => Some(report),
            Err(AppError::NoLoansFound) => {
                info!("Scheduled reconciliation skipped: no active loans");
                None
            }
            Err(e) => {
                error!(error = %e, "Scheduled reconciliation failed");
                None
            }
        }
    }
}
