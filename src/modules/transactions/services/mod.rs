pub mod compensation;
pub mod reconciliation_scheduler;
pub mod transaction_service;

pub use compensation::{Compensation, CompensationLog};
pub use reconciliation_scheduler::ReconciliationScheduler;
pub use transaction_service::TransactionService;
