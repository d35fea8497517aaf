//! Loan ledger: installment loans, billing-cycle transactions and the
//! reconciliation job that rolls them forward.

pub mod app;
pub mod config;
pub mod core;
pub mod middleware;
pub mod modules;

// Re-export commonly used types
pub use app::Services;
pub use modules::loans;
pub use modules::notifications;
pub use modules::transactions;
