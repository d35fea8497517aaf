pub mod controllers;
pub mod models;
pub mod repositories;
pub mod services;

pub use models::{
    PaymentOutcome, ReconciliationReport, Transaction, TransactionDetail, TransactionStatus,
};
pub use services::{ReconciliationScheduler, TransactionService};
