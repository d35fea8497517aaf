pub mod transaction;

pub use transaction::{
    LoanBrief, PaymentOutcome, ReconcileAction, ReconciliationReport, Transaction,
    TransactionDetail, TransactionStatus,
};
