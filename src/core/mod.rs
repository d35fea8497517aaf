pub mod error;
pub mod fault;
pub mod locks;

pub use error::{AppError, Result};
pub use fault::FaultPlan;
pub use locks::{LoanGuard, LoanLocks};
