use async_trait::async_trait;

use crate::core::Result;
use crate::modules::loans::models::{Loan, LoanStatus};

/// Persistence port for loans
///
/// Implementations must be safe to share across tasks; ordering between two
/// concurrent calls on the same loan is handled by the services through
/// `LoanLocks`.
#[async_trait]
pub trait LoanRepository: Send + Sync {
    /// Insert a new loan and return the stored record
    async fn create(&self, loan: &Loan) -> Result<Loan>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Loan>>;

    /// All loans owned by a user, oldest first
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Loan>>;

    /// Loans whose status is one of `statuses`, oldest first
    async fn find_all_by_status(&self, statuses: &[LoanStatus]) -> Result<Vec<Loan>>;

    /// Overwrite a stored loan; `NotFound` if it does not exist
    async fn update(&self, loan: &Loan) -> Result<()>;

    /// Remove a loan; `NotFound` if it does not exist
    async fn delete(&self, id: &str) -> Result<()>;
}
