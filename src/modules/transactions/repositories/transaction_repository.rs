use async_trait::async_trait;

use crate::core::Result;
use crate::modules::transactions::models::Transaction;

/// Persistence port for billing-cycle transactions
#[async_trait]
pub trait TransactionRepository: Send + Sync {
    /// Insert a transaction and return the stored record
    async fn create(&self, transaction: &Transaction) -> Result<Transaction>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>>;

    /// All transactions of a user, newest first
    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Transaction>>;

    /// All transactions of the given loans, oldest first
    async fn find_by_loan_ids(&self, loan_ids: &[String]) -> Result<Vec<Transaction>>;

    /// Most recently created transaction of a loan
    async fn find_latest_by_loan_id(&self, loan_id: &str) -> Result<Option<Transaction>>;

    /// Overwrite a stored transaction; `NotFound` if it does not exist
    async fn update(&self, transaction: &Transaction) -> Result<()>;

    /// Remove a transaction; `NotFound` if it does not exist
    async fn delete(&self, id: &str) -> Result<()>;

    /// Remove every transaction of a loan, returning how many were removed
    async fn delete_all_by_loan_id(&self, loan_id: &str) -> Result<u64>;

    /// Number of transactions currently stored for a loan
    async fn count_by_loan_id(&self, loan_id: &str) -> Result<i64>;
}
