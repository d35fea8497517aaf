use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::transactions::models::{Transaction, TransactionStatus};
use crate::modules::transactions::repositories::TransactionRepository;

const TRANSACTION_COLUMNS: &str = "id, loan_id, user_id, status, created_at, updated_at";

/// Upper bound on bound parameters per `IN (...)` lookup; MySQL rejects
/// prepared statements with more than 65,535 placeholders
const LOAN_IDS_PER_QUERY: usize = 1_000;

fn select_by_loan_ids_sql(count: usize) -> String {
    let placeholders = vec!["?"; count].join(", ");
    format!(
        "SELECT {} FROM loan_transactions WHERE loan_id IN ({}) ORDER BY created_at ASC, id ASC",
        TRANSACTION_COLUMNS, placeholders
    )
}

/// Repository for loan transaction persistence
#[derive(Clone)]
pub struct MySqlTransactionRepository {
    pool: MySqlPool,
}

impl MySqlTransactionRepository {
    /// Create a new MySqlTransactionRepository
    ///
    /// # Arguments
    /// * `pool` - Database connection pool
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for MySqlTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction> {
        sqlx::query(
            r#"
            INSERT INTO loan_transactions (id, loan_id, user_id, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&transaction.id)
        .bind(&transaction.loan_id)
        .bind(&transaction.user_id)
        .bind(transaction.status.as_str())
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to create transaction: {}", e)))?;

        self.find_by_id(&transaction.id).await?.ok_or_else(|| {
            AppError::internal("Transaction was created but not found")
        })
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM loan_transactions WHERE id = ?",
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to fetch transaction: {}", e)))?;

        row.map(Transaction::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM loan_transactions WHERE user_id = ? ORDER BY created_at DESC, id DESC",
            TRANSACTION_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::persistence(format!("Failed to fetch transactions for user: {}", e))
        })?;

        rows.into_iter().map(Transaction::try_from).collect()
    }

    async fn find_by_loan_ids(&self, loan_ids: &[String]) -> Result<Vec<Transaction>> {
        let mut transactions = Vec::new();

        for chunk in loan_ids.chunks(LOAN_IDS_PER_QUERY) {
            let sql = select_by_loan_ids_sql(chunk.len());
            let mut query = sqlx::query_as::<_, TransactionRow>(&sql);
            for loan_id in chunk {
                query = query.bind(loan_id);
            }

            let rows = query.fetch_all(&self.pool).await.map_err(|e| {
                AppError::persistence(format!("Failed to fetch transactions for loans: {}", e))
            })?;

            for row in rows {
                transactions.push(Transaction::try_from(row)?);
            }
        }

        // Chunks are ordered individually
        if loan_ids.len() > LOAN_IDS_PER_QUERY {
            transactions.sort_by(|a, b| {
                a.created_at
                    .cmp(&b.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        Ok(transactions)
    }

    async fn find_latest_by_loan_id(&self, loan_id: &str) -> Result<Option<Transaction>> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM loan_transactions WHERE loan_id = ? ORDER BY created_at DESC, id DESC LIMIT 1",
            TRANSACTION_COLUMNS
        ))
        .bind(loan_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            AppError::persistence(format!("Failed to fetch latest transaction: {}", e))
        })?;

        row.map(Transaction::try_from).transpose()
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
        let result = sqlx::query(
            r#"
            UPDATE loan_transactions
            SET status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(transaction.status.as_str())
        .bind(transaction.updated_at)
        .bind(&transaction.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to update transaction: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Transaction with id '{}' not found",
                transaction.id
            )));
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let result = sqlx::query("DELETE FROM loan_transactions WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::persistence(format!("Failed to delete transaction: {}", e)))?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!(
                "Transaction with id '{}' not found",
                id
            )));
        }

        Ok(())
    }

    async fn delete_all_by_loan_id(&self, loan_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM loan_transactions WHERE loan_id = ?")
            .bind(loan_id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                AppError::persistence(format!("Failed to delete transactions for loan: {}", e))
            })?;

        Ok(result.rows_affected())
    }

    async fn count_by_loan_id(&self, loan_id: &str) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) as count
            FROM loan_transactions
            WHERE loan_id = ?
            "#,
        )
        .bind(loan_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to count transactions: {}", e)))?;

        Ok(row.0)
    }
}

/// Database row representation for the loan_transactions table
#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: String,
    loan_id: String,
    user_id: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TransactionRow> for Transaction {
    type Error = AppError;

    fn try_from(row: TransactionRow) -> Result<Self> {
        let status = TransactionStatus::try_from(row.status).map_err(AppError::Internal)?;

        Ok(Transaction {
            id: row.id,
            loan_id: row.loan_id,
            user_id: row.user_id,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
