use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::{AppError, FaultPlan, Result};
use crate::modules::transactions::models::Transaction;
use crate::modules::transactions::repositories::TransactionRepository;

#[derive(Debug, Default)]
struct TransactionTable {
    /// Rows keyed by id with their insertion sequence
    rows: HashMap<String, (u64, Transaction)>,
    next_seq: u64,
    faults: FaultPlan,
    writes: usize,
}

impl TransactionTable {
    /// Matching rows ordered by (created_at, insertion sequence)
    fn ordered(&self, filter: impl Fn(&Transaction) -> bool) -> Vec<Transaction> {
        let mut rows: Vec<&(u64, Transaction)> =
            self.rows.values().filter(|(_, t)| filter(t)).collect();
        rows.sort_by(|(a_seq, a), (b_seq, b)| {
            a.created_at.cmp(&b.created_at).then_with(|| a_seq.cmp(b_seq))
        });
        rows.into_iter().map(|(_, t)| t.clone()).collect()
    }
}

/// Process-local transaction store; clones share the same table
#[derive(Debug, Default, Clone)]
pub struct InMemoryTransactionRepository {
    table: Arc<Mutex<TransactionTable>>,
}

impl InMemoryTransactionRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `operation` fail after `successes` more successful calls
    pub async fn fail_after(&self, operation: &'static str, successes: usize) {
        self.table.lock().await.faults.fail_after(operation, successes);
    }

    pub async fn clear_failures(&self) {
        self.table.lock().await.faults.clear();
    }

    /// Successful create/update/delete calls so far
    pub async fn write_count(&self) -> usize {
        self.table.lock().await.writes
    }

    /// Snapshot of every stored transaction, oldest first
    pub async fn all(&self) -> Vec<Transaction> {
        self.table.lock().await.ordered(|_| true)
    }
}

#[async_trait]
impl TransactionRepository for InMemoryTransactionRepository {
    async fn create(&self, transaction: &Transaction) -> Result<Transaction> {
        let mut guard = self.table.lock().await;
        let table = &mut *guard;
        table.faults.check("create")?;

        if table.rows.contains_key(&transaction.id) {
            return Err(AppError::persistence(format!(
                "Transaction '{}' already exists",
                transaction.id
            )));
        }

        let seq = table.next_seq;
        table.next_seq += 1;
        table
            .rows
            .insert(transaction.id.clone(), (seq, transaction.clone()));
        table.writes += 1;
        Ok(transaction.clone())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Transaction>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_by_id")?;
        Ok(table.rows.get(id).map(|(_, t)| t.clone()))
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Transaction>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_by_user_id")?;
        let mut transactions = table.ordered(|t| t.user_id == user_id);
        transactions.reverse();
        Ok(transactions)
    }

    async fn find_by_loan_ids(&self, loan_ids: &[String]) -> Result<Vec<Transaction>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_by_loan_ids")?;
        Ok(table.ordered(|t| loan_ids.contains(&t.loan_id)))
    }

    async fn find_latest_by_loan_id(&self, loan_id: &str) -> Result<Option<Transaction>> {
        let mut table = self.table.lock().await;
        table.faults.check("find_latest_by_loan_id")?;
        Ok(table.ordered(|t| t.loan_id == loan_id).pop())
    }

    async fn update(&self, transaction: &Transaction) -> Result<()> {
        let mut guard = self.table.lock().await;
        let table = &mut *guard;
        table.faults.check("update")?;

        match table.rows.get_mut(&transaction.id) {
            Some((_, stored)) => {
                *stored = transaction.clone();
                table.writes += 1;
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Transaction with id '{}' not found",
                transaction.id
            ))),
        }
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let mut table = self.table.lock().await;
        table.faults.check("delete")?;

        match table.rows.remove(id) {
            Some(_) => {
                table.writes += 1;
                Ok(())
            }
            None => Err(AppError::not_found(format!(
                "Transaction with id '{}' not found",
                id
            ))),
        }
    }

    async fn delete_all_by_loan_id(&self, loan_id: &str) -> Result<u64> {
        let mut guard = self.table.lock().await;
        let table = &mut *guard;
        table.faults.check("delete_all_by_loan_id")?;

        let before = table.rows.len();
        table.rows.retain(|_, (_, t)| t.loan_id != loan_id);
        let removed = (before - table.rows.len()) as u64;
        table.writes += 1;
        Ok(removed)
    }

    async fn count_by_loan_id(&self, loan_id: &str) -> Result<i64> {
        let mut table = self.table.lock().await;
        table.faults.check("count_by_loan_id")?;
        let count = table
            .rows
            .values()
            .filter(|(_, t)| t.loan_id == loan_id)
            .count();
        Ok(count as i64)
    }
}
