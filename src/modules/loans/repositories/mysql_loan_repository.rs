// MySQL adapter for LoanRepository
//
// Status columns hold the text form of LoanStatus ("In_Progress", "Paused",
// "Completed"); rows are converted through TryFrom so an unknown value is
// reported instead of silently mapped.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::MySqlPool;

use crate::core::{AppError, Result};
use crate::modules::loans::models::{Loan, LoanStatus};
use crate::modules::loans::repositories::LoanRepository;

const LOAN_COLUMNS: &str = r#"
    id, user_id, name, loan_type, monthly_expenses, interest_percentage,
    remaining_months, installment, status, created_at, updated_at
"#;

/// Repository for loan database operations
#[derive(Clone)]
pub struct MySqlLoanRepository {
    pool: MySqlPool,
}

impl MySqlLoanRepository {
    pub fn new(pool: MySqlPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoanRepository for MySqlLoanRepository {
    async fn create(&self, loan: &Loan) -> Result<Loan> {
        sqlx::query(
            r#"
            INSERT INTO loans (
                id, user_id, name, loan_type, monthly_expenses, interest_percentage,
                remaining_months, installment, status, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&loan.id)
        .bind(&loan.user_id)
        .bind(&loan.name)
        .bind(&loan.loan_type)
        .bind(loan.monthly_expenses)
        .bind(loan.interest_percentage)
        .bind(loan.remaining_months)
        .bind(loan.installment)
        .bind(loan.status.as_str())
        .bind(loan.created_at)
        .bind(loan.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to insert loan: {}", e)))?;

        self.find_by_id(&loan.id)
            .await?
            .ok_or_else(|| AppError::internal("Loan was created but not found"))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Loan>> {
        let row = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE id = ?",
            LOAN_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to fetch loan: {}", e)))?;

        row.map(Loan::try_from).transpose()
    }

    async fn find_by_user_id(&self, user_id: &str) -> Result<Vec<Loan>> {
        let rows = sqlx::query_as::<_, LoanRow>(&format!(
            "SELECT {} FROM loans WHERE user_id = ? ORDER BY created_at ASC, id ASC",
            LOAN_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to fetch loans for user: {}", e)))?;

        rows.into_iter().map(Loan::try_from).collect()
    }

    async fn find_all_by_status(&self, statuses: &[LoanStatus]) -> Result<Vec<Loan>> {
        if statuses.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; statuses.len()].join(", ");
        let sql = format!(
            "SELECT {} FROM loans WHERE status IN ({}) ORDER BY created_at ASC, id ASC",
            LOAN_COLUMNS, placeholders
        );

        let mut query = sqlx::query_as::<_, LoanRow>(&sql);
        for status in statuses {
            query = query.bind(status.as_str());
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::persistence(format!("Failed to fetch loans by status: {}", e)))?;

        rows.into_iter().map(Loan::try_from).collect()
    }

    async fn update(&self, loan: &Loan) -> Result<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE loans
            SET
                name = ?,
                loan_type = ?,
                monthly_expenses = ?,
                interest_percentage = ?,
                remaining_months = ?,
                installment = ?,
                status = ?,
                updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&loan.name)
        .bind(&loan.loan_type)
        .bind(loan.monthly_expenses)
        .bind(loan.interest_percentage)
        .bind(loan.remaining_months)
        .bind(loan.installment)
        .bind(loan.status.as_str())
        .bind(loan.updated_at)
        .bind(&loan.id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::persistence(format!("Failed to update loan: {}", e)))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found(format!("Loan '{}' not found", loan.id)));
        }

        Ok(())
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let rows_affected = sqlx::query("DELETE FROM loans WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::persistence(format!("Failed to delete loan: {}", e)))?
            .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::not_found(format!("Loan '{}' not found", id)));
        }

        Ok(())
    }
}

/// Database row representation for the loans table
#[derive(sqlx::FromRow)]
struct LoanRow {
    id: String,
    user_id: String,
    name: String,
    loan_type: String,
    monthly_expenses: Decimal,
    interest_percentage: Decimal,
    remaining_months: i32,
    installment: bool,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<LoanRow> for Loan {
    type Error = AppError;

    fn try_from(row: LoanRow) -> Result<Self> {
        let status = LoanStatus::try_from(row.status).map_err(AppError::Internal)?;

        Ok(Loan {
            id: row.id,
            user_id: row.user_id,
            name: row.name,
            loan_type: row.loan_type,
            monthly_expenses: row.monthly_expenses,
            interest_percentage: row.interest_percentage,
            remaining_months: row.remaining_months,
            installment: row.installment,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}
