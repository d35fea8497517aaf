use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::transactions::models::Transaction;

/// Loan status
///
/// Never set by callers: it is derived from `monthly_expenses`, `installment`
/// and `remaining_months` every time one of them changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LoanStatus {
    /// Borrower enrolled in active billing
    #[serde(rename = "In_Progress")]
    InProgress,
    /// Billing suspended by the borrower
    #[serde(rename = "Paused")]
    Paused,
    /// Fully paid off
    #[serde(rename = "Completed")]
    Completed,
}

impl LoanStatus {
    /// Statuses the reconciliation job bills
    pub const ACTIVE: [LoanStatus; 2] = [LoanStatus::InProgress, LoanStatus::Paused];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InProgress => "In_Progress",
            Self::Paused => "Paused",
            Self::Completed => "Completed",
        }
    }

    /// Compute the status implied by the stored loan fields
    pub fn derive(monthly_expenses: Decimal, installment: bool, remaining_months: i32) -> Self {
        if monthly_expenses <= Decimal::ZERO || remaining_months <= 0 {
            Self::Completed
        } else if installment {
            Self::InProgress
        } else {
            Self::Paused
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress | Self::Paused)
    }
}

impl std::fmt::Display for LoanStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for LoanStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "In_Progress" => Ok(Self::InProgress),
            "Paused" => Ok(Self::Paused),
            "Completed" => Ok(Self::Completed),
            _ => Err(format!("Invalid loan status: {}", s)),
        }
    }
}

impl TryFrom<String> for LoanStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// Installment loan owned by a single user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Loan {
    pub id: String,
    pub user_id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub loan_type: String,
    /// Amount billed per cycle
    pub monthly_expenses: Decimal,
    /// Carried for display; no interest math is applied
    pub interest_percentage: Decimal,
    /// Billing cycles left; never increases
    pub remaining_months: i32,
    /// Borrower's enrollment in active billing
    pub installment: bool,
    pub status: LoanStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Draft submitted to create a loan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLoanRequest {
    pub name: String,
    #[serde(rename = "type")]
    pub loan_type: String,
    pub monthly_expenses: Decimal,
    pub interest_percentage: Decimal,
    pub remaining_months: i32,
    #[serde(default = "default_installment")]
    pub installment: bool,
}

fn default_installment() -> bool {
    true
}

/// Editable loan fields for a status update
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoanPatch {
    pub installment: bool,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub loan_type: Option<String>,
}

impl Loan {
    /// Build a new loan for `user_id`, enforcing creation rules
    pub fn new(user_id: String, request: CreateLoanRequest) -> Result<Self> {
        if user_id.trim().is_empty() {
            return Err(AppError::validation("user_id", "cannot be empty"));
        }

        if request.name.trim().is_empty() {
            return Err(AppError::validation("name", "cannot be empty"));
        }

        if request.loan_type.trim().is_empty() {
            return Err(AppError::validation("type", "cannot be empty"));
        }

        if request.monthly_expenses <= Decimal::ZERO {
            return Err(AppError::validation(
                "monthly_expenses",
                "must be greater than 0",
            ));
        }

        if request.interest_percentage <= Decimal::ZERO {
            return Err(AppError::validation(
                "interest_percentage",
                "must be greater than 0",
            ));
        }

        if request.remaining_months <= 0 {
            return Err(AppError::validation(
                "remaining_months",
                "must be greater than 0",
            ));
        }

        let now = Utc::now();
        let mut loan = Self {
            id: Uuid::new_v4().to_string(),
            user_id,
            name: request.name,
            loan_type: request.loan_type,
            monthly_expenses: request.monthly_expenses,
            interest_percentage: request.interest_percentage,
            remaining_months: request.remaining_months,
            installment: request.installment,
            status: LoanStatus::InProgress,
            created_at: now,
            updated_at: now,
        };
        loan.refresh_status();

        Ok(loan)
    }

    /// Re-derive `status`; a completed loan is normalized to
    /// `installment = false` and `remaining_months = 0`
    pub fn refresh_status(&mut self) {
        self.status =
            LoanStatus::derive(self.monthly_expenses, self.installment, self.remaining_months);

        if self.status == LoanStatus::Completed {
            self.installment = false;
            self.remaining_months = 0;
        }
    }

    /// Apply a status patch and re-derive the status
    pub fn apply_patch(&mut self, patch: LoanPatch) -> Result<()> {
        if let Some(name) = patch.name {
            if name.trim().is_empty() {
                return Err(AppError::validation("name", "cannot be empty"));
            }
            self.name = name;
        }

        if let Some(loan_type) = patch.loan_type {
            if loan_type.trim().is_empty() {
                return Err(AppError::validation("type", "cannot be empty"));
            }
            self.loan_type = loan_type;
        }

        self.installment = patch.installment;
        self.refresh_status();
        self.updated_at = Utc::now();

        Ok(())
    }

    /// Count one settled cycle against the term
    ///
    /// Returns true when this payment completed the loan.
    pub fn record_payment(&mut self) -> bool {
        let was_completed = self.status == LoanStatus::Completed;

        if self.remaining_months > 0 {
            self.remaining_months -= 1;
        }
        self.refresh_status();
        self.updated_at = Utc::now();

        !was_completed && self.status == LoanStatus::Completed
    }

    /// Outstanding amount: remaining cycles times the monthly amount
    pub fn total_amount(&self) -> Decimal {
        Decimal::from(self.remaining_months) * self.monthly_expenses
    }

    pub fn is_completed(&self) -> bool {
        self.status == LoanStatus::Completed
    }
}

/// Aggregate view over a user's active loans
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoanSummary {
    /// In-Progress and Paused loans
    pub total_loan: i64,
    /// Sum of remaining_months * monthly_expenses over those loans
    pub total_amount: Decimal,
    /// monthly_expenses counted once per Due or Overdue transaction
    pub total_transaction_amount: Decimal,
}

impl LoanSummary {
    pub fn compute(loans: &[Loan], transactions: &[Transaction]) -> Self {
        let active: Vec<&Loan> = loans.iter().filter(|l| l.status.is_active()).collect();

        let total_amount = active.iter().map(|l| l.total_amount()).sum();

        let total_transaction_amount = transactions
            .iter()
            .filter(|t| t.status.is_outstanding())
            .filter_map(|t| active.iter().find(|l| l.id == t.loan_id))
            .map(|l| l.monthly_expenses)
            .sum();

        Self {
            total_loan: active.len() as i64,
            total_amount,
            total_transaction_amount,
        }
    }
}

/// A user's loans with their summary
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserLoans {
    pub loans: Vec<Loan>,
    pub summary: LoanSummary,
}
