use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{AppError, Result};
use crate::modules::loans::models::{Loan, LoanStatus};

/// Billing-cycle transaction status
///
/// The serialized text is part of the stored and published data contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransactionStatus {
    /// Open and expected to be paid this cycle
    #[serde(rename = "ชำระ")]
    Due,
    /// Was due when the next reconciliation ran
    #[serde(rename = "ค้างชำระ")]
    Overdue,
    /// Settled by the borrower
    #[serde(rename = "ชำระแล้ว")]
    Paid,
    /// Cycle of a paused loan; not billed
    #[serde(rename = "หยุดพัก")]
    Suspended,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Due => "ชำระ",
            Self::Overdue => "ค้างชำระ",
            Self::Paid => "ชำระแล้ว",
            Self::Suspended => "หยุดพัก",
        }
    }

    /// Status a new or touched transaction takes for a loan in `status`
    pub fn for_loan(status: LoanStatus) -> Option<Self> {
        match status {
            LoanStatus::InProgress => Some(Self::Due),
            LoanStatus::Paused => Some(Self::Suspended),
            LoanStatus::Completed => None,
        }
    }

    /// Awaiting payment (Due or Overdue)
    pub fn is_outstanding(&self) -> bool {
        matches!(self, Self::Due | Self::Overdue)
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "ชำระ" => Ok(Self::Due),
            "ค้างชำระ" => Ok(Self::Overdue),
            "ชำระแล้ว" => Ok(Self::Paid),
            "หยุดพัก" => Ok(Self::Suspended),
            _ => Err(format!("Invalid transaction status: {}", s)),
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = String;

    fn try_from(value: String) -> std::result::Result<Self, Self::Error> {
        value.parse()
    }
}

/// What reconciliation does with an existing transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Cycle resolved (Paid) or never billed (Suspended)
    Delete,
    /// Due transaction left unpaid for a full cycle
    MarkOverdue,
    Keep,
}

/// One billing cycle's payment record for a loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: String,
    pub loan_id: String,
    /// Owner of the loan, copied at creation
    pub user_id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(loan: &Loan, status: TransactionStatus) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            loan_id: loan.id.clone(),
            user_id: loan.user_id.clone(),
            status,
            created_at: now,
            updated_at: now,
        }
    }

    /// Next cycle's transaction for a billable loan
    pub fn for_cycle(loan: &Loan) -> Option<Self> {
        TransactionStatus::for_loan(loan.status).map(|status| Self::new(loan, status))
    }

    pub fn reconcile_action(&self) -> ReconcileAction {
        match self.status {
            TransactionStatus::Paid | TransactionStatus::Suspended => ReconcileAction::Delete,
            TransactionStatus::Due => ReconcileAction::MarkOverdue,
            TransactionStatus::Overdue => ReconcileAction::Keep,
        }
    }

    /// Settle this cycle
    ///
    /// Suspended cycles belong to a paused loan and cannot be settled while
    /// paused; paid cycles cannot be settled twice.
    pub fn mark_as_paid(&mut self) -> Result<()> {
        match self.status {
            TransactionStatus::Suspended => Err(AppError::not_payable(
                "transaction is not in a payable state",
            )),
            TransactionStatus::Paid => Err(AppError::not_payable(format!(
                "transaction '{}' is already paid",
                self.id
            ))),
            TransactionStatus::Due | TransactionStatus::Overdue => {
                self.set_status(TransactionStatus::Paid);
                Ok(())
            }
        }
    }

    pub fn mark_as_overdue(&mut self) {
        self.set_status(TransactionStatus::Overdue);
    }

    pub fn set_status(&mut self, status: TransactionStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

/// Loan fields embedded in a transaction listing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoanBrief {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub loan_type: String,
    pub monthly_expenses: Decimal,
    pub interest_percentage: Decimal,
    pub remaining_months: i32,
    pub installment: bool,
    pub status: LoanStatus,
}

impl From<&Loan> for LoanBrief {
    fn from(loan: &Loan) -> Self {
        Self {
            id: loan.id.clone(),
            name: loan.name.clone(),
            loan_type: loan.loan_type.clone(),
            monthly_expenses: loan.monthly_expenses,
            interest_percentage: loan.interest_percentage,
            remaining_months: loan.remaining_months,
            installment: loan.installment,
            status: loan.status,
        }
    }
}

/// Transaction joined with its parent loan
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionDetail {
    pub id: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub loan: LoanBrief,
    /// Parent loan's remaining_months * monthly_expenses at read time
    pub total_amount: Decimal,
}

impl TransactionDetail {
    pub fn new(transaction: &Transaction, loan: &Loan) -> Self {
        Self {
            id: transaction.id.clone(),
            status: transaction.status,
            created_at: transaction.created_at,
            loan: LoanBrief::from(loan),
            total_amount: loan.total_amount(),
        }
    }
}

/// Counters from one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub loans_considered: usize,
    pub transactions_removed: usize,
    pub transactions_marked_overdue: usize,
    pub transactions_created: usize,
    /// Loans whose open transactions already cover the remaining term
    pub loans_fully_scheduled: usize,
}

/// Result of settling a transaction
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentOutcome {
    pub transaction: Transaction,
    pub loan: Loan,
    /// This payment brought the loan to Completed
    pub loan_completed: bool,
}
