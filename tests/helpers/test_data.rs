// Test data factory
//
// Loan drafts and JSON payloads with unique names so assertions never match
// data from another test.

use loanledger::loans::CreateLoanRequest;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

pub const USER: &str = "user-1";
pub const OTHER_USER: &str = "user-2";

/// Draft for an enrolled loan of 5,000 per month
pub fn loan_request(remaining_months: i32) -> CreateLoanRequest {
    CreateLoanRequest {
        name: format!("Loan {}", &Uuid::new_v4().simple().to_string()[..8]),
        loan_type: "personal".to_string(),
        monthly_expenses: dec!(5000),
        interest_percentage: dec!(2.5),
        remaining_months,
        installment: true,
    }
}

pub fn paused_loan_request(remaining_months: i32) -> CreateLoanRequest {
    CreateLoanRequest {
        installment: false,
        ..loan_request(remaining_months)
    }
}

pub fn loan_request_with_expenses(monthly_expenses: Decimal) -> CreateLoanRequest {
    CreateLoanRequest {
        monthly_expenses,
        ..loan_request(12)
    }
}

/// JSON body for `POST /api/loans`
pub fn loan_payload(remaining_months: i32) -> Value {
    json!({
        "name": "Car",
        "type": "vehicle",
        "monthly_expenses": "10000",
        "interest_percentage": "3.5",
        "remaining_months": remaining_months,
    })
}
