// Integration tests for the loan lifecycle
//
// Covers creation rules, the installment/status state machine with its
// effect on the latest transaction, listing with summary, and deletion.

#[path = "../helpers/mod.rs"]
mod helpers;

use helpers::*;
use loanledger::core::AppError;
use loanledger::loans::{LoanPatch, LoanStatus};
use loanledger::transactions::TransactionStatus;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;

fn patch(installment: bool) -> LoanPatch {
    LoanPatch {
        installment,
        ..Default::default()
    }
}

#[tokio::test]
async fn test_create_loan_starts_in_progress() {
    let ctx = TestContext::new();

    let loan = ctx.create_loan(USER, loan_request(12)).await;

    assert_eq!(loan.status, LoanStatus::InProgress);
    assert_eq!(loan.remaining_months, 12);
    assert!(loan.installment);
    assert_eq!(ctx.stored_loan(&loan.id).await, loan);
}

#[tokio::test]
async fn test_create_loan_without_installment_is_paused() {
    let ctx = TestContext::new();

    let loan = ctx.create_loan(USER, paused_loan_request(6)).await;

    assert_eq!(loan.status, LoanStatus::Paused);
    assert!(!loan.installment);
}

#[tokio::test]
async fn test_create_loan_rejects_non_positive_amounts_without_writing() {
    let ctx = TestContext::new();

    let cases = [
        (loan_request_with_expenses(Decimal::ZERO), "monthly_expenses"),
        (loan_request_with_expenses(dec!(-1)), "monthly_expenses"),
        (
            loanledger::loans::CreateLoanRequest {
                interest_percentage: Decimal::ZERO,
                ..loan_request(12)
            },
            "interest_percentage",
        ),
        (loan_request(0), "remaining_months"),
    ];

    for (request, field) in cases {
        let err = ctx.loans().create_loan(USER, request).await.unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
        assert_eq!(err.field(), Some(field));
    }

    assert_eq!(ctx.loan_repo.write_count().await, 0);
    assert!(ctx.loan_repo.is_empty().await);
}

#[tokio::test]
async fn test_pause_suspends_latest_due_transaction() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let older = ctx.seed_transaction(&loan, TransactionStatus::Overdue).await;
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Due).await;

    let updated = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap();

    assert_eq!(updated.status, LoanStatus::Paused);
    assert_eq!(ctx.stored_loan(&loan.id).await.status, LoanStatus::Paused);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Suspended
    );
    // Only the latest transaction follows the loan
    assert_eq!(
        ctx.stored_transaction(&older.id).await.unwrap().status,
        TransactionStatus::Overdue
    );
}

#[tokio::test]
async fn test_resume_turns_suspended_latest_into_due() {
    let ctx = TestContext::new();
    let loan = ctx
        .create_loan(
            USER,
            loanledger::loans::CreateLoanRequest {
                installment: false,
                ..loan_request_with_expenses(dec!(10000))
            },
        )
        .await;
    assert_eq!(loan.status, LoanStatus::Paused);
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Suspended).await;

    let updated = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(true))
        .await
        .unwrap();

    assert_eq!(updated.status, LoanStatus::InProgress);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Due
    );
}

#[tokio::test]
async fn test_status_round_trip_without_transactions() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(3)).await;

    let paused = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap();
    assert_eq!(paused.status, LoanStatus::Paused);

    let resumed = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(true))
        .await
        .unwrap();
    assert_eq!(resumed.status, LoanStatus::InProgress);
    assert_eq!(resumed.remaining_months, 3);
    assert_eq!(ctx.transaction_repo.write_count().await, 0);
}

#[tokio::test]
async fn test_latest_paid_transaction_is_left_alone() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(4)).await;
    let paid = ctx.seed_transaction(&loan, TransactionStatus::Paid).await;

    ctx.loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap();

    assert_eq!(
        ctx.stored_transaction(&paid.id).await.unwrap().status,
        TransactionStatus::Paid
    );
}

#[tokio::test]
async fn test_zero_monthly_expenses_forces_completed() {
    let ctx = TestContext::new();
    let mut loan = ctx.create_loan(USER, loan_request(5)).await;
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    loan.monthly_expenses = Decimal::ZERO;
    ctx.store_loan(&loan).await;

    let updated = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(true))
        .await
        .unwrap();

    assert_eq!(updated.status, LoanStatus::Completed);
    assert_eq!(updated.remaining_months, 0);
    assert!(!updated.installment);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Due
    );
}

#[tokio::test]
async fn test_failed_transaction_write_leaves_loan_unchanged() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    ctx.transaction_repo.fail_after("update", 0).await;

    let err = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap_err();

    match err {
        AppError::StateUpdateFailed { transaction_id, .. } => {
            assert_eq!(transaction_id, latest.id)
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(ctx.stored_loan(&loan.id).await.status, LoanStatus::InProgress);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Due
    );
}

#[tokio::test]
async fn test_failed_loan_write_reverts_touched_transaction() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    ctx.loan_repo.fail_after("update", 0).await;

    let err = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(ctx.stored_loan(&loan.id).await.status, LoanStatus::InProgress);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Due
    );
}

#[tokio::test]
async fn test_failed_latest_lookup_still_updates_loan() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let latest = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    ctx.transaction_repo
        .fail_after("find_latest_by_loan_id", 0)
        .await;

    let updated = ctx
        .loans()
        .update_loan_status_by_id(&loan.id, patch(false))
        .await
        .unwrap();

    assert_eq!(updated.status, LoanStatus::Paused);
    assert_eq!(ctx.stored_loan(&loan.id).await.status, LoanStatus::Paused);
    assert_eq!(
        ctx.stored_transaction(&latest.id).await.unwrap().status,
        TransactionStatus::Due
    );
}

#[tokio::test]
async fn test_update_missing_loan_is_not_found() {
    let ctx = TestContext::new();

    let err = ctx
        .loans()
        .update_loan_status_by_id("missing", patch(true))
        .await
        .unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_user_loans_include_summary_over_active_loans() {
    let ctx = TestContext::new();
    let active = ctx.create_loan(USER, loan_request(12)).await;
    let paused = ctx.create_loan(USER, paused_loan_request(2)).await;
    let mut completed = ctx.create_loan(USER, loan_request(1)).await;
    completed.remaining_months = 0;
    completed.refresh_status();
    ctx.store_loan(&completed).await;
    ctx.create_loan(OTHER_USER, loan_request(8)).await;

    ctx.seed_transaction(&active, TransactionStatus::Overdue).await;
    ctx.seed_transaction(&active, TransactionStatus::Due).await;
    ctx.seed_transaction(&paused, TransactionStatus::Suspended).await;
    ctx.seed_transaction(&completed, TransactionStatus::Due).await;

    let user_loans = ctx.loans().get_loans_by_user_id(USER).await.unwrap();

    assert_eq!(user_loans.loans.len(), 3);
    assert_eq!(user_loans.summary.total_loan, 2);
    // (12 + 2) months at 5,000
    assert_eq!(user_loans.summary.total_amount, dec!(70000));
    // Due + Overdue of the active loan
    assert_eq!(user_loans.summary.total_transaction_amount, dec!(10000));
}

#[tokio::test]
async fn test_user_without_loans_is_not_found() {
    let ctx = TestContext::new();

    let err = ctx.loans().get_loans_by_user_id(USER).await.unwrap_err();

    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn test_delete_removes_loan_and_its_transactions() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let kept = ctx.create_loan(USER, loan_request(12)).await;
    ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    ctx.seed_transaction(&loan, TransactionStatus::Overdue).await;
    ctx.seed_transaction(&kept, TransactionStatus::Due).await;

    ctx.loans().delete_loan_by_id(&loan.id).await.unwrap();

    assert!(matches!(
        ctx.loans().get_loan_by_id(&loan.id).await,
        Err(AppError::NotFound(_))
    ));
    assert!(ctx.transactions_of(&loan).await.is_empty());
    assert_eq!(ctx.transactions_of(&kept).await.len(), 1);
}

#[tokio::test]
async fn test_failed_loan_delete_restores_transactions() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    let due = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    let overdue = ctx.seed_transaction(&loan, TransactionStatus::Overdue).await;
    ctx.loan_repo.fail_after("delete", 0).await;

    let err = ctx.loans().delete_loan_by_id(&loan.id).await.unwrap_err();

    assert!(matches!(err, AppError::Persistence(_)));
    assert_eq!(ctx.stored_loan(&loan.id).await.id, loan.id);
    let restored = ctx.transactions_of(&loan).await;
    assert_eq!(restored.len(), 2);
    assert!(restored.contains(&due));
    assert!(restored.contains(&overdue));
}

#[tokio::test]
async fn test_failed_transaction_delete_keeps_loan() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(12)).await;
    ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    ctx.transaction_repo
        .fail_after("delete_all_by_loan_id", 0)
        .await;

    assert!(ctx.loans().delete_loan_by_id(&loan.id).await.is_err());

    assert_eq!(ctx.stored_loan(&loan.id).await.id, loan.id);
    assert_eq!(ctx.transactions_of(&loan).await.len(), 1);
}
