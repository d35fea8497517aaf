// Contract tests for the HTTP surface
//
// Drives the actix app in-process over in-memory storage and checks status
// codes, the error envelope and the serialized field names and status text.

#[path = "../helpers/mod.rs"]
mod helpers;

use actix_web::{test, App};
use helpers::*;
use loanledger::middleware::{RequestId, USER_ID_HEADER};
use loanledger::transactions::TransactionStatus;
use serde_json::{json, Value};

macro_rules! app {
    ($ctx:expr) => {{
        let services = $ctx.services.clone();
        test::init_service(
            App::new()
                .wrap(RequestId)
                .configure(move |cfg| services.configure(cfg)),
        )
        .await
    }};
}

#[actix_web::test]
async fn test_create_and_fetch_loan() {
    let ctx = TestContext::new();
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/loans")
        .insert_header((USER_ID_HEADER, USER))
        .set_json(loan_payload(12))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 201);

    let created: Value = test::read_body_json(resp).await;
    assert_eq!(created["status"], "In_Progress");
    assert_eq!(created["type"], "vehicle");
    assert_eq!(created["remaining_months"], 12);
    assert_eq!(created["user_id"], USER);

    let id = created["id"].as_str().unwrap();
    let req = test::TestRequest::get()
        .uri(&format!("/api/loans/{}", id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
}

#[actix_web::test]
async fn test_validation_error_envelope() {
    let ctx = TestContext::new();
    let app = app!(ctx);

    let mut payload = loan_payload(12);
    payload["monthly_expenses"] = json!("0");

    let req = test::TestRequest::post()
        .uri("/api/loans")
        .insert_header((USER_ID_HEADER, USER))
        .set_json(payload)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 400);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["error"]["code"], 400);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("monthly_expenses"));
}

#[actix_web::test]
async fn test_missing_user_header_is_unauthorized() {
    let ctx = TestContext::new();
    let app = app!(ctx);

    let req = test::TestRequest::get().uri("/api/loans").to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 401);
}

#[actix_web::test]
async fn test_list_loans_with_summary() {
    let ctx = TestContext::new();
    ctx.create_loan(USER, loan_request(2)).await;
    let app = app!(ctx);

    let req = test::TestRequest::get()
        .uri("/api/loans")
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["loans"].as_array().unwrap().len(), 1);
    assert_eq!(body["summary"]["total_loan"], 1);
    assert_eq!(body["summary"]["total_amount"], "10000");
}

#[actix_web::test]
async fn test_other_users_loan_is_forbidden() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(2)).await;
    let app = app!(ctx);

    for req in [
        test::TestRequest::get()
            .uri(&format!("/api/loans/{}", loan.id))
            .insert_header((USER_ID_HEADER, OTHER_USER))
            .to_request(),
        test::TestRequest::delete()
            .uri(&format!("/api/loans/{}", loan.id))
            .insert_header((USER_ID_HEADER, OTHER_USER))
            .to_request(),
    ] {
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), 403);
    }

    assert_eq!(ctx.stored_loan(&loan.id).await.id, loan.id);
}

#[actix_web::test]
async fn test_pause_loan_over_http() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, loan_request(6)).await;
    let due = ctx.seed_transaction(&loan, TransactionStatus::Due).await;
    let app = app!(ctx);

    let req = test::TestRequest::patch()
        .uri(&format!("/api/loans/{}/status", loan.id))
        .insert_header((USER_ID_HEADER, USER))
        .set_json(json!({ "installment": false }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["status"], "Paused");
    assert_eq!(
        ctx.stored_transaction(&due.id).await.unwrap().status,
        TransactionStatus::Suspended
    );
}

#[actix_web::test]
async fn test_reconcile_list_and_pay() {
    let ctx = TestContext::new();
    ctx.create_loan(USER, loan_request(1)).await;
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/transactions/reconcile")
        .insert_header((USER_ID_HEADER, "operator"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);
    let report: Value = test::read_body_json(resp).await;
    assert_eq!(report["transactions_created"], 1);

    let req = test::TestRequest::get()
        .uri("/api/transactions")
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let listed: Value = test::call_and_read_body_json(&app, req).await;
    let listed = listed.as_array().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0]["status"], "ชำระ");
    assert_eq!(listed[0]["total_amount"], "5000");

    let id = listed[0]["id"].as_str().unwrap();
    let req = test::TestRequest::post()
        .uri(&format!("/api/transactions/{}/pay", id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status(), 200);

    let outcome: Value = test::read_body_json(resp).await;
    assert_eq!(outcome["transaction"]["status"], "ชำระแล้ว");
    assert_eq!(outcome["loan"]["status"], "Completed");
    assert_eq!(outcome["loan_completed"], true);
}

#[actix_web::test]
async fn test_reconcile_without_loans_is_not_found() {
    let ctx = TestContext::new();
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri("/api/transactions/reconcile")
        .insert_header((USER_ID_HEADER, "operator"))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 404);
}

#[actix_web::test]
async fn test_paying_suspended_transaction_is_unprocessable() {
    let ctx = TestContext::new();
    let loan = ctx.create_loan(USER, paused_loan_request(3)).await;
    let suspended = ctx.seed_transaction(&loan, TransactionStatus::Suspended).await;
    let app = app!(ctx);

    let req = test::TestRequest::post()
        .uri(&format!("/api/transactions/{}/pay", suspended.id))
        .insert_header((USER_ID_HEADER, USER))
        .to_request();
    let resp = test::call_service(&app, req).await;

    assert_eq!(resp.status(), 422);
}
