use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::modules::transactions::services::TransactionService;

/// List the caller's transactions joined with their loans
/// GET /api/transactions
pub async fn list_transactions(
    service: web::Data<Arc<TransactionService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let transactions = service.get_transactions_by_user_id(user.id()).await?;

    Ok(HttpResponse::Ok().json(transactions))
}

/// Settle one of the caller's transactions
/// POST /api/transactions/{id}/pay
pub async fn pay_transaction(
    service: web::Data<Arc<TransactionService>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let outcome = service
        .mark_transaction_paid(&path.into_inner(), user.id())
        .await?;

    Ok(HttpResponse::Ok().json(outcome))
}

/// Run reconciliation now
/// POST /api/transactions/reconcile
pub async fn reconcile(
    service: web::Data<Arc<TransactionService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    tracing::info!(user_id = user.id(), "Manual reconciliation requested");

    let report = service.create_transactions_for_all_users().await?;

    Ok(HttpResponse::Ok().json(report))
}

/// Configure transaction routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/transactions")
            .route("", web::get().to(list_transactions))
            .route("/reconcile", web::post().to(reconcile))
            .route("/{id}/pay", web::post().to(pay_transaction)),
    );
}
