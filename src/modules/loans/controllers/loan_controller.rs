use std::sync::Arc;

use actix_web::{web, HttpResponse};

use crate::core::error::AppError;
use crate::middleware::auth::AuthenticatedUser;
use crate::modules::loans::models::{CreateLoanRequest, Loan, LoanPatch};
use crate::modules::loans::services::LoanService;

/// Load a loan and make sure the caller owns it
async fn owned_loan(service: &LoanService, user: &AuthenticatedUser, id: &str) -> Result<Loan, AppError> {
    let loan = service.get_loan_by_id(id).await?;
    if loan.user_id != user.id() {
        tracing::warn!(loan_id = id, user_id = user.id(), "Loan access denied");
        return Err(AppError::forbidden(format!(
            "Loan '{}' does not belong to the caller",
            id
        )));
    }
    Ok(loan)
}

/// Create a loan for the caller
/// POST /api/loans
pub async fn create_loan(
    service: web::Data<Arc<LoanService>>,
    user: AuthenticatedUser,
    request: web::Json<CreateLoanRequest>,
) -> Result<HttpResponse, AppError> {
    let loan = service.create_loan(user.id(), request.into_inner()).await?;

    Ok(HttpResponse::Created().json(loan))
}

/// List the caller's loans with the summary
/// GET /api/loans
pub async fn list_loans(
    service: web::Data<Arc<LoanService>>,
    user: AuthenticatedUser,
) -> Result<HttpResponse, AppError> {
    let loans = service.get_loans_by_user_id(user.id()).await?;

    Ok(HttpResponse::Ok().json(loans))
}

/// GET /api/loans/{id}
pub async fn get_loan(
    service: web::Data<Arc<LoanService>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let loan = owned_loan(&service, &user, &path.into_inner()).await?;

    Ok(HttpResponse::Ok().json(loan))
}

/// Change installment enrollment
/// PATCH /api/loans/{id}/status
pub async fn update_loan_status(
    service: web::Data<Arc<LoanService>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    request: web::Json<LoanPatch>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    owned_loan(&service, &user, &id).await?;

    let loan = service
        .update_loan_status_by_id(&id, request.into_inner())
        .await?;

    Ok(HttpResponse::Ok().json(loan))
}

/// Delete a loan and its transactions
/// DELETE /api/loans/{id}
pub async fn delete_loan(
    service: web::Data<Arc<LoanService>>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    owned_loan(&service, &user, &id).await?;

    service.delete_loan_by_id(&id).await?;

    Ok(HttpResponse::NoContent().finish())
}

/// Configure loan routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/loans")
            .route("", web::post().to(create_loan))
            .route("", web::get().to(list_loans))
            .route("/{id}", web::get().to(get_loan))
            .route("/{id}", web::delete().to(delete_loan))
            .route("/{id}/status", web::patch().to(update_loan_status)),
    );
}
