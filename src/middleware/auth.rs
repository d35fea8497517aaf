use std::future::{ready, Ready};

use actix_web::{dev::Payload, FromRequest, HttpRequest};

use crate::core::AppError;

/// Header carrying the caller's user id, set by the upstream gateway
pub const USER_ID_HEADER: &str = "X-User-Id";

/// Caller identity extracted from the `X-User-Id` header
///
/// Handlers that take this extractor reject requests without the header
/// with 401.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser(pub String);

impl AuthenticatedUser {
    pub fn id(&self) -> &str {
        &self.0
    }
}

impl FromRequest for AuthenticatedUser {
    type Error = actix_web::Error;
    type Future = Ready<std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let user_id = req
            .headers()
            .get(USER_ID_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(|v| AuthenticatedUser(v.to_string()))
            .ok_or_else(|| {
                tracing::warn!(path = req.path(), "Request without caller identity");
                actix_web::Error::from(AppError::unauthorized(format!(
                    "Missing {} header",
                    USER_ID_HEADER
                )))
            });

        ready(user_id)
    }
}
