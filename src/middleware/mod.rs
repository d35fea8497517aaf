pub mod auth;
pub mod request_id;

pub use auth::{AuthenticatedUser, USER_ID_HEADER};
pub use request_id::{RequestId, RequestIdValue, REQUEST_ID_HEADER};
