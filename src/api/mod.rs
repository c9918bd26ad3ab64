mod error;
mod handler;
mod router;

pub use error::{ApiErrorCode, ErrorBody, recover_error};
pub use handler::{LoginResponse, MessageResponse, RefreshResponse, RegisterResponse};
pub use router::routes;
