mod auth_service;
mod clock;
mod task_service;

pub use auth_service::*;
pub use clock::*;
pub use task_service::*;
