mod auth_service_impl;
mod clock_impl;
mod task_service_impl;

pub use auth_service_impl::*;
pub use clock_impl::*;
pub use task_service_impl::*;
