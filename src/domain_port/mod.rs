// store

mod revocation_store;

pub use revocation_store::*;

// repo

mod task_repo;
mod user_repo;

pub use task_repo::*;
pub use user_repo::*;
