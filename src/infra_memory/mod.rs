mod revocation_store_memory;
mod task_repo_memory;
mod user_repo_memory;

pub use revocation_store_memory::*;
pub use task_repo_memory::*;
pub use user_repo_memory::*;
