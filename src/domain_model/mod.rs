mod task;
mod unit;
mod user;

pub use task::*;
pub use unit::*;
pub use user::*;
