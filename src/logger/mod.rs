//! Global `tracing` setup with a reloadable filter.

mod logger;
pub use logger::*;

pub use tracing::{debug, error, info, trace, warn};
