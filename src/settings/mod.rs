//! Process settings: command line flags plus a layered TOML/env configuration.

mod cli;
pub use clap::Parser;
pub use cli::*;

mod settings;
pub use settings::*;
