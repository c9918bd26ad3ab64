use super::Parser;

#[derive(Parser, Debug)]
#[command(name = "tasklane", about = "Task list service with token authentication")]
pub struct Cli {
    /// Path to a TOML settings file.
    #[arg(long)]
    pub settings: Option<String>,
}
