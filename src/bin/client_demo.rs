//! Drives a running server through the client library:
//! register, log in, create and list tasks, log out.
//!
//! $ cargo run --bin client_demo -- --email demo@example.com --password secret-pw

use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tasklane::client::*;
use tasklane::logger::*;

#[derive(Parser, Debug)]
struct Args {
    #[arg(long, default_value = "http://127.0.0.1:5000")]
    base_url: String,
    #[arg(long)]
    email: String,
    #[arg(long)]
    password: String,
    #[arg(long, default_value_t = 30)]
    timeout_secs: u64,
    /// Share one refresh between concurrent requests.
    #[arg(long)]
    coalesce: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _logger = Logger::new_bootstrap();

    let transport = Arc::new(ReqwestTransport::new(
        &args.base_url,
        Duration::from_secs(args.timeout_secs),
    )?);
    let policy = if args.coalesce {
        RefreshPolicy::Coalesced
    } else {
        RefreshPolicy::Independent
    };
    let client = ApiClient::new(transport, Arc::new(Session::new()), policy);

    match client.register(&args.email, &args.password, None).await {
        Ok(user_id) => info!(%user_id, "registered"),
        Err(e) => info!("register skipped: {}", e),
    }

    let user = client.login(&args.email, &args.password).await?;
    info!(?user, "logged in");

    let task = client.create_task("Try the demo", Some("created by client_demo")).await?;
    info!(task_id = %task.id, "created task");

    let page = client.list_tasks(&TaskQuery::default()).await?;
    for task in &page.tasks {
        println!("[{}] {} ({})", task.status, task.title, task.id);
    }
    println!(
        "page {}/{} ({} total)",
        page.pagination.page, page.pagination.total_pages, page.pagination.total
    );

    client.logout().await?;
    info!("logged out");
    Ok(())
}
