//! iconrequest command line
//!
//! `iconrequest [check] [run-file.toml]`: loads the filter and the app
//! inventory named by the run file, then sends the request (or, with
//! `check`, only validates the filter).

use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use iconrequest::commands::{CheckCommand, RunCommand};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "iconrequest";

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    info!("{} v{} starting...", APP_NAME, VERSION);

    let mut args = std::env::args().skip(1);
    let first = args.next();
    let check = first.as_deref() == Some("check");
    let run_file = if check { args.next() } else { first }
        .map(PathBuf::from)
        .unwrap_or_else(default_run_file);

    if check {
        let result = CheckCommand { run_file }.execute().await?;
        println!("{} components themed", result.themed);
        if result.diagnostics.is_empty() {
            println!("No problems found");
        } else {
            println!("Problems:");
            for diagnostic in &result.diagnostics {
                println!("  {}", diagnostic);
            }
        }
    } else {
        let summary = RunCommand { run_file }.execute().await?;
        println!(
            "{} unthemed apps, {} requested, sent: {}",
            summary.unthemed, summary.selected, summary.sent
        );
    }

    Ok(())
}

/// Run file used when none is given
fn default_run_file() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_NAME)
        .join("run.toml")
}
