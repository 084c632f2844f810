mod browser;
mod config;
mod model;
mod normalizer;
mod parser;
mod runner;
mod storage;
mod utils;

use browser::ChromeSession;
use config::{resolve_config, DEFAULT_CONFIG};
use model::AppError;
use parser::CardParser;
use runner::Runner;
use std::future::Future;
use std::path::{Path, PathBuf};
use storage::{load_cities, prior_progress, CsvStore};
use tracing::{error, info, warn};
use tracing_subscriber;

#[tokio::main]
async fn main() {
    // Initialize logging
    tracing_subscriber::fmt::init();

    if let Err(e) = run().await {
        error!("Fatal: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), AppError> {
    let config = resolve_config(std::env::args().nth(1).map(PathBuf::from), Path::new(DEFAULT_CONFIG))?;

    // The city list is a precondition for any work
    let cities = load_cities(&config.input_path)?;
    let parser = CardParser::new(&config.selectors)?;

    let resume = prior_progress(&config.output_path, config.resume, config.dedupe_records);

    let mut store = CsvStore::open(&config.output_path)?;
    let session = ChromeSession::launch(&config.browser, config.timing.navigation_timeout())?;

    let mut runner = Runner::new(&session, &parser, &config, resume);
    let outcome = tokio::select! {
        result = runner.run(&cities, &mut store) => result,
        _ = interrupted(tokio::signal::ctrl_c()) => {
            warn!("🛑 Interrupted, shutting down");
            Ok(())
        }
    };

    let summary = runner.summary().clone();

    // Release both handles whatever the loop returned
    let closed = store.close();
    session.close();

    info!(
        "Summary: {} attempted, {} resumed, {} repeated, {} with records, {} without results, {} without complete records, {} failed, {} rows written",
        summary.attempted,
        summary.resumed,
        summary.duplicates,
        summary.succeeded,
        summary.no_results,
        summary.no_complete_records,
        summary.failed,
        summary.rows_written
    );

    outcome?;
    closed?;
    info!("🎉 Scraping completed!");
    Ok(())
}

/// Resolves once the signal arrives. If the handler cannot be installed it never resolves,
/// so the loop runs to completion instead of being cut short.
async fn interrupted<F>(signal: F)
where
    F: Future<Output = std::io::Result<()>>,
{
    if let Err(e) = signal.await {
        warn!("⚠️ Ctrl-C handler unavailable: {}", e);
        std::future::pending::<()>().await;
    }
}
