mod cli;
mod output;
mod terminal;

use std::collections::HashMap;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use rapport_compute::{AnalysisOptions, ClosenessEngine, NormalizationMode};
use rapport_core::{Config, EventStore};
use rapport_ingest::{
    clean_messages, load_user_map, JsonImporter, RawMessage, SqliteImporter, TimeWindow,
};

use crate::cli::CliArgs;
use crate::terminal::Terminal;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    rapport_core::config::load_dotenv();
    let config = Config::from_env();
    config.log_summary();

    run(&args, &config, &Terminal::new())
}

fn run(args: &CliArgs, config: &Config, terminal: &Terminal) -> Result<()> {
    let raw = read_source(args)?;
    if raw.is_empty() {
        return terminal.print_empty("the source contains no text messages");
    }

    let (events, stats) = clean_messages(raw, &config.ingest.excluded_senders);
    if stats.dropped() > 0 {
        info!(
            "Dropped {} of {} messages: {} without sender, {} empty, {} system accounts, {} blank nicknames",
            stats.dropped(),
            stats.input,
            stats.missing_sender,
            stats.empty_content,
            stats.excluded_sender,
            stats.blank_nickname
        );
    }
    let window = TimeWindow::from_dates(args.start.as_deref(), args.end.as_deref())
        .context("invalid --start/--end")?;
    let events = window.apply(events);
    if events.is_empty() {
        return terminal.print_empty("no messages left after cleaning and date filtering");
    }

    let options = analysis_options(args, config)?;
    let store = EventStore::new(events);
    let report = ClosenessEngine::run(&store, &options);
    if report.is_empty() {
        return terminal.print_empty("no pair of participants has messages from both sides");
    }

    let path = args.output_path();
    output::write_csv_file(&path, &report)?;
    info!("Result table written to {}", path.display());

    terminal.print_top_pairs(&report, args.top_n)?;
    terminal.print_saved(&path, report.len())?;
    Ok(())
}

fn read_source(args: &CliArgs) -> Result<Vec<RawMessage>> {
    if let Some(path) = &args.events {
        return JsonImporter::import(path)
            .with_context(|| format!("failed to read events from {}", path.display()));
    }
    match (&args.db, &args.group) {
        (Some(path), Some(group)) => SqliteImporter::import(path, group)
            .with_context(|| format!("failed to read group {} from {}", group, path.display())),
        _ => anyhow::bail!("either --events or --db with --group is required"),
    }
}

/// Config values first, then command-line overrides.
fn analysis_options(args: &CliArgs, config: &Config) -> Result<AnalysisOptions> {
    let mut options = AnalysisOptions::from_config(&config.analysis)
        .context("invalid analysis config")?
        .with_focus(args.focus_user.as_deref());

    if let Some(threads) = args.threads {
        options.worker_threads = threads;
    }
    if let Some(mode) = &args.normalization {
        options.normalization = mode
            .parse::<NormalizationMode>()
            .context("invalid --normalization")?;
    }
    if let Some(path) = &args.usermap {
        options = options.with_user_names(read_user_map(path));
    }
    Ok(options)
}

/// Missing or malformed maps are logged and treated as empty.
fn read_user_map(path: &std::path::Path) -> HashMap<String, String> {
    load_user_map(path).unwrap_or_else(|e| {
        warn!("Failed to load user map {}: {}", path.display(), e);
        HashMap::new()
    })
}
