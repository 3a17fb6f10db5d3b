use crate::cli::Cli;
use crate::progress::{ProgressState, Stage, progress_enabled, run_with_spinner};
use crate::summary::{SummaryContext, SummaryPaths, print_summary};
use anyhow::{Context, Result, anyhow};
use chrono::Local;
use clap::Parser;
use salesview::payload::{DashboardPayload, parse_payload, remember_payload};
use salesview::{AssembleOptions, compile_dashboard};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

mod cli;
mod output;
mod progress;
mod summary;

const DEFAULT_LOG_FILTER: &str = "info";

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    colored::control::set_override(true);

    let mut cli = Cli::parse();

    if let Some(command) = cli.command.take() {
        crate::cli::handle_command(command)?;
        return Ok(());
    }

    let payload_path = cli
        .payload
        .clone()
        .ok_or_else(|| anyhow!("missing PAYLOAD argument; run with --help for usage"))?;
    let options = load_options(&cli).await?;
    let run_started_at = Local::now();
    let progress = progress_enabled(cli.no_progress).then(ProgressState::new);

    let payload_label = payload_path.display().to_string();
    let payload = run_with_spinner(
        progress.as_ref(),
        Stage::Load,
        &payload_label,
        load_payload(&payload_path),
    )
    .await?;
    let record_count = payload.record_count();
    let payload = remember_payload(payload);
    info!(
        records = record_count,
        period = %payload.period,
        "loaded dashboard payload"
    );

    let views = run_with_spinner(progress.as_ref(), Stage::Compile, "view models", async {
        Ok(compile_dashboard(&payload, &options))
    })
    .await?;
    if views.degraded_records > 0 {
        warn!(
            degraded = views.degraded_records,
            "some records were malformed and rendered with sentinels"
        );
    }

    let json_path: Option<PathBuf> = match cli.save_json.as_deref() {
        Some(path) => Some(
            run_with_spinner(
                progress.as_ref(),
                Stage::Save,
                "view models JSON",
                output::save_views_json(path, &views, &run_started_at, cli.archive),
            )
            .await?,
        ),
        None => None,
    };
    let csv_path: Option<PathBuf> = match cli.save_csv.as_deref() {
        Some(path) => Some(
            run_with_spinner(
                progress.as_ref(),
                Stage::Save,
                "tables CSV",
                output::save_tables_csv(path, &views, cli.archive),
            )
            .await?,
        ),
        None => None,
    };

    if let Some(progress) = progress.as_ref() {
        progress.clear();
    }

    print_summary(&SummaryContext {
        payload_path: &payload_path,
        record_count,
        run_started_at: &run_started_at,
        paths: SummaryPaths {
            json: json_path.as_deref(),
            csv: csv_path.as_deref(),
        },
        views: &views,
        full_output: cli.full_output,
    });

    Ok(())
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| DEFAULT_LOG_FILTER.into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn load_payload(path: &Path) -> Result<DashboardPayload> {
    let bytes = fs::read(path)
        .await
        .with_context(|| format!("failed to read payload {}", path.display()))?;
    parse_payload(&bytes).with_context(|| format!("invalid payload in {}", path.display()))
}

/// Defaults, then the options file, then command-line flags.
async fn load_options(cli: &Cli) -> Result<AssembleOptions> {
    let mut options = match cli.options.as_deref() {
        Some(path) => {
            let bytes = fs::read(path)
                .await
                .with_context(|| format!("failed to read options {}", path.display()))?;
            AssembleOptions::from_json(&bytes)
                .with_context(|| format!("invalid options in {}", path.display()))?
        }
        None => AssembleOptions::default(),
    };
    cli.apply_overrides(&mut options);
    Ok(options)
}
