use std::path::Path;

use anyhow::Result;
use tracing::info;

use shopmetrics_core::config::Config;
use shopmetrics_duckdb::DuckDbBackend;
use shopmetrics_report::runner::{build_report, ReportOptions};

/// Batch entrypoint: every setting comes from `SHOPMETRICS_*` env vars.
/// The report goes to stdout as JSON; logs go to stderr.
#[tokio::main]
async fn main() -> Result<()> {
    // Structured JSON logging. Level controlled via RUST_LOG env var.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("shopmetrics=info".parse()?),
        )
        .with_writer(std::io::stderr)
        .json()
        .init();

    let cfg = Config::from_env()?;

    if let Some(parent) = Path::new(&cfg.db_path).parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let db = DuckDbBackend::open(&cfg.db_path, &cfg.duckdb_memory_limit)?;

    let options = ReportOptions::from(&cfg);
    info!(
        censor_from = %options.lifespan.censor_from,
        top_n = ?options.top_n,
        materialize = options.materialize,
        "Building insights report"
    );
    let report = build_report(&db, &options).await?;

    if let Some(dir) = &cfg.export_dir {
        if options.materialize {
            db.export_derived_tables(Path::new(dir)).await?;
        } else {
            tracing::warn!(
                export_dir = %dir,
                "SHOPMETRICS_EXPORT_DIR set but materialization is disabled; skipping export"
            );
        }
    }

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
