//! Full index rebuild from a record snapshot.
//!
//! ```text
//! SEARCH_HOST=http://localhost:9308 migratesearch --manifest snapshot.json
//! ```
//!
//! Exits non-zero with the error kind on failure.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use search_sync::config::ENV_HOST;
use search_sync::manifest::Manifest;
use search_sync::{
    HttpTransport, IndexGateway, MemoryTransport, MigrationReport, Migrator, SearchConfig,
    SearchError, SearchTransport,
};
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "migratesearch", about = "Rebuild every registered search index")]
struct Args {
    /// JSON manifest: record types, index definitions, records
    #[arg(long, short)]
    manifest: PathBuf,

    /// Engine URL (overrides SEARCH_HOST)
    #[arg(long, env = ENV_HOST)]
    host: Option<String>,

    /// Run against an in-process engine instead of the configured host
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,search_sync=debug".into()),
        )
        .init();

    let args = Args::parse();
    match run(args).await {
        Ok(report) => {
            for table in &report.rebuilt {
                println!("{}: {} documents", table.table, table.documents);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("{}: {}", e.kind(), e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<MigrationReport, SearchError> {
    let loaded = Manifest::load(&args.manifest)?.into_loaded()?;

    let (transport, config) = if args.dry_run {
        info!("Dry run against in-process engine");
        let transport: Arc<dyn SearchTransport> = Arc::new(MemoryTransport::new());
        (transport, SearchConfig::default())
    } else {
        let host = args.host.clone();
        let config = SearchConfig::from_lookup(|key| {
            if key == ENV_HOST {
                host.clone()
            } else {
                std::env::var(key).ok()
            }
        })?;
        let transport: Arc<dyn SearchTransport> = Arc::new(HttpTransport::connect(&config).await?);
        (transport, config)
    };

    let gateway = Arc::new(IndexGateway::from_config(transport, &config));
    let migrator = Migrator::new(loaded.registry.clone(), gateway, loaded.records.clone());
    let report = migrator.rebuild_all().await?;
    info!(
        tables = report.rebuilt.len(),
        types = loaded.record_types.len(),
        "Rebuild finished"
    );
    Ok(report)
}
