//! Collector Service - Downloads the portal's raw files
//!
//! Usage:
//!   # One dataset kind:
//!   cargo run --bin collector -- --kind producao
//!
//!   # Every kind, resolving links only:
//!   cargo run --bin collector -- --all --dry-run

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use collector::{fetch_cancellable, Catalog, HttpFetcher, PortalConfig, RemoteFile};
use common::DatasetKind;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Parser, Debug)]
#[command(name = "collector", about = "Downloads raw dataset files from the portal")]
struct Args {
    /// Dataset kind (producao, comercializacao, processamento, importacao, exportacao)
    #[arg(long)]
    kind: Option<DatasetKind>,

    /// Collect every dataset kind
    #[arg(long, default_value = "false")]
    all: bool,

    /// Re-download even if an identical file was already collected
    #[arg(long, default_value = "false")]
    force: bool,

    /// Dry run - resolve links without downloading
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Debug, Clone)]
struct Config {
    portal: PortalConfig,
    raw_fs_dir: PathBuf,
    rate_limit_ms: u64,
}

impl Config {
    fn from_env() -> Result<Self> {
        Ok(Self {
            portal: PortalConfig::from_env()?,
            raw_fs_dir: PathBuf::from(
                std::env::var("RAW_FS_DIR").unwrap_or_else(|_| "./data/raw".to_string()),
            ),
            rate_limit_ms: std::env::var("RATE_LIMIT_MS")
                .unwrap_or_else(|_| "1000".to_string())
                .parse()
                .unwrap_or(1000),
        })
    }
}

/// Sidecar written next to every raw file
#[derive(Debug, Serialize)]
struct ArtifactMeta {
    artifact_id: Uuid,
    kind: DatasetKind,
    label: String,
    url: String,
    captured_at: DateTime<Utc>,
    content_hash: String,
    size_bytes: usize,
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Save raw bytes and their sidecar, named by content hash.
async fn save_to_fs(dir: &Path, meta: &ArtifactMeta, bytes: &[u8]) -> Result<PathBuf> {
    fs::create_dir_all(dir).await?;

    let path = dir.join(format!("{}.raw", meta.content_hash));
    fs::write(&path, bytes).await?;

    let sidecar = dir.join(format!("{}.json", meta.content_hash));
    fs::write(&sidecar, serde_json::to_vec_pretty(meta)?).await?;

    Ok(path)
}

async fn collect_kind(
    fetcher: &HttpFetcher,
    catalog: &Catalog,
    config: &Config,
    kind: DatasetKind,
    args: &Args,
    cancel: &CancellationToken,
) -> Result<()> {
    let RemoteFile { label, url } = catalog.resolve(fetcher, kind, cancel).await?;
    println!("  File: {} ({})", label, url);

    if args.dry_run {
        println!("  Dry run - not downloading");
        return Ok(());
    }

    // Rate limit: wait before the file request
    sleep(Duration::from_millis(config.rate_limit_ms)).await;

    let bytes = fetch_cancellable(fetcher, &url, cancel).await?;
    let hash = content_hash(&bytes);
    info!(%kind, size = bytes.len(), hash = %hash, "downloaded");

    if !args.force && fs::try_exists(config.raw_fs_dir.join(format!("{}.raw", hash))).await? {
        println!("  Already collected: sha256:{}", hash);
        return Ok(());
    }

    let meta = ArtifactMeta {
        artifact_id: Uuid::new_v4(),
        kind,
        label,
        url: url.to_string(),
        captured_at: Utc::now(),
        content_hash: hash,
        size_bytes: bytes.len(),
    };
    let path = save_to_fs(&config.raw_fs_dir, &meta, &bytes).await?;
    println!("  Saved to: {}", path.display());

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    common::logging::init_tracing("info")?;
    let args = Args::parse();
    let config = Config::from_env()?;

    let kinds: Vec<DatasetKind> = match (args.all, args.kind) {
        (true, _) => DatasetKind::ALL.to_vec(),
        (false, Some(kind)) => vec![kind],
        (false, None) => anyhow::bail!("Must specify either --kind <kind> or --all"),
    };

    println!("=== Vitibrasil Collector ===");
    println!("Portal: {}", config.portal.base_url);
    println!("Storage: {}", config.raw_fs_dir.display());

    let fetcher = HttpFetcher::new(&config.portal).context("Failed to build HTTP client")?;
    let catalog = Catalog::new(config.portal.base_url.clone());

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling downloads");
            on_ctrl_c.cancel();
        }
    });

    let mut collected = 0;
    let mut failed = 0;

    for kind in kinds {
        println!("\n[{}]", kind);
        match collect_kind(&fetcher, &catalog, &config, kind, &args, &cancel).await {
            Ok(()) => collected += 1,
            Err(e) => {
                error!(%kind, error = %e, "collection failed");
                eprintln!("  ✗ Failed: {}", e);
                failed += 1;
            }
        }
    }

    println!("\n=== Collection Summary ===");
    println!("Collected: {}", collected);
    println!("Failed: {}", failed);

    if failed > 0 {
        anyhow::bail!("{} dataset kind(s) failed", failed);
    }
    Ok(())
}
