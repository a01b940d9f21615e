//! assetsync - game asset manifest sync and patch resolution CLI

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use assetsync_core::config::SyncConfig;
use assetsync_core::{HttpTransport, SyncStatus, TracingReporter, sync_all};
use assetsync_schema::{
    AssetIndexSummary, AudioManifest, BlockManifest, CachePatchCatalog, decode_hex, encode_hex,
    normalize_numeric_hash,
};

#[derive(Parser)]
#[command(name = "assetsync", version, about = "Sync and decode game asset manifests")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch and decode remote metadata for one or more families
    Sync {
        /// Config file (defaults to the user config dir)
        #[arg(long, env = "ASSETSYNC_CONFIG")]
        config: Option<PathBuf>,
        /// Families to sync (all configured families when omitted)
        #[arg(long = "family")]
        families: Vec<String>,
        /// Print every decoded entry
        #[arg(long)]
        list: bool,
    },
    /// Decode a block manifest file
    InspectBlock { file: PathBuf },
    /// Decode a cache patch catalog file
    InspectPatches { file: PathBuf },
    /// Decode an audio manifest, optionally attaching patch descriptors
    Audio {
        manifest: PathBuf,
        #[arg(long)]
        patches: Option<PathBuf>,
    },
    /// Convert a decimal-encoded identity to its canonical hex hash
    NormalizeHash { decimal: String },
    /// Print the patch filename for a patch blob hash
    PatchName { hash: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Sync {
            config,
            families,
            list,
        } => sync(config.as_deref(), &families, list).await,
        Commands::InspectBlock { file } => inspect_block(&file),
        Commands::InspectPatches { file } => inspect_patches(&file),
        Commands::Audio { manifest, patches } => audio(&manifest, patches.as_deref()),
        Commands::NormalizeHash { decimal } => {
            println!("{}", normalize_numeric_hash(&decimal));
            Ok(())
        }
        Commands::PatchName { hash } => {
            let bytes = decode_hex(&hash)?;
            println!("{}.patch", encode_hex(&bytes));
            Ok(())
        }
    }
}

async fn sync(config_path: Option<&Path>, families: &[String], list: bool) -> Result<()> {
    let config = SyncConfig::resolve(config_path)?;
    let mut sessions: Vec<_> = config
        .sessions(families)?
        .into_iter()
        .map(|s| s.with_reporter(Arc::new(TracingReporter)))
        .collect();

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .build()
        .context("building HTTP client")?;
    let transport = HttpTransport::new(client).with_user_agent(&config.user_agent);

    let cancel = CancellationToken::new();
    let on_ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_ctrl_c.cancel();
        }
    });

    let reports = sync_all(&mut sessions, &transport, &cancel, config.concurrency).await;

    let mut failed = 0;
    for (report, session) in reports.iter().zip(&sessions) {
        match &report.status {
            SyncStatus::Synced { assets, bytes } => {
                let revision = session
                    .tags()
                    .map_or_else(|| "-".to_string(), |t| t.revision.to_string());
                let filename = session.metadata_filename().unwrap_or("-");
                println!(
                    "{:<10} {assets:>6} assets {bytes:>12} bytes  rev {revision}  {filename}",
                    report.family,
                );
                if list {
                    for asset in session.assets() {
                        println!("    {}", asset.print_summary());
                    }
                }
            }
            SyncStatus::Cancelled => println!("{:<10} cancelled", report.family),
            SyncStatus::Failed(e) => {
                failed += 1;
                println!("{:<10} failed: {e}", report.family);
            }
        }
    }

    for session in &mut sessions {
        session.dispose();
    }

    if failed > 0 {
        anyhow::bail!("{failed} of {} families failed to sync", reports.len());
    }
    Ok(())
}

fn inspect_block(file: &Path) -> Result<()> {
    let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
    let manifest = BlockManifest::parse(&data)?;
    println!(
        "version {}  blocks {}  total {} bytes",
        manifest.version_string(),
        manifest.blocks().len(),
        manifest.total_size()
    );
    for block in manifest.blocks() {
        println!(
            "{}  {}  {} bytes  {} assets",
            block.name,
            block.hash,
            block.size,
            block.assets.len()
        );
    }
    Ok(())
}

fn inspect_patches(file: &Path) -> Result<()> {
    let catalog = CachePatchCatalog::open(file)?;
    for record in catalog.records() {
        println!("{}", record.print_summary());
    }
    println!(
        "{} patches, {} bytes",
        catalog.len(),
        catalog.total_patch_size()
    );
    Ok(())
}

fn audio(manifest: &Path, patches: Option<&Path>) -> Result<()> {
    let json = std::fs::read_to_string(manifest)
        .with_context(|| format!("reading {}", manifest.display()))?;
    let mut audio = AudioManifest::from_json(&json)?;

    if let Some(path) = patches {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        let unmatched = audio.attach_patches_json(&json)?;
        for name in unmatched {
            tracing::warn!(name = %name, "patch descriptor matches no audio package");
        }
    }

    for asset in audio.assets() {
        println!("{}", asset.print_summary());
    }
    println!(
        "{} packages, {} bytes to download",
        audio.assets().len(),
        audio.total_download_size()
    );
    Ok(())
}
