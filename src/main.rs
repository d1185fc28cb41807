use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use file_organizer::embedder::FastEmbedder;
use file_organizer::file_store::LocalFileStore;
use file_organizer::store::SurrealStore;
use file_organizer::{DocumentOrganizer, OrganizerConfig};

/// Sort a folder into themed clusters and find files worth cleaning up
#[derive(Parser)]
#[command(name = "file-organizer")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./.organizer.json or ./organizer.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// User the stored results belong to
    #[arg(long, global = true, default_value = "local", env = "FILE_ORGANIZER_USER")]
    user: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Index a directory and cluster its files by content
    Organize {
        /// Directory to organize (defaults to the desktop)
        dir: Option<PathBuf>,
        /// Number of clusters
        #[arg(short, long)]
        k: Option<usize>,
        /// Seed for reproducible clustering
        #[arg(long)]
        seed: Option<u64>,
    },
    /// List files that look safe to clean up
    Scan {
        /// Directory to scan (defaults to the desktop)
        dir: Option<PathBuf>,
    },
}

fn resolve_dir(dir: Option<PathBuf>) -> Result<PathBuf> {
    match dir {
        Some(dir) => Ok(dir),
        None => dirs::desktop_dir().context("Failed to get desktop directory"),
    }
}

async fn build(
    config: OrganizerConfig,
    dir: PathBuf,
    with_embedder: bool,
) -> Result<DocumentOrganizer> {
    let records = SurrealStore::open(&config.db_path).await?;
    let embedder: Box<dyn file_organizer::embedder::Embedder> = if with_embedder {
        Box::new(FastEmbedder::new()?)
    } else {
        Box::new(NoEmbedder)
    };

    let files = Arc::new(LocalFileStore::new(dir));
    Ok(DocumentOrganizer::new(config, Arc::new(records), files, embedder))
}

/// Stands in for the model on commands that never embed.
struct NoEmbedder;

impl file_organizer::embedder::Embedder for NoEmbedder {
    fn embed(&self, _texts: Vec<String>) -> file_organizer::Result<Vec<Vec<f32>>> {
        Err(file_organizer::OrganizerError::Embedding("no embedding model loaded".to_string()))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry().with(fmt::layer()).with(filter).init();

    let cli = Cli::parse();
    let mut config = match &cli.config {
        Some(path) => OrganizerConfig::load_from_file(path)?,
        None => OrganizerConfig::load()?,
    };

    match cli.command {
        Command::Organize { dir, k, seed } => {
            if seed.is_some() {
                config.seed = seed;
            }
            let dir = resolve_dir(dir)?;
            let organizer = build(config, dir.clone(), true).await?;

            println!("Indexing files from {}...", dir.display());
            let summary = organizer.index(&cli.user).await?;
            println!("Indexed {} files, skipped {}", summary.indexed.len(), summary.skipped.len());

            let report = organizer.organize(&cli.user, k).await?;
            println!("\nClusters:");
            println!("---------");
            for cluster in report.clusters.iter().filter(|c| !c.is_empty()) {
                println!("{} ({})", cluster.theme.name, cluster.theme.category);
                println!("   Folder: {}", cluster.theme.suggested_folder_name);
                println!("   {}", cluster.theme.description);
                println!("   Cohesion: {:.4}", cluster.cohesion);
                for file_id in &cluster.member_file_ids {
                    println!("   - {}", file_id);
                }
                println!();
            }
            if !report.converged {
                println!(
                    "Note: clustering stopped at the iteration cap ({} iterations)",
                    report.iterations
                );
            }
        }
        Command::Scan { dir } => {
            let dir = resolve_dir(dir)?;
            let organizer = build(config, dir, false).await?;
            let report = organizer.scan(&cli.user).await?;

            if report.cleanable.is_empty() {
                println!("Nothing to clean up!");
            } else {
                println!("Cleanable files:");
                println!("----------------");
                for (i, file) in report.cleanable.iter().enumerate() {
                    println!(
                        "{}. {} [{}, {:?}]",
                        i + 1,
                        file.file_id,
                        file.category,
                        file.confidence
                    );
                    println!("   {}", file.reason);
                }
                println!("\nReclaimable: {} bytes", report.total_reclaimable_bytes);
            }
        }
    }

    Ok(())
}
