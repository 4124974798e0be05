//! Merkle CLI: partitions a file into N blocks and builds the hash tree.
//!
//! Produces, under the output directory: one `blocks/<i>.bin` per block, one
//! `hashes/<id>.out` hex digest per tree node, and `visualization.txt`.

use std::fs::{self, File};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use merkle_file_tree::build::{build_tree, BuildConfig};
use merkle_file_tree::visualize::render_tree;

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// File to hash
    file: PathBuf,

    /// Number of data blocks / leaf nodes (power of two)
    n: usize,

    /// Output directory for block, hash and visualization artifacts
    #[arg(short, long, default_value = "output")]
    out: PathBuf,

    /// Worker threads (default: one per CPU)
    #[arg(short, long, default_value_t = 0)]
    jobs: usize,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let args = Args::parse();

    // Recreate the output directory from scratch on every run.
    if args.out.exists() {
        fs::remove_dir_all(&args.out)
            .with_context(|| format!("could not clear {}", args.out.display()))?;
    }
    let blocks_dir = args.out.join("blocks");
    let hashes_dir = args.out.join("hashes");
    fs::create_dir_all(&blocks_dir)?;
    fs::create_dir_all(&hashes_dir)?;

    let mut config = BuildConfig::new(&args.file, args.n, &blocks_dir);
    config.workers = args.jobs;

    let store = build_tree(&config)?;
    store.persist(&hashes_dir)?;

    let vis_path = args.out.join("visualization.txt");
    let mut vis = File::create(&vis_path)
        .with_context(|| format!("could not create {}", vis_path.display()))?;
    render_tree(&store, args.n, &mut vis)?;
    info!("Wrote visualization to {}", vis_path.display());

    let root = store.root().context("build finished without a root hash")?;
    println!("{}", root);
    Ok(())
}
