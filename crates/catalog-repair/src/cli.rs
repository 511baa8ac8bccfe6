use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "catalog-repair")]
#[command(about = "Scan product photos and repair image references in products.json")]
#[command(
    after_help = "Environment:\n  STOREFRONT_PUBLIC_DIR  Storefront public directory (required)\n  CATALOG_PATH           Catalog JSON file\n  IMAGE_SCAN_DIRS        Photo directories to scan\n  IMAGE_RULES_FILE       Mapping rules and matcher settings\n  RUST_LOG               Log filter"
)]
pub struct Cli {
    /// Catalog JSON file (overrides CATALOG_PATH).
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// List image files as JSON (configured scan directories when none given).
    Scan {
        dirs: Vec<PathBuf>,
    },
    /// Find the best scanned image for a product name.
    Match {
        #[arg(long)]
        name: String,
        #[arg(long)]
        category: Option<String>,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        threshold: Option<u32>,
    },
    /// Resolve declared image paths through the fallback chain.
    Resolve {
        #[arg(required = true)]
        paths: Vec<String>,
    },
    /// Report how every product's image resolves, without writing the catalog.
    Validate {
        /// Write the report here instead of stdout.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Re-link broken product images, backing up the catalog first.
    Repair {
        /// Plan and report only; no backup, no catalog write.
        #[arg(long, default_value_t = false)]
        dry_run: bool,
        #[arg(long, default_value = "image-repair-report.json")]
        report: PathBuf,
        #[arg(long, value_parser = clap::value_parser!(u32).range(0..=100))]
        threshold: Option<u32>,
    },
}
