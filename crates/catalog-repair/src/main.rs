mod cli;
mod commands;
mod config;
mod error;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Command};
use config::Config;

fn main() -> anyhow::Result<()> {
    // Logs go to stderr; stdout carries the JSON output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env(cli.catalog)?;
    info!(
        public_dir = %config.images.public_dir.display(),
        catalog = %config.catalog_path.display(),
        scan_dirs = config.images.scan_dirs.len(),
        threshold = config.images.matcher.threshold,
        "configuration loaded"
    );

    let mut out = std::io::stdout().lock();
    match cli.command {
        Command::Scan { dirs } => commands::scan(&config, &dirs, &mut out)?,
        Command::Match {
            name,
            category,
            threshold,
        } => commands::match_name(&config, &name, category.as_deref(), threshold, &mut out)?,
        Command::Resolve { paths } => commands::resolve(&config, &paths, &mut out)?,
        Command::Validate { report } => commands::validate(&config, report.as_deref(), &mut out)?,
        Command::Repair {
            dry_run,
            report,
            threshold,
        } => commands::repair(&config, dry_run, &report, threshold, &mut out)?,
    }
    Ok(())
}
