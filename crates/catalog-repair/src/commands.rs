/// Subcommand implementations.
///
/// Each command writes its JSON result to `out` (stdout in `main`); progress
/// goes to the tracing log on stderr.
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{info, warn};

use catalog_images::matcher::Matcher;
use catalog_images::mcp_api::MatchImageResponse;
use catalog_images::model::ImageRecord;
use catalog_images::resolver::PathResolver;
use catalog_images::rewriter::{apply, plan_repairs, CatalogStore, RepairReport};

use crate::config::Config;
use crate::error::AppError;

fn print_json<T: Serialize>(out: &mut impl Write, value: &T) -> Result<(), AppError> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

fn scan_candidates(config: &Config) -> Vec<ImageRecord> {
    let candidates = config.images.scanner().scan_all(&config.images.scan_dirs);
    info!(candidates = candidates.len(), "photo directories scanned");
    if candidates.is_empty() {
        warn!("no images found in scan directories; fuzzy matching will not find anything");
    }
    candidates
}

fn matcher_with(config: &Config, threshold: Option<u32>) -> Matcher {
    let mut matcher_config = config.images.matcher.clone();
    if let Some(threshold) = threshold {
        matcher_config.threshold = threshold;
    }
    Matcher::new(matcher_config)
}

pub fn scan(config: &Config, dirs: &[PathBuf], out: &mut impl Write) -> Result<(), AppError> {
    let records = if dirs.is_empty() {
        scan_candidates(config)
    } else {
        config.images.scanner().scan_all(dirs)
    };
    print_json(out, &records)
}

pub fn match_name(
    config: &Config,
    name: &str,
    category: Option<&str>,
    threshold: Option<u32>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    let candidates = scan_candidates(config);
    let matcher = matcher_with(config, threshold);
    let threshold = matcher.config().threshold;
    let outcome = matcher.best_match(name, category, &candidates);

    print_json(
        out,
        &MatchImageResponse {
            matched: outcome.candidate.cloned(),
            score: outcome.score,
            confidence: outcome.confidence,
            strategy: outcome.strategy,
            threshold,
        },
    )
}

pub fn resolve(config: &Config, paths: &[String], out: &mut impl Write) -> Result<(), AppError> {
    let resolver = PathResolver::new(config.images.resolver_config()?, config.images.probe());
    let resolutions: Vec<_> = paths.iter().map(|p| resolver.resolve(p)).collect();
    print_json(out, &resolutions)
}

pub fn validate(config: &Config, report_path: Option<&Path>, out: &mut impl Write) -> Result<(), AppError> {
    let store = CatalogStore::new(&config.catalog_path);
    let products = store.load()?;
    let resolver = PathResolver::new(config.images.resolver_config()?, config.images.probe());
    let candidates = scan_candidates(config);

    let plan = plan_repairs(&products, &resolver, &config.images.matcher(), &candidates);
    let report = RepairReport::new(store.path(), None, true, plan.items);
    info!(
        total = report.total,
        found = report.found,
        replaceable = report.replaced,
        unmapped = report.unmapped,
        "validation complete"
    );

    match report_path {
        Some(path) => Ok(report.write(path)?),
        None => print_json(out, &report),
    }
}

pub fn repair(
    config: &Config,
    dry_run: bool,
    report_path: &Path,
    threshold: Option<u32>,
    out: &mut impl Write,
) -> Result<(), AppError> {
    // Everything that can fail on input happens before the first write.
    let store = CatalogStore::new(&config.catalog_path);
    let mut products = store.load()?;
    let resolver = PathResolver::new(config.images.resolver_config()?, config.images.probe());
    let candidates = scan_candidates(config);
    let matcher = matcher_with(config, threshold);

    let total = products.len();
    let plan = plan_repairs(&products, &resolver, &matcher, &candidates);

    let backup = if dry_run {
        info!(planned = plan.resolutions.len(), "dry run, catalog left untouched");
        None
    } else {
        let backup = store.backup()?;
        let summary = apply(&mut products, &plan.resolutions);
        debug_assert_eq!(products.len(), total);
        store.write(&products)?;
        info!(
            replaced = summary.replaced,
            unchanged = summary.unchanged,
            "catalog repaired"
        );
        Some(backup)
    };

    let report = RepairReport::new(store.path(), backup.as_ref(), dry_run, plan.items);
    report.write(report_path)?;
    info!(
        total = report.total,
        found = report.found,
        replaced = report.replaced,
        unmapped = report.unmapped,
        report = %report_path.display(),
        "repair complete"
    );

    print_json(
        out,
        &serde_json::json!({
            "total": report.total,
            "found": report.found,
            "replaced": report.replaced,
            "unmapped": report.unmapped,
            "backup": report.backup,
            "report": report_path,
        }),
    )
}
