/// Catalog rewriter for `products.json`.
///
/// The catalog is read whole, repaired in memory, copied to a timestamped
/// backup, and replaced in a single rename. A read or parse failure aborts
/// before anything is written.
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::error::CommonError;
use crate::matcher::Matcher;
use crate::model::{Confidence, ImageRecord, Product, ResolutionSource};
use crate::resolver::{PathProbe, PathResolver};

#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

/// A backup copy of the catalog and the SHA-256 of its bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Backup {
    pub path: PathBuf,
    pub sha256: String,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Vec<Product>, CommonError> {
        let bytes = fs::read(&self.path).map_err(|e| CommonError::io(&self.path, e))?;
        let products: Vec<Product> =
            serde_json::from_slice(&bytes).map_err(|e| CommonError::json(&self.path, e))?;
        debug!(catalog = %self.path.display(), products = products.len(), "catalog loaded");
        Ok(products)
    }

    pub fn backup(&self) -> Result<Backup, CommonError> {
        self.backup_at(Utc::now())
    }

    /// Copy the catalog to `<stem>.backup-<timestamp>.json` in the same directory.
    pub fn backup_at(&self, at: DateTime<Utc>) -> Result<Backup, CommonError> {
        let bytes = fs::read(&self.path).map_err(|e| CommonError::io(&self.path, e))?;
        let stem = self
            .path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("catalog");
        let name = format!("{stem}.backup-{}.json", at.format("%Y%m%dT%H%M%S%3fZ"));
        let backup_path = self.path.with_file_name(name);

        fs::write(&backup_path, &bytes).map_err(|e| CommonError::io(&backup_path, e))?;
        let sha256 = format!("{:x}", Sha256::digest(&bytes));
        info!(backup = %backup_path.display(), sha256 = %sha256, "catalog backed up");
        Ok(Backup {
            path: backup_path,
            sha256,
        })
    }

    /// Write the whole catalog to a sibling temp file, then rename it over the original.
    pub fn write(&self, products: &[Product]) -> Result<(), CommonError> {
        let mut json = serde_json::to_vec_pretty(products).map_err(|e| CommonError::json(&self.path, e))?;
        json.push(b'\n');

        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, &json).map_err(|e| CommonError::io(&tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| CommonError::io(&self.path, e))?;
        info!(catalog = %self.path.display(), products = products.len(), "catalog written");
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub replaced: usize,
    pub unchanged: usize,
    /// Resolution entries whose product id is not in the catalog.
    pub unknown_ids: usize,
}

/// Point each product named in `resolutions` at its new image.
///
/// `primaryImage` is replaced; inside `images` the previously declared path is
/// swapped for the new one, and an empty `images` list is seeded with it.
/// Products are never added, removed, or reordered.
pub fn apply(products: &mut [Product], resolutions: &HashMap<String, String>) -> ApplySummary {
    let mut summary = ApplySummary::default();
    let mut seen: HashSet<&str> = HashSet::new();

    for product in products.iter_mut() {
        let Some(new_path) = resolutions.get(&product.id) else {
            continue;
        };
        seen.insert(product.id.as_str());

        let previous = product.declared_image().map(str::to_string);
        if previous.as_deref() == Some(new_path.as_str()) {
            summary.unchanged += 1;
            continue;
        }

        product.primary_image = Some(new_path.clone());
        let images = product.images.get_or_insert_with(Vec::new);
        if images.is_empty() {
            images.push(new_path.clone());
        } else if let Some(previous) = previous {
            for image in images.iter_mut().filter(|i| **i == previous) {
                *image = new_path.clone();
            }
        }
        summary.replaced += 1;
    }

    summary.unknown_ids = resolutions.keys().filter(|id| !seen.contains(id.as_str())).count();
    summary
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    /// The declared image already resolves.
    Found,
    /// A different existing image was chosen.
    Replaced,
    /// Nothing resolved; the product keeps its previous reference.
    Unmapped,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportItem {
    pub id: String,
    pub name: String,
    pub status: ItemStatus,
    pub previous: Option<String>,
    pub resolved: Option<String>,
    pub source: ResolutionSource,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub score: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<Confidence>,
}

/// The per-product decisions of a repair run.
#[derive(Debug, Clone, Default)]
pub struct RepairPlan {
    pub resolutions: HashMap<String, String>,
    pub items: Vec<ReportItem>,
}

/// Decide, for every product, whether its image is found, replaceable, or unmapped.
pub fn plan_repairs<P: PathProbe>(
    products: &[Product],
    resolver: &PathResolver<P>,
    matcher: &Matcher,
    candidates: &[ImageRecord],
) -> RepairPlan {
    let mut plan = RepairPlan::default();

    for product in products {
        let outcome = resolver.resolve_product(product, candidates, matcher);
        let resolution = outcome.resolution;
        let status = match resolution.source {
            ResolutionSource::Verbatim | ResolutionSource::Remote => ItemStatus::Found,
            ResolutionSource::Rule | ResolutionSource::BaseDir | ResolutionSource::Fuzzy => ItemStatus::Replaced,
            ResolutionSource::Placeholder => ItemStatus::Unmapped,
        };
        if status == ItemStatus::Replaced {
            plan.resolutions
                .insert(product.id.clone(), resolution.resolved.clone());
        }

        plan.items.push(ReportItem {
            id: product.id.clone(),
            name: product.name.clone(),
            status,
            previous: product.declared_image().map(str::to_string),
            resolved: (status != ItemStatus::Unmapped).then(|| resolution.resolved.clone()),
            source: resolution.source,
            score: outcome.matched.as_ref().map(|m| m.score),
            confidence: outcome.matched.as_ref().map(|m| m.confidence),
        });
    }

    plan
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepairReport {
    pub generated_at: DateTime<Utc>,
    pub catalog: PathBuf,
    pub backup: Option<PathBuf>,
    pub backup_sha256: Option<String>,
    pub dry_run: bool,
    pub total: usize,
    pub found: usize,
    pub replaced: usize,
    pub unmapped: usize,
    pub items: Vec<ReportItem>,
}

impl RepairReport {
    pub fn new(catalog: &Path, backup: Option<&Backup>, dry_run: bool, items: Vec<ReportItem>) -> Self {
        let count = |status: ItemStatus| items.iter().filter(|i| i.status == status).count();
        Self {
            generated_at: Utc::now(),
            catalog: catalog.to_path_buf(),
            backup: backup.map(|b| b.path.clone()),
            backup_sha256: backup.map(|b| b.sha256.clone()),
            dry_run,
            total: items.len(),
            found: count(ItemStatus::Found),
            replaced: count(ItemStatus::Replaced),
            unmapped: count(ItemStatus::Unmapped),
            items,
        }
    }

    pub fn write(&self, path: &Path) -> Result<(), CommonError> {
        let json = serde_json::to_vec_pretty(self).map_err(|e| CommonError::json(path, e))?;
        fs::write(path, json).map_err(|e| CommonError::io(path, e))?;
        info!(report = %path.display(), "report written");
        Ok(())
    }
}
