use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::model::{Confidence, ImageRecord, Resolution, Strategy};

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResolveImageParams {
    /// Declared image path, e.g. "/images/products/jasmine-rice.png".
    pub path: String,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct ResolveProductImageParams {
    /// Product id, used only for logging.
    pub id: Option<String>,
    /// Product display name, used for fuzzy matching when the path does not resolve.
    pub name: String,
    /// Product category.
    pub category: Option<String>,
    /// Declared image path; may be empty or missing.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct MatchImageParams {
    /// Product display name.
    pub name: String,
    /// Product category.
    pub category: Option<String>,
    /// Minimum accepted score, 0-100 (default: configured threshold).
    pub threshold: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, JsonSchema)]
pub struct InvalidateCacheParams {
    /// Declared path to drop; omit to clear the whole cache.
    pub path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolveImageResponse {
    pub resolution: Resolution,
    /// When the resolution was computed (earlier than now on a cache hit).
    pub resolved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ResolveProductImageResponse {
    pub resolution: Resolution,
    /// Present when the image was found by fuzzy matching.
    pub score: Option<u32>,
    pub confidence: Option<Confidence>,
    pub strategy: Option<Strategy>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatchImageResponse {
    /// Accepted candidate, if any.
    pub matched: Option<ImageRecord>,
    /// Best score seen, even when below the threshold.
    pub score: u32,
    pub confidence: Confidence,
    pub strategy: Option<Strategy>,
    pub threshold: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct RescanImagesResponse {
    pub candidate_count: usize,
    pub scan_dirs: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct InvalidateCacheResponse {
    /// The invalidated path, or "*" for the whole cache.
    pub invalidated: String,
    pub entries_remaining: u64,
}
