use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// An image file discovered by the directory scanner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ImageRecord {
    /// Web path (e.g. "/images/products/Rice/jasmine.png") when the file sits
    /// under the public root, otherwise the path as scanned.
    pub path: String,
    /// File name including extension.
    pub filename: String,
    /// Name of the directory that holds the file.
    pub category: String,
    /// Normalized file name without extension. Derived, never serialized.
    #[serde(default, skip_serializing)]
    #[schemars(skip)]
    pub stem: String,
}

impl ImageRecord {
    pub fn new(path: String, filename: String, category: String) -> Self {
        let stem = crate::normalize::normalize_words(crate::normalize::file_stem(&filename));
        Self {
            path,
            filename,
            category,
            stem,
        }
    }
}

/// A catalog entry from `products.json`.
///
/// Only the fields the image tooling reads are typed; everything else is
/// carried through `extra` so a rewrite never drops data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub images: Option<Vec<String>>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Product {
    /// The image the storefront would render: `primaryImage`, else the first of `images`.
    pub fn declared_image(&self) -> Option<&str> {
        self.primary_image
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .or_else(|| {
                self.images
                    .as_ref()
                    .and_then(|imgs| imgs.iter().find(|p| !p.trim().is_empty()))
                    .map(String::as_str)
            })
    }
}

/// Scoring strategies, in the order the matcher attempts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    ExactName,
    Category,
    WordOverlap,
    KeywordGroup,
    BrandWord,
}

impl Strategy {
    /// Bonus strategies add to the base score instead of competing with it.
    pub fn is_bonus(self) -> bool {
        matches!(self, Strategy::KeywordGroup | Strategy::BrandWord)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Confidence {
    Low,
    Medium,
    High,
}

/// An accepted pairing of a product with a scanned image.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct MatchResult {
    pub product_id: String,
    pub product_name: String,
    pub candidate: ImageRecord,
    /// 0–100.
    pub score: u32,
    pub confidence: Confidence,
    pub strategy: Strategy,
}

/// Which step of the fallback chain produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    Verbatim,
    Rule,
    BaseDir,
    Fuzzy,
    Remote,
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Resolution {
    /// The path as declared by the caller.
    pub requested: String,
    /// A path that exists, a remote URL, or the placeholder.
    pub resolved: String,
    pub source: ResolutionSource,
}

impl Resolution {
    pub fn is_placeholder(&self) -> bool {
        self.source == ResolutionSource::Placeholder
    }
}
