use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::CommonError;
use crate::matcher::{Matcher, MatcherConfig};
use crate::resolver::{FsProbe, MappingRule, MappingRuleDef, ResolverConfig, DEFAULT_BASE_PATHS, DEFAULT_PLACEHOLDER};
use crate::scanner::ImageScanner;

const DEFAULT_SCAN_DIRS: [&str; 2] = ["images/products", "sitephoto"];

/// Contents of the optional `IMAGE_RULES_FILE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RulesFile {
    #[serde(default)]
    pub rules: Vec<MappingRuleDef>,
    #[serde(default)]
    pub matcher: MatcherConfig,
}

impl RulesFile {
    pub fn load(path: &Path) -> Result<Self, CommonError> {
        let content = std::fs::read_to_string(path).map_err(|e| CommonError::io(path, e))?;
        serde_json::from_str(&content).map_err(|e| CommonError::json(path, e))
    }
}

/// Image resolution settings shared by the server and the repair CLI.
#[derive(Debug, Clone)]
pub struct ImageConfig {
    /// Filesystem directory that web paths are relative to.
    pub public_dir: PathBuf,
    /// Photo directories to scan, relative to `public_dir` unless absolute.
    pub scan_dirs: Vec<PathBuf>,
    /// Web directories for the resolver's file-name fallback.
    pub base_paths: Vec<String>,
    pub placeholder: String,
    pub rules: Vec<MappingRuleDef>,
    pub matcher: MatcherConfig,
}

impl ImageConfig {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `STOREFRONT_PUBLIC_DIR`: the storefront's public directory
    ///
    /// Optional:
    /// - `IMAGE_SCAN_DIRS`: OS path list of photo directories (default "images/products:sitephoto")
    /// - `IMAGE_BASE_PATHS`: comma-separated web directories for fallback lookups
    /// - `IMAGE_PLACEHOLDER`: placeholder web path
    /// - `IMAGE_RULES_FILE`: JSON file with mapping rules and matcher settings
    /// - `MATCH_THRESHOLD`: overrides the matcher's acceptance threshold
    pub fn from_env() -> Result<Self, CommonError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, CommonError> {
        let public_dir = lookup("STOREFRONT_PUBLIC_DIR").ok_or_else(|| {
            CommonError::Config("STOREFRONT_PUBLIC_DIR environment variable is required".to_string())
        })?;
        let public_dir = PathBuf::from(public_dir);
        if !public_dir.is_dir() {
            return Err(CommonError::Config(format!(
                "public directory not found: {}",
                public_dir.display()
            )));
        }

        let scan_dirs = match lookup("IMAGE_SCAN_DIRS").filter(|v| !v.trim().is_empty()) {
            Some(value) => std::env::split_paths(&value).collect(),
            None => DEFAULT_SCAN_DIRS.iter().map(PathBuf::from).collect(),
        };

        let base_paths = match lookup("IMAGE_BASE_PATHS").filter(|v| !v.trim().is_empty()) {
            Some(value) => value
                .split(',')
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .map(str::to_string)
                .collect(),
            None => DEFAULT_BASE_PATHS.iter().map(|p| p.to_string()).collect(),
        };

        let placeholder = lookup("IMAGE_PLACEHOLDER")
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_PLACEHOLDER.to_string());

        let rules_file = match lookup("IMAGE_RULES_FILE") {
            Some(path) => RulesFile::load(Path::new(&path))?,
            None => RulesFile::default(),
        };

        let mut matcher = rules_file.matcher;
        if let Some(raw) = lookup("MATCH_THRESHOLD") {
            matcher.threshold = parse_threshold(&raw)?;
        }

        Ok(Self {
            public_dir,
            scan_dirs,
            base_paths,
            placeholder,
            rules: rules_file.rules,
            matcher,
        })
    }

    /// Compile the mapping rules; an invalid pattern is a configuration error.
    pub fn resolver_config(&self) -> Result<ResolverConfig, CommonError> {
        let rules = self
            .rules
            .iter()
            .map(MappingRule::compile)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ResolverConfig {
            base_paths: self.base_paths.clone(),
            rules,
            placeholder: self.placeholder.clone(),
        })
    }

    pub fn scanner(&self) -> ImageScanner {
        ImageScanner::new(&self.public_dir)
    }

    pub fn probe(&self) -> FsProbe {
        FsProbe::new(&self.public_dir)
    }

    pub fn matcher(&self) -> Matcher {
        Matcher::new(self.matcher.clone())
    }
}

/// Parse a 0–100 match threshold.
pub fn parse_threshold(raw: &str) -> Result<u32, CommonError> {
    raw.trim()
        .parse::<u32>()
        .ok()
        .filter(|t| *t <= 100)
        .ok_or_else(|| CommonError::Config(format!("MATCH_THRESHOLD must be 0-100, got '{raw}'")))
}
