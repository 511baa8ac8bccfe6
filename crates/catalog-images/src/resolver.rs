/// Path resolver: turns a declared image path into one that exists.
///
/// Fallback chain, first hit wins:
/// 1. the declared path itself
/// 2. mapping rules, highest priority first
/// 3. each base directory, with the declared file name and then with every
///    supported extension swapped in
/// 4. the placeholder
///
/// The chain never fails. `resolve_product` adds a fuzzy step between 3 and 4
/// that asks the matcher for a scanned image by product name.
use std::path::{Component, Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::cache::{CachedResolution, ResolveCache};
use crate::error::CommonError;
use crate::matcher::Matcher;
use crate::model::{ImageRecord, MatchResult, Product, Resolution, ResolutionSource};
use crate::normalize::file_stem;
use crate::scanner::SUPPORTED_EXTENSIONS;

pub const DEFAULT_PLACEHOLDER: &str = "/images/product-placeholder.svg";
pub const DEFAULT_BASE_PATHS: [&str; 3] = ["/images/products", "/sitephoto", "/images"];

/// A mapping rule as written in the rules file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MappingRuleDef {
    pub pattern: String,
    pub replacement: String,
    #[serde(default)]
    pub priority: i32,
}

/// A compiled rewrite from a declared path to an alternate candidate path.
#[derive(Debug, Clone)]
pub struct MappingRule {
    pattern: Regex,
    replacement: String,
    priority: i32,
}

impl MappingRule {
    pub fn new(pattern: &str, replacement: impl Into<String>, priority: i32) -> Result<Self, CommonError> {
        let compiled = Regex::new(pattern).map_err(|source| CommonError::InvalidRule {
            pattern: pattern.to_string(),
            source,
        })?;
        Ok(Self {
            pattern: compiled,
            replacement: replacement.into(),
            priority,
        })
    }

    pub fn compile(def: &MappingRuleDef) -> Result<Self, CommonError> {
        Self::new(&def.pattern, def.replacement.clone(), def.priority)
    }

    pub fn priority(&self) -> i32 {
        self.priority
    }

    /// The rewritten path, or `None` when the pattern does not match.
    /// `$1`/`${name}` in the replacement expand to captures.
    pub fn rewrite(&self, declared: &str) -> Option<String> {
        if !self.pattern.is_match(declared) {
            return None;
        }
        Some(self.pattern.replace(declared, self.replacement.as_str()).into_owned())
    }
}

#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Web directories probed by file name, in order.
    pub base_paths: Vec<String>,
    pub rules: Vec<MappingRule>,
    pub placeholder: String,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            base_paths: DEFAULT_BASE_PATHS.iter().map(|p| p.to_string()).collect(),
            rules: Vec::new(),
            placeholder: DEFAULT_PLACEHOLDER.to_string(),
        }
    }
}

/// Existence check for a declared path.
pub trait PathProbe {
    fn exists(&self, path: &str) -> bool;
}

/// Checks web paths against the storefront's public directory on disk.
#[derive(Debug, Clone)]
pub struct FsProbe {
    public_root: PathBuf,
}

impl FsProbe {
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }
}

impl PathProbe for FsProbe {
    fn exists(&self, path: &str) -> bool {
        let raw = Path::new(path);
        // Web paths never leave the public root.
        if raw.components().any(|c| c == Component::ParentDir) {
            return false;
        }
        if raw.starts_with(&self.public_root) {
            return raw.is_file();
        }
        self.public_root.join(path.trim_start_matches('/')).is_file()
    }
}

/// A product's resolution, with the match that produced it when fuzzy matching was used.
#[derive(Debug, Clone)]
pub struct ProductResolution {
    pub resolution: Resolution,
    pub matched: Option<MatchResult>,
}

#[derive(Debug, Clone)]
pub struct PathResolver<P = FsProbe> {
    config: ResolverConfig,
    probe: P,
}

impl<P: PathProbe> PathResolver<P> {
    pub fn new(mut config: ResolverConfig, probe: P) -> Self {
        // Stable sort keeps file order among equal priorities.
        config.rules.sort_by(|a, b| b.priority.cmp(&a.priority));
        Self { config, probe }
    }

    pub fn resolve(&self, declared: &str) -> Resolution {
        let requested = declared.trim();
        if requested.is_empty() {
            return self.placeholder_for(declared);
        }
        if is_remote(requested) {
            return resolution(declared, requested, ResolutionSource::Remote);
        }
        if self.probe.exists(requested) {
            return resolution(declared, declared, ResolutionSource::Verbatim);
        }

        for rule in &self.config.rules {
            let Some(candidate) = rule.rewrite(requested) else {
                continue;
            };
            trace!(declared = requested, candidate = %candidate, priority = rule.priority, "mapping rule candidate");
            if candidate != requested && self.probe.exists(&candidate) {
                return resolution(declared, &candidate, ResolutionSource::Rule);
            }
        }

        let filename = requested.rsplit('/').next().unwrap_or(requested);
        if !filename.is_empty() {
            let stem = file_stem(filename);
            for base in &self.config.base_paths {
                let base = base.trim_end_matches('/');
                let direct = format!("{base}/{filename}");
                if self.probe.exists(&direct) {
                    return resolution(declared, &direct, ResolutionSource::BaseDir);
                }
                for ext in SUPPORTED_EXTENSIONS {
                    let swapped = format!("{base}/{stem}.{ext}");
                    if self.probe.exists(&swapped) {
                        return resolution(declared, &swapped, ResolutionSource::BaseDir);
                    }
                }
            }
        }

        debug!(declared = requested, "no existing file, using placeholder");
        self.placeholder_for(declared)
    }

    /// `resolve`, memoized in `cache` by declared path.
    pub fn resolve_cached(&self, cache: &ResolveCache, declared: &str) -> CachedResolution {
        if let Some(hit) = cache.get(declared) {
            trace!(declared, resolved = %hit.resolution.resolved, "resolution cache hit");
            return hit;
        }
        cache.insert(self.resolve(declared))
    }

    /// Resolve a product's declared image; when the chain ends at the
    /// placeholder, try the matcher over `candidates` before giving up.
    pub fn resolve_product(
        &self,
        product: &Product,
        candidates: &[ImageRecord],
        matcher: &Matcher,
    ) -> ProductResolution {
        let declared = product.declared_image().unwrap_or_default();
        let chained = self.resolve(declared);
        if !chained.is_placeholder() {
            return ProductResolution {
                resolution: chained,
                matched: None,
            };
        }

        match matcher.match_product(product, candidates) {
            Some(matched) => {
                debug!(
                    product_id = %product.id,
                    resolved = %matched.candidate.path,
                    score = matched.score,
                    "resolved by fuzzy match"
                );
                ProductResolution {
                    resolution: resolution(declared, &matched.candidate.path, ResolutionSource::Fuzzy),
                    matched: Some(matched),
                }
            }
            None => ProductResolution {
                resolution: chained,
                matched: None,
            },
        }
    }

    fn placeholder_for(&self, declared: &str) -> Resolution {
        resolution(declared, &self.config.placeholder, ResolutionSource::Placeholder)
    }
}

fn resolution(requested: &str, resolved: &str, source: ResolutionSource) -> Resolution {
    Resolution {
        requested: requested.to_string(),
        resolved: resolved.to_string(),
        source,
    }
}

fn is_remote(path: &str) -> bool {
    let lower = path.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("data:")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeProbe {
        files: HashSet<String>,
        calls: AtomicUsize,
    }

    impl FakeProbe {
        fn new(files: &[&str]) -> Self {
            Self {
                files: files.iter().map(|f| f.to_string()).collect(),
                calls: AtomicUsize::new(0),
            }
        }
    }

    impl PathProbe for FakeProbe {
        fn exists(&self, path: &str) -> bool {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.files.contains(path)
        }
    }

    fn resolver(files: &[&str], rules: Vec<MappingRule>) -> PathResolver<FakeProbe> {
        let config = ResolverConfig {
            rules,
            ..ResolverConfig::default()
        };
        PathResolver::new(config, FakeProbe::new(files))
    }

    #[test]
    fn test_existing_path_resolves_to_itself() {
        let r = resolver(&["/images/products/rice.png"], vec![]);
        let res = r.resolve("/images/products/rice.png");
        assert_eq!(res.resolved, "/images/products/rice.png");
        assert_eq!(res.source, ResolutionSource::Verbatim);
    }

    #[test]
    fn test_rules_apply_in_priority_order() {
        let rules = vec![
            MappingRule::new(r"^/img/(.+)$", "/images/low/$1", 1).unwrap(),
            MappingRule::new(r"^/img/(.+)$", "/images/high/$1", 10).unwrap(),
        ];
        let r = resolver(&["/images/low/a.png", "/images/high/a.png"], rules);
        let res = r.resolve("/img/a.png");
        assert_eq!(res.resolved, "/images/high/a.png");
        assert_eq!(res.source, ResolutionSource::Rule);
    }

    #[test]
    fn test_rule_miss_falls_through_to_lower_priority() {
        let rules = vec![
            MappingRule::new(r"^/img/(.+)$", "/images/high/$1", 10).unwrap(),
            MappingRule::new(r"^/img/(?P<file>.+)$", "/images/low/${file}", 1).unwrap(),
        ];
        let r = resolver(&["/images/low/a.png"], rules);
        assert_eq!(r.resolve("/img/a.png").resolved, "/images/low/a.png");
    }

    #[test]
    fn test_base_dirs_and_extension_swap() {
        let r = resolver(&["/sitephoto/ackee.png", "/images/products/jerk.webp"], vec![]);

        let moved = r.resolve("/old/location/ackee.png");
        assert_eq!(moved.resolved, "/sitephoto/ackee.png");
        assert_eq!(moved.source, ResolutionSource::BaseDir);

        let swapped = r.resolve("/images/products/jerk.jpg");
        assert_eq!(swapped.resolved, "/images/products/jerk.webp");
        assert_eq!(swapped.source, ResolutionSource::BaseDir);
    }

    #[test]
    fn test_unresolvable_returns_placeholder() {
        let r = resolver(&[], vec![]);
        for declared in ["/images/products/missing.png", "", "   ", "/images/products/"] {
            let res = r.resolve(declared);
            assert_eq!(res.resolved, DEFAULT_PLACEHOLDER, "for {declared:?}");
            assert!(res.is_placeholder());
        }
    }

    #[test]
    fn test_remote_urls_pass_through() {
        let r = resolver(&[], vec![]);
        let url = "https://firebasestorage.googleapis.com/v0/b/shop/o/rice.png";
        let res = r.resolve(url);
        assert_eq!(res.resolved, url);
        assert_eq!(res.source, ResolutionSource::Remote);
    }

    #[test]
    fn test_resolve_cached_skips_probe_until_invalidated() {
        let r = resolver(&["/images/products/rice.png"], vec![]);
        let cache = ResolveCache::default();

        r.resolve_cached(&cache, "/images/products/rice.png");
        let after_first = r.probe.calls.load(Ordering::SeqCst);
        r.resolve_cached(&cache, "/images/products/rice.png");
        assert_eq!(r.probe.calls.load(Ordering::SeqCst), after_first);

        cache.invalidate("/images/products/rice.png");
        r.resolve_cached(&cache, "/images/products/rice.png");
        assert!(r.probe.calls.load(Ordering::SeqCst) > after_first);
    }

    #[test]
    fn test_resolve_product_uses_fuzzy_fallback() {
        let r = resolver(&[], vec![]);
        let product: Product = serde_json::from_value(serde_json::json!({
            "id": "42",
            "name": "Premium Vinegar",
            "primaryImage": "/images/products/G-1042.png"
        }))
        .unwrap();
        let candidates = vec![ImageRecord::new(
            "/sitephoto/Apple Cider Viniger/North_Coast_Organic_Apple_Cider_Vinegar.png".to_string(),
            "North_Coast_Organic_Apple_Cider_Vinegar.png".to_string(),
            "Apple Cider Viniger".to_string(),
        )];

        let out = r.resolve_product(&product, &candidates, &Matcher::default());
        assert_eq!(out.resolution.source, ResolutionSource::Fuzzy);
        assert_eq!(out.resolution.requested, "/images/products/G-1042.png");
        assert!(out.matched.is_some());

        let none = r.resolve_product(&product, &[], &Matcher::default());
        assert!(none.resolution.is_placeholder());
        assert!(none.matched.is_none());
    }

    #[test]
    fn test_invalid_rule_is_rejected() {
        let err = MappingRule::new("([", "/x", 0).unwrap_err();
        assert!(matches!(err, CommonError::InvalidRule { .. }));
    }

    #[test]
    fn test_fs_probe_maps_web_paths_onto_public_root() {
        let tmp = tempfile::tempdir().unwrap();
        let file = tmp.path().join("images/products/rice.png");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, b"img").unwrap();

        let probe = FsProbe::new(tmp.path());
        assert!(probe.exists("/images/products/rice.png"));
        assert!(probe.exists("images/products/rice.png"));
        assert!(probe.exists(file.to_str().unwrap()));
        assert!(!probe.exists("/images/products"));
        assert!(!probe.exists("/images/products/beans.png"));
    }

    #[test]
    fn test_fs_probe_rejects_paths_leaving_public_root() {
        let tmp = tempfile::tempdir().unwrap();
        let public = tmp.path().join("public");
        std::fs::create_dir_all(public.join("images")).unwrap();
        std::fs::write(tmp.path().join("secret.png"), b"img").unwrap();

        let probe = FsProbe::new(&public);
        assert!(!probe.exists("/../secret.png"));
        assert!(!probe.exists("/images/../../secret.png"));
        let outside = public.join("../secret.png");
        assert!(!probe.exists(outside.to_str().unwrap()));

        let r = PathResolver::new(ResolverConfig::default(), probe);
        assert!(r.resolve("/../secret.png").is_placeholder());
    }

    #[test]
    fn test_existing_path_is_returned_as_declared() {
        let r = resolver(&["/images/products/rice.png"], vec![]);
        let res = r.resolve("  /images/products/rice.png ");
        assert_eq!(res.resolved, "  /images/products/rice.png ");
        assert_eq!(res.source, ResolutionSource::Verbatim);
    }
}
