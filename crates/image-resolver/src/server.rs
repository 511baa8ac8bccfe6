/// MCP server implementation for storefront image resolution.
///
/// Exposes five tools:
/// - `resolve_image`: Resolve a declared image path through the fallback chain (cached)
/// - `resolve_product_image`: Resolve a product's image, falling back to fuzzy matching
/// - `match_image`: Find the best scanned image for a product name
/// - `rescan_images`: Re-walk the photo directories and clear the cache
/// - `invalidate_cache`: Drop one cached resolution or all of them
use std::path::PathBuf;
use std::sync::Arc;

use rmcp::{
    Json, ServerHandler,
    handler::server::router::tool::ToolRouter,
    handler::server::wrapper::Parameters,
    model::*,
    tool, tool_handler, tool_router,
};
use tokio::sync::RwLock;
use tracing::info;

use catalog_images::cache::ResolveCache;
use catalog_images::matcher::Matcher;
use catalog_images::mcp_api::{
    InvalidateCacheParams, InvalidateCacheResponse, MatchImageParams, MatchImageResponse,
    RescanImagesResponse, ResolveImageParams, ResolveImageResponse, ResolveProductImageParams,
    ResolveProductImageResponse,
};
use catalog_images::model::{ImageRecord, Product};
use catalog_images::resolver::PathResolver;
use catalog_images::scanner::ImageScanner;

// --- MCP Server ---

/// Scanned candidates, replaced wholesale on rescan.
pub struct AppState {
    pub candidates: Vec<ImageRecord>,
}

#[derive(Clone)]
pub struct ImageResolverServer {
    state: Arc<RwLock<AppState>>,
    resolver: Arc<PathResolver>,
    matcher: Arc<Matcher>,
    cache: ResolveCache,
    scanner: ImageScanner,
    scan_dirs: Arc<Vec<PathBuf>>,
    tool_router: ToolRouter<ImageResolverServer>,
}

impl ImageResolverServer {
    pub fn new(
        candidates: Vec<ImageRecord>,
        resolver: PathResolver,
        matcher: Matcher,
        cache: ResolveCache,
        scanner: ImageScanner,
        scan_dirs: Vec<PathBuf>,
    ) -> Self {
        Self {
            state: Arc::new(RwLock::new(AppState { candidates })),
            resolver: Arc::new(resolver),
            matcher: Arc::new(matcher),
            cache,
            scanner,
            scan_dirs: Arc::new(scan_dirs),
            tool_router: Self::tool_router(),
        }
    }
}

#[tool_router]
impl ImageResolverServer {
    #[tool(description = "Resolve a declared product image path to one that exists on disk. Tries the path itself, mapping rules, and the configured base directories with alternate extensions; returns the placeholder image when nothing exists.")]
    async fn resolve_image(
        &self,
        Parameters(params): Parameters<ResolveImageParams>,
    ) -> Result<Json<ResolveImageResponse>, String> {
        // Held across resolve and insert so a concurrent rescan clears this entry.
        let _state = self.state.read().await;
        let entry = self.resolver.resolve_cached(&self.cache, &params.path);
        Ok(Json(ResolveImageResponse {
            resolution: entry.resolution,
            resolved_at: entry.resolved_at,
        }))
    }

    #[tool(description = "Resolve the image for a product. Like resolve_image, but when the declared path cannot be resolved, picks the best-matching scanned photo by product name and category before falling back to the placeholder.")]
    async fn resolve_product_image(
        &self,
        Parameters(params): Parameters<ResolveProductImageParams>,
    ) -> Result<Json<ResolveProductImageResponse>, String> {
        let name = params.name.trim().to_string();
        if name.is_empty() {
            return Err("name must not be empty".to_string());
        }

        let product = Product {
            id: params.id.unwrap_or_default(),
            name,
            category: params.category,
            primary_image: params.path,
            images: None,
            extra: Default::default(),
        };

        let state = self.state.read().await;
        let outcome = self
            .resolver
            .resolve_product(&product, &state.candidates, &self.matcher);

        Ok(Json(ResolveProductImageResponse {
            resolution: outcome.resolution,
            score: outcome.matched.as_ref().map(|m| m.score),
            confidence: outcome.matched.as_ref().map(|m| m.confidence),
            strategy: outcome.matched.as_ref().map(|m| m.strategy),
        }))
    }

    #[tool(description = "Find the best scanned product photo for a product name and optional category. Returns the match only when its score (0-100) reaches the threshold; the best score is always reported.")]
    async fn match_image(
        &self,
        Parameters(params): Parameters<MatchImageParams>,
    ) -> Result<Json<MatchImageResponse>, String> {
        let name = params.name.trim().to_string();
        if name.is_empty() {
            return Err("name must not be empty".to_string());
        }
        let threshold = params
            .threshold
            .unwrap_or(self.matcher.config().threshold)
            .min(100);

        let state = self.state.read().await;
        let outcome = self.matcher.best_match_with_threshold(
            &name,
            params.category.as_deref(),
            &state.candidates,
            threshold,
        );

        Ok(Json(MatchImageResponse {
            matched: outcome.candidate.cloned(),
            score: outcome.score,
            confidence: outcome.confidence,
            strategy: outcome.strategy,
            threshold,
        }))
    }

    #[tool(description = "Re-scan the configured photo directories, replace the candidate list used for matching, and clear the resolution cache. Use after images are added, moved, or deleted.")]
    async fn rescan_images(&self) -> Result<Json<RescanImagesResponse>, String> {
        info!("rescan_images tool invoked");

        let scanner = self.scanner.clone();
        let scan_dirs = Arc::clone(&self.scan_dirs);
        let candidates = tokio::task::spawn_blocking(move || scanner.scan_all(&scan_dirs))
            .await
            .map_err(|e| format!("rescan failed: {e}"))?;
        let candidate_count = candidates.len();

        {
            let mut state = self.state.write().await;
            state.candidates = candidates;
            self.cache.invalidate_all();
        }
        info!(candidate_count, "candidates replaced, cache cleared");

        Ok(Json(RescanImagesResponse {
            candidate_count,
            scan_dirs: self
                .scan_dirs
                .iter()
                .map(|d| d.display().to_string())
                .collect(),
        }))
    }

    #[tool(description = "Invalidate cached path resolutions. Pass a path to drop a single entry, or omit it to clear everything.")]
    async fn invalidate_cache(
        &self,
        Parameters(params): Parameters<InvalidateCacheParams>,
    ) -> Result<Json<InvalidateCacheResponse>, String> {
        let invalidated = match params.path.filter(|p| !p.is_empty()) {
            Some(path) => {
                self.cache.invalidate(&path);
                path
            }
            None => {
                self.cache.invalidate_all();
                "*".to_string()
            }
        };
        info!(invalidated = %invalidated, "resolution cache invalidated");

        Ok(Json(InvalidateCacheResponse {
            invalidated,
            entries_remaining: self.cache.entry_count(),
        }))
    }
}

#[tool_handler]
impl ServerHandler for ImageResolverServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_06_18,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "image-resolver".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: None,
                icons: None,
                website_url: None,
            },
            instructions: Some(
                "Storefront image resolver. Use resolve_image to turn a declared product \
                 image path into one that exists (or the placeholder), resolve_product_image \
                 when the product name is known, match_image to search scanned photos by \
                 name, and rescan_images / invalidate_cache after the photo directories change."
                    .to_string(),
            ),
        }
    }
}
