mod config;
mod error;
mod server;

use rmcp::{ServiceExt, transport::stdio};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use catalog_images::cache::ResolveCache;
use catalog_images::resolver::PathResolver;
use config::Config;
use server::ImageResolverServer;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing to stderr (stdout is reserved for MCP JSON-RPC)
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    info!("starting image-resolver MCP server");

    // 1. Load config from environment
    let config = Config::from_env()?;
    info!(
        public_dir = %config.images.public_dir.display(),
        scan_dirs = config.images.scan_dirs.len(),
        rules = config.images.rules.len(),
        threshold = config.images.matcher.threshold,
        cache_capacity = config.cache_capacity,
        cache_ttl_secs = config.cache_ttl.as_secs(),
        "configuration loaded"
    );

    // 2. Build the resolver; invalid mapping rules stop startup here
    let resolver = PathResolver::new(config.images.resolver_config()?, config.images.probe());
    let cache = ResolveCache::new(config.cache_capacity, config.cache_ttl);

    // 3. Scan photo directories for fuzzy-match candidates
    let scanner = config.images.scanner();
    let scan_dirs = config.images.scan_dirs.clone();
    let candidates = {
        let scanner = scanner.clone();
        let scan_dirs = scan_dirs.clone();
        tokio::task::spawn_blocking(move || scanner.scan_all(&scan_dirs)).await?
    };
    info!(candidates = candidates.len(), "photo directories scanned");

    let server = ImageResolverServer::new(
        candidates,
        resolver,
        config.images.matcher(),
        cache,
        scanner,
        scan_dirs,
    );

    // 4. Serve on TCP when configured, otherwise stdio
    if let Some(addr) = config.tcp_listen_addr.as_deref() {
        let listener = TcpListener::bind(addr).await?;
        info!(listen_addr = %addr, "MCP server ready, serving on TCP");
        loop {
            let (stream, peer) = listener.accept().await?;
            let server = server.clone();
            tokio::spawn(async move {
                tracing::info!(peer = %peer, "MCP client connected");
                let service = server.serve(stream).await.inspect_err(|e| {
                    tracing::error!(error = %e, "MCP server error");
                })?;
                service.waiting().await?;
                tracing::info!(peer = %peer, "MCP client disconnected");
                Ok::<(), anyhow::Error>(())
            });
        }
    } else {
        info!("MCP server ready, serving on stdio");
        let service = server.serve(stdio()).await.inspect_err(|e| {
            tracing::error!(error = %e, "MCP server error");
        })?;
        service.waiting().await?;
        info!("MCP server shut down");
    }
    Ok(())
}
