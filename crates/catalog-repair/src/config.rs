use std::path::PathBuf;

use catalog_images::config::ImageConfig;

use crate::error::AppError;

const DEFAULT_CATALOG_PATH: &str = "data/products/products.json";

#[derive(Debug, Clone)]
pub struct Config {
    pub images: ImageConfig,
    /// `--catalog`, else `CATALOG_PATH`, else "data/products/products.json".
    pub catalog_path: PathBuf,
}

impl Config {
    pub fn from_env(catalog_override: Option<PathBuf>) -> Result<Self, AppError> {
        let images = ImageConfig::from_env()?;
        let catalog_path = catalog_override
            .or_else(|| std::env::var("CATALOG_PATH").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CATALOG_PATH));
        Ok(Self {
            images,
            catalog_path,
        })
    }
}
