/// Directory scanner for product photos.
///
/// Walks one or more photo directories and produces an `ImageRecord` per image
/// file. A missing directory yields no records rather than an error: the
/// resolver runs on request paths that must never fail because a folder was
/// moved.
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::model::ImageRecord;

/// Image extensions the scanner and the resolver's extension swap accept, in probe order.
pub const SUPPORTED_EXTENSIONS: [&str; 7] = ["jpg", "jpeg", "png", "webp", "gif", "avif", "svg"];

/// Returns `true` if `path` has an allowed image extension (case-insensitive).
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| {
            let ext = ext.to_ascii_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|e| *e == ext)
        })
}

#[derive(Debug, Clone)]
pub struct ImageScanner {
    public_root: PathBuf,
}

impl ImageScanner {
    /// `public_root` is the directory web paths are relative to (the storefront's `public/`).
    pub fn new(public_root: impl Into<PathBuf>) -> Self {
        Self {
            public_root: public_root.into(),
        }
    }

    /// Recursively list image files under `dir`, sorted by path.
    ///
    /// A relative `dir` is taken relative to the public root.
    pub fn scan(&self, dir: &Path) -> Vec<ImageRecord> {
        let root = if dir.is_absolute() {
            dir.to_path_buf()
        } else {
            self.public_root.join(dir)
        };

        if !root.is_dir() {
            debug!(dir = %root.display(), "scan root missing, no candidates");
            return Vec::new();
        }

        let mut records = Vec::new();
        for entry in WalkDir::new(&root).follow_links(true) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable entry during scan");
                    continue;
                }
            };
            if !entry.file_type().is_file() || !is_supported_image(entry.path()) {
                continue;
            }

            let path = entry.path();
            let Some(filename) = path.file_name().and_then(|n| n.to_str()) else {
                warn!(path = %path.display(), "skipping non-utf8 file name");
                continue;
            };
            let category = path
                .parent()
                .and_then(|p| p.file_name())
                .and_then(|n| n.to_str())
                .unwrap_or_default()
                .to_string();

            records.push(ImageRecord::new(
                self.web_path(path),
                filename.to_string(),
                category,
            ));
        }

        records.sort_by(|a, b| a.path.cmp(&b.path));
        debug!(dir = %root.display(), count = records.len(), "scan complete");
        records
    }

    /// Scan every directory, merging the results and dropping duplicate paths
    /// (nested or repeated roots).
    pub fn scan_all(&self, dirs: &[PathBuf]) -> Vec<ImageRecord> {
        let mut records: Vec<ImageRecord> = dirs.iter().flat_map(|d| self.scan(d)).collect();
        records.sort_by(|a, b| a.path.cmp(&b.path));
        records.dedup_by(|a, b| a.path == b.path);
        records
    }

    fn web_path(&self, path: &Path) -> String {
        match path.strip_prefix(&self.public_root) {
            Ok(rel) => {
                let parts: Vec<String> = rel
                    .components()
                    .map(|c| c.as_os_str().to_string_lossy().into_owned())
                    .collect();
                format!("/{}", parts.join("/"))
            }
            Err(_) => path.display().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"img").unwrap();
    }

    #[test]
    fn test_scan_filters_extensions_and_sets_category() {
        let tmp = tempfile::tempdir().unwrap();
        let public = tmp.path();
        touch(&public.join("images/products/Apple Cider Viniger/North_Coast_Organic_Apple_Cider_Vinegar.png"));
        touch(&public.join("images/products/Rice/JASMINE.JPG"));
        touch(&public.join("images/products/Rice/notes.txt"));
        touch(&public.join("images/products/Rice/.DS_Store"));

        let scanner = ImageScanner::new(public);
        let records = scanner.scan(Path::new("images/products"));

        assert_eq!(records.len(), 2);
        assert_eq!(
            records[0].path,
            "/images/products/Apple Cider Viniger/North_Coast_Organic_Apple_Cider_Vinegar.png"
        );
        assert_eq!(records[0].category, "Apple Cider Viniger");
        assert_eq!(records[0].stem, "north coast organic apple cider vinegar");
        assert_eq!(records[1].filename, "JASMINE.JPG");
        assert_eq!(records[1].category, "Rice");
    }

    #[test]
    fn test_scan_missing_or_empty_dir_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let scanner = ImageScanner::new(tmp.path());

        assert!(scanner.scan(Path::new("does/not/exist")).is_empty());

        fs::create_dir_all(tmp.path().join("empty")).unwrap();
        assert!(scanner.scan(Path::new("empty")).is_empty());
    }

    #[test]
    fn test_scan_all_dedups_overlapping_roots() {
        let tmp = tempfile::tempdir().unwrap();
        touch(&tmp.path().join("sitephoto/Spices/curry.webp"));
        touch(&tmp.path().join("sitephoto/Oils/palm-oil.avif"));

        let scanner = ImageScanner::new(tmp.path());
        let records = scanner.scan_all(&[
            PathBuf::from("sitephoto"),
            PathBuf::from("sitephoto/Spices"),
            PathBuf::from("missing"),
        ]);

        let paths: Vec<&str> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, vec!["/sitephoto/Oils/palm-oil.avif", "/sitephoto/Spices/curry.webp"]);
    }

    #[test]
    fn test_is_supported_image() {
        assert!(is_supported_image(Path::new("a/b.SVG")));
        assert!(is_supported_image(Path::new("b.jpeg")));
        assert!(!is_supported_image(Path::new("b.tiff")));
        assert!(!is_supported_image(Path::new("noext")));
    }
}
