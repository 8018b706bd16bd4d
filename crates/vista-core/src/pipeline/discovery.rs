//! Input discovery: source lists and directory expansion.

use std::path::Path;
use walkdir::WalkDir;

use crate::types::is_url;

/// Extensions accepted when expanding a directory of local images.
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["jpg", "jpeg", "png", "gif", "bmp", "webp"];

/// Split newline-separated text into sources: trimmed, blank lines dropped.
pub fn parse_source_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(String::from)
        .collect()
}

/// Expands raw inputs into the flat source list handed to the resolver.
pub struct SourceDiscovery;

impl SourceDiscovery {
    /// Expand every directory input into the supported image files it contains.
    ///
    /// URLs, plain files, and paths that don't exist pass through untouched
    /// and in order; the resolver decides what happens to them.
    pub fn expand(inputs: &[String]) -> Vec<String> {
        let mut expanded = Vec::with_capacity(inputs.len());
        for input in inputs {
            let path = Path::new(input);
            if !is_url(input) && path.is_dir() {
                let found = Self::discover_dir(path);
                tracing::debug!("Expanded {:?} into {} image(s)", path, found.len());
                expanded.extend(found);
            } else {
                expanded.push(input.clone());
            }
        }
        expanded
    }

    /// Recursively find supported images under `dir`, sorted by path.
    fn discover_dir(dir: &Path) -> Vec<String> {
        let mut files: Vec<String> = WalkDir::new(dir)
            .follow_links(true)
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|entry| entry.path().is_file() && is_supported(entry.path()))
            .map(|entry| entry.path().to_string_lossy().into_owned())
            .collect();

        // Sort by path for deterministic ordering
        files.sort();
        files
    }
}

/// Check if a file has a supported image extension.
pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            let ext_lower = ext.to_lowercase();
            SUPPORTED_EXTENSIONS.iter().any(|fmt| *fmt == ext_lower)
        })
        .unwrap_or(false)
}
