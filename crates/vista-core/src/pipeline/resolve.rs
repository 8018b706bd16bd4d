//! Source resolution: classify inputs and decide which ones get dispatched.

use serde::Serialize;
use std::path::Path;

use crate::types::{ImageSource, WritePolicy};

/// Partition of the input list. Every input lands in exactly one bucket.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResult {
    /// Sources that will be sent to the API
    pub to_process: Vec<ImageSource>,
    /// Local sources whose sibling caption already exists
    pub skipped_existing: Vec<ImageSource>,
    /// Local sources missing on disk
    pub not_found: Vec<ImageSource>,
    /// Number of inputs received
    pub total: usize,
}

impl ValidationResult {
    pub fn is_empty(&self) -> bool {
        self.to_process.is_empty()
    }
}

/// Classifies raw inputs against the filesystem and the write policy.
pub struct SourceResolver {
    policy: WritePolicy,
}

impl SourceResolver {
    pub fn new(policy: WritePolicy) -> Self {
        Self {
            policy: policy.normalized(),
        }
    }

    /// Resolve inputs in order. Duplicates are kept and resolved independently.
    pub fn resolve<S: AsRef<str>>(&self, inputs: &[S]) -> ValidationResult {
        let mut result = ValidationResult {
            total: inputs.len(),
            ..Default::default()
        };

        for input in inputs {
            let source = ImageSource::parse(input.as_ref());
            match source.local_path().map(Path::exists) {
                None => result.to_process.push(source),
                Some(false) => {
                    tracing::debug!("Not found: {}", source);
                    result.not_found.push(source);
                }
                Some(true) if self.has_existing_caption(&source) => {
                    tracing::debug!("Caption already exists, skipping: {}", source);
                    result.skipped_existing.push(source);
                }
                Some(true) => result.to_process.push(source),
            }
        }

        tracing::info!(
            "Validated {} source(s): {} to process, {} skipped, {} not found",
            result.total,
            result.to_process.len(),
            result.skipped_existing.len(),
            result.not_found.len()
        );
        result
    }

    fn has_existing_caption(&self, source: &ImageSource) -> bool {
        self.policy.skips_existing()
            && source
                .sibling_caption_path()
                .is_some_and(|caption| caption.exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn skip_policy() -> WritePolicy {
        WritePolicy {
            save_individual: true,
            save_next_to_source: true,
            overwrite: false,
        }
    }

    #[test]
    fn test_partitions_cover_every_input() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.jpg");
        let captioned = dir.path().join("photo.jpg");
        std::fs::write(&present, b"x").unwrap();
        std::fs::write(&captioned, b"x").unwrap();
        std::fs::write(dir.path().join("photo.txt"), b"old").unwrap();

        let inputs = vec![
            "https://x/a.png".to_string(),
            present.to_string_lossy().into_owned(),
            captioned.to_string_lossy().into_owned(),
            dir.path().join("missing.jpg").to_string_lossy().into_owned(),
            "https://x/a.png".to_string(),
        ];
        let result = SourceResolver::new(skip_policy()).resolve(&inputs);

        assert_eq!(result.total, 5);
        assert_eq!(
            result.to_process.len() + result.skipped_existing.len() + result.not_found.len(),
            result.total
        );
        assert_eq!(result.to_process.len(), 3);
        assert_eq!(result.skipped_existing.len(), 1);
        assert_eq!(result.not_found.len(), 1);
        assert_eq!(result.skipped_existing[0].stem(), "photo");
    }

    #[test]
    fn test_existing_caption_ignored_when_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.jpg");
        std::fs::write(&photo, b"x").unwrap();
        std::fs::write(dir.path().join("photo.txt"), b"old").unwrap();

        let policy = WritePolicy {
            overwrite: true,
            ..skip_policy()
        };
        let inputs = vec![photo.to_string_lossy().into_owned()];
        let result = SourceResolver::new(policy).resolve(&inputs);
        assert_eq!(result.to_process.len(), 1);
        assert!(result.skipped_existing.is_empty());
    }

    #[test]
    fn test_existing_caption_ignored_when_saving_to_run_folder() {
        let dir = tempfile::tempdir().unwrap();
        let photo = dir.path().join("photo.jpg");
        std::fs::write(&photo, b"x").unwrap();
        std::fs::write(dir.path().join("photo.txt"), b"old").unwrap();

        let policy = WritePolicy {
            save_next_to_source: false,
            ..skip_policy()
        };
        let inputs = vec![photo.to_string_lossy().into_owned()];
        let result = SourceResolver::new(policy).resolve(&inputs);
        assert_eq!(result.to_process.len(), 1);
    }

    #[test]
    fn test_remote_sources_never_checked() {
        let inputs = vec!["https://x/photo.jpg", "ftp://x/photo.jpg"];
        let result = SourceResolver::new(skip_policy()).resolve(&inputs);
        assert_eq!(result.to_process.len(), 2);
        assert!(result.not_found.is_empty());
    }

    #[test]
    fn test_empty_input() {
        let inputs: Vec<String> = vec![];
        let result = SourceResolver::new(WritePolicy::default()).resolve(&inputs);
        assert_eq!(result.total, 0);
        assert!(result.is_empty());
    }
}
