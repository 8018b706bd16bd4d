//! Named instruction presets loaded from `presets.json`.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::VistaError;

pub const DEFAULT_PRESET_TITLE: &str = "Basic Description";
pub const DEFAULT_PRESET_TEXT: &str = "What's in this image?";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preset {
    pub title: String,
    pub text: String,
}

impl Default for Preset {
    fn default() -> Self {
        Self {
            title: DEFAULT_PRESET_TITLE.to_string(),
            text: DEFAULT_PRESET_TEXT.to_string(),
        }
    }
}

/// On-disk shape; entries missing a field are tolerated and dropped.
#[derive(Deserialize)]
struct PresetFile {
    #[serde(default)]
    presets: Vec<RawPreset>,
}

#[derive(Serialize)]
struct PresetFileRef<'a> {
    presets: &'a [Preset],
}

#[derive(Deserialize)]
struct RawPreset {
    title: Option<String>,
    text: Option<String>,
}

/// Load presets from `path`.
///
/// A missing or unreadable file, invalid JSON, or a file with no complete
/// entries all yield the single default preset.
pub fn load_presets(path: &Path) -> Vec<Preset> {
    let presets = match std::fs::read_to_string(path) {
        Ok(text) => parse_presets(&text).unwrap_or_else(|e| {
            tracing::warn!("Failed to parse presets {:?}: {}", path, e);
            Vec::new()
        }),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
        Err(e) => {
            tracing::warn!("Failed to read presets {:?}: {}", path, e);
            Vec::new()
        }
    };

    if presets.is_empty() {
        tracing::debug!("No usable presets at {:?}, using default", path);
        vec![Preset::default()]
    } else {
        presets
    }
}

fn parse_presets(text: &str) -> Result<Vec<Preset>, serde_json::Error> {
    let file: PresetFile = serde_json::from_str(text)?;
    Ok(file
        .presets
        .into_iter()
        .filter_map(|raw| match (raw.title, raw.text) {
            (Some(title), Some(text)) => Some(Preset { title, text }),
            _ => None,
        })
        .collect())
}

/// Write presets as pretty JSON, creating the parent directory.
pub fn write_presets(path: &Path, presets: &[Preset]) -> Result<(), VistaError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(&PresetFileRef { presets })?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Find a preset by title, ignoring case.
pub fn find_preset<'a>(presets: &'a [Preset], title: &str) -> Option<&'a Preset> {
    presets
        .iter()
        .find(|preset| preset.title.eq_ignore_ascii_case(title))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_yields_default() {
        let presets = load_presets(Path::new("/nonexistent/presets.json"));
        assert_eq!(presets, vec![Preset::default()]);
    }

    #[test]
    fn test_incomplete_entries_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("presets.json");
        std::fs::write(
            &path,
            r#"{"presets": [
                {"title": "Alt text", "text": "Write concise alt text."},
                {"title": "No text"},
                {"text": "No title"}
            ]}"#,
        )
        .unwrap();

        let presets = load_presets(&path);
        assert_eq!(presets.len(), 1);
        assert_eq!(presets[0].title, "Alt text");
    }

    #[test]
    fn test_invalid_json_yields_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("presets.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_presets(&path), vec![Preset::default()]);
    }

    #[test]
    fn test_empty_list_yields_default() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("presets.json");
        std::fs::write(&path, r#"{"presets": []}"#).unwrap();
        assert_eq!(load_presets(&path), vec![Preset::default()]);
    }

    #[test]
    fn test_written_presets_load_back() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("nested").join("presets.json");
        let presets = vec![
            Preset::default(),
            Preset {
                title: "Alt text".to_string(),
                text: "Write concise alt text.".to_string(),
            },
        ];
        write_presets(&path, &presets).unwrap();
        assert_eq!(load_presets(&path), presets);
    }

    #[test]
    fn test_find_preset_ignores_case() {
        let presets = vec![
            Preset::default(),
            Preset {
                title: "Tags".to_string(),
                text: "List tags.".to_string(),
            },
        ];
        assert_eq!(find_preset(&presets, "tags").map(|p| p.text.as_str()), Some("List tags."));
        assert!(find_preset(&presets, "missing").is_none());
    }
}
