//! Caption persistence.
//!
//! Captions go either into one consolidated `captions.txt` per run, or into
//! one `<stem>.txt` per source. Individual files land next to a local source
//! when that is enabled, otherwise in the timestamped run folder.

use chrono::{DateTime, Local};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::CaptionError;
use crate::types::{ImageSource, WritePolicy};

/// File name of the consolidated caption file inside the run folder.
pub const CONSOLIDATED_FILE_NAME: &str = "captions.txt";

/// `<base>/<YYYY-MM-DD>/<YYYY-MM-DD - HH.MM.SS>` for a run started at `started`.
pub fn run_output_dir(base: &Path, started: DateTime<Local>) -> PathBuf {
    base.join(started.format("%Y-%m-%d").to_string())
        .join(started.format("%Y-%m-%d - %H.%M.%S").to_string())
}

/// Writes captions for one run according to a [`WritePolicy`].
///
/// Directories are created on first write, so a run where nothing succeeds
/// leaves no empty folders behind.
#[derive(Debug)]
pub struct ResultWriter {
    run_dir: PathBuf,
    policy: WritePolicy,
    written: usize,
}

impl ResultWriter {
    pub fn new(run_dir: impl Into<PathBuf>, policy: WritePolicy) -> Self {
        Self {
            run_dir: run_dir.into(),
            policy: policy.normalized(),
            written: 0,
        }
    }

    pub fn run_dir(&self) -> &Path {
        &self.run_dir
    }

    pub fn consolidated_path(&self) -> PathBuf {
        self.run_dir.join(CONSOLIDATED_FILE_NAME)
    }

    /// Number of captions written so far.
    pub fn written(&self) -> usize {
        self.written
    }

    /// Persist one caption. Returns the file that was written or appended to.
    pub fn write(&mut self, source: &ImageSource, caption: &str) -> Result<PathBuf, CaptionError> {
        let stem = source.stem();

        let path = if self.policy.save_individual {
            let path = self.individual_path(source, &stem);
            self.ensure_parent(&path)?;
            fs::write(&path, caption).map_err(|e| write_error(&path, e))?;
            path
        } else {
            let path = self.consolidated_path();
            self.ensure_parent(&path)?;
            let mut file = OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| write_error(&path, e))?;
            write!(file, "=== {stem} ===\n{caption}\n\n").map_err(|e| write_error(&path, e))?;
            path
        };

        tracing::debug!("Wrote caption for {} to {:?}", source, path);
        self.written += 1;
        Ok(path)
    }

    fn individual_path(&self, source: &ImageSource, stem: &str) -> PathBuf {
        if self.policy.save_next_to_source {
            let exists = source.local_path().is_some_and(Path::exists);
            if let Some(sibling) = source.sibling_caption_path().filter(|_| exists) {
                return sibling;
            }
        }
        self.run_dir.join(format!("{stem}.txt"))
    }

    fn ensure_parent(&self, path: &Path) -> Result<(), CaptionError> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => {
                fs::create_dir_all(dir).map_err(|e| write_error(dir, e))
            }
            _ => Ok(()),
        }
    }
}

fn write_error(path: &Path, cause: std::io::Error) -> CaptionError {
    CaptionError::Write {
        path: path.to_path_buf(),
        message: cause.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn policy(individual: bool, next_to_source: bool) -> WritePolicy {
        WritePolicy {
            save_individual: individual,
            save_next_to_source: next_to_source,
            overwrite: true,
        }
    }

    #[test]
    fn test_run_output_dir_layout() {
        let started = Local.with_ymd_and_hms(2024, 3, 9, 7, 5, 2).unwrap();
        let dir = run_output_dir(Path::new("output"), started);
        assert_eq!(
            dir,
            PathBuf::from("output")
                .join("2024-03-09")
                .join("2024-03-09 - 07.05.02")
        );
    }

    #[test]
    fn test_consolidated_blocks_in_call_order() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = ResultWriter::new(tmp.path().join("run"), policy(false, false));

        writer
            .write(&ImageSource::parse("https://x/a.png"), "X")
            .unwrap();
        writer
            .write(&ImageSource::parse("https://x/b.jpg"), "Y")
            .unwrap();

        let text = fs::read_to_string(writer.consolidated_path()).unwrap();
        assert_eq!(text, "=== a ===\nX\n\n=== b ===\nY\n\n");
        assert_eq!(writer.written(), 2);
    }

    #[test]
    fn test_individual_file_in_run_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("run");
        let mut writer = ResultWriter::new(&run_dir, policy(true, false));

        let path = writer
            .write(
                &ImageSource::parse("https://x/Caf%C3%A9%20sign.png?w=1"),
                "A cafe sign.",
            )
            .unwrap();

        assert_eq!(path, run_dir.join("Café sign.txt"));
        assert_eq!(fs::read_to_string(path).unwrap(), "A cafe sign.");
    }

    #[test]
    fn test_individual_file_next_to_existing_source() {
        let tmp = tempfile::tempdir().unwrap();
        let image = tmp.path().join("photo.jpg");
        fs::write(&image, b"jpeg").unwrap();
        let run_dir = tmp.path().join("run");
        let mut writer = ResultWriter::new(&run_dir, policy(true, true));

        let path = writer
            .write(&ImageSource::parse(image.to_string_lossy()), "A photo.")
            .unwrap();

        assert_eq!(path, tmp.path().join("photo.txt"));
        assert!(!run_dir.exists());
    }

    #[test]
    fn test_next_to_source_falls_back_for_remote() {
        let tmp = tempfile::tempdir().unwrap();
        let run_dir = tmp.path().join("run");
        let mut writer = ResultWriter::new(&run_dir, policy(true, true));

        let path = writer
            .write(&ImageSource::parse("https://x/remote.png"), "Remote.")
            .unwrap();
        assert_eq!(path, run_dir.join("remote.txt"));
    }

    #[test]
    fn test_individual_overwrites_existing_file() {
        let tmp = tempfile::tempdir().unwrap();
        let mut writer = ResultWriter::new(tmp.path(), policy(true, false));
        let source = ImageSource::parse("https://x/a.png");

        writer.write(&source, "first").unwrap();
        let path = writer.write(&source, "second").unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "second");
    }

    #[test]
    fn test_unwritable_target_is_write_error() {
        let tmp = tempfile::tempdir().unwrap();
        // A file where the run directory should be
        let blocker = tmp.path().join("run");
        fs::write(&blocker, b"").unwrap();
        let mut writer = ResultWriter::new(blocker.join("nested"), policy(true, false));

        let err = writer
            .write(&ImageSource::parse("https://x/a.png"), "X")
            .unwrap_err();
        assert!(matches!(err, CaptionError::Write { .. }));
        assert_eq!(writer.written(), 0);
    }
}
