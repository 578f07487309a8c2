use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{error, info, warn};

use crate::models::JournalEntry;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to serialize entry: {0}")]
    Serialize(#[from] serde_json::Error),
    #[error("failed to write export file: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    File(PathBuf),
    /// The file could not be written; the JSON is shown for copying instead.
    Inline(String),
}

pub struct ExportService {
    dir: PathBuf,
}

impl ExportService {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// `journal-YYYY-MM-DD-HHmmss.json`
    pub fn generate_filename(now: DateTime<Local>) -> String {
        format!("journal-{}.json", now.format("%Y-%m-%d-%H%M%S"))
    }

    pub fn export_to_json(
        &self,
        entry: &JournalEntry,
        now: DateTime<Local>,
    ) -> Result<ExportOutcome, ExportError> {
        let json = serde_json::to_string_pretty(entry)?;
        let path = self.dir.join(Self::generate_filename(now));

        match self.write(&path, &json) {
            Ok(()) => {
                info!(path = %path.display(), id = %entry.id, "journal entry exported");
                Ok(ExportOutcome::File(path))
            }
            Err(e) => {
                warn!(error = %e, "export file not written, showing JSON inline");
                Ok(ExportOutcome::Inline(json))
            }
        }
    }

    fn write(&self, path: &Path, json: &str) -> Result<(), ExportError> {
        fs::create_dir_all(&self.dir)?;
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, json)?;
        fs::rename(&temp_path, path).inspect_err(|e| {
            error!(error = %e, "rename of export file failed");
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn entry() -> JournalEntry {
        JournalEntry {
            id: "journal-1".into(),
            title: "Title".into(),
            date: "2024-05-03".into(),
            excerpt: "Excerpt".into(),
            content: "<p class=\"md-paragraph\">Body</p>".into(),
            tags: vec!["personal".into()],
            mood: Some("happy".into()),
            read_time: 1,
            timestamp: 1,
        }
    }

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 5, 3, 7, 8, 9).unwrap()
    }

    #[test]
    fn filename_format() {
        assert_eq!(
            ExportService::generate_filename(at()),
            "journal-2024-05-03-070809.json"
        );
    }

    #[test]
    fn writes_pretty_json() {
        let tmp = tempfile::tempdir().unwrap();
        let service = ExportService::new(tmp.path().join("exports"));

        let outcome = service.export_to_json(&entry(), at()).unwrap();
        let ExportOutcome::File(path) = outcome else {
            panic!("expected a file");
        };
        let text = fs::read_to_string(path).unwrap();
        assert!(text.contains("\n  \"title\": \"Title\""));
        let back: JournalEntry = serde_json::from_str(&text).unwrap();
        assert_eq!(back, entry());
    }

    #[test]
    fn unwritable_dir_falls_back_to_inline() {
        let tmp = tempfile::tempdir().unwrap();
        let blocker = tmp.path().join("file");
        fs::write(&blocker, "not a dir").unwrap();
        let service = ExportService::new(blocker.join("exports"));

        match service.export_to_json(&entry(), at()).unwrap() {
            ExportOutcome::Inline(json) => assert!(json.contains("journal-1")),
            other => panic!("expected inline fallback, got {other:?}"),
        }
    }
}
