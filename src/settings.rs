use std::env;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

const APP_DIR_NAME: &str = "moodjournal";
const DEFAULT_STORAGE_QUOTA: u64 = 5 * 1024 * 1024; // 5 MiB, same order as browser local storage

/// Runtime configuration resolved once at startup.
#[derive(Debug, Clone)]
pub struct Settings {
    /// Root for drafts, logs and anything else the app writes.
    pub data_dir: PathBuf,
    /// Where `moods.json` and `journal-entries.json` are read from.
    pub content_dir: PathBuf,
    pub export_dir: PathBuf,
    pub storage_quota: u64,
    pub debug: bool,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let data_dir = match env::var_os("MOODJOURNAL_DATA_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => dirs::data_dir()
                .map(|d| d.join(APP_DIR_NAME))
                .ok_or_else(|| anyhow::anyhow!("Could not determine data directory"))?,
        };

        let content_dir = env::var_os("MOODJOURNAL_CONTENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("data"));

        let export_dir = env::var_os("MOODJOURNAL_EXPORT_DIR")
            .map(PathBuf::from)
            .or_else(dirs::download_dir)
            .unwrap_or_else(|| data_dir.join("exports"));

        let storage_quota = match env::var("MOODJOURNAL_STORAGE_QUOTA") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("MOODJOURNAL_STORAGE_QUOTA is not a byte count: {raw}"))?,
            Err(_) => DEFAULT_STORAGE_QUOTA,
        };

        let debug = env::args().any(|a| a == "--debug")
            || env::var("MOODJOURNAL_DEBUG").is_ok_and(|v| v == "1" || v == "true");

        Ok(Self {
            data_dir,
            content_dir,
            export_dir,
            storage_quota,
            debug,
        })
    }

    pub fn log_dir(&self) -> PathBuf {
        self.data_dir.join("logs")
    }

    pub fn storage_dir(&self) -> PathBuf {
        self.data_dir.join("storage")
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.data_dir, &self.content_dir, &self.log_dir(), &self.storage_dir()] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {}", dir.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
impl Settings {
    pub fn for_dir(root: &std::path::Path) -> Self {
        Self {
            data_dir: root.to_path_buf(),
            content_dir: root.join("data"),
            export_dir: root.join("exports"),
            storage_quota: DEFAULT_STORAGE_QUOTA,
            debug: false,
        }
    }
}
