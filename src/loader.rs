use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde_json::{Value, json};
use tracing::{debug, error, info, warn};

use crate::models::{JournalData, JournalEntry, MoodData};

pub const MOODS_PATH: &str = "/data/moods.json";
pub const JOURNAL_PATH: &str = "/data/journal-entries.json";

const LOAD_FAILED_MESSAGE: &str = "Could not load content. Please try again later.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheStats {
    pub size: usize,
    pub keys: Vec<String>,
}

/// JSON loader for the static content files, cached by path.
///
/// Paths look like `/data/moods.json`; the leading `/data/` maps onto the
/// content directory.
pub struct DataLoader {
    root: PathBuf,
    cache: HashMap<String, Value>,
    messages: Vec<String>,
}

impl DataLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
            messages: Vec::new(),
        }
    }

    /// Never fails: a missing or malformed file yields the default shape for
    /// `path` and queues a user-facing message.
    pub fn fetch_json(&mut self, path: &str, use_cache: bool) -> Value {
        if use_cache {
            if let Some(value) = self.cache.get(path) {
                debug!(path, "loaded from cache");
                return value.clone();
            }
        }

        match self.read(path) {
            Ok(value) => {
                if use_cache {
                    self.cache.insert(path.to_string(), value.clone());
                    debug!(path, "cached");
                }
                value
            }
            Err(e) => {
                error!(path, error = format!("{e:#}"), "failed to load data");
                self.messages.push(LOAD_FAILED_MESSAGE.to_string());
                default_data(path)
            }
        }
    }

    fn read(&self, path: &str) -> Result<Value> {
        let relative = path
            .trim_start_matches('/')
            .trim_start_matches("data/");
        let file = self.root.join(relative);
        info!(file = %file.display(), "reading data file");
        let text = fs::read_to_string(&file)
            .with_context(|| format!("Failed to read {}", file.display()))?;
        let value = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse {}", file.display()))?;
        Ok(value)
    }

    pub fn load_moods(&mut self) -> MoodData {
        let value = self.fetch_json(MOODS_PATH, true);
        serde_json::from_value(value).unwrap_or_else(|e| {
            warn!(error = %e, "mood data has an unexpected shape");
            self.messages.push(LOAD_FAILED_MESSAGE.to_string());
            MoodData::default()
        })
    }

    pub fn load_journal(&mut self) -> Vec<JournalEntry> {
        let value = self.fetch_json(JOURNAL_PATH, true);
        serde_json::from_value::<JournalData>(value)
            .map(|d| d.entries)
            .unwrap_or_else(|e| {
                warn!(error = %e, "journal data has an unexpected shape");
                self.messages.push(LOAD_FAILED_MESSAGE.to_string());
                Vec::new()
            })
    }

    pub fn clear_cache(&mut self) {
        self.cache.clear();
        info!("data cache cleared");
    }

    pub fn cache_stats(&self) -> CacheStats {
        let mut keys: Vec<String> = self.cache.keys().cloned().collect();
        keys.sort();
        CacheStats {
            size: self.cache.len(),
            keys,
        }
    }

    /// Drains the messages queued for display since the last call.
    pub fn take_messages(&mut self) -> Vec<String> {
        std::mem::take(&mut self.messages)
    }
}

pub fn default_data(path: &str) -> Value {
    if path.contains("projects") {
        json!({ "projects": [] })
    } else if path.contains("moods") {
        json!({ "moods": [], "moodTypes": {} })
    } else if path.contains("journal") {
        json!({ "entries": [] })
    } else {
        json!({})
    }
}
