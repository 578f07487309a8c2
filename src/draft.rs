use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::storage::{Storage, StorageError};

pub const STORAGE_KEY: &str = "journal_draft";
pub const MAX_AGE_DAYS: i64 = 7;
const DAY_MS: i64 = 24 * 60 * 60 * 1000;

/// The single in-progress journal entry kept for recovery.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub title: String,
    pub content: String,
    #[serde(rename = "moodId")]
    pub mood_id: Option<String>,
    pub timestamp: i64,
}

pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

pub struct DraftService {
    storage: Box<dyn Storage>,
}

impl DraftService {
    pub fn new(storage: Box<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Stores `draft` with a fresh timestamp, replacing any previous draft.
    ///
    /// On a quota error the stored draft is cleared and the write retried
    /// once. Returns `false` when nothing could be stored; no draft is left
    /// behind in that case.
    pub fn save_draft(&mut self, draft: &Draft) -> bool {
        let data = Draft {
            title: draft.title.clone(),
            content: draft.content.clone(),
            mood_id: draft.mood_id.clone().filter(|m| !m.is_empty()),
            timestamp: now_millis(),
        };
        let json = match serde_json::to_string(&data) {
            Ok(json) => json,
            Err(e) => {
                error!(error = %e, "failed to serialize draft");
                return false;
            }
        };

        match self.storage.set_item(STORAGE_KEY, &json) {
            Ok(()) => true,
            Err(StorageError::QuotaExceeded { quota }) => {
                warn!(quota, "storage quota exceeded, clearing draft and retrying");
                self.clear_draft();
                match self.storage.set_item(STORAGE_KEY, &json) {
                    Ok(()) => true,
                    Err(e) => {
                        error!(error = %e, "draft retry failed");
                        self.clear_draft();
                        false
                    }
                }
            }
            Err(e) => {
                error!(error = %e, "failed to save draft");
                false
            }
        }
    }

    /// Returns the stored draft, or `None` when absent. Malformed drafts are
    /// removed.
    pub fn load_draft(&mut self) -> Option<Draft> {
        let raw = match self.storage.get_item(STORAGE_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                error!(error = %e, "failed to read draft");
                self.clear_draft();
                return None;
            }
        };

        let value: Value = match serde_json::from_str(&raw) {
            Ok(value) => value,
            Err(e) => {
                error!(error = %e, "stored draft is not JSON, discarding");
                self.clear_draft();
                return None;
            }
        };

        match validate_draft(&value) {
            Some(draft) => Some(draft),
            None => {
                warn!("stored draft has an invalid shape, discarding");
                self.clear_draft();
                None
            }
        }
    }

    pub fn clear_draft(&mut self) {
        if let Err(e) = self.storage.remove_item(STORAGE_KEY) {
            error!(error = %e, "failed to clear draft");
        } else {
            info!("draft cleared");
        }
    }

    pub fn has_draft(&self) -> bool {
        matches!(self.storage.get_item(STORAGE_KEY), Ok(Some(_)))
    }

    /// Advisory only; expired drafts still load.
    pub fn is_draft_expired(&self, draft: &Draft) -> bool {
        is_expired_at(draft, now_millis())
    }

    /// Whole days since the draft was saved.
    pub fn get_draft_age(&self, draft: &Draft) -> i64 {
        age_days_at(draft, now_millis())
    }
}

fn validate_draft(value: &Value) -> Option<Draft> {
    let obj = value.as_object()?;
    let title = obj.get("title")?.as_str()?;
    let content = obj.get("content")?.as_str()?;
    let timestamp = obj.get("timestamp")?;
    let timestamp = timestamp
        .as_i64()
        .or_else(|| timestamp.as_f64().map(|f| f as i64))?;
    let mood_id = obj
        .get("moodId")
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(Draft {
        title: title.to_string(),
        content: content.to_string(),
        mood_id,
        timestamp,
    })
}

fn is_expired_at(draft: &Draft, now_ms: i64) -> bool {
    if draft.timestamp == 0 {
        return false;
    }
    let age_days = now_ms.saturating_sub(draft.timestamp) as f64 / DAY_MS as f64;
    age_days > MAX_AGE_DAYS as f64
}

fn age_days_at(draft: &Draft, now_ms: i64) -> i64 {
    if draft.timestamp == 0 {
        return 0;
    }
    now_ms.saturating_sub(draft.timestamp).div_euclid(DAY_MS)
}
