use std::fmt;

use chrono::NaiveDate;
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer, Serialize};

pub const FALLBACK_COLOR: &str = "#6b7280";
pub const FALLBACK_ICON: &str = "😐";
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// One day's logged mood.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodRecord {
    pub date: String,
    pub mood: String,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub color: String,
    #[serde(default)]
    pub timestamp: i64,
}

impl MoodRecord {
    pub fn parsed_date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(&self.date, DATE_FORMAT).ok()
    }
}

pub fn date_key(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoodType {
    pub label: String,
    pub icon: String,
    pub color: String,
}

/// Static mood catalog, kept in the order the data file lists it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MoodCatalog {
    entries: Vec<(String, MoodType)>,
}

impl MoodCatalog {
    pub fn new(entries: Vec<(String, MoodType)>) -> Self {
        Self { entries }
    }

    pub fn get(&self, key: &str) -> Option<&MoodType> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, t)| t)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &MoodType)> {
        self.entries.iter().map(|(k, t)| (k.as_str(), t))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn color_for(&self, key: &str) -> &str {
        self.get(key).map(|t| t.color.as_str()).unwrap_or(FALLBACK_COLOR)
    }

    pub fn label_for<'a>(&'a self, key: &'a str) -> &'a str {
        self.get(key).map(|t| t.label.as_str()).unwrap_or(key)
    }

    pub fn icon_for(&self, key: &str) -> &str {
        self.get(key).map(|t| t.icon.as_str()).unwrap_or(FALLBACK_ICON)
    }
}

impl<'de> Deserialize<'de> for MoodCatalog {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct CatalogVisitor;

        impl<'de> Visitor<'de> for CatalogVisitor {
            type Value = MoodCatalog;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of mood keys to {label, icon, color}")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((key, value)) = map.next_entry::<String, MoodType>()? {
                    entries.retain(|(k, _): &(String, MoodType)| *k != key);
                    entries.push((key, value));
                }
                Ok(MoodCatalog { entries })
            }
        }

        deserializer.deserialize_map(CatalogVisitor)
    }
}

/// Shape of `moods.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MoodData {
    #[serde(default)]
    pub moods: Vec<MoodRecord>,
    #[serde(default, rename = "moodTypes")]
    pub mood_types: MoodCatalog,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub title: String,
    pub date: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mood: Option<String>,
    #[serde(default)]
    pub read_time: u32,
    #[serde(default)]
    pub timestamp: i64,
}

/// Shape of `journal-entries.json`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JournalData {
    #[serde(default)]
    pub entries: Vec<JournalEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_keeps_file_order() {
        let json = r##"{
            "happy": {"label": "Happy", "icon": "😊", "color": "#10b981"},
            "sad": {"label": "Sad", "icon": "😢", "color": "#6b7280"},
            "calm": {"label": "Calm", "icon": "😌", "color": "#3b82f6"}
        }"##;
        let catalog: MoodCatalog = serde_json::from_str(json).unwrap();
        let keys: Vec<&str> = catalog.keys().collect();
        assert_eq!(keys, vec!["happy", "sad", "calm"]);
        assert_eq!(catalog.color_for("calm"), "#3b82f6");
    }

    #[test]
    fn unknown_mood_falls_back() {
        let catalog = MoodCatalog::default();
        assert_eq!(catalog.color_for("bored"), FALLBACK_COLOR);
        assert_eq!(catalog.label_for("bored"), "bored");
        assert_eq!(catalog.icon_for("bored"), FALLBACK_ICON);
    }

    #[test]
    fn mood_data_tolerates_missing_sections() {
        let data: MoodData = serde_json::from_str(r#"{"moods": []}"#).unwrap();
        assert!(data.mood_types.is_empty());

        let data: MoodData =
            serde_json::from_str(r#"{"moods": [{"date": "2024-03-01", "mood": "happy"}]}"#)
                .unwrap();
        assert_eq!(data.moods[0].note, "");
        assert_eq!(
            data.moods[0].parsed_date(),
            NaiveDate::from_ymd_opt(2024, 3, 1)
        );
    }

    #[test]
    fn journal_entry_uses_camel_case() {
        let entry = JournalEntry {
            id: "journal-1".into(),
            title: "t".into(),
            date: "2024-01-01".into(),
            excerpt: String::new(),
            content: String::new(),
            tags: vec![],
            mood: None,
            read_time: 3,
            timestamp: 1,
        };
        let json = serde_json::to_string(&entry).unwrap();
        assert!(json.contains("\"readTime\":3"));
        assert!(!json.contains("mood"));
    }
}
