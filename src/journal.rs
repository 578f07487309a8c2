use std::cmp::Reverse;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::KeyEvent;
use tracing::{debug, info};
use tui_textarea::TextArea;

use crate::debounce::Debouncer;
use crate::input;
use crate::loader::DataLoader;
use crate::models::{DATE_FORMAT, JournalEntry};

pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(300);
const DEFAULT_READ_TIME: u32 = 5;

/// Debounced free-text search over entry titles and excerpts.
pub struct SearchBox {
    entries: Vec<JournalEntry>,
    query: TextArea<'static>,
    pending: Debouncer<String>,
}

impl Default for SearchBox {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchBox {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            query: TextArea::default(),
            pending: Debouncer::new(SEARCH_DEBOUNCE),
        }
    }

    pub fn set_entries(&mut self, entries: Vec<JournalEntry>) {
        debug!(count = entries.len(), "search entries set");
        self.entries = entries;
    }

    /// Replaces the query text and schedules a search.
    pub fn input(&mut self, query: &str, now: Instant) {
        self.query = input::textarea_with(query);
        self.pending.call(query.to_string(), now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if input::feed(&mut self.query, key, None, false) {
            self.pending.call(self.current_query(), now);
        }
    }

    /// Results of a search whose quiet period has ended.
    pub fn poll(&mut self, now: Instant) -> Option<Vec<JournalEntry>> {
        let query = self.pending.poll(now)?;
        Some(self.handle_search(&query))
    }

    /// Case-insensitive substring match on title or excerpt. An empty query
    /// matches everything.
    pub fn handle_search(&self, query: &str) -> Vec<JournalEntry> {
        let normalized = query.trim().to_lowercase();
        if normalized.is_empty() {
            return self.entries.clone();
        }
        let results: Vec<JournalEntry> = self
            .entries
            .iter()
            .filter(|e| {
                e.title.to_lowercase().contains(&normalized)
                    || e.excerpt.to_lowercase().contains(&normalized)
            })
            .cloned()
            .collect();
        info!(query = %normalized, results = results.len(), "search ran");
        results
    }

    /// Empties the box and returns every entry immediately.
    pub fn clear(&mut self) -> Vec<JournalEntry> {
        self.pending.cancel();
        self.query = TextArea::default();
        debug!("search cleared");
        self.entries.clone()
    }

    pub fn current_query(&self) -> String {
        input::text_of(&self.query)
    }

    pub fn query_area(&self) -> &TextArea<'static> {
        &self.query
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }
}

/// Read-only journal list with tag, mood and search filters.
pub struct JournalSystem {
    entries: Vec<JournalEntry>,
    current_tag: Option<String>,
    current_mood: Option<String>,
    /// Entries matched by the last search; `None` when no search narrows the list.
    search_hits: Option<Vec<JournalEntry>>,
    selected: usize,
    pub search: SearchBox,
}

impl Default for JournalSystem {
    fn default() -> Self {
        Self::new()
    }
}

impl JournalSystem {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            current_tag: None,
            current_mood: None,
            search_hits: None,
            selected: 0,
            search: SearchBox::new(),
        }
    }

    pub fn load_entries(&mut self, loader: &mut DataLoader) {
        let entries = loader
            .load_journal()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| with_defaults(index, entry))
            .collect();
        self.set_entries(entries);
        info!(count = self.entries.len(), "journal entries loaded");
    }

    pub fn reload(&mut self, loader: &mut DataLoader) {
        loader.clear_cache();
        self.load_entries(loader);
    }

    fn set_entries(&mut self, mut entries: Vec<JournalEntry>) {
        sort_entries_by_date(&mut entries);
        self.entries = entries;
        self.search.set_entries(self.entries.clone());
        self.search_hits = None;
        self.selected = 0;
    }

    /// Adds a newly written entry to the in-memory list.
    pub fn add_entry(&mut self, entry: JournalEntry) {
        info!(id = %entry.id, "journal entry added");
        let mut entries = std::mem::take(&mut self.entries);
        entries.push(entry);
        self.set_entries(entries);

        let query = self.search.current_query();
        if !query.trim().is_empty() {
            let results = self.search.handle_search(&query);
            self.apply_search(&results);
        }
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn filter_by_tag(&mut self, tag: &str) {
        info!(tag, "journal filtered by tag");
        self.current_tag = Some(tag.to_string());
        self.selected = 0;
    }

    pub fn filter_by_mood(&mut self, mood: &str) {
        info!(mood, "journal filtered by mood");
        self.current_mood = Some(mood.to_string());
        self.selected = 0;
    }

    /// Drops the tag and mood filters.
    pub fn show_all(&mut self) {
        self.current_tag = None;
        self.current_mood = None;
        self.selected = 0;
    }

    pub fn current_tag(&self) -> Option<&str> {
        self.current_tag.as_deref()
    }

    pub fn current_mood(&self) -> Option<&str> {
        self.current_mood.as_deref()
    }

    pub fn apply_search(&mut self, results: &[JournalEntry]) {
        self.search_hits = if results.len() == self.entries.len() {
            None
        } else {
            Some(results.to_vec())
        };
        self.selected = 0;
    }

    pub fn filtered_entries(&self) -> Vec<&JournalEntry> {
        self.entries
            .iter()
            .filter(|e| {
                self.current_tag
                    .as_ref()
                    .is_none_or(|tag| e.tags.contains(tag))
            })
            .filter(|e| {
                self.current_mood
                    .as_ref()
                    .is_none_or(|mood| e.mood.as_ref() == Some(mood))
            })
            .filter(|e| {
                self.search_hits
                    .as_ref()
                    .is_none_or(|hits| hits.contains(e))
            })
            .collect()
    }

    pub fn get_all_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .entries
            .iter()
            .flat_map(|e| e.tags.iter().cloned())
            .collect();
        tags.sort();
        tags.dedup();
        tags
    }

    pub fn get_entries_count_by_tag(&self, tag: &str) -> usize {
        self.entries
            .iter()
            .filter(|e| e.tags.iter().any(|t| t == tag))
            .count()
    }

    pub fn selected(&self) -> usize {
        self.selected
    }

    pub fn select(&mut self, index: usize) {
        let len = self.filtered_entries().len();
        self.selected = index.min(len.saturating_sub(1));
    }

    pub fn select_next(&mut self) {
        self.select(self.selected + 1);
    }

    pub fn select_prev(&mut self) {
        self.select(self.selected.saturating_sub(1));
    }

    pub fn selected_entry(&self) -> Option<&JournalEntry> {
        self.filtered_entries().get(self.selected).copied()
    }
}

fn with_defaults(index: usize, mut entry: JournalEntry) -> JournalEntry {
    if entry.id.is_empty() {
        entry.id = format!("unknown-{index}");
    }
    if entry.title.is_empty() {
        entry.title = "Untitled entry".to_string();
    }
    if entry.excerpt.is_empty() {
        entry.excerpt = "No summary yet".to_string();
    }
    if entry.read_time == 0 {
        entry.read_time = DEFAULT_READ_TIME;
    }
    entry
}

/// Newest first; undated entries go last.
fn sort_entries_by_date(entries: &mut [JournalEntry]) {
    entries.sort_by_key(|e| Reverse(NaiveDate::parse_from_str(&e.date, DATE_FORMAT).ok()));
}

pub fn format_date(date: &str) -> String {
    match NaiveDate::parse_from_str(date, DATE_FORMAT) {
        Ok(d) => d.format("%b %-d, %Y").to_string(),
        Err(_) => date.to_string(),
    }
}
