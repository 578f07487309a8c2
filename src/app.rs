use std::cell::Cell;
use std::rc::Rc;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use anyhow::Result;
use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseButton, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use tracing::{debug, info, warn};

use crate::calendar::{CalendarAction, MoodCalendar};
use crate::draft::DraftService;
use crate::editor::{EditorEvent, EditorField, FormData, JournalEditor};
use crate::export::{ExportOutcome, ExportService};
use crate::filter::MoodFilterController;
use crate::journal::JournalSystem;
use crate::loader::DataLoader;
use crate::modal::{ModalHit, MoodRecordModal};
use crate::models::{MoodRecord, date_key};
use crate::settings::Settings;
use crate::statistics::EmotionStatistics;
use crate::storage::FileStorage;

pub const TOAST_LIFETIME: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Calendar,
    Journal,
    Editor,
}

impl View {
    pub const ALL: [View; 3] = [View::Calendar, View::Journal, View::Editor];

    pub fn title(self) -> &'static str {
        match self {
            View::Calendar => "Calendar",
            View::Journal => "Journal",
            View::Editor => "Write",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub message: String,
    pub kind: ToastKind,
    pub expires: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalFocus {
    List,
    Search,
}

/// Clickable areas recorded while drawing.
#[derive(Debug, Clone, Default)]
pub struct HitMap {
    pub tabs: Vec<(View, Rect)>,
    pub days: Vec<(NaiveDate, Rect)>,
    pub prev_month: Rect,
    pub next_month: Rect,
    pub bars: Vec<(usize, Rect)>,
    pub modal_dialog: Rect,
    pub modal_moods: Vec<(usize, Rect)>,
    pub modal_note: Rect,
    pub modal_save: Rect,
    pub modal_cancel: Rect,
    pub modal_close: Rect,
    pub journal_search: Rect,
    pub journal_entries: Vec<(usize, Rect)>,
    /// `None` is the "all" chip.
    pub journal_tags: Vec<(Option<String>, Rect)>,
    pub editor_fields: Vec<(EditorField, Rect)>,
    pub editor_tags: Vec<(usize, Rect)>,
}

/// The services the app is built from; constructed by the entry point.
pub struct Services {
    pub loader: DataLoader,
    pub drafts: DraftService,
    pub exporter: ExportService,
    pub filter: MoodFilterController,
}

impl Services {
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let storage = FileStorage::new(settings.storage_dir(), settings.storage_quota)?;
        Ok(Self {
            loader: DataLoader::new(&settings.content_dir),
            drafts: DraftService::new(Box::new(storage)),
            exporter: ExportService::new(&settings.export_dir),
            filter: MoodFilterController::new(),
        })
    }
}

pub struct App {
    pub view: View,
    pub today: NaiveDate,
    loader: DataLoader,
    filter: MoodFilterController,
    pub calendar: MoodCalendar,
    pub statistics: EmotionStatistics,
    pub modal: Option<MoodRecordModal>,
    saved_tx: Sender<MoodRecord>,
    saved_rx: Receiver<MoodRecord>,
    modal_closed: Rc<Cell<bool>>,
    pub journal: JournalSystem,
    pub journal_focus: JournalFocus,
    pub editor: JournalEditor,
    editor_opened: bool,
    pub toasts: Vec<Toast>,
    /// JSON of an entry whose export file could not be written.
    pub inline_export: Option<String>,
    pub hits: HitMap,
    pub should_quit: bool,
}

impl App {
    pub fn new(services: Services, today: NaiveDate, now: Instant) -> Self {
        let Services {
            mut loader,
            drafts,
            exporter,
            mut filter,
        } = services;

        let mut calendar = MoodCalendar::new(today);
        calendar.load_moods(&mut loader);
        calendar.subscribe(&mut filter);

        let mut statistics = EmotionStatistics::new(calendar.catalog(), calendar.month());
        statistics.subscribe(&mut filter);
        statistics.update(calendar.moods(), calendar.month(), now);

        let mut journal = JournalSystem::new();
        journal.load_entries(&mut loader);

        let editor = JournalEditor::new(drafts, exporter, calendar.catalog());
        let (saved_tx, saved_rx) = mpsc::channel();

        let mut app = Self {
            view: View::Calendar,
            today,
            loader,
            filter,
            calendar,
            statistics,
            modal: None,
            saved_tx,
            saved_rx,
            modal_closed: Rc::new(Cell::new(false)),
            journal,
            journal_focus: JournalFocus::List,
            editor,
            editor_opened: false,
            toasts: Vec::new(),
            inline_export: None,
            hits: HitMap::default(),
            should_quit: false,
        };
        app.drain_loader_messages(now);
        app
    }

    pub fn filter(&self) -> &MoodFilterController {
        &self.filter
    }

    pub fn toast(&mut self, message: impl Into<String>, kind: ToastKind, now: Instant) {
        let message = message.into();
        debug!(%message, ?kind, "toast");
        self.toasts.push(Toast {
            message,
            kind,
            expires: now + TOAST_LIFETIME,
        });
    }

    fn drain_loader_messages(&mut self, now: Instant) {
        for message in self.loader.take_messages() {
            self.toast(message, ToastKind::Error, now);
        }
    }

    pub fn switch_view(&mut self, view: View) {
        if self.view == view {
            return;
        }
        info!(?view, "view switched");
        self.view = view;
        if view == View::Editor && !self.editor_opened && self.editor.form() == FormData::default() {
            self.editor.open();
            self.editor_opened = true;
        }
    }

    /// Re-reads both data files and hands the new catalog to its users.
    pub fn reload(&mut self, now: Instant) {
        self.calendar.reload(&mut self.loader);
        self.journal.reload(&mut self.loader);
        let catalog = self.calendar.catalog();
        self.statistics.set_catalog(Rc::clone(&catalog));
        self.statistics
            .update(self.calendar.moods(), self.calendar.month(), now);
        self.editor.set_catalog(catalog);
        self.drain_loader_messages(now);
        self.toast("Data reloaded", ToastKind::Info, now);
    }

    fn open_modal(&mut self, date: NaiveDate, preselect: Option<String>, now: Instant) {
        if self.modal.is_some() {
            warn!("mood modal already open");
            return;
        }
        let tx = self.saved_tx.clone();
        let closed = Rc::clone(&self.modal_closed);
        let mut modal = MoodRecordModal::new(
            date,
            self.calendar.catalog(),
            Box::new(move |record| {
                if tx.send(record).is_err() {
                    warn!("mood record dropped, app is gone");
                }
            }),
            Box::new(move || closed.set(true)),
            Some(self.calendar.save_animation()),
        );
        if let Some(mood) = preselect {
            modal.select_mood(&mood);
        }
        modal.show(now);
        self.modal = Some(modal);
    }

    fn apply_calendar_action(&mut self, action: CalendarAction, now: Instant) {
        match action {
            CalendarAction::OpenModal { date, preselect } => self.open_modal(date, preselect, now),
            CalendarAction::ShowDetails(date) => debug!(%date, "details shown"),
            CalendarAction::QuickRecorded(record) => {
                self.statistics
                    .update(self.calendar.moods(), self.calendar.month(), now);
                let label = self.calendar.catalog().label_for(&record.mood).to_string();
                self.toast(format!("Recorded {label} for {}", record.date), ToastKind::Success, now);
            }
        }
    }

    /// Advances every timer-driven piece of state.
    pub fn tick(&mut self, now: Instant) {
        let mut saved = false;
        while let Ok(record) = self.saved_rx.try_recv() {
            self.calendar.record(record);
            saved = true;
        }
        if saved {
            self.statistics
                .update(self.calendar.moods(), self.calendar.month(), now);
            self.toast("Mood saved", ToastKind::Success, now);
        }

        self.filter.tick(now, self.calendar.moods());
        self.calendar.sync_filter();
        self.statistics.sync_filter();

        if let Some(action) = self.calendar.tick(now) {
            self.apply_calendar_action(action, now);
        }
        if self.statistics.month() != self.calendar.month() {
            self.statistics
                .update(self.calendar.moods(), self.calendar.month(), now);
        }

        if let Some(modal) = &mut self.modal {
            modal.tick(now);
        }
        if self.modal_closed.replace(false) {
            self.modal = None;
        }

        if let Some(results) = self.journal.search.poll(now) {
            self.journal.apply_search(&results);
        }

        if let Some(EditorEvent::DraftSaveFailed) = self.editor.tick(now) {
            self.toast("Draft could not be saved", ToastKind::Error, now);
        }

        self.drain_loader_messages(now);
        self.toasts.retain(|t| t.expires > now);
    }

    /// Whether keys are currently going into a text field.
    fn typing(&self) -> bool {
        if self.modal.is_some() {
            return true;
        }
        match self.view {
            View::Calendar => false,
            View::Journal => self.journal_focus == JournalFocus::Search,
            View::Editor => true,
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }
        if self.inline_export.is_some() {
            if key.code == KeyCode::Esc || key.code == KeyCode::Enter {
                self.inline_export = None;
            }
            return;
        }
        if let Some(modal) = &mut self.modal {
            modal.handle_key(key, now);
            return;
        }

        match key.code {
            KeyCode::F(n @ 1..=3) => {
                self.switch_view(View::ALL[usize::from(n - 1)]);
                return;
            }
            KeyCode::Char(c @ '1'..='3') if !self.typing() => {
                let index = c as usize - '1' as usize;
                self.switch_view(View::ALL[index]);
                return;
            }
            KeyCode::Char('q') if !self.typing() => {
                self.should_quit = true;
                return;
            }
            _ => {}
        }

        match self.view {
            View::Calendar => self.handle_calendar_key(key, now),
            View::Journal => self.handle_journal_key(key, now),
            View::Editor => self.handle_editor_key(key, now),
        }
    }

    fn handle_calendar_key(&mut self, key: KeyEvent, now: Instant) {
        match key.code {
            KeyCode::Left => self.calendar.move_selection(-1, now),
            KeyCode::Right => self.calendar.move_selection(1, now),
            KeyCode::Up => self.calendar.move_selection(-7, now),
            KeyCode::Down => self.calendar.move_selection(7, now),
            KeyCode::Char('[') => self.calendar.navigate_month(-1, now),
            KeyCode::Char(']') => self.calendar.navigate_month(1, now),
            KeyCode::Enter => {
                let action = self.calendar.single_click(self.calendar.selected());
                self.apply_calendar_action(action, now);
            }
            KeyCode::Char(' ') => {
                let action = self.calendar.double_click(self.calendar.selected(), now);
                self.apply_calendar_action(action, now);
            }
            KeyCode::Char('f') => {
                let date = date_key(self.calendar.selected());
                match self.calendar.get_mood_for_date(&date) {
                    Some(record) => {
                        let mood = record.mood.clone();
                        self.filter.activate_filter(&mood, now);
                    }
                    None => self.toast("No mood recorded for this day", ToastKind::Info, now),
                }
            }
            KeyCode::Char('r') => self.reload(now),
            KeyCode::Esc => {
                if self.calendar.details().is_some() {
                    self.calendar.dismiss_details();
                } else if self.filter.has_active_filter() {
                    self.filter.clear_filter();
                }
            }
            _ => {}
        }
    }

    fn handle_journal_key(&mut self, key: KeyEvent, now: Instant) {
        if self.journal_focus == JournalFocus::Search {
            match key.code {
                KeyCode::Esc => {
                    let all = self.journal.search.clear();
                    self.journal.apply_search(&all);
                    self.journal_focus = JournalFocus::List;
                }
                KeyCode::Enter | KeyCode::Tab => self.journal_focus = JournalFocus::List,
                _ => self.journal.search.handle_key(key, now),
            }
            return;
        }

        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.journal.select_prev(),
            KeyCode::Down | KeyCode::Char('j') => self.journal.select_next(),
            KeyCode::Char('/') | KeyCode::Tab => self.journal_focus = JournalFocus::Search,
            KeyCode::Char('t') => self.cycle_tag_filter(),
            KeyCode::Char('m') => self.cycle_mood_filter(),
            KeyCode::Char('a') | KeyCode::Esc => self.journal.show_all(),
            KeyCode::Char('r') => self.reload(now),
            _ => {}
        }
    }

    fn cycle_tag_filter(&mut self) {
        let tags = self.journal.get_all_tags();
        let next = match self.journal.current_tag() {
            None => tags.first().cloned(),
            Some(current) => tags
                .iter()
                .position(|t| t == current)
                .and_then(|i| tags.get(i + 1).cloned()),
        };
        let mood = self.journal.current_mood().map(str::to_string);
        self.journal.show_all();
        if let Some(tag) = next {
            self.journal.filter_by_tag(&tag);
        }
        if let Some(mood) = mood {
            self.journal.filter_by_mood(&mood);
        }
    }

    fn cycle_mood_filter(&mut self) {
        let catalog = self.calendar.catalog();
        let keys: Vec<&str> = catalog.keys().collect();
        let next = match self.journal.current_mood() {
            None => keys.first().copied(),
            Some(current) => keys
                .iter()
                .position(|k| *k == current)
                .and_then(|i| keys.get(i + 1).copied()),
        };
        let tag = self.journal.current_tag().map(str::to_string);
        self.journal.show_all();
        if let Some(tag) = tag {
            self.journal.filter_by_tag(&tag);
        }
        if let Some(mood) = next {
            self.journal.filter_by_mood(mood);
        }
    }

    fn handle_editor_key(&mut self, key: KeyEvent, now: Instant) {
        if let Some(event) = self.editor.handle_key(key, now) {
            self.apply_editor_event(event, now);
        }
    }

    fn apply_editor_event(&mut self, event: EditorEvent, now: Instant) {
        match event {
            EditorEvent::Submitted { entry, export } => {
                let title = entry.title.clone();
                self.journal.add_entry(entry);
                match export {
                    Some(ExportOutcome::File(path)) => self.toast(
                        format!("Saved \"{title}\" to {}", path.display()),
                        ToastKind::Success,
                        now,
                    ),
                    Some(ExportOutcome::Inline(json)) => {
                        self.toast("Export file could not be written", ToastKind::Error, now);
                        self.inline_export = Some(json);
                    }
                    None => self.toast("Export failed", ToastKind::Error, now),
                }
            }
            EditorEvent::Invalid(errors) => {
                let message = errors
                    .first()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                self.toast(message, ToastKind::Error, now);
            }
            EditorEvent::DraftSaveFailed => {
                self.toast("Draft could not be saved", ToastKind::Error, now);
            }
            EditorEvent::Reset => self.toast("Form cleared", ToastKind::Info, now),
            EditorEvent::DraftSaved => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, now: Instant) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => self.handle_left_click(mouse, now),
            MouseEventKind::ScrollUp if self.view == View::Journal && self.modal.is_none() => {
                self.journal.select_prev();
            }
            MouseEventKind::ScrollDown if self.view == View::Journal && self.modal.is_none() => {
                self.journal.select_next();
            }
            _ => {}
        }
    }

    fn handle_left_click(&mut self, mouse: MouseEvent, now: Instant) {
        if self.inline_export.is_some() {
            self.inline_export = None;
            return;
        }
        if self.modal.is_some() {
            let hit = self.modal_hit(mouse);
            if let Some(modal) = &mut self.modal {
                modal.handle_click(hit, now);
            }
            return;
        }

        if let Some(view) = find_clicked_item(mouse, &self.hits.tabs) {
            self.switch_view(view);
            return;
        }

        match self.view {
            View::Calendar => self.handle_calendar_click(mouse, now),
            View::Journal => self.handle_journal_click(mouse),
            View::Editor => self.handle_editor_click(mouse, now),
        }
    }

    fn modal_hit(&self, mouse: MouseEvent) -> ModalHit {
        let hits = &self.hits;
        if let Some(index) = find_clicked_item(mouse, &hits.modal_moods) {
            return ModalHit::Mood(index);
        }
        if inside_rect(mouse, hits.modal_close) {
            ModalHit::Close
        } else if inside_rect(mouse, hits.modal_save) {
            ModalHit::Save
        } else if inside_rect(mouse, hits.modal_cancel) {
            ModalHit::Cancel
        } else if inside_rect(mouse, hits.modal_note) {
            ModalHit::Note
        } else if inside_rect(mouse, hits.modal_dialog) {
            ModalHit::Dialog
        } else {
            ModalHit::Outside
        }
    }

    fn handle_calendar_click(&mut self, mouse: MouseEvent, now: Instant) {
        if inside_rect(mouse, self.hits.prev_month) {
            self.calendar.navigate_month(-1, now);
            return;
        }
        if inside_rect(mouse, self.hits.next_month) {
            self.calendar.navigate_month(1, now);
            return;
        }
        if let Some(date) = find_clicked_item(mouse, &self.hits.days) {
            if let Some(action) = self.calendar.click_day(date, now) {
                self.apply_calendar_action(action, now);
            }
            return;
        }
        if let Some(index) = find_clicked_item(mouse, &self.hits.bars) {
            self.statistics
                .handle_bar_click(index, &mut self.filter, now);
            return;
        }
        self.calendar.dismiss_details();
    }

    fn handle_journal_click(&mut self, mouse: MouseEvent) {
        if inside_rect(mouse, self.hits.journal_search) {
            self.journal_focus = JournalFocus::Search;
            return;
        }
        self.journal_focus = JournalFocus::List;
        if let Some(tag) = find_clicked_item(mouse, &self.hits.journal_tags) {
            let mood = self.journal.current_mood().map(str::to_string);
            self.journal.show_all();
            if let Some(tag) = tag {
                self.journal.filter_by_tag(&tag);
            }
            if let Some(mood) = mood {
                self.journal.filter_by_mood(&mood);
            }
            return;
        }
        if let Some(index) = find_clicked_item(mouse, &self.hits.journal_entries) {
            self.journal.select(index);
        }
    }

    fn handle_editor_click(&mut self, mouse: MouseEvent, now: Instant) {
        if self.editor.prompt().is_some() {
            return;
        }
        if let Some(index) = find_clicked_item(mouse, &self.hits.editor_tags) {
            if let Some(tag) = crate::editor::AVAILABLE_TAGS.get(index) {
                self.editor.set_focus(EditorField::Tags);
                self.editor.toggle_tag(tag, now);
            }
            return;
        }
        if let Some(field) = find_clicked_item(mouse, &self.hits.editor_fields) {
            self.editor.set_focus(field);
        }
    }
}

fn inside_rect(mouse: MouseEvent, rect: Rect) -> bool {
    mouse.row >= rect.y
        && mouse.row < rect.y + rect.height
        && mouse.column >= rect.x
        && mouse.column < rect.x + rect.width
}

fn find_clicked_item<T: Clone>(mouse: MouseEvent, items: &[(T, Rect)]) -> Option<T> {
    items
        .iter()
        .find(|(_, rect)| inside_rect(mouse, *rect))
        .map(|(item, _)| item.clone())
}

#[cfg(test)]
mod tests {
    use std::fs;

    use crate::calendar::DOUBLE_CLICK_WINDOW;
    use crate::filter::{CellEmphasis, FILTER_DEBOUNCE};
    use crate::journal::SEARCH_DEBOUNCE;
    use crate::storage::MemoryStorage;

    use super::*;

    const MOODS: &str = r##"{
        "moods": [
            {"date": "2024-05-02", "mood": "happy", "note": "sun", "color": "#10b981", "timestamp": 1},
            {"date": "2024-05-04", "mood": "tired", "note": "", "color": "#64748b", "timestamp": 2}
        ],
        "moodTypes": {
            "happy": {"label": "Happy", "icon": "😊", "color": "#10b981"},
            "neutral": {"label": "Neutral", "icon": "😐", "color": "#6b7280"},
            "tired": {"label": "Tired", "icon": "😴", "color": "#64748b"}
        }
    }"##;

    const JOURNAL: &str = r#"{
        "entries": [
            {"id": "a", "title": "Rust notes", "date": "2024-05-01", "excerpt": "ownership",
             "content": "", "tags": ["performance"], "mood": "happy", "readTime": 3},
            {"id": "b", "title": "Garden", "date": "2024-05-03", "excerpt": "tomatoes",
             "content": "", "tags": ["personal"], "readTime": 2}
        ]
    }"#;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn left_click(column: u16, row: u16) -> MouseEvent {
        MouseEvent {
            kind: MouseEventKind::Down(MouseButton::Left),
            column,
            row,
            modifiers: KeyModifiers::NONE,
        }
    }

    fn app_in(dir: &std::path::Path, with_content: bool, now: Instant) -> App {
        let content = dir.join("data");
        fs::create_dir_all(&content).unwrap();
        if with_content {
            fs::write(content.join("moods.json"), MOODS).unwrap();
            fs::write(content.join("journal-entries.json"), JOURNAL).unwrap();
        }
        let services = Services {
            loader: DataLoader::new(&content),
            drafts: DraftService::new(Box::new(MemoryStorage::default())),
            exporter: ExportService::new(dir.join("exports")),
            filter: MoodFilterController::new(),
        };
        App::new(services, day(10), now)
    }

    #[test]
    fn services_from_settings_use_configured_dirs() {
        let tmp = tempfile::tempdir().unwrap();
        let settings = Settings::for_dir(tmp.path());
        settings.ensure_dirs().unwrap();
        let services = Services::from_settings(&settings).unwrap();
        assert_eq!(services.loader.cache_stats().size, 0);
        assert!(!services.drafts.has_draft());
    }

    #[test]
    fn missing_data_starts_empty_with_a_toast() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let app = app_in(tmp.path(), false, now);

        assert!(app.calendar.moods().is_empty());
        assert!(app.journal.entries().is_empty());
        assert_eq!(app.toasts.len(), 2);
        assert!(app.toasts.iter().all(|t| t.kind == ToastKind::Error));
    }

    #[test]
    fn toasts_expire() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), false, now);
        app.tick(now + TOAST_LIFETIME - Duration::from_millis(1));
        assert_eq!(app.toasts.len(), 2);
        app.tick(now + TOAST_LIFETIME);
        assert!(app.toasts.is_empty());
    }

    #[test]
    fn recording_through_the_modal_updates_calendar_and_statistics() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        assert_eq!(app.statistics.frequency().len(), 2);

        app.handle_key(key(KeyCode::Enter), now);
        let modal = app.modal.as_ref().expect("empty day opens the modal");
        assert_eq!(modal.date(), day(10));

        // cursor starts on the first catalog entry
        app.handle_key(key(KeyCode::Char(' ')), now);
        app.handle_key(key(KeyCode::Enter), now);
        app.tick(now);

        let record = app.calendar.get_mood_for_date("2024-05-10").unwrap();
        assert_eq!(record.mood, "happy");
        assert_eq!(app.statistics.dominant_mood().unwrap().mood, "happy");
        assert!(app.calendar.save_animation().intensity("2024-05-10", now).is_some());
        assert!(app.toasts.iter().any(|t| t.message == "Mood saved"));

        assert!(app.modal.is_some(), "modal is fading out");
        app.tick(now + Duration::from_millis(300));
        assert!(app.modal.is_none());
    }

    #[test]
    fn double_click_on_empty_day_quick_records_neutral() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.hits.days = vec![(day(7), Rect::new(10, 5, 4, 1))];

        app.handle_mouse(left_click(11, 5), now);
        app.handle_mouse(left_click(12, 5), now + Duration::from_millis(100));

        let record = app.calendar.get_mood_for_date("2024-05-07").unwrap();
        assert_eq!(record.mood, "neutral");
        assert_eq!(record.color, "#6b7280");
        assert!(app.modal.is_none());

        app.tick(now + DOUBLE_CLICK_WINDOW * 2);
        assert!(app.modal.is_none());
    }

    #[test]
    fn single_click_commits_after_window_and_outside_click_closes() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.hits.days = vec![(day(7), Rect::new(10, 5, 4, 1))];

        app.handle_mouse(left_click(11, 5), now);
        assert!(app.modal.is_none());
        app.tick(now + DOUBLE_CLICK_WINDOW);
        assert!(app.modal.is_some());

        app.hits.modal_dialog = Rect::new(20, 2, 30, 10);
        app.handle_mouse(left_click(0, 0), now + DOUBLE_CLICK_WINDOW);
        assert!(app.modal.as_ref().is_some_and(|m| m.is_closing()));
    }

    #[test]
    fn filter_key_highlights_calendar_and_statistics() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);

        app.calendar.move_selection(-8, now);
        assert_eq!(app.calendar.selected(), day(2));
        app.handle_key(key(KeyCode::Char('f')), now);
        app.tick(now + FILTER_DEBOUNCE);

        assert_eq!(app.statistics.active_filter(), Some("happy"));
        assert_eq!(app.calendar.filter_view().emphasis("2024-05-02"), CellEmphasis::Highlighted);
        assert_eq!(app.calendar.filter_view().emphasis("2024-05-04"), CellEmphasis::Dimmed);

        app.handle_key(key(KeyCode::Esc), now + FILTER_DEBOUNCE);
        app.tick(now + FILTER_DEBOUNCE);
        assert_eq!(app.statistics.active_filter(), None);
        assert!(!app.calendar.filter_view().is_active());
    }

    #[test]
    fn journal_search_is_debounced() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.switch_view(View::Journal);
        assert_eq!(app.journal.filtered_entries().len(), 2);

        app.handle_key(key(KeyCode::Char('/')), now);
        for c in "garden".chars() {
            app.handle_key(key(KeyCode::Char(c)), now);
        }
        app.tick(now);
        assert_eq!(app.journal.filtered_entries().len(), 2);
        app.tick(now + SEARCH_DEBOUNCE);
        let titles: Vec<_> = app.journal.filtered_entries().iter().map(|e| e.title.clone()).collect();
        assert_eq!(titles, vec!["Garden"]);

        // typing 'q' into the search box does not quit
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(!app.should_quit);
        app.handle_key(key(KeyCode::Esc), now);
        assert_eq!(app.journal.filtered_entries().len(), 2);
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(app.should_quit);
    }

    #[test]
    fn tag_and_mood_filters_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.switch_view(View::Journal);

        app.handle_key(key(KeyCode::Char('t')), now);
        assert_eq!(app.journal.current_tag(), Some("performance"));
        app.handle_key(key(KeyCode::Char('t')), now);
        assert_eq!(app.journal.current_tag(), Some("personal"));
        app.handle_key(key(KeyCode::Char('t')), now);
        assert_eq!(app.journal.current_tag(), None);

        app.handle_key(key(KeyCode::Char('m')), now);
        assert_eq!(app.journal.current_mood(), Some("happy"));
        assert_eq!(app.journal.filtered_entries().len(), 1);
    }

    #[test]
    fn submitted_entry_lands_in_the_journal() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.handle_key(key(KeyCode::F(3)), now);
        assert_eq!(app.view, View::Editor);

        for (field, text) in [
            (EditorField::Title, "Launch"),
            (EditorField::Excerpt, "It went out"),
            (EditorField::Content, "All **good**"),
        ] {
            app.editor.set_focus(field);
            for c in text.chars() {
                app.handle_key(key(KeyCode::Char(c)), now);
            }
        }
        app.editor.toggle_tag("productivity", now);
        app.handle_key(KeyEvent::new(KeyCode::Char('s'), KeyModifiers::CONTROL), now);

        assert_eq!(app.journal.entries().len(), 3);
        assert!(app.journal.entries().iter().any(|e| e.title == "Launch"));
        assert!(app.toasts.iter().any(|t| t.kind == ToastKind::Success));
        assert!(app.inline_export.is_none());
    }

    #[test]
    fn ctrl_c_quits_from_anywhere() {
        let tmp = tempfile::tempdir().unwrap();
        let now = Instant::now();
        let mut app = app_in(tmp.path(), true, now);
        app.switch_view(View::Editor);
        app.handle_key(key(KeyCode::Char('q')), now);
        assert!(!app.should_quit);
        app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), now);
        assert!(app.should_quit);
    }
}
