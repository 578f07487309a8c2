//! Journal entry form with live Markdown preview, draft autosave and export.

use std::rc::Rc;
use std::sync::LazyLock;
use std::time::{Duration, Instant};

use chrono::Local;
use crossterm::event::{KeyCode, KeyEvent};
use regex::Regex;
use tracing::{debug, info, warn};
use tui_textarea::TextArea;

use crate::debounce::Debouncer;
use crate::draft::{Draft, DraftService, now_millis};
use crate::export::{ExportOutcome, ExportService};
use crate::input::{self, is_ctrl};
use crate::markdown::{Document, MarkdownParser};
use crate::models::{JournalEntry, MoodCatalog, date_key};

pub const AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(500);
pub const MAX_TITLE_CHARS: usize = 100;
pub const MAX_EXCERPT_CHARS: usize = 200;
const CJK_CHARS_PER_MINUTE: f64 = 300.0;
const WORDS_PER_MINUTE: f64 = 200.0;

pub const AVAILABLE_TAGS: [&str; 14] = [
    "web-development",
    "game-development",
    "design",
    "personal",
    "unity",
    "lessons-learned",
    "ui-ux",
    "animation",
    "performance",
    "indie-game",
    "productivity",
    "技术",
    "生活",
    "思考",
];

static CJK_CHAR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[\u{4e00}-\u{9fa5}]").expect("cjk pattern"));
static LATIN_LETTER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z]").expect("latin pattern"));

/// Minutes to read `content`: CJK characters at 300 a minute plus words
/// containing a Latin letter at 200 a minute, rounded up, at least 1.
/// Empty content reads in 0 minutes.
pub fn calculate_read_time(content: &str) -> u32 {
    if content.is_empty() {
        return 0;
    }
    let cjk = CJK_CHAR.find_iter(content).count() as f64;
    let words = content
        .split_whitespace()
        .filter(|w| LATIN_LETTER.is_match(w))
        .count() as f64;
    let minutes = (cjk / CJK_CHARS_PER_MINUTE + words / WORDS_PER_MINUTE).ceil() as u32;
    minutes.max(1)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditorField {
    Title,
    Excerpt,
    Content,
    Tags,
    Mood,
}

impl EditorField {
    const ORDER: [EditorField; 5] = [
        EditorField::Title,
        EditorField::Excerpt,
        EditorField::Content,
        EditorField::Tags,
        EditorField::Mood,
    ];

    fn index(self) -> usize {
        Self::ORDER.iter().position(|f| *f == self).unwrap_or(0)
    }

    pub fn next(self) -> Self {
        Self::ORDER[(self.index() + 1) % Self::ORDER.len()]
    }

    pub fn prev(self) -> Self {
        Self::ORDER[(self.index() + Self::ORDER.len() - 1) % Self::ORDER.len()]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Title is required")]
    TitleRequired,
    #[error("Title must be at most {} characters", MAX_TITLE_CHARS)]
    TitleTooLong,
    #[error("Excerpt is required")]
    ExcerptRequired,
    #[error("Excerpt must be at most {} characters", MAX_EXCERPT_CHARS)]
    ExcerptTooLong,
    #[error("Content is required")]
    ContentRequired,
    #[error("Pick at least one tag")]
    TagsRequired,
}

impl ValidationError {
    pub fn field(&self) -> EditorField {
        match self {
            ValidationError::TitleRequired | ValidationError::TitleTooLong => EditorField::Title,
            ValidationError::ExcerptRequired | ValidationError::ExcerptTooLong => {
                EditorField::Excerpt
            }
            ValidationError::ContentRequired => EditorField::Content,
            ValidationError::TagsRequired => EditorField::Tags,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormData {
    pub title: String,
    pub excerpt: String,
    pub content: String,
    pub tags: Vec<String>,
    pub mood: Option<String>,
}

pub fn validate_form(form: &FormData) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if form.title.trim().is_empty() {
        errors.push(ValidationError::TitleRequired);
    } else if form.title.chars().count() > MAX_TITLE_CHARS {
        errors.push(ValidationError::TitleTooLong);
    }

    if form.excerpt.trim().is_empty() {
        errors.push(ValidationError::ExcerptRequired);
    } else if form.excerpt.chars().count() > MAX_EXCERPT_CHARS {
        errors.push(ValidationError::ExcerptTooLong);
    }

    if form.content.trim().is_empty() {
        errors.push(ValidationError::ContentRequired);
    }

    if form.tags.is_empty() {
        errors.push(ValidationError::TagsRequired);
    }

    if errors.is_empty() { Ok(()) } else { Err(errors) }
}

/// Shown when the editor opens over a stored draft.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DraftPrompt {
    pub draft: Draft,
    pub age_days: i64,
    pub expired: bool,
}

impl DraftPrompt {
    pub fn message(&self) -> String {
        let age = match self.age_days {
            0 => "today".to_string(),
            1 => "1 day ago".to_string(),
            n => format!("{n} days ago"),
        };
        if self.expired {
            format!("This draft was saved {age} and has expired. Restore it anyway?")
        } else {
            format!("A draft saved {age} was found. Restore it?")
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum EditorEvent {
    Submitted {
        entry: JournalEntry,
        export: Option<ExportOutcome>,
    },
    Invalid(Vec<ValidationError>),
    DraftSaved,
    DraftSaveFailed,
    Reset,
}

pub struct JournalEditor {
    catalog: Rc<MoodCatalog>,
    parser: MarkdownParser,
    drafts: DraftService,
    exporter: ExportService,
    title: TextArea<'static>,
    excerpt: TextArea<'static>,
    content: TextArea<'static>,
    selected_tags: Vec<String>,
    mood: Option<String>,
    focus: EditorField,
    tag_cursor: usize,
    errors: Vec<ValidationError>,
    autosave: Debouncer<Draft>,
    prompt: Option<DraftPrompt>,
    preview: Document,
}

impl JournalEditor {
    pub fn new(drafts: DraftService, exporter: ExportService, catalog: Rc<MoodCatalog>) -> Self {
        Self {
            catalog,
            parser: MarkdownParser::new(),
            drafts,
            exporter,
            title: TextArea::default(),
            excerpt: TextArea::default(),
            content: TextArea::default(),
            selected_tags: Vec::new(),
            mood: None,
            focus: EditorField::Title,
            tag_cursor: 0,
            errors: Vec::new(),
            autosave: Debouncer::new(AUTOSAVE_DEBOUNCE),
            prompt: None,
            preview: Document::Blocks(Vec::new()),
        }
    }

    pub fn set_catalog(&mut self, catalog: Rc<MoodCatalog>) {
        self.catalog = catalog;
    }

    /// Looks for a stored draft and raises the restore prompt when one exists.
    pub fn open(&mut self) {
        let Some(draft) = self.drafts.load_draft() else {
            return;
        };
        if draft.title.is_empty() && draft.content.is_empty() {
            debug!("stored draft is empty, ignoring");
            return;
        }
        let prompt = DraftPrompt {
            age_days: self.drafts.get_draft_age(&draft),
            expired: self.drafts.is_draft_expired(&draft),
            draft,
        };
        info!(age_days = prompt.age_days, expired = prompt.expired, "draft found");
        self.prompt = Some(prompt);
    }

    pub fn prompt(&self) -> Option<&DraftPrompt> {
        self.prompt.as_ref()
    }

    pub fn restore_draft(&mut self) {
        let Some(prompt) = self.prompt.take() else {
            return;
        };
        let draft = prompt.draft;
        self.title = input::textarea_with(&draft.title);
        self.content = input::textarea_with(&draft.content);
        self.mood = draft.mood_id.filter(|m| !m.is_empty());
        self.refresh_preview();
        info!("draft restored");
    }

    pub fn discard_draft(&mut self) {
        if self.prompt.take().is_some() {
            self.drafts.clear_draft();
            info!("draft discarded");
        }
    }

    pub fn form(&self) -> FormData {
        FormData {
            title: input::text_of(&self.title),
            excerpt: input::text_of(&self.excerpt),
            content: input::text_of(&self.content),
            tags: self.selected_tags.clone(),
            mood: self.mood.clone(),
        }
    }

    pub fn focus(&self) -> EditorField {
        self.focus
    }

    pub fn set_focus(&mut self, field: EditorField) {
        self.focus = field;
    }

    pub fn field_area(&self, field: EditorField) -> Option<&TextArea<'static>> {
        match field {
            EditorField::Title => Some(&self.title),
            EditorField::Excerpt => Some(&self.excerpt),
            EditorField::Content => Some(&self.content),
            EditorField::Tags | EditorField::Mood => None,
        }
    }

    pub fn selected_tags(&self) -> &[String] {
        &self.selected_tags
    }

    pub fn tag_cursor(&self) -> usize {
        self.tag_cursor
    }

    pub fn mood(&self) -> Option<&str> {
        self.mood.as_deref()
    }

    pub fn catalog(&self) -> &MoodCatalog {
        &self.catalog
    }

    pub fn errors(&self) -> &[ValidationError] {
        &self.errors
    }

    pub fn error_for(&self, field: EditorField) -> Option<&ValidationError> {
        self.errors.iter().find(|e| e.field() == field)
    }

    pub fn preview(&self) -> &Document {
        &self.preview
    }

    pub fn read_time(&self) -> u32 {
        calculate_read_time(&input::text_of(&self.content))
    }

    pub fn toggle_tag(&mut self, tag: &str, now: Instant) {
        match self.selected_tags.iter().position(|t| t == tag) {
            Some(index) => {
                self.selected_tags.remove(index);
            }
            None => self.selected_tags.push(tag.to_string()),
        }
        if let Some(index) = AVAILABLE_TAGS.iter().position(|t| *t == tag) {
            self.tag_cursor = index;
        }
        self.clear_error(EditorField::Tags);
        self.changed(now);
    }

    pub fn set_mood(&mut self, mood: Option<&str>, now: Instant) {
        self.mood = mood.map(str::to_string);
        self.changed(now);
    }

    fn cycle_mood(&mut self, forward: bool, now: Instant) {
        // position 0 is "no mood"
        let keys: Vec<String> = self.catalog.keys().map(str::to_string).collect();
        let slots = keys.len() + 1;
        let current = self
            .mood
            .as_ref()
            .and_then(|m| keys.iter().position(|k| k == m))
            .map(|i| i + 1)
            .unwrap_or(0);
        let next = if forward {
            (current + 1) % slots
        } else {
            (current + slots - 1) % slots
        };
        let mood = if next == 0 { None } else { keys.get(next - 1).cloned() };
        self.set_mood(mood.as_deref(), now);
    }

    fn clear_error(&mut self, field: EditorField) {
        self.errors.retain(|e| e.field() != field);
    }

    fn refresh_preview(&mut self) {
        self.preview = self.parser.parse_document(&input::text_of(&self.content));
    }

    fn changed(&mut self, now: Instant) {
        let draft = Draft {
            title: input::text_of(&self.title),
            content: input::text_of(&self.content),
            mood_id: self.mood.clone(),
            timestamp: 0,
        };
        self.autosave.call(draft, now);
    }

    /// Writes a due autosave.
    pub fn tick(&mut self, now: Instant) -> Option<EditorEvent> {
        let draft = self.autosave.poll(now)?;
        if self.drafts.save_draft(&draft) {
            debug!("draft autosaved");
            Some(EditorEvent::DraftSaved)
        } else {
            warn!("draft autosave failed");
            Some(EditorEvent::DraftSaveFailed)
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) -> Option<EditorEvent> {
        if self.prompt.is_some() {
            match key.code {
                KeyCode::Char('y') | KeyCode::Enter => self.restore_draft(),
                KeyCode::Char('n') | KeyCode::Esc => self.discard_draft(),
                _ => {}
            }
            return None;
        }
        if is_ctrl(&key, 's') {
            return Some(self.handle_submit());
        }
        if is_ctrl(&key, 'r') {
            self.reset_form();
            return Some(EditorEvent::Reset);
        }
        match key.code {
            KeyCode::Tab => {
                self.focus = self.focus.next();
                return None;
            }
            KeyCode::BackTab => {
                self.focus = self.focus.prev();
                return None;
            }
            _ => {}
        }

        match self.focus {
            EditorField::Title => {
                if input::feed(&mut self.title, key, Some(MAX_TITLE_CHARS), false) {
                    self.clear_error(EditorField::Title);
                    self.changed(now);
                }
            }
            EditorField::Excerpt => {
                if input::feed(&mut self.excerpt, key, Some(MAX_EXCERPT_CHARS), false) {
                    self.clear_error(EditorField::Excerpt);
                    self.changed(now);
                }
            }
            EditorField::Content => {
                if input::feed(&mut self.content, key, None, true) {
                    self.clear_error(EditorField::Content);
                    self.refresh_preview();
                    self.changed(now);
                }
            }
            EditorField::Tags => match key.code {
                KeyCode::Left => {
                    self.tag_cursor = (self.tag_cursor + AVAILABLE_TAGS.len() - 1) % AVAILABLE_TAGS.len();
                }
                KeyCode::Right => {
                    self.tag_cursor = (self.tag_cursor + 1) % AVAILABLE_TAGS.len();
                }
                KeyCode::Char(' ') | KeyCode::Enter => {
                    let tag = AVAILABLE_TAGS[self.tag_cursor];
                    self.toggle_tag(tag, now);
                }
                _ => {}
            },
            EditorField::Mood => match key.code {
                KeyCode::Left => self.cycle_mood(false, now),
                KeyCode::Right | KeyCode::Char(' ') | KeyCode::Enter => self.cycle_mood(true, now),
                _ => {}
            },
        }
        None
    }

    /// Builds the entry from the form. Content is the Markdown rendered to HTML.
    pub fn generate_journal_entry(&self) -> JournalEntry {
        let form = self.form();
        let timestamp = now_millis();
        JournalEntry {
            id: format!("journal-{timestamp}"),
            title: form.title.trim().to_string(),
            date: date_key(Local::now().date_naive()),
            excerpt: form.excerpt.trim().to_string(),
            content: self.parser.parse(&form.content),
            tags: form.tags,
            mood: form.mood.filter(|m| !m.is_empty()),
            read_time: calculate_read_time(&form.content),
            timestamp,
        }
    }

    /// Validates, builds and exports the entry, then clears the form and draft.
    pub fn handle_submit(&mut self) -> EditorEvent {
        if let Err(errors) = validate_form(&self.form()) {
            warn!(errors = errors.len(), "journal form is invalid");
            self.errors = errors.clone();
            if let Some(first) = errors.first() {
                self.focus = first.field();
            }
            return EditorEvent::Invalid(errors);
        }

        let entry = self.generate_journal_entry();
        info!(id = %entry.id, read_time = entry.read_time, "journal entry generated");
        let export = match self.exporter.export_to_json(&entry, Local::now()) {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                warn!(error = %e, "journal export failed");
                None
            }
        };

        self.reset_form();
        self.drafts.clear_draft();
        EditorEvent::Submitted { entry, export }
    }

    pub fn reset_form(&mut self) {
        self.title = TextArea::default();
        self.excerpt = TextArea::default();
        self.content = TextArea::default();
        self.selected_tags.clear();
        self.mood = None;
        self.errors.clear();
        self.focus = EditorField::Title;
        self.tag_cursor = 0;
        self.autosave.cancel();
        self.refresh_preview();
        debug!("journal form reset");
    }
}

#[cfg(test)]
mod tests {
    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::draft::STORAGE_KEY;
    use crate::storage::MemoryStorage;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn type_text(editor: &mut JournalEditor, text: &str, now: Instant) {
        for c in text.chars() {
            let code = if c == '\n' { KeyCode::Enter } else { KeyCode::Char(c) };
            editor.handle_key(key(code), now);
        }
    }

    fn editor_with(storage: MemoryStorage, export_dir: &std::path::Path) -> JournalEditor {
        JournalEditor::new(
            DraftService::new(Box::new(storage)),
            ExportService::new(export_dir),
            Rc::new(MoodCatalog::default()),
        )
    }

    #[test]
    fn read_time_rules() {
        assert_eq!(calculate_read_time(""), 0);
        assert_eq!(calculate_read_time("hello"), 1);
        assert_eq!(calculate_read_time("   "), 1);
        assert_eq!(calculate_read_time(&"word ".repeat(401)), 3);
        assert_eq!(calculate_read_time(&"字".repeat(600)), 2);
        // digits alone are not words
        assert_eq!(calculate_read_time(&"42 ".repeat(1000)), 1);
    }

    #[test]
    fn validation_reports_every_problem() {
        let errors = validate_form(&FormData::default()).unwrap_err();
        assert_eq!(
            errors,
            vec![
                ValidationError::TitleRequired,
                ValidationError::ExcerptRequired,
                ValidationError::ContentRequired,
                ValidationError::TagsRequired,
            ]
        );

        let long = FormData {
            title: "t".repeat(101),
            excerpt: "e".repeat(201),
            content: "body".into(),
            tags: vec!["design".into()],
            mood: None,
        };
        assert_eq!(
            validate_form(&long).unwrap_err(),
            vec![ValidationError::TitleTooLong, ValidationError::ExcerptTooLong]
        );
        assert_eq!(
            ValidationError::TitleTooLong.to_string(),
            "Title must be at most 100 characters"
        );
    }

    #[test]
    fn typing_updates_preview_and_autosaves_after_quiet_period() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut editor = editor_with(MemoryStorage::default(), tmp.path());

        type_text(&mut editor, "Day one", start);
        editor.set_focus(EditorField::Content);
        type_text(&mut editor, "# Hi\n**bold**", start);
        assert_eq!(
            editor.preview().to_html(),
            "<h1 class=\"md-h1\">Hi</h1>\n<p class=\"md-paragraph\"><strong class=\"md-strong\">bold</strong></p>"
        );

        assert_eq!(editor.tick(start + Duration::from_millis(499)), None);
        assert_eq!(editor.tick(start + AUTOSAVE_DEBOUNCE), Some(EditorEvent::DraftSaved));

        editor.open();
        let prompt = editor.prompt().unwrap();
        assert_eq!(prompt.draft.title, "Day one");
        assert!(!prompt.expired);
        assert_eq!(prompt.message(), "A draft saved today was found. Restore it?");
    }

    #[test]
    fn title_input_is_capped() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut editor = editor_with(MemoryStorage::default(), tmp.path());
        type_text(&mut editor, &"x".repeat(150), start);
        assert_eq!(editor.form().title.chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn expired_draft_prompt_and_restore() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = MemoryStorage::default();
        let stale = serde_json::json!({
            "title": "Old thoughts",
            "content": "- a\n- b",
            "moodId": "tired",
            "timestamp": now_millis() - 10 * 86_400_000,
        });
        storage.items.insert(STORAGE_KEY.into(), stale.to_string());
        let mut editor = editor_with(storage, tmp.path());

        editor.open();
        let prompt = editor.prompt().unwrap();
        assert!(prompt.expired);
        assert_eq!(
            prompt.message(),
            "This draft was saved 10 days ago and has expired. Restore it anyway?"
        );

        editor.handle_key(key(KeyCode::Char('y')), Instant::now());
        assert!(editor.prompt().is_none());
        let form = editor.form();
        assert_eq!(form.title, "Old thoughts");
        assert_eq!(form.mood.as_deref(), Some("tired"));
        assert!(editor.preview().to_html().starts_with("<ul"));
    }

    #[test]
    fn discarding_the_prompt_clears_the_draft() {
        let tmp = tempfile::tempdir().unwrap();
        let mut storage = MemoryStorage::default();
        storage.items.insert(
            STORAGE_KEY.into(),
            r#"{"title": "x", "content": "", "timestamp": 0}"#.into(),
        );
        let mut editor = editor_with(storage, tmp.path());
        editor.open();
        editor.handle_key(key(KeyCode::Esc), Instant::now());
        assert!(editor.prompt().is_none());
        editor.open();
        assert!(editor.prompt().is_none());
    }

    #[test]
    fn invalid_submit_focuses_first_error_and_typing_clears_it() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut editor = editor_with(MemoryStorage::default(), tmp.path());
        editor.set_focus(EditorField::Content);

        let Some(EditorEvent::Invalid(errors)) = editor.handle_key(ctrl('s'), start) else {
            panic!("expected validation errors");
        };
        assert_eq!(errors.len(), 4);
        assert_eq!(editor.focus(), EditorField::Title);

        type_text(&mut editor, "T", start);
        assert!(editor.error_for(EditorField::Title).is_none());
        assert!(editor.error_for(EditorField::Excerpt).is_some());
    }

    #[test]
    fn successful_submit_exports_and_resets() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut editor = editor_with(MemoryStorage::default(), tmp.path());

        type_text(&mut editor, "Shipping day", start);
        editor.handle_key(key(KeyCode::Tab), start);
        type_text(&mut editor, "Finally out", start);
        editor.handle_key(key(KeyCode::Tab), start);
        type_text(&mut editor, "We **shipped** it", start);
        editor.toggle_tag("indie-game", start);
        editor.tick(start + AUTOSAVE_DEBOUNCE);

        let event = editor.handle_key(ctrl('s'), start);
        let Some(EditorEvent::Submitted { entry, export }) = event else {
            panic!("expected a submitted entry, got {event:?}");
        };
        assert!(entry.id.starts_with("journal-"));
        assert_eq!(entry.title, "Shipping day");
        assert_eq!(entry.tags, vec!["indie-game"]);
        assert_eq!(entry.read_time, 1);
        assert!(entry.content.contains("<strong class=\"md-strong\">shipped</strong>"));
        assert!(matches!(export, Some(ExportOutcome::File(_))));

        assert_eq!(editor.form(), FormData::default());
        editor.open();
        assert!(editor.prompt().is_none());
    }

    #[test]
    fn tags_toggle_and_mood_cycles() {
        let tmp = tempfile::tempdir().unwrap();
        let start = Instant::now();
        let mut editor = editor_with(MemoryStorage::default(), tmp.path());
        editor.set_catalog(Rc::new(MoodCatalog::new(vec![(
            "happy".into(),
            crate::models::MoodType {
                label: "Happy".into(),
                icon: "😊".into(),
                color: "#10b981".into(),
            },
        )])));

        editor.set_focus(EditorField::Tags);
        editor.handle_key(key(KeyCode::Right), start);
        editor.handle_key(key(KeyCode::Char(' ')), start);
        assert_eq!(editor.selected_tags(), ["game-development"]);
        editor.handle_key(key(KeyCode::Enter), start);
        assert!(editor.selected_tags().is_empty());

        editor.set_focus(EditorField::Mood);
        editor.handle_key(key(KeyCode::Right), start);
        assert_eq!(editor.mood(), Some("happy"));
        editor.handle_key(key(KeyCode::Right), start);
        assert_eq!(editor.mood(), None);
        editor.handle_key(key(KeyCode::Left), start);
        assert_eq!(editor.mood(), Some("happy"));
    }
}
