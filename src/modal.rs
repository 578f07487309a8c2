//! Dialog for recording one day's mood and an optional note.

use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::NaiveDate;
use crossterm::event::{KeyCode, KeyEvent};
use tracing::{debug, info, warn};
use tui_textarea::TextArea;

use crate::calendar::SaveAnimationHandle;
use crate::draft::now_millis;
use crate::input::{self, is_ctrl};
use crate::models::{MoodCatalog, MoodRecord, date_key};

pub const MAX_NOTE_CHARS: usize = 200;
pub const MODAL_FADE: Duration = Duration::from_millis(300);
const DEFAULT_PLACEHOLDER: &str = "Write down what's on your mind...";

pub fn note_placeholder(mood: &str) -> Option<&'static str> {
    let text = match mood {
        "happy" => "Share a little of your joy...",
        "sad" => "Writing it down can help...",
        "neutral" => "Capture today's quiet moments...",
        "excited" => "This feeling deserves remembering!",
        "anxious" => "Tell me what worries you, I'm listening...",
        "tired" => "Take a breath and note how you feel...",
        "motivated" => "Where is this drive coming from?",
        _ => return None,
    };
    Some(text)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalFocus {
    Moods,
    Note,
}

/// What a mouse press landed on, resolved from the rects of the last draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModalHit {
    Mood(usize),
    Note,
    Save,
    Cancel,
    Close,
    Dialog,
    Outside,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Hidden,
    Shown { since: Instant },
    Closing { since: Instant },
}

pub struct MoodRecordModal {
    date: NaiveDate,
    catalog: Rc<MoodCatalog>,
    on_save: Box<dyn FnMut(MoodRecord)>,
    on_close: Box<dyn FnMut()>,
    save_animation: Option<SaveAnimationHandle>,
    selected: Option<String>,
    cursor: usize,
    focus: ModalFocus,
    note: TextArea<'static>,
    phase: Phase,
}

impl MoodRecordModal {
    pub fn new(
        date: NaiveDate,
        catalog: Rc<MoodCatalog>,
        on_save: Box<dyn FnMut(MoodRecord)>,
        on_close: Box<dyn FnMut()>,
        save_animation: Option<SaveAnimationHandle>,
    ) -> Self {
        debug!(date = %date, "mood modal created");
        Self {
            date,
            catalog,
            on_save,
            on_close,
            save_animation,
            selected: None,
            cursor: 0,
            focus: ModalFocus::Moods,
            note: TextArea::default(),
            phase: Phase::Hidden,
        }
    }

    pub fn show(&mut self, now: Instant) {
        if self.phase != Phase::Hidden {
            warn!("mood modal already shown");
            return;
        }
        self.phase = Phase::Shown { since: now };
        info!(date = %self.date, "mood modal shown");
    }

    /// Starts the fade-out; `on_close` runs when it completes in `tick`.
    pub fn hide(&mut self, now: Instant) {
        if let Phase::Shown { .. } = self.phase {
            self.phase = Phase::Closing { since: now };
        }
    }

    /// Returns true once the modal has fully closed.
    pub fn tick(&mut self, now: Instant) -> bool {
        if let Phase::Closing { since } = self.phase {
            if now.saturating_duration_since(since) >= MODAL_FADE {
                self.phase = Phase::Hidden;
                (self.on_close)();
                info!(date = %self.date, "mood modal closed");
                return true;
            }
        }
        false
    }

    pub fn is_visible(&self) -> bool {
        self.phase != Phase::Hidden
    }

    pub fn is_closing(&self) -> bool {
        matches!(self.phase, Phase::Closing { .. })
    }

    /// 0.0 to 1.0 over the fade in and back down over the fade out.
    pub fn opacity(&self, now: Instant) -> f64 {
        let fade = MODAL_FADE.as_secs_f64();
        match self.phase {
            Phase::Hidden => 0.0,
            Phase::Shown { since } => (now.saturating_duration_since(since).as_secs_f64() / fade).min(1.0),
            Phase::Closing { since } => {
                1.0 - (now.saturating_duration_since(since).as_secs_f64() / fade).min(1.0)
            }
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn catalog(&self) -> &MoodCatalog {
        &self.catalog
    }

    pub fn selected_mood(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn focus(&self) -> ModalFocus {
        self.focus
    }

    pub fn can_save(&self) -> bool {
        self.selected.is_some()
    }

    pub fn select_mood(&mut self, mood: &str) {
        if self.catalog.get(mood).is_none() {
            warn!(mood, "unknown mood selected");
        }
        if let Some(index) = self.catalog.keys().position(|k| k == mood) {
            self.cursor = index;
        }
        self.selected = Some(mood.to_string());
        debug!(mood, "mood selected");
    }

    pub fn placeholder(&self) -> &'static str {
        self.selected
            .as_deref()
            .and_then(note_placeholder)
            .unwrap_or(DEFAULT_PLACEHOLDER)
    }

    pub fn note(&self) -> String {
        input::text_of(&self.note)
    }

    pub fn note_area(&self) -> &TextArea<'static> {
        &self.note
    }

    pub fn note_chars(&self) -> usize {
        input::char_count(&self.note)
    }

    /// Replaces the note directly, bypassing the input cap.
    pub fn set_note(&mut self, note: &str) {
        self.note = input::textarea_with(note);
    }

    pub fn generate_mood_data(&self) -> Option<MoodRecord> {
        let mood = self.selected.clone()?;
        Some(MoodRecord {
            date: date_key(self.date),
            color: self.catalog.color_for(&mood).to_string(),
            mood,
            note: self.note().trim().to_string(),
            timestamp: now_millis(),
        })
    }

    /// Saves when a mood is selected: `on_save`, the calendar pulse, then hide.
    pub fn handle_save(&mut self, now: Instant) {
        let Some(record) = self.generate_mood_data() else {
            warn!("no mood selected, nothing to save");
            return;
        };
        info!(date = %record.date, mood = %record.mood, "mood saved from modal");
        let key = record.date.clone();
        (self.on_save)(record);
        match &self.save_animation {
            Some(handle) => handle.trigger(&key, now),
            None => debug!("no calendar to animate"),
        }
        self.hide(now);
    }

    pub fn handle_key(&mut self, key: KeyEvent, now: Instant) {
        if self.is_closing() {
            return;
        }
        if key.code == KeyCode::Esc {
            self.hide(now);
            return;
        }
        if is_ctrl(&key, 's') {
            self.handle_save(now);
            return;
        }
        if key.code == KeyCode::Tab || key.code == KeyCode::BackTab {
            self.focus = match self.focus {
                ModalFocus::Moods => ModalFocus::Note,
                ModalFocus::Note => ModalFocus::Moods,
            };
            return;
        }

        match self.focus {
            ModalFocus::Moods => self.handle_mood_key(key, now),
            ModalFocus::Note => {
                input::feed(&mut self.note, key, Some(MAX_NOTE_CHARS), true);
            }
        }
    }

    fn handle_mood_key(&mut self, key: KeyEvent, now: Instant) {
        let count = self.catalog.len();
        if count == 0 {
            return;
        }
        match key.code {
            KeyCode::Left | KeyCode::Up => {
                self.cursor = (self.cursor + count - 1) % count;
            }
            KeyCode::Right | KeyCode::Down => {
                self.cursor = (self.cursor + 1) % count;
            }
            KeyCode::Char(' ') => self.select_at(self.cursor),
            KeyCode::Enter => {
                if self.selected.as_deref() == self.catalog.keys().nth(self.cursor) {
                    self.handle_save(now);
                } else {
                    self.select_at(self.cursor);
                }
            }
            _ => {}
        }
    }

    fn select_at(&mut self, index: usize) {
        let mood = self.catalog.keys().nth(index).map(str::to_string);
        if let Some(mood) = mood {
            self.select_mood(&mood);
        }
    }

    pub fn handle_click(&mut self, hit: ModalHit, now: Instant) {
        if self.is_closing() {
            return;
        }
        match hit {
            ModalHit::Mood(index) => {
                self.focus = ModalFocus::Moods;
                self.select_at(index);
            }
            ModalHit::Note => self.focus = ModalFocus::Note,
            ModalHit::Save => self.handle_save(now),
            ModalHit::Cancel | ModalHit::Close | ModalHit::Outside => self.hide(now),
            ModalHit::Dialog => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use crossterm::event::KeyModifiers;

    use super::*;
    use crate::models::MoodType;

    fn catalog() -> Rc<MoodCatalog> {
        let mood = |label: &str, color: &str| MoodType {
            label: label.into(),
            icon: "*".into(),
            color: color.into(),
        };
        Rc::new(MoodCatalog::new(vec![
            ("happy".into(), mood("Happy", "#10b981")),
            ("sad".into(), mood("Sad", "#3b82f6")),
            ("neutral".into(), mood("Neutral", "#9ca3af")),
        ]))
    }

    struct Harness {
        modal: MoodRecordModal,
        saved: Rc<RefCell<Vec<MoodRecord>>>,
        closed: Rc<RefCell<u32>>,
        pulses: SaveAnimationHandle,
    }

    fn harness() -> Harness {
        let saved = Rc::new(RefCell::new(Vec::new()));
        let closed = Rc::new(RefCell::new(0));
        let pulses = SaveAnimationHandle::default();
        let sink = Rc::clone(&saved);
        let close_count = Rc::clone(&closed);
        let modal = MoodRecordModal::new(
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
            catalog(),
            Box::new(move |record| sink.borrow_mut().push(record)),
            Box::new(move || *close_count.borrow_mut() += 1),
            Some(pulses.clone()),
        );
        Harness {
            modal,
            saved,
            closed,
            pulses,
        }
    }

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn save_requires_a_mood() {
        let start = Instant::now();
        let mut h = harness();
        h.modal.show(start);
        h.modal.handle_save(start);
        assert!(h.saved.borrow().is_empty());
        assert!(h.modal.is_visible());
        assert!(!h.modal.can_save());
    }

    #[test]
    fn save_builds_record_pulses_and_closes_after_fade() {
        let start = Instant::now();
        let mut h = harness();
        h.modal.show(start);
        h.modal.handle_click(ModalHit::Mood(1), start);
        h.modal.set_note("  rainy day  ");
        h.modal.handle_click(ModalHit::Save, start);

        let saved = h.saved.borrow();
        assert_eq!(saved.len(), 1);
        assert_eq!(saved[0].date, "2024-05-10");
        assert_eq!(saved[0].mood, "sad");
        assert_eq!(saved[0].note, "rainy day");
        assert_eq!(saved[0].color, "#3b82f6");
        assert!(h.pulses.intensity("2024-05-10", start).is_some());

        assert!(!h.modal.tick(start + Duration::from_millis(100)));
        assert_eq!(*h.closed.borrow(), 0);
        assert!(h.modal.tick(start + MODAL_FADE));
        assert_eq!(*h.closed.borrow(), 1);
        assert!(!h.modal.is_visible());
    }

    #[test]
    fn escape_and_outside_click_close_without_saving() {
        let start = Instant::now();
        let mut h = harness();
        h.modal.show(start);
        h.modal.handle_key(key(KeyCode::Esc), start);
        h.modal.tick(start + MODAL_FADE);
        assert_eq!(*h.closed.borrow(), 1);

        let mut h = harness();
        h.modal.show(start);
        h.modal.handle_click(ModalHit::Outside, start);
        h.modal.tick(start + MODAL_FADE);
        assert_eq!(*h.closed.borrow(), 1);
        assert!(h.saved.borrow().is_empty());
    }

    #[test]
    fn note_input_is_capped() {
        let start = Instant::now();
        let mut h = harness();
        h.modal.show(start);
        h.modal.handle_key(key(KeyCode::Tab), start);
        assert_eq!(h.modal.focus(), ModalFocus::Note);
        for _ in 0..MAX_NOTE_CHARS + 20 {
            h.modal.handle_key(key(KeyCode::Char('a')), start);
        }
        assert_eq!(h.modal.note_chars(), MAX_NOTE_CHARS);

        // programmatic notes are not re-validated
        h.modal.set_note(&"b".repeat(300));
        assert_eq!(h.modal.note_chars(), 300);
    }

    #[test]
    fn keyboard_selection_and_placeholder() {
        let start = Instant::now();
        let mut h = harness();
        h.modal.show(start);
        assert_eq!(h.modal.placeholder(), DEFAULT_PLACEHOLDER);

        h.modal.handle_key(key(KeyCode::Left), start);
        assert_eq!(h.modal.cursor(), 2);
        h.modal.handle_key(key(KeyCode::Enter), start);
        assert_eq!(h.modal.selected_mood(), Some("neutral"));
        assert_eq!(h.modal.placeholder(), "Capture today's quiet moments...");

        // Enter on the selected mood saves
        h.modal.handle_key(key(KeyCode::Enter), start);
        assert_eq!(h.saved.borrow().len(), 1);
    }

    #[test]
    fn fade_in_opacity() {
        let start = Instant::now();
        let mut h = harness();
        assert_eq!(h.modal.opacity(start), 0.0);
        h.modal.show(start);
        assert!(h.modal.opacity(start + Duration::from_millis(150)) < 1.0);
        assert_eq!(h.modal.opacity(start + MODAL_FADE), 1.0);
    }
}
