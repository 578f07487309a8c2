//! Single active mood filter shared by the calendar and the statistics panel.

use std::collections::BTreeMap;
use std::sync::mpsc::{self, Receiver, Sender};
use std::time::{Duration, Instant};

use tracing::{debug, info};

use crate::debounce::Debouncer;
use crate::draft::now_millis;
use crate::models::MoodRecord;

pub const FILTER_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellEmphasis {
    Highlighted,
    Dimmed,
    Normal,
}

/// Per-date emphasis computed when a filter is applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterView {
    mood_type: Option<String>,
    cells: BTreeMap<String, CellEmphasis>,
}

impl FilterView {
    fn for_mood(mood_type: &str, moods: &[MoodRecord]) -> Self {
        let mut cells = BTreeMap::new();
        for record in moods {
            // first record for a date wins, like the calendar lookup
            cells.entry(record.date.clone()).or_insert(if record.mood == mood_type {
                CellEmphasis::Highlighted
            } else {
                CellEmphasis::Dimmed
            });
        }
        Self {
            mood_type: Some(mood_type.to_string()),
            cells,
        }
    }

    pub fn is_active(&self) -> bool {
        self.mood_type.is_some()
    }

    pub fn mood_type(&self) -> Option<&str> {
        self.mood_type.as_deref()
    }

    pub fn emphasis(&self, date_key: &str) -> CellEmphasis {
        if self.mood_type.is_none() {
            return CellEmphasis::Normal;
        }
        self.cells
            .get(date_key)
            .copied()
            .unwrap_or(CellEmphasis::Dimmed)
    }

    pub fn highlighted_dates(&self) -> impl Iterator<Item = &str> {
        self.cells
            .iter()
            .filter(|(_, e)| **e == CellEmphasis::Highlighted)
            .map(|(d, _)| d.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterAction {
    Activated,
    Cleared,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterEvent {
    pub action: FilterAction,
    pub mood_type: Option<String>,
    pub timestamp: i64,
    pub view: FilterView,
}

/// Receiving end of `MoodFilterController::on_change`.
pub struct FilterSubscription {
    rx: Receiver<FilterEvent>,
}

impl FilterSubscription {
    /// All events delivered since the last drain, oldest first.
    pub fn drain(&self) -> Vec<FilterEvent> {
        self.rx.try_iter().collect()
    }
}

pub struct MoodFilterController {
    current: Option<String>,
    view: FilterView,
    pending: Debouncer<String>,
    listeners: Vec<Sender<FilterEvent>>,
}

impl Default for MoodFilterController {
    fn default() -> Self {
        Self::new()
    }
}

impl MoodFilterController {
    pub fn new() -> Self {
        Self {
            current: None,
            view: FilterView::default(),
            pending: Debouncer::new(FILTER_DEBOUNCE),
            listeners: Vec::new(),
        }
    }

    pub fn on_change(&mut self) -> FilterSubscription {
        let (tx, rx) = mpsc::channel();
        self.listeners.push(tx);
        FilterSubscription { rx }
    }

    /// Schedules an activation. Calls inside the debounce window collapse to
    /// the last one.
    pub fn activate_filter(&mut self, mood_type: &str, now: Instant) {
        debug!(mood_type, "filter activation scheduled");
        self.pending.call(mood_type.to_string(), now);
    }

    /// Applies a due activation against the current mood list. Returns true
    /// when the filter state changed.
    pub fn tick(&mut self, now: Instant, moods: &[MoodRecord]) -> bool {
        match self.pending.poll(now) {
            Some(mood_type) => {
                self.activate_now(&mood_type, moods);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.is_pending()
    }

    fn activate_now(&mut self, mood_type: &str, moods: &[MoodRecord]) {
        if self.current.as_deref() == Some(mood_type) {
            self.clear_filter();
            return;
        }
        if self.current.is_some() {
            self.restore_all();
        }
        self.current = Some(mood_type.to_string());
        self.view = FilterView::for_mood(mood_type, moods);
        info!(mood_type, matches = self.view.highlighted_dates().count(), "filter activated");
        self.dispatch(FilterAction::Activated);
    }

    pub fn clear_filter(&mut self) {
        if self.current.is_none() {
            return;
        }
        self.current = None;
        self.restore_all();
        info!("filter cleared");
    }

    fn restore_all(&mut self) {
        self.view = FilterView::default();
        self.dispatch(FilterAction::Cleared);
    }

    fn dispatch(&mut self, action: FilterAction) {
        let event = FilterEvent {
            action,
            mood_type: match action {
                FilterAction::Activated => self.current.clone(),
                FilterAction::Cleared => None,
            },
            timestamp: now_millis(),
            view: self.view.clone(),
        };
        // drop listeners whose subscription is gone
        self.listeners.retain(|tx| tx.send(event.clone()).is_ok());
    }

    pub fn get_current_filter(&self) -> Option<&str> {
        self.current.as_deref()
    }

    pub fn has_active_filter(&self) -> bool {
        self.current.is_some()
    }

    pub fn view(&self) -> &FilterView {
        &self.view
    }

    /// Drops any scheduled activation and clears the filter.
    pub fn reset(&mut self) {
        self.pending.cancel();
        self.clear_filter();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(date: &str, mood: &str) -> MoodRecord {
        MoodRecord {
            date: date.into(),
            mood: mood.into(),
            note: String::new(),
            color: String::new(),
            timestamp: 0,
        }
    }

    fn moods() -> Vec<MoodRecord> {
        vec![
            record("2024-05-01", "happy"),
            record("2024-05-02", "sad"),
            record("2024-05-03", "happy"),
        ]
    }

    #[test]
    fn two_quick_calls_activate_once_and_a_later_call_toggles_off() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        let events = filter.on_change();
        let moods = moods();

        filter.activate_filter("happy", start);
        filter.activate_filter("happy", start + Duration::from_millis(100));
        assert!(!filter.tick(start + Duration::from_millis(300), &moods));
        assert!(filter.tick(start + Duration::from_millis(400), &moods));
        assert!(!filter.tick(start + Duration::from_millis(800), &moods));

        let fired = events.drain();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].action, FilterAction::Activated);
        assert_eq!(filter.get_current_filter(), Some("happy"));

        filter.activate_filter("happy", start + Duration::from_millis(900));
        assert!(filter.tick(start + Duration::from_millis(1200), &moods));
        assert!(!filter.has_active_filter());
        let fired = events.drain();
        assert_eq!(fired.len(), 1);
        assert_eq!(fired[0].action, FilterAction::Cleared);
        assert_eq!(fired[0].mood_type, None);
    }

    #[test]
    fn burst_uses_last_argument() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        filter.activate_filter("happy", start);
        filter.activate_filter("sad", start + Duration::from_millis(50));
        filter.tick(start + Duration::from_secs(1), &moods());
        assert_eq!(filter.get_current_filter(), Some("sad"));
    }

    #[test]
    fn switching_mood_clears_then_activates() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        let events = filter.on_change();
        let moods = moods();

        filter.activate_filter("happy", start);
        filter.tick(start + FILTER_DEBOUNCE, &moods);
        filter.activate_filter("sad", start + Duration::from_secs(1));
        filter.tick(start + Duration::from_secs(2), &moods);

        let actions: Vec<_> = events.drain().into_iter().map(|e| e.action).collect();
        assert_eq!(
            actions,
            vec![
                FilterAction::Activated,
                FilterAction::Cleared,
                FilterAction::Activated
            ]
        );
        assert_eq!(filter.view().emphasis("2024-05-02"), CellEmphasis::Highlighted);
        assert_eq!(filter.view().emphasis("2024-05-01"), CellEmphasis::Dimmed);
    }

    #[test]
    fn view_marks_matches_and_dims_the_rest() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        assert_eq!(filter.view().emphasis("2024-05-01"), CellEmphasis::Normal);

        filter.activate_filter("happy", start);
        filter.tick(start + FILTER_DEBOUNCE, &moods());

        let view = filter.view();
        assert_eq!(view.emphasis("2024-05-01"), CellEmphasis::Highlighted);
        assert_eq!(view.emphasis("2024-05-02"), CellEmphasis::Dimmed);
        assert_eq!(view.emphasis("2024-05-20"), CellEmphasis::Dimmed);
        assert_eq!(
            view.highlighted_dates().collect::<Vec<_>>(),
            vec!["2024-05-01", "2024-05-03"]
        );
    }

    #[test]
    fn view_is_computed_at_activation_time() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        let mut moods = moods();
        filter.activate_filter("happy", start);
        filter.tick(start + FILTER_DEBOUNCE, &moods);

        moods.push(record("2024-05-04", "happy"));
        assert_eq!(filter.view().emphasis("2024-05-04"), CellEmphasis::Dimmed);
    }

    #[test]
    fn clear_without_filter_is_silent() {
        let mut filter = MoodFilterController::new();
        let events = filter.on_change();
        filter.clear_filter();
        assert!(events.drain().is_empty());
    }

    #[test]
    fn reset_cancels_pending_activation() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        filter.activate_filter("happy", start);
        filter.reset();
        assert!(!filter.tick(start + Duration::from_secs(1), &moods()));
        assert!(!filter.has_active_filter());
    }

    #[test]
    fn every_subscriber_gets_every_event() {
        let start = Instant::now();
        let mut filter = MoodFilterController::new();
        let a = filter.on_change();
        let b = filter.on_change();
        filter.activate_filter("sad", start);
        filter.tick(start + FILTER_DEBOUNCE, &moods());
        assert_eq!(a.drain().len(), 1);
        assert_eq!(b.drain().len(), 1);
    }
}
