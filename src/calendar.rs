use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{Datelike, Months, NaiveDate};
use tracing::{debug, info, warn};

use crate::draft::now_millis;
use crate::filter::{CellEmphasis, FilterAction, FilterSubscription, FilterView, MoodFilterController};
use crate::loader::DataLoader;
use crate::models::{FALLBACK_COLOR, MoodCatalog, MoodRecord, MoodType, date_key};

pub const DOUBLE_CLICK_WINDOW: Duration = Duration::from_millis(250);
pub const SAVE_PULSE: Duration = Duration::from_millis(600);
pub const MONTH_FADE_OUT: Duration = Duration::from_millis(200);
pub const MONTH_FADE_IN: Duration = Duration::from_millis(300);
pub const QUICK_RECORD_MOOD: &str = "neutral";

/// Two-stop gradient for a mood's indicator dot.
pub fn mood_gradient(mood: &str) -> (&'static str, &'static str) {
    match mood {
        "happy" => ("#10b981", "#14b8a6"),
        "excited" => ("#f59e0b", "#ef4444"),
        "calm" => ("#3b82f6", "#8b5cf6"),
        "tired" => ("#6366f1", "#06b6d4"),
        "sad" => ("#6b7280", "#9ca3af"),
        "anxious" => ("#f97316", "#fb923c"),
        "productive" => ("#22c55e", "#84cc16"),
        "creative" => ("#a855f7", "#ec4899"),
        _ => ("#6b7280", "#9ca3af"),
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if year % 400 == 0 || (year % 4 == 0 && year % 100 != 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Pending save pulses by date, shared with whoever saves a record.
#[derive(Debug, Clone, Default)]
pub struct SaveAnimationHandle(Rc<RefCell<BTreeMap<String, Instant>>>);

impl SaveAnimationHandle {
    pub fn trigger(&self, date: &str, now: Instant) {
        debug!(date, "save pulse started");
        self.0.borrow_mut().insert(date.to_string(), now);
    }

    /// Pulse strength for `date`, 1.0 at the start fading to 0.0.
    pub fn intensity(&self, date: &str, now: Instant) -> Option<f64> {
        let started = *self.0.borrow().get(date)?;
        let elapsed = now.saturating_duration_since(started);
        if elapsed >= SAVE_PULSE {
            return None;
        }
        Some(1.0 - elapsed.as_secs_f64() / SAVE_PULSE.as_secs_f64())
    }

    pub fn prune(&self, now: Instant) {
        self.0
            .borrow_mut()
            .retain(|_, started| now.saturating_duration_since(*started) < SAVE_PULSE);
    }

    pub fn is_active(&self) -> bool {
        !self.0.borrow().is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickState {
    Idle,
    PendingSingle { date: NaiveDate, deadline: Instant },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CalendarAction {
    /// Open the record modal for `date`, optionally with a mood preselected.
    OpenModal {
        date: NaiveDate,
        preselect: Option<String>,
    },
    ShowDetails(NaiveDate),
    QuickRecorded(MoodRecord),
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum MonthTransition {
    Steady,
    FadingOut { until: Instant },
    FadingIn { since: Instant },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DayCell {
    pub day: u32,
    pub date: NaiveDate,
    pub key: String,
    pub mood: Option<String>,
    pub glow: Option<String>,
    pub gradient: Option<(&'static str, &'static str)>,
    pub note: Option<String>,
    pub is_today: bool,
    pub is_selected: bool,
    pub emphasis: CellEmphasis,
    pub pulse: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthGrid {
    pub title: String,
    /// Blank cells before the 1st; weeks start on Sunday.
    pub leading_blanks: u32,
    pub days: Vec<DayCell>,
}

/// Month view over the session's mood records. Sole owner of the records.
pub struct MoodCalendar {
    moods: Vec<MoodRecord>,
    catalog: Rc<MoodCatalog>,
    month: NaiveDate,
    selected: NaiveDate,
    click: ClickState,
    filter_view: FilterView,
    filter_events: Option<FilterSubscription>,
    save_animation: SaveAnimationHandle,
    transition: MonthTransition,
    details: Option<NaiveDate>,
}

impl MoodCalendar {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            moods: Vec::new(),
            catalog: Rc::new(MoodCatalog::default()),
            month: first_of_month(today),
            selected: today,
            click: ClickState::Idle,
            filter_view: FilterView::default(),
            filter_events: None,
            save_animation: SaveAnimationHandle::default(),
            transition: MonthTransition::Steady,
            details: None,
        }
    }

    pub fn load_moods(&mut self, loader: &mut DataLoader) {
        let data = loader.load_moods();
        info!(
            records = data.moods.len(),
            mood_types = data.mood_types.len(),
            "mood data loaded"
        );
        self.moods = data.moods;
        self.catalog = Rc::new(data.mood_types);
        self.details = None;
    }

    pub fn reload(&mut self, loader: &mut DataLoader) {
        loader.clear_cache();
        self.load_moods(loader);
    }

    pub fn subscribe(&mut self, controller: &mut MoodFilterController) {
        self.filter_events = Some(controller.on_change());
    }

    pub fn moods(&self) -> &[MoodRecord] {
        &self.moods
    }

    pub fn catalog(&self) -> Rc<MoodCatalog> {
        Rc::clone(&self.catalog)
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn selected(&self) -> NaiveDate {
        self.selected
    }

    pub fn month_title(&self) -> String {
        self.month.format("%B %Y").to_string()
    }

    /// First record for `date_key`, if any.
    pub fn get_mood_for_date(&self, date_key: &str) -> Option<&MoodRecord> {
        self.moods.iter().find(|m| m.date == date_key)
    }

    /// `record.color`, else the catalog colour, else grey.
    pub fn glow_color(&self, record: &MoodRecord) -> String {
        if !record.color.is_empty() {
            return record.color.clone();
        }
        self.catalog
            .get(&record.mood)
            .map(|t| t.color.clone())
            .unwrap_or_else(|| FALLBACK_COLOR.to_string())
    }

    /// Stores `record`, replacing any record for the same date.
    pub fn record(&mut self, record: MoodRecord) {
        match self.moods.iter().position(|m| m.date == record.date) {
            Some(index) => {
                info!(date = %record.date, mood = %record.mood, "mood record replaced");
                self.moods[index] = record;
            }
            None => {
                info!(date = %record.date, mood = %record.mood, "mood recorded");
                self.moods.push(record);
            }
        }
    }

    pub fn quick_record(&mut self, date: NaiveDate, now: Instant) -> MoodRecord {
        let record = MoodRecord {
            date: date_key(date),
            mood: QUICK_RECORD_MOOD.to_string(),
            note: String::new(),
            color: self.catalog.color_for(QUICK_RECORD_MOOD).to_string(),
            timestamp: now_millis(),
        };
        self.record(record.clone());
        self.trigger_save_animation(&record.date, now);
        record
    }

    pub fn trigger_save_animation(&self, date_key: &str, now: Instant) {
        self.save_animation.trigger(date_key, now);
    }

    pub fn save_animation(&self) -> SaveAnimationHandle {
        self.save_animation.clone()
    }

    pub fn navigate_month(&mut self, direction: i32, now: Instant) {
        let step = Months::new(direction.unsigned_abs());
        let target = if direction < 0 {
            self.month.checked_sub_months(step)
        } else {
            self.month.checked_add_months(step)
        };
        let Some(target) = target else {
            warn!(direction, "month navigation out of range");
            return;
        };
        self.month = target;
        let day = self
            .selected
            .day()
            .min(days_in_month(target.year(), target.month()));
        self.selected = target.with_day(day).unwrap_or(target);
        self.details = None;
        self.transition = MonthTransition::FadingOut {
            until: now + MONTH_FADE_OUT,
        };
        info!(month = %self.month_title(), "navigated month");
    }

    /// Grid opacity for the month-change fade.
    pub fn grid_opacity(&self, now: Instant) -> f64 {
        match self.transition {
            MonthTransition::Steady => 1.0,
            MonthTransition::FadingOut { until } => {
                let left = until.saturating_duration_since(now);
                left.as_secs_f64() / MONTH_FADE_OUT.as_secs_f64()
            }
            MonthTransition::FadingIn { since } => {
                let elapsed = now.saturating_duration_since(since);
                (elapsed.as_secs_f64() / MONTH_FADE_IN.as_secs_f64()).min(1.0)
            }
        }
    }

    pub fn is_transitioning(&self) -> bool {
        self.transition != MonthTransition::Steady
    }

    /// Advances timers. Returns the single click that committed, if any.
    pub fn tick(&mut self, now: Instant) -> Option<CalendarAction> {
        self.transition = match self.transition {
            MonthTransition::FadingOut { until } if now >= until => {
                MonthTransition::FadingIn { since: now }
            }
            MonthTransition::FadingIn { since } if now >= since + MONTH_FADE_IN => {
                MonthTransition::Steady
            }
            other => other,
        };
        self.save_animation.prune(now);

        match self.click {
            ClickState::PendingSingle { date, deadline } if now >= deadline => {
                self.click = ClickState::Idle;
                Some(self.single_click(date))
            }
            _ => None,
        }
    }

    pub fn click_state(&self) -> ClickState {
        self.click
    }

    /// Mouse press on a day. A second press on the same day inside
    /// `DOUBLE_CLICK_WINDOW` is a double click; otherwise the single click
    /// commits when the window closes (see `tick`).
    pub fn click_day(&mut self, date: NaiveDate, now: Instant) -> Option<CalendarAction> {
        self.selected = date;
        match self.click {
            ClickState::PendingSingle {
                date: pending,
                deadline,
            } if pending == date && now < deadline => {
                self.click = ClickState::Idle;
                Some(self.double_click(date, now))
            }
            ClickState::PendingSingle { date: pending, .. } => {
                self.click = ClickState::PendingSingle {
                    date,
                    deadline: now + DOUBLE_CLICK_WINDOW,
                };
                Some(self.single_click(pending))
            }
            ClickState::Idle => {
                self.click = ClickState::PendingSingle {
                    date,
                    deadline: now + DOUBLE_CLICK_WINDOW,
                };
                None
            }
        }
    }

    /// Empty day opens the modal; a recorded day shows its details.
    pub fn single_click(&mut self, date: NaiveDate) -> CalendarAction {
        let key = date_key(date);
        if self.get_mood_for_date(&key).is_some() {
            debug!(date = %key, "showing mood details");
            self.details = Some(date);
            CalendarAction::ShowDetails(date)
        } else {
            self.details = None;
            CalendarAction::OpenModal {
                date,
                preselect: None,
            }
        }
    }

    /// Empty day gets a quick neutral record; a recorded day reopens the
    /// modal with its mood selected.
    pub fn double_click(&mut self, date: NaiveDate, now: Instant) -> CalendarAction {
        let key = date_key(date);
        match self.get_mood_for_date(&key) {
            Some(record) => CalendarAction::OpenModal {
                date,
                preselect: Some(record.mood.clone()),
            },
            None => CalendarAction::QuickRecorded(self.quick_record(date, now)),
        }
    }

    /// Moves the selection by `days`, following it into other months.
    pub fn move_selection(&mut self, days: i64, now: Instant) {
        let Some(target) = self
            .selected
            .checked_add_signed(chrono::Duration::days(days))
        else {
            return;
        };
        let target_month = first_of_month(target);
        if target_month != self.month {
            let direction = if target_month > self.month { 1 } else { -1 };
            self.navigate_month(direction, now);
        }
        self.selected = target;
        self.details = None;
    }

    pub fn details(&self) -> Option<(&MoodRecord, &MoodType)> {
        let date = self.details?;
        let record = self.get_mood_for_date(&date_key(date))?;
        let mood_type = self.catalog.get(&record.mood)?;
        Some((record, mood_type))
    }

    pub fn details_record(&self) -> Option<&MoodRecord> {
        let date = self.details?;
        self.get_mood_for_date(&date_key(date))
    }

    pub fn dismiss_details(&mut self) {
        self.details = None;
    }

    /// Applies filter changes broadcast since the last call.
    pub fn sync_filter(&mut self) {
        let events = match &self.filter_events {
            Some(sub) => sub.drain(),
            None => return,
        };
        for event in events {
            match event.action {
                FilterAction::Activated => self.highlight_dates(event.view),
                FilterAction::Cleared => self.clear_filter(),
            }
        }
    }

    pub fn highlight_dates(&mut self, view: FilterView) {
        debug!(mood = ?view.mood_type(), "calendar filter applied");
        self.filter_view = view;
    }

    pub fn clear_filter(&mut self) {
        self.filter_view = FilterView::default();
    }

    pub fn filter_view(&self) -> &FilterView {
        &self.filter_view
    }

    pub fn legend(&self) -> Vec<(String, MoodType)> {
        self.catalog
            .iter()
            .map(|(key, t)| (key.to_string(), t.clone()))
            .collect()
    }

    pub fn month_grid(&self, today: NaiveDate, now: Instant) -> MonthGrid {
        let (year, month) = (self.month.year(), self.month.month());
        let days = (1..=days_in_month(year, month))
            .filter_map(|day| NaiveDate::from_ymd_opt(year, month, day))
            .map(|date| {
                let key = date_key(date);
                let record = self.get_mood_for_date(&key);
                DayCell {
                    day: date.day(),
                    date,
                    mood: record.map(|r| r.mood.clone()),
                    glow: record.map(|r| self.glow_color(r)),
                    gradient: record.map(|r| mood_gradient(&r.mood)),
                    note: record.map(|r| r.note.clone()).filter(|n| !n.is_empty()),
                    is_today: date == today,
                    is_selected: date == self.selected,
                    emphasis: self.filter_view.emphasis(&key),
                    pulse: self.save_animation.intensity(&key, now),
                    key,
                }
            })
            .collect();

        MonthGrid {
            title: self.month_title(),
            leading_blanks: self.month.weekday().num_days_from_sunday(),
            days,
        }
    }
}
