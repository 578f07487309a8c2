use std::rc::Rc;
use std::time::{Duration, Instant};

use chrono::{Datelike, NaiveDate};
use tracing::{debug, info, warn};

use crate::filter::{FilterAction, FilterSubscription, MoodFilterController};
use crate::models::{MoodCatalog, MoodRecord};

pub const BAR_STAGGER: Duration = Duration::from_millis(100);
pub const BAR_GROW: Duration = Duration::from_millis(800);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoodFrequency {
    pub mood: String,
    pub count: usize,
    pub percentage: u32,
    pub color: String,
    pub label: String,
    pub icon: String,
}

/// Canned advice for the month's dominant mood.
pub fn life_advice(mood: &str) -> Option<&'static str> {
    let text = match mood {
        "happy" => "Hold on to this joy! Keep doing what makes you happy, and share it with the people around you.",
        "sad" => "Let yourself feel the sadness, it is a normal emotion. Talk to someone you trust, or do something that comforts you.",
        "excited" => "Your energy is great! Between the highs, look after your body and get enough rest.",
        "neutral" => "Calm is a strength too. Enjoy the quiet, and maybe try something new to add some colour.",
        "anxious" => "Breathe deeply, things will work out. Try writing your worries down, or move your body to let the pressure out.",
        "tired" => "Your body is asking for rest. Give yourself time to relax and go to bed early; tomorrow will be better.",
        "motivated" => "Brilliant! Use this drive to chase your goals, and remember to balance work with rest.",
        _ => return None,
    };
    Some(text)
}

/// Month mood distribution panel.
pub struct EmotionStatistics {
    catalog: Rc<MoodCatalog>,
    moods: Vec<MoodRecord>,
    month: NaiveDate,
    frequency: Vec<MoodFrequency>,
    animation_start: Option<Instant>,
    active_filter: Option<String>,
    filter_events: Option<FilterSubscription>,
}

impl EmotionStatistics {
    pub fn new(catalog: Rc<MoodCatalog>, month: NaiveDate) -> Self {
        Self {
            catalog,
            moods: Vec::new(),
            month,
            frequency: Vec::new(),
            animation_start: None,
            active_filter: None,
            filter_events: None,
        }
    }

    pub fn set_catalog(&mut self, catalog: Rc<MoodCatalog>) {
        self.catalog = catalog;
    }

    pub fn subscribe(&mut self, controller: &mut MoodFilterController) {
        self.filter_events = Some(controller.on_change());
    }

    /// Replaces the data and month, recomputes and restarts the bar animation.
    pub fn update(&mut self, moods: &[MoodRecord], month: NaiveDate, now: Instant) {
        self.moods = moods.to_vec();
        self.month = month;
        self.frequency = self.calculate_mood_frequency();
        self.animation_start = Some(now);
        info!(
            month = %self.month_label(),
            moods = self.frequency.len(),
            "statistics updated"
        );
    }

    /// Frequencies for the current month, highest percentage first.
    ///
    /// Ties keep the order in which the moods first appear in the data.
    /// Percentages are rounded independently and need not sum to 100.
    pub fn calculate_mood_frequency(&self) -> Vec<MoodFrequency> {
        let (year, month) = (self.month.year(), self.month.month());
        let in_month: Vec<&MoodRecord> = self
            .moods
            .iter()
            .filter(|m| {
                m.parsed_date()
                    .is_some_and(|d| d.year() == year && d.month() == month)
            })
            .collect();
        if in_month.is_empty() {
            return Vec::new();
        }

        let mut counts: Vec<(&str, usize)> = Vec::new();
        for record in &in_month {
            match counts.iter_mut().find(|(k, _)| *k == record.mood) {
                Some((_, count)) => *count += 1,
                None => counts.push((record.mood.as_str(), 1)),
            }
        }

        let total = in_month.len() as f64;
        let mut frequency: Vec<MoodFrequency> = counts
            .into_iter()
            .map(|(mood, count)| MoodFrequency {
                mood: mood.to_string(),
                count,
                percentage: (count as f64 / total * 100.0).round() as u32,
                color: self.catalog.color_for(mood).to_string(),
                label: self.catalog.label_for(mood).to_string(),
                icon: self.catalog.icon_for(mood).to_string(),
            })
            .collect();
        frequency.sort_by(|a, b| b.percentage.cmp(&a.percentage));
        frequency
    }

    pub fn frequency(&self) -> &[MoodFrequency] {
        &self.frequency
    }

    pub fn dominant_mood(&self) -> Option<&MoodFrequency> {
        let dominant = self.frequency.first()?;
        debug!(mood = %dominant.mood, percentage = dominant.percentage, "dominant mood");
        Some(dominant)
    }

    /// `(label, advice)` for the dominant mood, if one has advice.
    pub fn advice(&self) -> Option<(&str, &'static str)> {
        let dominant = self.dominant_mood()?;
        match life_advice(&dominant.mood) {
            Some(text) => Some((dominant.label.as_str(), text)),
            None => {
                warn!(mood = %dominant.mood, "no advice for dominant mood");
                None
            }
        }
    }

    pub fn month(&self) -> NaiveDate {
        self.month
    }

    pub fn month_label(&self) -> String {
        self.month.format("%B %Y").to_string()
    }

    /// Animated width of bar `index` as a fraction of its target, 0.0 to 1.0.
    pub fn bar_progress(&self, index: usize, now: Instant) -> f64 {
        let Some(start) = self.animation_start else {
            return 1.0;
        };
        let begin = start + BAR_STAGGER * index as u32;
        if now <= begin {
            return 0.0;
        }
        let t = (now - begin).as_secs_f64() / BAR_GROW.as_secs_f64();
        if t >= 1.0 {
            1.0
        } else {
            // ease-out
            1.0 - (1.0 - t).powi(3)
        }
    }

    pub fn is_animating(&self, now: Instant) -> bool {
        let Some(start) = self.animation_start else {
            return false;
        };
        let bars = self.frequency.len() as u32;
        now < start + BAR_STAGGER * bars.saturating_sub(1) + BAR_GROW
    }

    /// A click on a bar asks the controller to filter by its mood.
    pub fn handle_bar_click(
        &mut self,
        index: usize,
        controller: &mut MoodFilterController,
        now: Instant,
    ) {
        if let Some(entry) = self.frequency.get(index) {
            info!(mood = %entry.mood, "statistics bar clicked");
            controller.activate_filter(&entry.mood, now);
        }
    }

    /// Applies filter changes broadcast since the last call.
    pub fn sync_filter(&mut self) {
        let Some(events) = &self.filter_events else {
            return;
        };
        for event in events.drain() {
            self.active_filter = match event.action {
                FilterAction::Activated => event.mood_type,
                FilterAction::Cleared => None,
            };
        }
    }

    pub fn active_filter(&self) -> Option<&str> {
        self.active_filter.as_deref()
    }
}
