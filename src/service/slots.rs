//! Working-day time slots.
//!
//! A day is cut into 30 minute slots between its working hours. Saturday is
//! the short day (09:00 to 14:00); every other day runs 08:00 to 17:00. Slot
//! labels (`"HH:MM - HH:MM"`) are what log entries are keyed by.

use std::fmt;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

pub const SLOT_MINUTES: u32 = 30;

/// Half-open working window `[start_hour, end_hour)` for one day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingHours {
    pub start_hour: u32,
    pub end_hour: u32,
}

impl WorkingHours {
    pub const SHORT_DAY: WorkingHours = WorkingHours { start_hour: 9, end_hour: 14 };
    pub const REGULAR_DAY: WorkingHours = WorkingHours { start_hour: 8, end_hour: 17 };

    pub fn for_date(date: NaiveDate) -> Self {
        if date.weekday() == Weekday::Sat {
            Self::SHORT_DAY
        } else {
            Self::REGULAR_DAY
        }
    }

    /// Slots covering the window; the last one ends exactly at `end_hour`.
    pub fn slots(self) -> impl Iterator<Item = TimeSlot> {
        let first = self.start_hour * 60;
        let last = self.end_hour * 60;

        (first..last)
            .step_by(SLOT_MINUTES as usize)
            .take_while(move |start| start + SLOT_MINUTES <= last)
            .filter_map(TimeSlot::starting_at_minute)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeSlot {
    pub start: NaiveTime,
    pub end: NaiveTime,
}

impl TimeSlot {
    fn starting_at_minute(minute_of_day: u32) -> Option<Self> {
        let end_minute = minute_of_day + SLOT_MINUTES;
        Some(Self {
            start: NaiveTime::from_hms_opt(minute_of_day / 60, minute_of_day % 60, 0)?,
            end: NaiveTime::from_hms_opt(end_minute / 60, end_minute % 60, 0)?,
        })
    }

    pub fn label(&self) -> String {
        self.to_string()
    }

    /// Parses a `"HH:MM - HH:MM"` label. Any well-formed label parses; use
    /// [`slot_on`] to check it belongs to a given day.
    pub fn parse(label: &str) -> Option<Self> {
        let (start, end) = label.split_once(" - ")?;
        let start = NaiveTime::parse_from_str(start.trim(), "%H:%M").ok()?;
        let end = NaiveTime::parse_from_str(end.trim(), "%H:%M").ok()?;
        (start < end).then_some(Self { start, end })
    }
}

impl fmt::Display for TimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.start.format("%H:%M"), self.end.format("%H:%M"))
    }
}

/// Ordered slots for the given day.
pub fn time_slots(date: NaiveDate) -> impl Iterator<Item = TimeSlot> {
    WorkingHours::for_date(date).slots()
}

/// Slot labels for the given day, in order.
pub fn time_slot_labels(date: NaiveDate) -> Vec<String> {
    time_slots(date).map(|slot| slot.label()).collect()
}

/// The slot of `date` that `label` names, if any.
pub fn slot_on(date: NaiveDate, label: &str) -> Option<TimeSlot> {
    let wanted = TimeSlot::parse(label)?;
    time_slots(date).find(|slot| *slot == wanted)
}

pub fn is_valid_slot(date: NaiveDate, label: &str) -> bool {
    slot_on(date, label).is_some()
}
