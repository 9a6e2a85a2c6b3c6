//! Wall-clock to (operational date, slot) resolution.
//!
//! - One operational day = 12 fixed-width slots of 120 minutes.
//! - The day starts at a configurable [`DayStart`] (08:00 by default), not midnight.
//! - The *calendar* date is kept as the operational date; only slot numbering is
//!   shifted, so with an 08:00 start slots 9–12 cover 00:00–08:00 of that same date.
//! - The selected slot is the one that has just closed ([`SlotSelection::JustClosed`]):
//!   a slot's readings become reportable once its window has fully elapsed.
//!
//! All inputs are local wall-clock times already resolved to the operating
//! timezone (see [`crate::tz`]); no timezone conversion happens here. All math is
//! in whole minutes, seconds are ignored.

use std::{fmt, str::FromStr};

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::slot::{DAY_MINUTES, SLOT_MINUTES, SlotIndex, slot};

/// Rejected day start value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid day start {0:?}: expected HH:MM between 00:00 and 23:59")]
pub struct DayStartError(pub String);

/// Offset of the operational-day start from midnight, in whole minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayStart(u32);

impl DayStart {
    /// Midnight-aligned operational day.
    pub const MIDNIGHT: DayStart = DayStart(0);
    /// 08:00, the operational day start in use.
    pub const EIGHT_AM: DayStart = DayStart(8 * 60);

    pub fn from_minutes(minutes: u32) -> Result<Self, DayStartError> {
        if minutes < DAY_MINUTES {
            Ok(Self(minutes))
        } else {
            Err(DayStartError(minutes.to_string()))
        }
    }

    pub fn from_hm(hour: u32, minute: u32) -> Result<Self, DayStartError> {
        if hour < 24 && minute < 60 {
            Ok(Self(hour * 60 + minute))
        } else {
            Err(DayStartError(format!("{hour:02}:{minute:02}")))
        }
    }

    pub const fn minutes(self) -> u32 {
        self.0
    }
}

impl Default for DayStart {
    fn default() -> Self {
        Self::EIGHT_AM
    }
}

impl fmt::Display for DayStart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:02}:{:02}", self.0 / 60, self.0 % 60)
    }
}

impl FromStr for DayStart {
    type Err = DayStartError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let t = NaiveTime::parse_from_str(s.trim(), "%H:%M")
            .map_err(|_| DayStartError(s.to_string()))?;
        Self::from_hm(t.hour(), t.minute())
    }
}

impl Serialize for DayStart {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for DayStart {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Which slot a wall-clock instant selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotSelection {
    /// The slot immediately preceding the one containing `now` (1 wraps to 12).
    #[default]
    JustClosed,
    /// The slot containing `now`.
    Containing,
}

/// Result of resolving a wall-clock instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSlot {
    /// Calendar date of the instant.
    pub operational_date: NaiveDate,
    /// Selected slot.
    pub slot_index: SlotIndex,
}

/// Minutes elapsed since the operational-day start, in `0..1440`.
///
/// Time before the day start counts towards the tail of the day.
pub fn position_in_day(now: NaiveDateTime, day_start: DayStart) -> u32 {
    let since_midnight = now.hour() * 60 + now.minute();
    (since_midnight + DAY_MINUTES - day_start.minutes()) % DAY_MINUTES
}

/// The slot whose window contains `now`.
pub fn containing_slot(now: NaiveDateTime, day_start: DayStart) -> SlotIndex {
    let pos = position_in_day(now, day_start);
    let idx = (pos / SLOT_MINUTES) as u8 + 1;
    // pos < 1440 ⇒ idx ∈ 1..=12
    SlotIndex::new(idx).unwrap_or(SlotIndex::LAST)
}

/// Resolve `now` with the just-closed rule.
///
/// A timestamp exactly on a slot boundary selects the slot that just ended.
///
/// The calendar date of `now` is kept, so between midnight and 02:00 (with an
/// 08:00 start) the result is slot 8 of *today*, whose [`slot_window`] runs
/// from 22:00 tonight to the next midnight and has not opened yet. The slot
/// that actually just elapsed is slot 8 of the previous date.
pub fn resolve_current_slot(now: NaiveDateTime, day_start: DayStart) -> CurrentSlot {
    resolve_slot_with(now, day_start, SlotSelection::JustClosed)
}

/// Resolve `now` with an explicit selection policy.
pub fn resolve_slot_with(
    now: NaiveDateTime,
    day_start: DayStart,
    selection: SlotSelection,
) -> CurrentSlot {
    let containing = containing_slot(now, day_start);
    let slot_index = match selection {
        SlotSelection::JustClosed => containing.prev(),
        SlotSelection::Containing => containing,
    };
    CurrentSlot {
        operational_date: now.date(),
        slot_index,
    }
}

/// Wall-clock window of a slot, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SlotWindow {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl SlotWindow {
    /// True once the window has fully elapsed at `now`.
    pub fn is_closed_at(&self, now: NaiveDateTime) -> bool {
        now >= self.end
    }

    /// True if `now` falls inside the window.
    pub fn contains(&self, now: NaiveDateTime) -> bool {
        self.start <= now && now < self.end
    }
}

/// The wall-clock window of `slot_index` on `date`.
///
/// Follows the calendar-date numbering: with an 08:00 start, slot 12 of a date
/// is 06:00–08:00 of that same date, and slot 8 ends at the following midnight.
pub fn slot_window(date: NaiveDate, slot_index: SlotIndex, day_start: DayStart) -> SlotWindow {
    let s = slot(slot_index);
    let start_minutes = (day_start.minutes() + s.start_offset) % DAY_MINUTES;
    let start = date.and_time(NaiveTime::MIN) + Duration::minutes(start_minutes as i64);
    let end = start + Duration::minutes((s.end_offset - s.start_offset) as i64);
    SlotWindow { start, end }
}

// -------------------- tests --------------------
#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn at(h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 14)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn idx(n: u8) -> SlotIndex {
        SlotIndex::new(n).unwrap()
    }

    #[test]
    fn day_start_parse_display_roundtrip() {
        let ds: DayStart = "08:00".parse().unwrap();
        assert_eq!(ds, DayStart::EIGHT_AM);
        assert_eq!(ds.to_string(), "08:00");
        assert!("24:00".parse::<DayStart>().is_err());
        assert!("8h".parse::<DayStart>().is_err());
        assert!(DayStart::from_minutes(1440).is_err());
    }

    #[test]
    fn eight_oclock_exactly_selects_slot_twelve() {
        let got = resolve_current_slot(at(8, 0), DayStart::EIGHT_AM);
        assert_eq!(got.slot_index, SlotIndex::LAST);
        assert_eq!(got.operational_date, at(8, 0).date());
    }

    #[test]
    fn before_day_start_keeps_calendar_date() {
        let got = resolve_current_slot(at(7, 59), DayStart::EIGHT_AM);
        assert_eq!(got.operational_date, at(7, 59).date());
        // 07:59 sits in slot 12 (06:00–08:00); the just-closed slot is 11.
        assert_eq!(containing_slot(at(7, 59), DayStart::EIGHT_AM), SlotIndex::LAST);
        assert_eq!(got.slot_index, idx(11));

        let containing = resolve_slot_with(at(7, 59), DayStart::EIGHT_AM, SlotSelection::Containing);
        assert_eq!(containing.slot_index, SlotIndex::LAST);
        assert_eq!(containing.operational_date, at(7, 59).date());
    }

    #[test]
    fn midnight_is_tail_of_day_numbering() {
        // 00:00 with an 08:00 start lies in slot 9 (00:00–02:00), so slot 8 just closed.
        assert_eq!(containing_slot(at(0, 0), DayStart::EIGHT_AM), idx(9));
        assert_eq!(resolve_current_slot(at(0, 0), DayStart::EIGHT_AM).slot_index, idx(8));
    }

    #[test]
    fn after_midnight_selects_a_window_that_has_not_opened() {
        let now = at(0, 30);
        let got = resolve_current_slot(now, DayStart::EIGHT_AM);
        assert_eq!(got.operational_date, now.date());
        assert_eq!(got.slot_index, idx(8));

        let w = slot_window(got.operational_date, got.slot_index, DayStart::EIGHT_AM);
        assert_eq!(w.start, at(22, 0));
        assert!(!w.is_closed_at(now));

        let yesterday = now.date().pred_opt().unwrap();
        assert!(slot_window(yesterday, idx(8), DayStart::EIGHT_AM).is_closed_at(now));
    }

    #[test]
    fn midnight_day_start_policy() {
        assert_eq!(containing_slot(at(0, 0), DayStart::MIDNIGHT), SlotIndex::FIRST);
        assert_eq!(
            resolve_current_slot(at(0, 0), DayStart::MIDNIGHT).slot_index,
            SlotIndex::LAST
        );
        assert_eq!(resolve_current_slot(at(13, 30), DayStart::MIDNIGHT).slot_index, idx(6));
    }

    #[test]
    fn slot_start_resolves_to_previous_slot() {
        let date = at(0, 0).date();
        for s in SlotIndex::all() {
            let w = slot_window(date, s, DayStart::EIGHT_AM);
            let got = resolve_current_slot(w.start, DayStart::EIGHT_AM);
            assert_eq!(got.slot_index, s.prev(), "slot {s}");
            assert_eq!(got.operational_date, date);
        }
    }

    #[test]
    fn slot_windows_follow_calendar_numbering() {
        let date = at(0, 0).date();
        let w12 = slot_window(date, SlotIndex::LAST, DayStart::EIGHT_AM);
        assert_eq!(w12.start, at(6, 0));
        assert_eq!(w12.end, at(8, 0));
        assert!(w12.is_closed_at(at(8, 0)));
        assert!(!w12.is_closed_at(at(7, 59)));
        assert!(w12.contains(at(7, 59)));

        let w8 = slot_window(date, idx(8), DayStart::EIGHT_AM);
        assert_eq!(w8.start, at(22, 0));
        assert_eq!(w8.end, at(0, 0) + Duration::days(1));
    }

    proptest! {
        #[test]
        fn resolver_is_total_over_the_day(minute in 0u32..1440, start in 0u32..1440, secs in 0u32..60) {
            let now = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap()
                .and_hms_opt(minute / 60, minute % 60, secs).unwrap();
            let ds = DayStart::from_minutes(start).unwrap();
            let got = resolve_current_slot(now, ds);
            prop_assert!((1..=12).contains(&got.slot_index.get()));
            prop_assert_eq!(got.operational_date, now.date());
            // the containing slot's window really contains `now`
            let w = slot_window(now.date(), containing_slot(now, ds), ds);
            let trimmed = now.with_second(0).unwrap();
            prop_assert!(w.contains(trimmed) || w.contains(trimmed + Duration::days(1))
                || w.contains(trimmed - Duration::days(1)));
        }
    }
}
