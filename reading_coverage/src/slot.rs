//! Slot catalog: the twelve fixed 2-hour periods of an operational day.
//!
//! A [`Slot`] is addressed by its [`SlotIndex`] (1..=12), which is the stable
//! external key used by the system of record. Offsets are expressed in minutes
//! from the *operational-day start*, not from midnight; converting them to a
//! wall-clock time needs a [`DayStart`](crate::clock::DayStart).
//!
//! The catalog is a `const` table: it is built at compile time, shared by the
//! whole process and never mutated.
//!
//! ```
//! use reading_coverage::slot::{SlotIndex, catalog};
//!
//! let first = &catalog()[0];
//! assert_eq!(first.index, SlotIndex::FIRST);
//! assert_eq!(first.start_offset, 0);
//! assert_eq!(catalog()[11].end_offset, 24 * 60);
//! ```

use std::{fmt, str::FromStr};

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::clock::DayStart;

/// Number of slots in one operational day.
pub const SLOT_COUNT: u8 = 12;
/// Width of one slot in minutes.
pub const SLOT_MINUTES: u32 = 120;
/// Length of an operational day in minutes.
pub const DAY_MINUTES: u32 = 24 * 60;

/// Rejected slot index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotIndexError {
    /// Outside `1..=12`.
    #[error("slot index must be between 1 and 12, got {0}")]
    OutOfRange(i64),
    /// Not a number at all.
    #[error("invalid slot index: {0:?}")]
    Unparsable(String),
}

/// 1-based position of a slot within the operational day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct SlotIndex(u8);

impl SlotIndex {
    /// Slot 1, the one opening the operational day.
    pub const FIRST: SlotIndex = SlotIndex(1);
    /// Slot 12, the one closing the operational day.
    pub const LAST: SlotIndex = SlotIndex(SLOT_COUNT);

    /// Validating constructor.
    pub const fn new(index: u8) -> Result<Self, SlotIndexError> {
        if index >= 1 && index <= SLOT_COUNT {
            Ok(Self(index))
        } else {
            Err(SlotIndexError::OutOfRange(index as i64))
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// Zero-based position, for indexing the catalog table.
    pub const fn position(self) -> usize {
        (self.0 - 1) as usize
    }

    /// The slot before this one; slot 1 wraps to slot 12.
    pub const fn prev(self) -> Self {
        if self.0 == 1 { Self::LAST } else { Self(self.0 - 1) }
    }

    /// The slot after this one; slot 12 wraps to slot 1.
    pub const fn next(self) -> Self {
        if self.0 == SLOT_COUNT { Self::FIRST } else { Self(self.0 + 1) }
    }

    /// All slot indices in day order.
    pub fn all() -> impl Iterator<Item = SlotIndex> + Clone {
        (1..=SLOT_COUNT).map(SlotIndex)
    }
}

impl TryFrom<u8> for SlotIndex {
    type Error = SlotIndexError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<SlotIndex> for u8 {
    fn from(value: SlotIndex) -> Self {
        value.0
    }
}

impl fmt::Display for SlotIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SlotIndex {
    type Err = SlotIndexError;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let n: i64 = s
            .trim()
            .parse()
            .map_err(|_| SlotIndexError::Unparsable(s.to_string()))?;
        u8::try_from(n)
            .map_err(|_| SlotIndexError::OutOfRange(n))
            .and_then(Self::new)
    }
}

/// One fixed period of the operational day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Slot {
    /// Stable external key.
    pub index: SlotIndex,
    /// Minutes from the operational-day start (inclusive).
    pub start_offset: u32,
    /// Minutes from the operational-day start (exclusive).
    pub end_offset: u32,
    /// Short display code ("T01".."T12"). Display text may change; `index` never does.
    pub name: &'static str,
}

impl Slot {
    /// Wall-clock time the slot opens at, given the day start.
    pub fn wall_clock_start(&self, day_start: DayStart) -> NaiveTime {
        minutes_to_time(day_start.minutes() + self.start_offset)
    }

    /// Wall-clock time the slot closes at, given the day start.
    pub fn wall_clock_end(&self, day_start: DayStart) -> NaiveTime {
        minutes_to_time(day_start.minutes() + self.end_offset)
    }

    /// Human label such as `"08:00-10:00"`.
    pub fn label(&self, day_start: DayStart) -> String {
        format!(
            "{}-{}",
            self.wall_clock_start(day_start).format("%H:%M"),
            self.wall_clock_end(day_start).format("%H:%M")
        )
    }

    /// True if `offset` (minutes from day start) falls inside this slot.
    pub fn contains_offset(&self, offset: u32) -> bool {
        (self.start_offset..self.end_offset).contains(&offset)
    }
}

fn minutes_to_time(minutes: u32) -> NaiveTime {
    let m = minutes % DAY_MINUTES;
    // m < 1440 so hour/minute are always in range
    NaiveTime::from_hms_opt(m / 60, m % 60, 0).unwrap_or(NaiveTime::MIN)
}

const NAMES: [&str; SLOT_COUNT as usize] = [
    "T01", "T02", "T03", "T04", "T05", "T06", "T07", "T08", "T09", "T10", "T11", "T12",
];

const fn build_catalog() -> [Slot; SLOT_COUNT as usize] {
    let mut out = [Slot {
        index: SlotIndex::FIRST,
        start_offset: 0,
        end_offset: SLOT_MINUTES,
        name: NAMES[0],
    }; SLOT_COUNT as usize];
    let mut i = 0;
    while i < SLOT_COUNT as usize {
        out[i] = Slot {
            index: SlotIndex(i as u8 + 1),
            start_offset: i as u32 * SLOT_MINUTES,
            end_offset: (i as u32 + 1) * SLOT_MINUTES,
            name: NAMES[i],
        };
        i += 1;
    }
    out
}

static CATALOG: [Slot; SLOT_COUNT as usize] = build_catalog();

/// The full slot catalog, ordered by index.
pub fn catalog() -> &'static [Slot; SLOT_COUNT as usize] {
    &CATALOG
}

/// Catalog entry for `index`.
pub fn slot(index: SlotIndex) -> &'static Slot {
    &CATALOG[index.position()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_is_ordered_gapless_and_covers_the_day() {
        let slots = catalog();
        assert_eq!(slots.len(), SLOT_COUNT as usize);
        for (i, s) in slots.iter().enumerate() {
            assert_eq!(s.index.position(), i);
            assert_eq!(s.end_offset - s.start_offset, SLOT_MINUTES);
        }
        for pair in slots.windows(2) {
            assert_eq!(pair[0].end_offset, pair[1].start_offset);
        }
        assert_eq!(slots[11].end_offset, slots[0].start_offset + DAY_MINUTES);
    }

    #[test]
    fn every_offset_of_the_day_has_exactly_one_slot() {
        for offset in 0..DAY_MINUTES {
            let hits = catalog().iter().filter(|s| s.contains_offset(offset)).count();
            assert_eq!(hits, 1, "offset {offset}");
        }
    }

    #[test]
    fn index_bounds_and_wraparound() {
        assert!(SlotIndex::new(0).is_err());
        assert!(SlotIndex::new(13).is_err());
        assert_eq!(SlotIndex::FIRST.prev(), SlotIndex::LAST);
        assert_eq!(SlotIndex::LAST.next(), SlotIndex::FIRST);
        assert_eq!(SlotIndex::all().count(), 12);
    }

    #[test]
    fn parse_and_serde_as_plain_integer() {
        assert_eq!("7".parse::<SlotIndex>().unwrap().get(), 7);
        assert_eq!(
            "-1".parse::<SlotIndex>().unwrap_err(),
            SlotIndexError::OutOfRange(-1)
        );
        assert!(matches!(
            "x".parse::<SlotIndex>(),
            Err(SlotIndexError::Unparsable(_))
        ));

        let json = serde_json::to_string(&SlotIndex::new(3).unwrap()).unwrap();
        assert_eq!(json, "3");
        assert!(serde_json::from_str::<SlotIndex>("0").is_err());
    }

    #[test]
    fn labels_follow_the_day_start() {
        let eight = DayStart::from_hm(8, 0).unwrap();
        assert_eq!(slot(SlotIndex::FIRST).label(eight), "08:00-10:00");
        assert_eq!(slot(SlotIndex::LAST).label(eight), "06:00-08:00");
        assert_eq!(slot(SlotIndex::new(8).unwrap()).label(eight), "22:00-00:00");
        assert_eq!(slot(SlotIndex::FIRST).label(DayStart::MIDNIGHT), "00:00-02:00");
    }
}
