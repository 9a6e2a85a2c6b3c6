//! Operating timezone boundary.
//!
//! [`crate::clock`] only sees local wall-clock time. Instants cross into it
//! through [`to_operating_wall_clock`], and slot windows cross back out as
//! instants through [`slot_window_utc`], which is what a dashboard shows next
//! to the current slot.
//!
//! Local times that fall into a DST gap or occur twice are settled by a
//! [`DstPolicy`]. Zones without DST (e.g. "Africa/Algiers") never hit either case.

use anyhow::{Context, bail};
use chrono::{DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::{
    clock::{DayStart, slot_window},
    slot::SlotIndex,
};

/// Longest spring-forward gap stepped over.
const MAX_GAP_MINUTES: i64 = 120;

/// Wall-clock time in `tz` at `instant`.
pub fn to_operating_wall_clock(instant: DateTime<Utc>, tz: Tz) -> NaiveDateTime {
    instant.with_timezone(&tz).naive_local()
}

/// Parse an IANA zone name such as "Africa/Algiers".
pub fn parse_tz(name: &str) -> anyhow::Result<Tz> {
    name.trim()
        .parse::<Tz>()
        .with_context(|| format!("bad tz: {name}"))
}

/// How a local wall-clock time that is skipped or repeated by DST maps to an instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DstPolicy {
    /// Skipped and repeated times are errors.
    Strict,
    /// Repeated times take the first occurrence.
    PreferEarliest,
    /// Repeated times take the second occurrence.
    PreferLatest,
    /// Skipped times move to the first minute after the gap; repeated times
    /// take the first occurrence.
    #[default]
    ShiftForward,
}

/// The instant the local time `naive` in `tz` denotes under `policy`.
pub fn local_to_utc(
    naive: NaiveDateTime,
    tz: Tz,
    policy: DstPolicy,
) -> anyhow::Result<DateTime<Utc>> {
    let local = match tz.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, second) => match policy {
            DstPolicy::Strict => bail!("{naive} occurs twice in {tz}"),
            DstPolicy::PreferLatest => second,
            DstPolicy::PreferEarliest | DstPolicy::ShiftForward => first,
        },
        LocalResult::None if policy == DstPolicy::ShiftForward => {
            (1..=MAX_GAP_MINUTES)
                .find_map(|m| tz.from_local_datetime(&(naive + Duration::minutes(m))).earliest())
                .with_context(|| format!("{naive} does not exist in {tz}"))?
        }
        LocalResult::None => bail!("{naive} does not exist in {tz}"),
    };
    Ok(local.with_timezone(&Utc))
}

/// A slot window as instants, `[start, end)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UtcWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl UtcWindow {
    pub fn is_closed_at(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.end
    }
}

/// The window of `slot_index` on `date` in the operating zone, as instants.
pub fn slot_window_utc(
    date: NaiveDate,
    slot_index: SlotIndex,
    day_start: DayStart,
    tz: Tz,
    policy: DstPolicy,
) -> anyhow::Result<UtcWindow> {
    let w = slot_window(date, slot_index, day_start);
    let start = local_to_utc(w.start, tz, policy)
        .with_context(|| format!("start of slot {slot_index} on {date}"))?;
    let end = local_to_utc(w.end, tz, policy)
        .with_context(|| format!("end of slot {slot_index} on {date}"))?;
    Ok(UtcWindow { start, end })
}
