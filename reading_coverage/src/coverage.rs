//! Coverage aggregation: per-slot summaries and the day-level rollup.
//!
//! Two percentages exist and are never conflated:
//! - **completion** = approved / total, "fully validated coverage"
//! - **recorded** = (approved + submitted) / total, "operationally captured"
//!
//! Both are derived on demand from the counts and rounded half-up to whole
//! percents; an empty roster yields 0 for both.

use std::{
    collections::BTreeMap,
    iter::Sum,
    ops::{Add, AddAssign},
};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer, ser::SerializeStruct};
use tracing::debug;

use crate::{
    error::{CoverageError, Subject},
    lifecycle::ReadingStatus,
    models::PipelineCoverageItem,
    slot::{SLOT_COUNT, SlotIndex},
};

/// Number of items per lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageCounts {
    pub not_recorded: u32,
    pub draft: u32,
    pub submitted: u32,
    pub approved: u32,
    pub rejected: u32,
}

impl CoverageCounts {
    pub fn record(&mut self, status: ReadingStatus) {
        match status {
            ReadingStatus::NotRecorded => self.not_recorded += 1,
            ReadingStatus::Draft => self.draft += 1,
            ReadingStatus::Submitted => self.submitted += 1,
            ReadingStatus::Approved => self.approved += 1,
            ReadingStatus::Rejected => self.rejected += 1,
        }
    }

    pub fn get(&self, status: ReadingStatus) -> u32 {
        match status {
            ReadingStatus::NotRecorded => self.not_recorded,
            ReadingStatus::Draft => self.draft,
            ReadingStatus::Submitted => self.submitted,
            ReadingStatus::Approved => self.approved,
            ReadingStatus::Rejected => self.rejected,
        }
    }

    pub fn total(&self) -> u32 {
        self.not_recorded + self.draft + self.submitted + self.approved + self.rejected
    }
}

impl Add for CoverageCounts {
    type Output = CoverageCounts;
    fn add(mut self, rhs: Self) -> Self::Output {
        self += rhs;
        self
    }
}

impl AddAssign for CoverageCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.not_recorded += rhs.not_recorded;
        self.draft += rhs.draft;
        self.submitted += rhs.submitted;
        self.approved += rhs.approved;
        self.rejected += rhs.rejected;
    }
}

impl Sum for CoverageCounts {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

/// `round(100 * part / total)`, half-up, 0 for an empty total.
pub fn percent(part: u32, total: u32) -> u32 {
    if total == 0 {
        return 0;
    }
    let (part, total) = (part as u64, total as u64);
    ((200 * part + total) / (2 * total)) as u32
}

/// Counts for one (date, slot, unit). Percentages are derived, not stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct CoverageSummary {
    pub counts: CoverageCounts,
    pub total_pipelines: u32,
}

impl CoverageSummary {
    /// Summary of a status stream; `total_pipelines` is the stream length.
    pub fn from_statuses<I: IntoIterator<Item = ReadingStatus>>(statuses: I) -> Self {
        let mut counts = CoverageCounts::default();
        for s in statuses {
            counts.record(s);
        }
        Self {
            counts,
            total_pipelines: counts.total(),
        }
    }

    /// Fully validated share of the roster.
    pub fn completion_percent(&self) -> u32 {
        percent(self.counts.approved, self.total_pipelines)
    }

    /// Captured share of the roster, pending validation or not.
    pub fn recorded_percent(&self) -> u32 {
        percent(
            self.counts.approved + self.counts.submitted,
            self.total_pipelines,
        )
    }

    pub fn state(&self) -> SlotState {
        SlotState::classify(self)
    }
}

impl Serialize for CoverageSummary {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("CoverageSummary", 9)?;
        s.serialize_field("notRecorded", &self.counts.not_recorded)?;
        s.serialize_field("draft", &self.counts.draft)?;
        s.serialize_field("submitted", &self.counts.submitted)?;
        s.serialize_field("approved", &self.counts.approved)?;
        s.serialize_field("rejected", &self.counts.rejected)?;
        s.serialize_field("totalPipelines", &self.total_pipelines)?;
        s.serialize_field("completionPercent", &self.completion_percent())?;
        s.serialize_field("recordedPercent", &self.recorded_percent())?;
        s.serialize_field("state", &self.state())?;
        s.end()
    }
}

/// Single linear pass over a consistent snapshot of items.
pub fn aggregate(items: &[PipelineCoverageItem]) -> CoverageSummary {
    CoverageSummary::from_statuses(items.iter().map(|i| i.status))
}

/// Classification of one slot's summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    /// Every pipeline approved (and there is at least one).
    Complete,
    /// Nothing recorded.
    Empty,
    /// Something waits for a validator.
    PendingValidation,
    /// Anything else.
    Partial,
}

impl SlotState {
    pub fn classify(summary: &CoverageSummary) -> Self {
        let c = &summary.counts;
        let total = summary.total_pipelines;
        if total > 0 && c.approved == total {
            SlotState::Complete
        } else if c.not_recorded == total {
            SlotState::Empty
        } else if c.submitted > 0 {
            SlotState::PendingValidation
        } else {
            SlotState::Partial
        }
    }
}

/// One slot's line in the day rollup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCoverageSummary {
    pub slot_index: SlotIndex,
    pub summary: CoverageSummary,
    pub state: SlotState,
}

/// Day-level totals.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyTotals {
    pub complete_slots: u32,
    pub partial_slots: u32,
    pub pending_validation_slots: u32,
    pub empty_slots: u32,
    /// Per-state counts summed across all slots.
    pub counts: CoverageCounts,
    /// Pipeline-slot cells across the day.
    pub total_cells: u32,
}

/// Rollup of the twelve slot summaries of one operational date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DailyCoverage {
    pub operational_date: NaiveDate,
    /// Ordered by slot index.
    pub slots: Vec<SlotCoverageSummary>,
    pub totals: DailyTotals,
}

impl DailyCoverage {
    /// Build from exactly one summary per catalog slot, in any order.
    pub fn from_slots<I>(operational_date: NaiveDate, summaries: I) -> Result<Self, CoverageError>
    where
        I: IntoIterator<Item = (SlotIndex, CoverageSummary)>,
    {
        let mut by_slot = BTreeMap::new();
        for (slot_index, summary) in summaries {
            if by_slot.insert(slot_index, summary).is_some() {
                return Err(CoverageError::Validation {
                    subject: Subject::slot(operational_date, slot_index),
                    message: "duplicate slot summary in daily rollup".into(),
                });
            }
        }
        if by_slot.len() != SLOT_COUNT as usize {
            let missing = SlotIndex::all()
                .filter(|s| !by_slot.contains_key(s))
                .map(|s| s.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            return Err(CoverageError::Validation {
                subject: Subject::date(operational_date),
                message: format!("daily rollup is missing slots: {missing}"),
            });
        }

        let mut totals = DailyTotals::default();
        let slots = by_slot
            .into_iter()
            .map(|(slot_index, summary)| {
                let state = summary.state();
                match state {
                    SlotState::Complete => totals.complete_slots += 1,
                    SlotState::Partial => totals.partial_slots += 1,
                    SlotState::PendingValidation => totals.pending_validation_slots += 1,
                    SlotState::Empty => totals.empty_slots += 1,
                }
                totals.counts += summary.counts;
                totals.total_cells += summary.total_pipelines;
                SlotCoverageSummary {
                    slot_index,
                    summary,
                    state,
                }
            })
            .collect();

        debug!(
            date = %operational_date,
            complete = totals.complete_slots,
            empty = totals.empty_slots,
            "daily coverage rolled up"
        );

        Ok(Self {
            operational_date,
            slots,
            totals,
        })
    }

    /// Approved cells over all cells of the day.
    pub fn completion_percent(&self) -> u32 {
        percent(self.totals.counts.approved, self.totals.total_cells)
    }

    /// Approved + submitted cells over all cells of the day.
    pub fn recorded_percent(&self) -> u32 {
        percent(
            self.totals.counts.approved + self.totals.counts.submitted,
            self.totals.total_cells,
        )
    }

    pub fn slot(&self, index: SlotIndex) -> Option<&SlotCoverageSummary> {
        self.slots.iter().find(|s| s.slot_index == index)
    }
}

impl Serialize for DailyCoverage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("DailyCoverage", 5)?;
        s.serialize_field("operationalDate", &self.operational_date)?;
        s.serialize_field("slots", &self.slots)?;
        s.serialize_field("totals", &self.totals)?;
        s.serialize_field("completionPercent", &self.completion_percent())?;
        s.serialize_field("recordedPercent", &self.recorded_percent())?;
        s.end()
    }
}
