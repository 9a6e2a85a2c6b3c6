//! Coverage query facade and lifecycle commands.
//!
//! [`CoverageService`] is the single composition point: it fetches rosters from
//! the [`RecordSystem`], derives each pipeline's state and permission flags, and
//! aggregates. Commands run their local checks in a fixed order (input
//! validation, lifecycle, capability) and then make exactly one external call.
//! Input is judged before state: out-of-range measurements or a short
//! rejection reason fail with `Validation` even on a reading the lifecycle
//! would refuse with `Conflict`.
//! Nothing is cached between calls and nothing is retried.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use chrono_tz::Tz;
use tracing::{debug, info, instrument, warn};

use crate::{
    clock::{CurrentSlot, DayStart, SlotSelection, resolve_slot_with},
    coverage::{DailyCoverage, aggregate},
    error::{CoverageError, Subject},
    lifecycle::{Action, ReadingStatus, RejectionReason, transition},
    measurement::MeasurementLimits,
    models::{OrgUnitId, PipelineCoverageItem, Reading, ReadingDraft, SlotCoverage},
    permissions::{Actor, authorize, permissions_for},
    record::{RecordError, RecordSystem, SaveReadingCommand, SlotQuery},
    slot::SlotIndex,
    tz::{DstPolicy, UtcWindow, slot_window_utc, to_operating_wall_clock},
};

/// Runtime settings of the facade.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageSettings {
    pub day_start: DayStart,
    pub selection: SlotSelection,
    pub limits: MeasurementLimits,
    /// Zone the operating site's wall clock runs in.
    pub timezone: Tz,
    pub dst_policy: DstPolicy,
}

impl Default for CoverageSettings {
    fn default() -> Self {
        Self {
            day_start: DayStart::default(),
            selection: SlotSelection::default(),
            limits: MeasurementLimits::default(),
            timezone: Tz::UTC,
            dst_policy: DstPolicy::default(),
        }
    }
}

/// Facade over a [`RecordSystem`].
#[derive(Debug)]
pub struct CoverageService<R> {
    records: R,
    settings: CoverageSettings,
}

impl<R: RecordSystem> CoverageService<R> {
    pub fn new(records: R, settings: CoverageSettings) -> Self {
        Self { records, settings }
    }

    pub fn settings(&self) -> &CoverageSettings {
        &self.settings
    }

    pub fn records(&self) -> &R {
        &self.records
    }

    /// Slot selected at local wall-clock time `now`.
    pub fn current_slot(&self, now: NaiveDateTime) -> CurrentSlot {
        resolve_slot_with(now, self.settings.day_start, self.settings.selection)
    }

    /// Slot selected at `instant`, read on the operating site's wall clock.
    pub fn current_slot_at(&self, instant: DateTime<Utc>) -> CurrentSlot {
        self.current_slot(to_operating_wall_clock(instant, self.settings.timezone))
    }

    /// Window of a slot in the operating zone, as instants.
    pub fn slot_window_at(
        &self,
        date: NaiveDate,
        slot_index: SlotIndex,
    ) -> Result<UtcWindow, CoverageError> {
        let s = &self.settings;
        slot_window_utc(date, slot_index, s.day_start, s.timezone, s.dst_policy).map_err(|e| {
            CoverageError::Validation {
                subject: Subject::slot(date, slot_index),
                message: format!("{e:#}"),
            }
        })
    }

    /// Coverage of every pipeline of `org_unit_id` for one slot, with flags for `actor`.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn get_slot_coverage(
        &self,
        date: NaiveDate,
        slot_index: SlotIndex,
        org_unit_id: OrgUnitId,
        actor: &Actor,
    ) -> Result<SlotCoverage, CoverageError> {
        let query = SlotQuery {
            date,
            slot_index,
            org_unit_id,
        };
        let roster = self
            .records
            .fetch_slot_roster(&query)
            .await
            .map_err(|e| CoverageError::from_record(Subject::slot(date, slot_index), e))?;

        let items: Vec<PipelineCoverageItem> = roster
            .pipelines
            .into_iter()
            .map(|entry| {
                if let Some(r) = &entry.reading {
                    if r.operational_date != date || r.slot_index != slot_index {
                        warn!(
                            reading = %r.id,
                            pipeline = %entry.pipeline.id,
                            got_date = %r.operational_date,
                            got_slot = %r.slot_index,
                            "roster returned a reading for another slot"
                        );
                    }
                }
                let status = PipelineCoverageItem::derive_status(entry.reading.as_ref());
                PipelineCoverageItem {
                    permissions: permissions_for(&actor.capabilities, status),
                    pipeline: entry.pipeline,
                    reading: entry.reading,
                    status,
                }
            })
            .collect();

        let summary = aggregate(&items);
        debug!(
            pipelines = summary.total_pipelines,
            approved = summary.counts.approved,
            state = ?summary.state(),
            "slot coverage aggregated"
        );

        Ok(SlotCoverage {
            operational_date: date,
            slot_index,
            org_unit_id,
            items,
            summary,
        })
    }

    /// Day rollup: the twelve slots fetched one after another.
    #[instrument(skip(self, actor), fields(actor = %actor.id))]
    pub async fn get_daily_coverage(
        &self,
        date: NaiveDate,
        org_unit_id: OrgUnitId,
        actor: &Actor,
    ) -> Result<DailyCoverage, CoverageError> {
        let mut summaries = Vec::with_capacity(SlotIndex::all().count());
        for slot_index in SlotIndex::all() {
            let coverage = self
                .get_slot_coverage(date, slot_index, org_unit_id, actor)
                .await?;
            summaries.push((slot_index, coverage.summary));
        }
        DailyCoverage::from_slots(date, summaries)
    }

    /// Coverage of the slot selected at `now`.
    pub async fn get_current_slot_coverage(
        &self,
        now: DateTime<Utc>,
        org_unit_id: OrgUnitId,
        actor: &Actor,
    ) -> Result<SlotCoverage, CoverageError> {
        let current = self.current_slot_at(now);
        self.get_slot_coverage(
            current.operational_date,
            current.slot_index,
            org_unit_id,
            actor,
        )
        .await
    }

    /// Create a reading (no `existing`) or edit a DRAFT or REJECTED one.
    ///
    /// With `draft.submit` set the reading goes straight to SUBMITTED, which
    /// requires every measurement.
    #[instrument(skip_all, fields(actor = %actor.id, pipeline = %draft.pipeline_id, slot = %draft.slot_index))]
    pub async fn save_reading(
        &self,
        actor: &Actor,
        existing: Option<&Reading>,
        draft: ReadingDraft,
    ) -> Result<Reading, CoverageError> {
        let subject = Subject::draft(&draft, existing.map(|r| r.id));

        if let Some(r) = existing {
            if r.pipeline_id != draft.pipeline_id
                || r.operational_date != draft.operational_date
                || r.slot_index != draft.slot_index
            {
                return Err(CoverageError::Validation {
                    subject,
                    message: format!(
                        "draft targets a different pipeline or slot than reading {}",
                        r.id
                    ),
                });
            }
        }
        let checked = if draft.submit {
            self.settings.limits.check_complete(&draft.measurements)
        } else {
            self.settings.limits.check_bounds(&draft.measurements)
        };
        checked.map_err(|e| CoverageError::Validation {
            subject,
            message: e.to_string(),
        })?;

        let from = PipelineCoverageItem::derive_status(existing);
        let action = if from == ReadingStatus::NotRecorded {
            Action::Create
        } else {
            Action::Edit
        };
        let mut expected = guard(actor, from, action, subject)?;
        if draft.submit {
            expected = guard(actor, expected, Action::Submit, subject)?;
        }
        let owner = existing
            .filter(|r| r.status == ReadingStatus::Draft)
            .and_then(|r| r.recorded_by);
        if let Some(owner) = owner {
            if owner != actor.id && !actor.capabilities.is_admin() {
                return Err(CoverageError::Forbidden {
                    subject,
                    message: format!("draft belongs to actor {owner}"),
                });
            }
        }

        let command = SaveReadingCommand {
            reading_id: existing.map(|r| r.id),
            pipeline_id: draft.pipeline_id,
            operational_date: draft.operational_date,
            slot_index: draft.slot_index,
            actor_id: actor.id,
            measurements: draft.measurements,
            notes: draft.notes,
            status: expected,
        };
        let result = self.records.save_reading(&command).await;
        settle(subject, expected, result)
    }

    /// DRAFT → SUBMITTED. Every measurement must be present and in range.
    #[instrument(skip_all, fields(actor = %actor.id, reading = %reading.id))]
    pub async fn submit_reading(
        &self,
        actor: &Actor,
        reading: &Reading,
    ) -> Result<Reading, CoverageError> {
        let subject = Subject::reading(reading);
        self.settings
            .limits
            .check_complete(&reading.measurements)
            .map_err(|e| CoverageError::Validation {
                subject,
                message: e.to_string(),
            })?;
        let expected = guard(actor, reading.status, Action::Submit, subject)?;

        let result = self.records.submit_reading(reading.id, actor.id).await;
        settle(subject, expected, result)
    }

    /// SUBMITTED → APPROVED. Blank notes are dropped.
    #[instrument(skip_all, fields(actor = %actor.id, reading = %reading.id))]
    pub async fn approve_reading(
        &self,
        actor: &Actor,
        reading: &Reading,
        notes: Option<String>,
    ) -> Result<Reading, CoverageError> {
        let subject = Subject::reading(reading);
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let expected = guard(actor, reading.status, Action::Approve, subject)?;

        let result = self
            .records
            .approve_reading(reading.id, actor.id, notes.as_deref())
            .await;
        settle(subject, expected, result)
    }

    /// SUBMITTED → REJECTED. The reason must have at least five characters.
    #[instrument(skip_all, fields(actor = %actor.id, reading = %reading.id))]
    pub async fn reject_reading(
        &self,
        actor: &Actor,
        reading: &Reading,
        reason: &str,
    ) -> Result<Reading, CoverageError> {
        let subject = Subject::reading(reading);
        let reason = RejectionReason::parse(reason).map_err(|e| CoverageError::Validation {
            subject,
            message: e.to_string(),
        })?;
        let expected = guard(actor, reading.status, Action::Reject, subject)?;

        let result = self
            .records
            .reject_reading(reading.id, actor.id, &reason)
            .await;
        settle(subject, expected, result)
    }
}

/// Lifecycle then capability. Returns the target state.
fn guard(
    actor: &Actor,
    from: ReadingStatus,
    action: Action,
    subject: Subject,
) -> Result<ReadingStatus, CoverageError> {
    let to = transition(from, action).map_err(|e| CoverageError::Conflict {
        subject,
        message: e.to_string(),
    })?;
    if !authorize(&actor.capabilities, action) {
        return Err(CoverageError::Forbidden {
            subject,
            message: format!("actor {} is not allowed to {action}", actor.id),
        });
    }
    Ok(to)
}

/// Map the backend result. Its reading wins even when the state is unexpected.
fn settle(
    subject: Subject,
    expected: ReadingStatus,
    result: Result<Reading, RecordError>,
) -> Result<Reading, CoverageError> {
    let reading = result.map_err(|e| {
        warn!(%subject, error = %e, "system of record refused the command");
        CoverageError::from_record(subject, e)
    })?;
    if reading.status != expected {
        warn!(
            reading = %reading.id,
            %expected,
            actual = %reading.status,
            "system of record reported an unexpected state"
        );
    } else {
        info!(reading = %reading.id, status = %reading.status, "reading updated");
    }
    Ok(reading)
}
