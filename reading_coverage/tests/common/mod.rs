#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use async_trait::async_trait;
use chrono::{NaiveDate, TimeZone, Utc};
use reading_coverage::{
    lifecycle::{Action, ReadingStatus, RejectionReason, transition},
    measurement::Measurements,
    models::{ActorId, Pipeline, PipelineId, Reading, ReadingId},
    permissions::{Actor, Capabilities, Role},
    record::{RecordError, RecordSystem, RosterEntry, SaveReadingCommand, SlotQuery, SlotRoster},
    slot::SlotIndex,
};

/// In-memory system of record. Applies the lifecycle table and counts calls.
pub struct InMemoryRecords {
    pipelines: Vec<Pipeline>,
    readings: Mutex<BTreeMap<ReadingId, Reading>>,
    next_id: AtomicUsize,
    fail_next: Mutex<Option<RecordError>>,
    /// Force the status of the next returned reading.
    override_status: Mutex<Option<ReadingStatus>>,
    pub roster_calls: AtomicUsize,
    pub command_calls: AtomicUsize,
}

impl InMemoryRecords {
    pub fn with_pipelines(n: i64) -> Self {
        let pipelines = (1..=n)
            .map(|i| Pipeline {
                id: PipelineId(i),
                code: format!("PL{i:02}"),
                name: format!("Pipeline {i}"),
            })
            .collect();
        Self {
            pipelines,
            readings: Mutex::new(BTreeMap::new()),
            next_id: AtomicUsize::new(100),
            fail_next: Mutex::new(None),
            override_status: Mutex::new(None),
            roster_calls: AtomicUsize::new(0),
            command_calls: AtomicUsize::new(0),
        }
    }

    /// Insert a reading directly, bypassing the lifecycle.
    pub fn seed(
        &self,
        pipeline: i64,
        date: NaiveDate,
        slot: u8,
        status: ReadingStatus,
        recorded_by: Option<ActorId>,
    ) -> Reading {
        let reading = Reading {
            id: self.fresh_id(),
            pipeline_id: PipelineId(pipeline),
            operational_date: date,
            slot_index: SlotIndex::new(slot).unwrap(),
            status,
            measurements: full_measurements(),
            notes: None,
            recorded_at: Some(Utc.with_ymd_and_hms(2025, 3, 14, 10, 5, 0).unwrap()),
            recorded_by,
            validated_at: None,
            validated_by: None,
            rejection_reason: None,
        };
        self.readings
            .lock()
            .unwrap()
            .insert(reading.id, reading.clone());
        reading
    }

    pub fn fail_next(&self, err: RecordError) {
        *self.fail_next.lock().unwrap() = Some(err);
    }

    pub fn override_next_status(&self, status: ReadingStatus) {
        *self.override_status.lock().unwrap() = Some(status);
    }

    pub fn get(&self, id: ReadingId) -> Option<Reading> {
        self.readings.lock().unwrap().get(&id).cloned()
    }

    pub fn commands(&self) -> usize {
        self.command_calls.load(Ordering::SeqCst)
    }

    pub fn rosters(&self) -> usize {
        self.roster_calls.load(Ordering::SeqCst)
    }

    fn fresh_id(&self) -> ReadingId {
        ReadingId(self.next_id.fetch_add(1, Ordering::SeqCst) as i64)
    }

    fn take_failure(&self) -> Result<(), RecordError> {
        match self.fail_next.lock().unwrap().take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn finish(&self, mut reading: Reading) -> Reading {
        if let Some(status) = self.override_status.lock().unwrap().take() {
            reading.status = status;
        }
        reading
    }

    fn apply(
        &self,
        id: ReadingId,
        action: Action,
        mutate: impl FnOnce(&mut Reading),
    ) -> Result<Reading, RecordError> {
        self.command_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let mut readings = self.readings.lock().unwrap();
        let reading = readings
            .get_mut(&id)
            .ok_or_else(|| RecordError::NotFound(format!("Reading {id} not found")))?;
        reading.status = transition(reading.status, action)
            .map_err(|_| RecordError::Conflict("Reading already validated".into()))?;
        mutate(reading);
        Ok(self.finish(reading.clone()))
    }
}

#[async_trait]
impl RecordSystem for InMemoryRecords {
    async fn fetch_slot_roster(&self, query: &SlotQuery) -> Result<SlotRoster, RecordError> {
        self.roster_calls.fetch_add(1, Ordering::SeqCst);
        self.take_failure()?;
        let readings = self.readings.lock().unwrap();
        let pipelines = self
            .pipelines
            .iter()
            .map(|p| RosterEntry {
                pipeline: p.clone(),
                reading: readings
                    .values()
                    .find(|r| {
                        r.pipeline_id == p.id
                            && r.operational_date == query.date
                            && r.slot_index == query.slot_index
                    })
                    .cloned(),
            })
            .collect();
        Ok(SlotRoster { pipelines })
    }

    async fn save_reading(&self, command: &SaveReadingCommand) -> Result<Reading, RecordError> {
        let fill = |r: &mut Reading| {
            r.measurements = command.measurements;
            r.notes = command.notes.clone();
            r.recorded_by = Some(command.actor_id);
            r.rejection_reason = None;
        };
        let reading = match command.reading_id {
            Some(id) => self.apply(id, Action::Edit, fill)?,
            None => {
                self.command_calls.fetch_add(1, Ordering::SeqCst);
                self.take_failure()?;
                let mut reading = Reading {
                    id: self.fresh_id(),
                    pipeline_id: command.pipeline_id,
                    operational_date: command.operational_date,
                    slot_index: command.slot_index,
                    status: ReadingStatus::Draft,
                    measurements: Measurements::default(),
                    notes: None,
                    recorded_at: Some(Utc.with_ymd_and_hms(2025, 3, 14, 10, 5, 0).unwrap()),
                    recorded_by: None,
                    validated_at: None,
                    validated_by: None,
                    rejection_reason: None,
                };
                fill(&mut reading);
                self.readings
                    .lock()
                    .unwrap()
                    .insert(reading.id, reading.clone());
                self.finish(reading)
            }
        };
        if command.status == ReadingStatus::Submitted {
            let mut readings = self.readings.lock().unwrap();
            let stored = readings.get_mut(&reading.id).unwrap();
            stored.status = ReadingStatus::Submitted;
            return Ok(stored.clone());
        }
        Ok(reading)
    }

    async fn submit_reading(
        &self,
        reading_id: ReadingId,
        _actor_id: ActorId,
    ) -> Result<Reading, RecordError> {
        self.apply(reading_id, Action::Submit, |_| {})
    }

    async fn approve_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        notes: Option<&str>,
    ) -> Result<Reading, RecordError> {
        self.apply(reading_id, Action::Approve, |r| {
            r.validated_by = Some(actor_id);
            if let Some(n) = notes {
                r.notes = Some(n.to_string());
            }
        })
    }

    async fn reject_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        reason: &RejectionReason,
    ) -> Result<Reading, RecordError> {
        self.apply(reading_id, Action::Reject, |r| {
            r.validated_by = Some(actor_id);
            r.rejection_reason = Some(reason.to_string());
        })
    }
}

pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 14).unwrap()
}

pub fn slot(n: u8) -> SlotIndex {
    SlotIndex::new(n).unwrap()
}

pub fn actor(id: i64, roles: &[Role]) -> Actor {
    Actor::new(ActorId(id), Capabilities::from_roles(roles.iter().copied()))
}

pub fn full_measurements() -> Measurements {
    Measurements {
        pressure: Some(62.5),
        temperature: Some(18.0),
        flow_rate: Some(850.0),
        contained_volume: Some(12_000.0),
    }
}
