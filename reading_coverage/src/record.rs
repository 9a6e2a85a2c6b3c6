//! System-of-record abstraction.
//!
//! The system of record owns every [`Reading`] and enforces authorization; this
//! crate only reads rosters from it and sends single lifecycle commands to it.
//! [`RecordSystem`] is that contract. The HTTP implementation lives in the
//! `record_gateway` crate; tests use in-memory implementations.
//!
//! Implementations perform no retries and keep no cache: each call is exactly
//! one request, and the returned [`Reading`] is authoritative.
//!
//! # Example
//!
//! ```rust
//! use async_trait::async_trait;
//! use reading_coverage::models::{ActorId, Reading, ReadingId};
//! use reading_coverage::lifecycle::RejectionReason;
//! use reading_coverage::record::{
//!     RecordError, RecordSystem, SaveReadingCommand, SlotQuery, SlotRoster,
//! };
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl RecordSystem for Offline {
//!     async fn fetch_slot_roster(&self, _q: &SlotQuery) -> Result<SlotRoster, RecordError> {
//!         Ok(SlotRoster::default())
//!     }
//!     async fn save_reading(&self, _c: &SaveReadingCommand) -> Result<Reading, RecordError> {
//!         Err(RecordError::Transport("offline".into()))
//!     }
//!     async fn submit_reading(&self, _r: ReadingId, _a: ActorId) -> Result<Reading, RecordError> {
//!         Err(RecordError::Transport("offline".into()))
//!     }
//!     async fn approve_reading(
//!         &self, _r: ReadingId, _a: ActorId, _n: Option<&str>,
//!     ) -> Result<Reading, RecordError> {
//!         Err(RecordError::Transport("offline".into()))
//!     }
//!     async fn reject_reading(
//!         &self, _r: ReadingId, _a: ActorId, _why: &RejectionReason,
//!     ) -> Result<Reading, RecordError> {
//!         Err(RecordError::Transport("offline".into()))
//!     }
//! }
//! ```

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    lifecycle::{ReadingStatus, RejectionReason},
    measurement::Measurements,
    models::{ActorId, OrgUnitId, Pipeline, PipelineId, Reading, ReadingId},
    slot::SlotIndex,
};

/// Coverage query: one unit, one date, one slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotQuery {
    /// ISO-8601 calendar date.
    pub date: NaiveDate,
    pub slot_index: SlotIndex,
    pub org_unit_id: OrgUnitId,
}

/// A roster line: a pipeline and its reading for the queried slot, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RosterEntry {
    pub pipeline: Pipeline,
    #[serde(default)]
    pub reading: Option<Reading>,
}

/// The unit's roster for one slot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotRoster {
    pub pipelines: Vec<RosterEntry>,
}

/// Create or update a reading.
///
/// `reading_id` is `None` for a creation. `status` is either
/// [`ReadingStatus::Draft`] or [`ReadingStatus::Submitted`] (immediate submission).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveReadingCommand {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reading_id: Option<ReadingId>,
    pub pipeline_id: PipelineId,
    pub operational_date: NaiveDate,
    pub slot_index: SlotIndex,
    pub actor_id: ActorId,
    #[serde(flatten)]
    pub measurements: Measurements,
    pub notes: Option<String>,
    pub status: ReadingStatus,
}

impl SaveReadingCommand {
    pub fn submits(&self) -> bool {
        self.status == ReadingStatus::Submitted
    }
}

/// Failure reported by a [`RecordSystem`].
///
/// Messages carry the backend's text unchanged.
#[derive(Debug, Error)]
pub enum RecordError {
    /// The backend refused a state transition.
    #[error("{0}")]
    Conflict(String),
    /// Pipeline, reading or actor unknown to the backend.
    #[error("{0}")]
    NotFound(String),
    /// The backend refused the actor.
    #[error("{0}")]
    Forbidden(String),
    /// The backend refused the payload as malformed.
    #[error("{0}")]
    Rejected(String),
    /// Network or infrastructure failure.
    #[error("{0}")]
    Transport(Box<dyn std::error::Error + Send + Sync>),
}

/// Contract with the system of record.
#[async_trait]
pub trait RecordSystem: Send + Sync {
    /// Roster of the unit with each pipeline's reading for the date and slot.
    async fn fetch_slot_roster(&self, query: &SlotQuery) -> Result<SlotRoster, RecordError>;

    /// Create or update a reading, as DRAFT or directly SUBMITTED.
    async fn save_reading(&self, command: &SaveReadingCommand) -> Result<Reading, RecordError>;

    /// DRAFT → SUBMITTED.
    async fn submit_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
    ) -> Result<Reading, RecordError>;

    /// SUBMITTED → APPROVED.
    async fn approve_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        notes: Option<&str>,
    ) -> Result<Reading, RecordError>;

    /// SUBMITTED → REJECTED.
    async fn reject_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        reason: &RejectionReason,
    ) -> Result<Reading, RecordError>;
}

#[async_trait]
impl<T: RecordSystem + ?Sized> RecordSystem for Box<T> {
    async fn fetch_slot_roster(&self, query: &SlotQuery) -> Result<SlotRoster, RecordError> {
        (**self).fetch_slot_roster(query).await
    }

    async fn save_reading(&self, command: &SaveReadingCommand) -> Result<Reading, RecordError> {
        (**self).save_reading(command).await
    }

    async fn submit_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
    ) -> Result<Reading, RecordError> {
        (**self).submit_reading(reading_id, actor_id).await
    }

    async fn approve_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        notes: Option<&str>,
    ) -> Result<Reading, RecordError> {
        (**self).approve_reading(reading_id, actor_id, notes).await
    }

    async fn reject_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        reason: &RejectionReason,
    ) -> Result<Reading, RecordError> {
        (**self).reject_reading(reading_id, actor_id, reason).await
    }
}
