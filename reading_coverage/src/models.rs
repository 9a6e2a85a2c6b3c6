//! Data model shared with the system of record.
//!
//! These types mirror the JSON the system of record exchanges (camelCase keys,
//! ISO-8601 dates, RFC-3339 timestamps). The core never persists them; a
//! [`Reading`] is owned by the system of record and only observed here.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
    coverage::CoverageSummary,
    lifecycle::ReadingStatus,
    measurement::Measurements,
    permissions::Permissions,
    slot::SlotIndex,
};

macro_rules! id_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }
    };
}

id_type!(
    /// Identity of a pipeline.
    PipelineId
);
id_type!(
    /// Identity of a reading record in the system of record.
    ReadingId
);
id_type!(
    /// Identity of an organizational unit owning pipelines.
    OrgUnitId
);
id_type!(
    /// Identity of an authenticated actor.
    ActorId
);

/// A pipeline on the unit's roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pipeline {
    pub id: PipelineId,
    /// Short operational code, e.g. "GZ1-OR".
    pub code: String,
    pub name: String,
}

/// One measurement record for one (pipeline, operational date, slot).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reading {
    pub id: ReadingId,
    pub pipeline_id: PipelineId,
    pub operational_date: NaiveDate,
    pub slot_index: SlotIndex,
    pub status: ReadingStatus,
    #[serde(flatten)]
    pub measurements: Measurements,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub recorded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub recorded_by: Option<ActorId>,
    #[serde(default)]
    pub validated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub validated_by: Option<ActorId>,
    /// Set by the system of record when a validator rejects the reading.
    #[serde(default)]
    pub rejection_reason: Option<String>,
}

/// Operator input for creating or updating a reading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDraft {
    pub pipeline_id: PipelineId,
    pub operational_date: NaiveDate,
    pub slot_index: SlotIndex,
    #[serde(flatten)]
    pub measurements: Measurements,
    #[serde(default)]
    pub notes: Option<String>,
    /// Submit immediately instead of saving as DRAFT.
    #[serde(default)]
    pub submit: bool,
}

/// One pipeline's row in a slot's coverage.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineCoverageItem {
    pub pipeline: Pipeline,
    pub reading: Option<Reading>,
    /// Derived: the reading's status, or NOT_RECORDED when there is none.
    pub status: ReadingStatus,
    /// Flags for the actor the coverage was computed for.
    pub permissions: Permissions,
}

impl PipelineCoverageItem {
    /// Status of an optional reading.
    pub fn derive_status(reading: Option<&Reading>) -> ReadingStatus {
        reading.map_or(ReadingStatus::NotRecorded, |r| r.status)
    }
}

/// Coverage of all of a unit's pipelines for one (date, slot).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotCoverage {
    pub operational_date: NaiveDate,
    pub slot_index: SlotIndex,
    pub org_unit_id: OrgUnitId,
    pub items: Vec<PipelineCoverageItem>,
    pub summary: CoverageSummary,
}
