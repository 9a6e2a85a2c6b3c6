use std::fmt;

use chrono::NaiveDate;
use thiserror::Error;

use crate::{
    models::{PipelineId, Reading, ReadingDraft, ReadingId},
    record::RecordError,
    slot::SlotIndex,
};

/// What an error is about: enough to find the offending reading, pipeline or slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Subject {
    pub reading_id: Option<ReadingId>,
    pub pipeline_id: Option<PipelineId>,
    pub operational_date: Option<NaiveDate>,
    pub slot_index: Option<SlotIndex>,
}

impl Subject {
    pub fn date(operational_date: NaiveDate) -> Self {
        Self {
            operational_date: Some(operational_date),
            ..Self::default()
        }
    }

    pub fn slot(operational_date: NaiveDate, slot_index: SlotIndex) -> Self {
        Self {
            slot_index: Some(slot_index),
            ..Self::date(operational_date)
        }
    }

    pub fn reading(reading: &Reading) -> Self {
        Self {
            reading_id: Some(reading.id),
            pipeline_id: Some(reading.pipeline_id),
            operational_date: Some(reading.operational_date),
            slot_index: Some(reading.slot_index),
        }
    }

    pub fn draft(draft: &ReadingDraft, reading_id: Option<ReadingId>) -> Self {
        Self {
            reading_id,
            pipeline_id: Some(draft.pipeline_id),
            operational_date: Some(draft.operational_date),
            slot_index: Some(draft.slot_index),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::with_capacity(4);
        if let Some(id) = self.reading_id {
            parts.push(format!("reading {id}"));
        }
        if let Some(id) = self.pipeline_id {
            parts.push(format!("pipeline {id}"));
        }
        if let Some(d) = self.operational_date {
            parts.push(format!("date {d}"));
        }
        if let Some(s) = self.slot_index {
            parts.push(format!("slot {s}"));
        }
        if parts.is_empty() {
            f.write_str("unspecified subject")
        } else {
            f.write_str(&parts.join(", "))
        }
    }
}

/// The unified error type of the coverage core.
///
/// Besides the four kinds a command can fail with (validation, conflict, not
/// found, transport) there is [`CoverageError::Forbidden`], for a missing
/// capability or another actor's draft. It is checked locally like the
/// lifecycle and also covers a backend 401/403.
///
/// Backend-supplied messages are kept verbatim in `message`.
#[derive(Debug, Error)]
pub enum CoverageError {
    /// Malformed input caught before any call to the system of record,
    /// or refused by the system of record as malformed.
    #[error("validation failed for {subject}: {message}")]
    Validation { subject: Subject, message: String },

    /// A lifecycle transition that is not legal from the current state.
    #[error("conflict on {subject}: {message}")]
    Conflict { subject: Subject, message: String },

    /// Pipeline, reading or actor could not be resolved.
    #[error("not found: {subject}: {message}")]
    NotFound { subject: Subject, message: String },

    /// The actor lacks the capability (or ownership) the action needs.
    #[error("forbidden on {subject}: {message}")]
    Forbidden { subject: Subject, message: String },

    /// Network or infrastructure failure with no domain meaning.
    #[error("transport failure on {subject}")]
    Transport {
        subject: Subject,
        #[source]
        source: RecordError,
    },
}

impl CoverageError {
    pub fn subject(&self) -> &Subject {
        match self {
            CoverageError::Validation { subject, .. }
            | CoverageError::Conflict { subject, .. }
            | CoverageError::NotFound { subject, .. }
            | CoverageError::Forbidden { subject, .. }
            | CoverageError::Transport { subject, .. } => subject,
        }
    }

    /// Attach `subject` to an error returned by the system of record.
    pub fn from_record(subject: Subject, err: RecordError) -> Self {
        match err {
            RecordError::Conflict(message) => CoverageError::Conflict { subject, message },
            RecordError::NotFound(message) => CoverageError::NotFound { subject, message },
            RecordError::Forbidden(message) => CoverageError::Forbidden { subject, message },
            RecordError::Rejected(message) => CoverageError::Validation { subject, message },
            source @ RecordError::Transport(_) => CoverageError::Transport { subject, source },
        }
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, CoverageError::Conflict { .. })
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, CoverageError::Validation { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn subject_renders_what_is_known() {
        let d = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        assert_eq!(
            Subject::slot(d, SlotIndex::LAST).to_string(),
            "date 2025-03-14, slot 12"
        );
        assert_eq!(Subject::default().to_string(), "unspecified subject");
    }

    #[test]
    fn backend_message_is_kept_verbatim() {
        let err = CoverageError::from_record(
            Subject {
                reading_id: Some(ReadingId(9)),
                ..Subject::default()
            },
            RecordError::Conflict("Reading already validated".into()),
        );
        assert!(err.is_conflict());
        assert_eq!(
            err.to_string(),
            "conflict on reading 9: Reading already validated"
        );
    }
}
