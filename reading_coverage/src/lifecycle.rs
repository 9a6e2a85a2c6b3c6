//! Reading lifecycle state machine.
//!
//! ```text
//! NOT_RECORDED --create--> DRAFT --submit--> SUBMITTED --approve--> APPROVED
//!                  ^  |                          |
//!                  |  +--edit--> DRAFT           +--reject--> REJECTED
//!                  +------------------edit---------------------------+
//! ```
//!
//! `NOT_RECORDED` is virtual: no backing record exists yet. `APPROVED` is
//! terminal. Anything not in [`transition`]'s table is an [`IllegalTransition`];
//! the state is never coerced.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Lifecycle state of one reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReadingStatus {
    /// No record exists for the (pipeline, date, slot).
    NotRecorded,
    /// Saved, editable by operators, not yet sent for validation.
    Draft,
    /// Waiting for a validator.
    Submitted,
    /// Validated. Terminal.
    Approved,
    /// Sent back by a validator; may be edited into a new draft.
    Rejected,
}

impl ReadingStatus {
    /// Every state, in lifecycle order.
    pub const ALL: [ReadingStatus; 5] = [
        ReadingStatus::NotRecorded,
        ReadingStatus::Draft,
        ReadingStatus::Submitted,
        ReadingStatus::Approved,
        ReadingStatus::Rejected,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::NotRecorded => "NOT_RECORDED",
            ReadingStatus::Draft => "DRAFT",
            ReadingStatus::Submitted => "SUBMITTED",
            ReadingStatus::Approved => "APPROVED",
            ReadingStatus::Rejected => "REJECTED",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ReadingStatus::Approved)
    }

    /// True if `action` is legal from this state.
    pub fn permits(self, action: Action) -> bool {
        transition(self, action).is_ok()
    }

    /// Actions legal from this state.
    pub fn allowed_actions(self) -> impl Iterator<Item = Action> {
        Action::ALL.into_iter().filter(move |a| self.permits(*a))
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Something an actor asks to do with a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Create,
    Edit,
    Submit,
    Approve,
    Reject,
}

impl Action {
    pub const ALL: [Action; 5] = [
        Action::Create,
        Action::Edit,
        Action::Submit,
        Action::Approve,
        Action::Reject,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Edit => "edit",
            Action::Submit => "submit",
            Action::Approve => "approve",
            Action::Reject => "reject",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An action attempted from a state that does not allow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("cannot {action} a reading in state {from}")]
pub struct IllegalTransition {
    pub from: ReadingStatus,
    pub action: Action,
}

/// Apply `action` to a reading currently in `from`.
pub fn transition(from: ReadingStatus, action: Action) -> Result<ReadingStatus, IllegalTransition> {
    use Action::*;
    use ReadingStatus::*;

    match (from, action) {
        (NotRecorded, Create) => Ok(Draft),
        (Draft, Edit) => Ok(Draft),
        (Draft, Submit) => Ok(Submitted),
        (Submitted, Approve) => Ok(Approved),
        (Submitted, Reject) => Ok(Rejected),
        (Rejected, Edit) => Ok(Draft),
        _ => Err(IllegalTransition { from, action }),
    }
}

/// Minimum length of a rejection reason, counted in characters after trimming.
pub const MIN_REJECTION_REASON_CHARS: usize = 5;

/// Rejection reason that failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RejectionReasonError {
    #[error("rejection reason is required")]
    Empty,
    #[error("rejection reason must be at least 5 characters, got {0}")]
    TooShort(usize),
}

/// A validated, trimmed rejection reason.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RejectionReason(String);

impl RejectionReason {
    pub fn parse(raw: &str) -> Result<Self, RejectionReasonError> {
        let trimmed = raw.trim();
        let chars = trimmed.chars().count();
        if chars == 0 {
            Err(RejectionReasonError::Empty)
        } else if chars < MIN_REJECTION_REASON_CHARS {
            Err(RejectionReasonError::TooShort(chars))
        } else {
            Ok(Self(trimmed.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RejectionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
