//! Reading coverage for a pipeline fleet.
//!
//! Each pipeline gets one measurement ("reading") per two-hour slot of an
//! operational day. This crate resolves wall-clock time to slots, governs the
//! reading lifecycle, derives per-actor permissions, and rolls reading states
//! up into slot and day coverage. Readings themselves live in an external
//! system of record reached through [`record::RecordSystem`].
//!
//! Layering, leaves first: [`slot`] → [`clock`] → [`lifecycle`] →
//! [`permissions`] → [`coverage`] → [`service`].

pub mod clock;
pub mod config;
pub mod coverage;
pub mod error;
pub mod lifecycle;
pub mod measurement;
pub mod models;
pub mod permissions;
pub mod poller;
pub mod record;
pub mod service;
pub mod slot;
pub mod tz;

pub use clock::{CurrentSlot, DayStart, SlotSelection, resolve_current_slot};
pub use coverage::{CoverageSummary, DailyCoverage, SlotState, aggregate};
pub use error::{CoverageError, Subject};
pub use lifecycle::{Action, ReadingStatus};
pub use permissions::{Actor, Capabilities, Permissions, Role, permissions_for};
pub use record::{RecordError, RecordSystem};
pub use service::{CoverageService, CoverageSettings};
pub use slot::{SlotIndex, catalog};
