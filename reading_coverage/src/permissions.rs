//! Capability roles and the permission resolver.
//!
//! Raw role names coming from authentication are resolved once, at the
//! boundary, into an opaque [`Capabilities`] value (see
//! [`RoleMapping`](crate::config::RoleMapping)). Everything downstream works on
//! capabilities, never on role strings.
//!
//! The flags are pure functions of capabilities and lifecycle state; slot-time
//! locking is a presentation policy layered on top.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{
    lifecycle::{Action, ReadingStatus},
    models::ActorId,
};

/// Capability role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Records readings.
    Operator,
    /// Approves or rejects submitted readings.
    Validator,
    /// Both of the above.
    Admin,
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Operator, Role::Validator, Role::Admin];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Operator => "operator",
            Role::Validator => "validator",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown role name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown role: {0}")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "operator" => Ok(Role::Operator),
            "validator" => Ok(Role::Validator),
            "admin" => Ok(Role::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

/// What an actor may do, independent of any particular reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
pub struct Capabilities {
    operator: bool,
    validator: bool,
    admin: bool,
}

impl Capabilities {
    /// No capability at all: read-only.
    pub const READ_ONLY: Capabilities = Capabilities {
        operator: false,
        validator: false,
        admin: false,
    };

    pub fn from_roles<I: IntoIterator<Item = Role>>(roles: I) -> Self {
        roles.into_iter().fold(Self::READ_ONLY, |mut caps, role| {
            match role {
                Role::Operator => caps.operator = true,
                Role::Validator => caps.validator = true,
                Role::Admin => {
                    caps.admin = true;
                    caps.operator = true;
                    caps.validator = true;
                }
            }
            caps
        })
    }

    pub fn has_operator(&self) -> bool {
        self.operator
    }

    pub fn has_validator(&self) -> bool {
        self.validator
    }

    pub fn is_admin(&self) -> bool {
        self.admin
    }

    pub fn is_read_only(&self) -> bool {
        !self.operator && !self.validator
    }
}

/// The authenticated party performing an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: ActorId,
    pub capabilities: Capabilities,
}

impl Actor {
    pub fn new(id: ActorId, capabilities: Capabilities) -> Self {
        Self { id, capabilities }
    }
}

/// Permission flags for one reading and one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    pub can_edit: bool,
    pub can_submit: bool,
    pub can_validate: bool,
}

/// True if the capabilities cover `action` (state not considered).
pub fn authorize(caps: &Capabilities, action: Action) -> bool {
    match action {
        Action::Create | Action::Edit | Action::Submit => caps.has_operator(),
        Action::Approve | Action::Reject => caps.has_validator(),
    }
}

/// Resolve the permission flags for a reading in `state`.
///
/// - `can_edit`: operator, and the state accepts create or edit
///   (NOT_RECORDED, DRAFT, REJECTED)
/// - `can_submit`: operator, and the state is DRAFT
/// - `can_validate`: validator, and the state is SUBMITTED
pub fn permissions_for(caps: &Capabilities, state: ReadingStatus) -> Permissions {
    let allowed = |action: Action| authorize(caps, action) && state.permits(action);
    Permissions {
        can_edit: allowed(Action::Create) || allowed(Action::Edit),
        can_submit: allowed(Action::Submit),
        can_validate: allowed(Action::Approve) && allowed(Action::Reject),
    }
}
