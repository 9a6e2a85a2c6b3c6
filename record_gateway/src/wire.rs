//! Request and error bodies exchanged with the system of record.

use reading_coverage::{lifecycle::RejectionReason, models::ActorId};
use serde::{Deserialize, Serialize};

/// Body of `POST readings/{id}/submit`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitBody {
    pub actor_id: ActorId,
}

/// Body of `POST readings/{id}/approve`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApproveBody<'a> {
    pub actor_id: ActorId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<&'a str>,
}

/// Body of `POST readings/{id}/reject`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejectBody<'a> {
    pub actor_id: ActorId,
    pub reason: &'a RejectionReason,
}

/// Error payload. Backends answer `{"message": ..}` or `{"error": ..}`.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}
