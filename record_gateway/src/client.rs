//! HTTP implementation of [`RecordSystem`].
//!
//! Endpoints, relative to the configured base URL:
//! - `GET  coverage/slots?date=&slotIndex=&orgUnitId=` → roster
//! - `POST readings` → create or update
//! - `POST readings/{id}/submit | approve | reject`
//!
//! Non-2xx answers are classified by status code; the backend's message is
//! kept verbatim. One request per call, no retries.

use std::time::Duration;

use async_trait::async_trait;
use reading_coverage::{
    lifecycle::RejectionReason,
    models::{ActorId, Reading, ReadingId},
    record::{RecordError, RecordSystem, SaveReadingCommand, SlotQuery, SlotRoster},
};
use reqwest::{Client, RequestBuilder, StatusCode, Url, header};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use shared_utils::env::get_env_var;
use snafu::ResultExt;
use tracing::{debug, instrument, warn};

use crate::{
    config::GatewayConfig,
    errors::{ClientBuildSnafu, GatewayInitError, InvalidBaseUrlSnafu, InvalidTokenSnafu, MissingTokenSnafu},
    wire::{ApproveBody, ErrorBody, RejectBody, SubmitBody},
};

pub struct HttpRecordSystem {
    client: Client,
    base_url: Url,
}

impl std::fmt::Debug for HttpRecordSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpRecordSystem")
            .field("base_url", &self.base_url.as_str())
            .finish_non_exhaustive()
    }
}

impl HttpRecordSystem {
    /// Creates a client, reading the bearer token from the variable named by
    /// `config.token_env`.
    pub fn new(config: &GatewayConfig) -> Result<Self, GatewayInitError> {
        let token = SecretString::new(get_env_var(&config.token_env).context(MissingTokenSnafu)?.into());
        Self::with_token(config, token)
    }

    /// The token only lives on in the client's default `Authorization` header.
    pub fn with_token(config: &GatewayConfig, token: SecretString) -> Result<Self, GatewayInitError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut auth = header::HeaderValue::from_str(&format!("Bearer {}", token.expose_secret()))
            .context(InvalidTokenSnafu)?;
        auth.set_sensitive(true);
        let mut headers = header::HeaderMap::new();
        headers.insert(header::AUTHORIZATION, auth);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(config.timeout().max(Duration::from_secs(1)))
            .build()
            .context(ClientBuildSnafu)?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, RecordError> {
        self.base_url
            .join(path)
            .map_err(|e| RecordError::Transport(Box::new(e)))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, RecordError> {
        let response = request.send().await.map_err(transport)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = extract_message(status, &body);
            warn!(%status, %message, "system of record answered with an error");
            return Err(classify(status, message));
        }
        response.json::<T>().await.map_err(transport)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, GatewayInitError> {
    // trailing slash so that `join` appends instead of replacing the last segment
    let with_slash = format!("{}/", raw.trim().trim_end_matches('/'));
    let url = Url::parse(&with_slash).map_err(|e| {
        InvalidBaseUrlSnafu {
            url: raw,
            message: e.to_string(),
        }
        .build()
    })?;
    if !matches!(url.scheme(), "http" | "https") {
        return InvalidBaseUrlSnafu {
            url: raw,
            message: format!("unsupported scheme {}", url.scheme()),
        }
        .fail();
    }
    Ok(url)
}

fn transport(err: reqwest::Error) -> RecordError {
    RecordError::Transport(Box::new(err))
}

/// Map a non-2xx status onto the record error taxonomy.
pub fn classify(status: StatusCode, message: String) -> RecordError {
    match status {
        StatusCode::BAD_REQUEST | StatusCode::UNPROCESSABLE_ENTITY => RecordError::Rejected(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RecordError::Forbidden(message),
        StatusCode::NOT_FOUND => RecordError::NotFound(message),
        StatusCode::CONFLICT => RecordError::Conflict(message),
        _ => RecordError::Transport(format!("HTTP {status}: {message}").into()),
    }
}

/// The backend's own message: `message` or `error` from a JSON body, else the
/// raw body, else the status reason.
pub fn extract_message(status: StatusCode, body: &str) -> String {
    let parsed = serde_json::from_str::<ErrorBody>(body).unwrap_or_default();
    parsed
        .message
        .or(parsed.error)
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let raw = body.trim();
            if raw.is_empty() {
                status.canonical_reason().unwrap_or("request failed").to_string()
            } else {
                raw.to_string()
            }
        })
}

#[async_trait]
impl RecordSystem for HttpRecordSystem {
    #[instrument(skip(self))]
    async fn fetch_slot_roster(&self, query: &SlotQuery) -> Result<SlotRoster, RecordError> {
        let url = self.endpoint("coverage/slots")?;
        let roster: SlotRoster = self.send(self.client.get(url).query(query)).await?;
        debug!(pipelines = roster.pipelines.len(), "roster fetched");
        Ok(roster)
    }

    #[instrument(skip_all, fields(reading = ?command.reading_id, pipeline = %command.pipeline_id))]
    async fn save_reading(&self, command: &SaveReadingCommand) -> Result<Reading, RecordError> {
        let url = self.endpoint("readings")?;
        self.send(self.client.post(url).json(command)).await
    }

    #[instrument(skip(self))]
    async fn submit_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
    ) -> Result<Reading, RecordError> {
        let url = self.endpoint(&format!("readings/{reading_id}/submit"))?;
        self.send(self.client.post(url).json(&SubmitBody { actor_id }))
            .await
    }

    #[instrument(skip(self, notes))]
    async fn approve_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        notes: Option<&str>,
    ) -> Result<Reading, RecordError> {
        let url = self.endpoint(&format!("readings/{reading_id}/approve"))?;
        self.send(self.client.post(url).json(&ApproveBody { actor_id, notes }))
            .await
    }

    #[instrument(skip(self, reason))]
    async fn reject_reading(
        &self,
        reading_id: ReadingId,
        actor_id: ActorId,
        reason: &RejectionReason,
    ) -> Result<Reading, RecordError> {
        let url = self.endpoint(&format!("readings/{reading_id}/reject"))?;
        self.send(self.client.post(url).json(&RejectBody { actor_id, reason }))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_codes_map_to_the_taxonomy() {
        let m = || "Reading already validated".to_string();
        assert!(matches!(classify(StatusCode::CONFLICT, m()), RecordError::Conflict(s) if s == m()));
        assert!(matches!(classify(StatusCode::NOT_FOUND, m()), RecordError::NotFound(_)));
        assert!(matches!(classify(StatusCode::FORBIDDEN, m()), RecordError::Forbidden(_)));
        assert!(matches!(classify(StatusCode::UNAUTHORIZED, m()), RecordError::Forbidden(_)));
        assert!(matches!(
            classify(StatusCode::UNPROCESSABLE_ENTITY, m()),
            RecordError::Rejected(_)
        ));
        let err = classify(StatusCode::BAD_GATEWAY, m());
        assert!(matches!(err, RecordError::Transport(_)));
        assert_eq!(err.to_string(), "HTTP 502 Bad Gateway: Reading already validated");
    }

    #[test]
    fn message_extraction() {
        assert_eq!(
            extract_message(StatusCode::CONFLICT, r#"{"message":"Reading already validated"}"#),
            "Reading already validated"
        );
        assert_eq!(
            extract_message(StatusCode::BAD_REQUEST, r#"{"error":"slotIndex out of range"}"#),
            "slotIndex out of range"
        );
        assert_eq!(extract_message(StatusCode::NOT_FOUND, "no such reading\n"), "no such reading");
        assert_eq!(extract_message(StatusCode::NOT_FOUND, ""), "Not Found");
    }

    #[test]
    fn base_url_keeps_its_path() {
        let client = HttpRecordSystem::with_token(
            &GatewayConfig::new("https://records.example/api"),
            SecretString::new("t0ken".into()),
        )
        .unwrap();
        assert_eq!(
            client.endpoint("readings/4/submit").unwrap().as_str(),
            "https://records.example/api/readings/4/submit"
        );
        assert!(!format!("{client:?}").contains("t0ken"));
    }

    #[test]
    fn bad_base_url_and_token_fail_init() {
        let err = HttpRecordSystem::with_token(
            &GatewayConfig::new("ftp://records.example"),
            SecretString::new("t".into()),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayInitError::InvalidBaseUrl { .. }));

        let err = HttpRecordSystem::with_token(
            &GatewayConfig::new("https://records.example"),
            SecretString::new("bad\ntoken".into()),
        )
        .unwrap_err();
        assert!(matches!(err, GatewayInitError::InvalidToken { .. }));
    }
}
