//! Dashboard polling.
//!
//! A [`DashboardPoller`] ticks on a fixed interval and, on each tick, resolves
//! the current slot and fetches the day's coverage. It spawns nothing: the
//! caller drives it by awaiting [`DashboardPoller::next_snapshot`], and dropping
//! that future abandons the poll without side effects.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::{Interval, MissedTickBehavior, interval};
use tracing::{debug, instrument};

use crate::{
    clock::CurrentSlot,
    coverage::DailyCoverage,
    error::CoverageError,
    models::OrgUnitId,
    permissions::Actor,
    record::RecordSystem,
    service::CoverageService,
    tz::UtcWindow,
};

/// What a dashboard shows after one poll.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSnapshot {
    pub taken_at: DateTime<Utc>,
    pub current: CurrentSlot,
    /// Window of the current slot.
    pub window: UtcWindow,
    pub daily: DailyCoverage,
}

/// Fixed-interval poller for one organizational unit.
pub struct DashboardPoller<'a, R> {
    service: &'a CoverageService<R>,
    org_unit_id: OrgUnitId,
    actor: Actor,
    ticker: Interval,
}

impl<'a, R: RecordSystem> DashboardPoller<'a, R> {
    /// The first tick completes immediately. A zero `period` is raised to one millisecond.
    pub fn new(
        service: &'a CoverageService<R>,
        org_unit_id: OrgUnitId,
        actor: Actor,
        period: Duration,
    ) -> Self {
        let mut ticker = interval(period.max(Duration::from_millis(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        Self {
            service,
            org_unit_id,
            actor,
            ticker,
        }
    }

    pub fn period(&self) -> Duration {
        self.ticker.period()
    }

    /// Wait for the next tick, then poll.
    pub async fn next_snapshot(&mut self) -> Result<DashboardSnapshot, CoverageError> {
        self.ticker.tick().await;
        self.snapshot_at(Utc::now()).await
    }

    /// Poll as of `now` without waiting.
    #[instrument(skip(self), fields(org_unit = %self.org_unit_id))]
    pub async fn snapshot_at(&self, now: DateTime<Utc>) -> Result<DashboardSnapshot, CoverageError> {
        let current = self.service.current_slot_at(now);
        let window = self
            .service
            .slot_window_at(current.operational_date, current.slot_index)?;
        let daily = self
            .service
            .get_daily_coverage(current.operational_date, self.org_unit_id, &self.actor)
            .await?;
        debug!(
            date = %current.operational_date,
            slot = %current.slot_index,
            completion = daily.completion_percent(),
            "dashboard refreshed"
        );
        Ok(DashboardSnapshot {
            taken_at: now,
            current,
            window,
            daily,
        })
    }
}
