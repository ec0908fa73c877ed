//! Schedule status state machine.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use tracing::instrument;
use uuid::Uuid;

use crate::engine::dates::next_billing_date;
use crate::engine::locks::ScheduleLocks;
use crate::error::BillingError;
use crate::models::{BillingSchedule, ScheduleStatus};
use crate::services::metrics::{record_error, record_schedule_operation};
use crate::store::ScheduleStore;

/// Allowed manual transitions. `Completed` is reached only through the
/// generator; terminal statuses admit nothing.
pub fn transition_allowed(from: ScheduleStatus, to: ScheduleStatus) -> bool {
    use ScheduleStatus::*;
    matches!(
        (from, to),
        (Active, Paused) | (Paused, Active) | (Active, Cancelled) | (Paused, Cancelled)
    )
}

pub struct LifecycleManager {
    schedules: Arc<dyn ScheduleStore>,
    locks: Arc<ScheduleLocks>,
}

impl LifecycleManager {
    pub fn new(schedules: Arc<dyn ScheduleStore>, locks: Arc<ScheduleLocks>) -> Self {
        Self { schedules, locks }
    }

    /// Pause an active schedule. `next_billing_date` is preserved.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn pause(&self, schedule_id: Uuid) -> Result<BillingSchedule, BillingError> {
        self.transition(schedule_id, ScheduleStatus::Paused, None).await
    }

    /// Resume a paused schedule. `next_billing_date` is recomputed from
    /// `today`; cycles missed while paused are skipped, never back-filled.
    #[instrument(skip(self), fields(schedule_id = %schedule_id, %today))]
    pub async fn resume(
        &self,
        schedule_id: Uuid,
        today: NaiveDate,
    ) -> Result<BillingSchedule, BillingError> {
        self.transition(schedule_id, ScheduleStatus::Active, Some(today))
            .await
    }

    /// Cancel a schedule. Terminal; the record stays until deleted.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn cancel(&self, schedule_id: Uuid) -> Result<BillingSchedule, BillingError> {
        self.transition(schedule_id, ScheduleStatus::Cancelled, None)
            .await
    }

    /// Remove the schedule record. Irreversible and distinct from
    /// cancellation; allowed from any status.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn delete(&self, schedule_id: Uuid) -> Result<(), BillingError> {
        {
            let _guard = self.locks.acquire(schedule_id).await;

            let schedule = self
                .schedules
                .get(schedule_id)
                .await
                .map_err(BillingError::Persistence)?
                .ok_or_else(|| BillingError::NotFound(format!("schedule {schedule_id}")))?;

            self.schedules
                .delete(schedule.schedule_id)
                .await
                .map_err(BillingError::Persistence)?;

            tracing::info!(status = %schedule.status, "Deleted billing schedule");
        }
        self.locks.discard(schedule_id);
        record_schedule_operation("deleted");
        Ok(())
    }

    async fn transition(
        &self,
        schedule_id: Uuid,
        to: ScheduleStatus,
        resume_on: Option<NaiveDate>,
    ) -> Result<BillingSchedule, BillingError> {
        let _guard = self.locks.acquire(schedule_id).await;

        let schedule = self
            .schedules
            .get(schedule_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| BillingError::NotFound(format!("schedule {schedule_id}")))?;

        if !transition_allowed(schedule.status, to) {
            record_error("invalid_transition", "lifecycle");
            return Err(BillingError::InvalidTransition {
                from: schedule.status,
                to,
            });
        }

        let mut updated = schedule.clone();
        updated.status = to;
        if let Some(today) = resume_on {
            updated.next_billing_date = next_billing_date(
                today,
                schedule.due_day,
                schedule.frequency,
                schedule.custom_days,
            );
        }
        updated.updated_utc = Utc::now();

        self.schedules
            .update(&updated)
            .await
            .map_err(BillingError::Persistence)?;

        record_schedule_operation(operation_label(to));
        tracing::info!(
            from = %schedule.status,
            to = %to,
            next_billing_date = %updated.next_billing_date,
            "Schedule status changed"
        );

        Ok(updated)
    }
}

fn operation_label(to: ScheduleStatus) -> &'static str {
    match to {
        ScheduleStatus::Active => "resumed",
        ScheduleStatus::Paused => "paused",
        ScheduleStatus::Cancelled => "cancelled",
        ScheduleStatus::Completed => "completed",
    }
}
