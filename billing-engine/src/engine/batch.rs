//! Batch billing runs.

use std::sync::Arc;
use std::time::Duration;

use chrono::{NaiveDate, Utc};
use futures::stream::{self, StreamExt};
use tokio::time::timeout;
use tracing::instrument;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::engine::generator::InvoiceGenerator;
use crate::error::BillingError;
use crate::models::{
    BillingRun, BillingRunResult, BillingRunStatus, BillingRunType, RunResultStatus,
};
use crate::services::metrics::{record_billing_run, record_error};
use crate::store::ScheduleStore;

pub struct BatchProcessor {
    schedules: Arc<dyn ScheduleStore>,
    generator: Arc<InvoiceGenerator>,
    config: EngineConfig,
}

impl BatchProcessor {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        generator: Arc<InvoiceGenerator>,
        config: EngineConfig,
    ) -> Self {
        Self {
            schedules,
            generator,
            config,
        }
    }

    /// Generate invoices for every schedule due on `today`.
    ///
    /// Schedules are processed with bounded parallelism and a per-schedule
    /// deadline; a failing schedule is logged, counted, and skipped, never
    /// allowed to block the rest of the run.
    #[instrument(skip(self), fields(%today, run_type = run_type.as_str()))]
    pub async fn run(
        &self,
        today: NaiveDate,
        run_type: BillingRunType,
    ) -> Result<BillingRun, BillingError> {
        let run_id = Uuid::new_v4();
        let started_utc = Utc::now();

        let due = self
            .schedules
            .list_due(today)
            .await
            .map_err(BillingError::Persistence)?;

        tracing::info!(run_id = %run_id, due = due.len(), "Starting billing run");

        let deadline = Duration::from_secs(self.config.schedule_deadline_secs);
        let concurrency = self.config.batch_concurrency.max(1);

        let results: Vec<BillingRunResult> = stream::iter(due)
            .map(|schedule| {
                let generator = Arc::clone(&self.generator);
                async move {
                    let schedule_id = schedule.schedule_id;
                    match timeout(deadline, generator.generate(schedule_id)).await {
                        Ok(Ok(invoice)) => BillingRunResult {
                            schedule_id,
                            status: RunResultStatus::Succeeded,
                            invoice_id: Some(invoice.invoice_id),
                            error: None,
                        },
                        Ok(Err(e @ BillingError::DuplicateGeneration { .. })) => {
                            tracing::warn!(
                                schedule_id = %schedule_id,
                                error = %e,
                                "Cycle already billed, skipping"
                            );
                            failed_result(schedule_id, e.to_string())
                        }
                        Ok(Err(e)) => {
                            tracing::error!(
                                schedule_id = %schedule_id,
                                error = %e,
                                "Failed to generate invoice"
                            );
                            failed_result(schedule_id, e.to_string())
                        }
                        Err(_) => {
                            tracing::error!(
                                schedule_id = %schedule_id,
                                deadline_secs = self.config.schedule_deadline_secs,
                                "Generation deadline exceeded"
                            );
                            record_error("deadline", "batch");
                            failed_result(schedule_id, "generation deadline exceeded".to_string())
                        }
                    }
                }
            })
            .buffer_unordered(concurrency)
            .collect()
            .await;

        let processed = results.len() as u32;
        let succeeded = results
            .iter()
            .filter(|r| r.status == RunResultStatus::Succeeded)
            .count() as u32;
        let failed = processed - succeeded;

        // A run only counts as failed when nothing at all succeeded.
        let status = if failed > 0 && succeeded == 0 && processed > 0 {
            BillingRunStatus::Failed
        } else {
            BillingRunStatus::Completed
        };

        record_billing_run(run_type.as_str(), status.as_str());
        tracing::info!(
            run_id = %run_id,
            processed,
            succeeded,
            failed,
            status = status.as_str(),
            "Billing run finished"
        );

        Ok(BillingRun {
            run_id,
            run_type,
            status,
            started_utc,
            completed_utc: Some(Utc::now()),
            schedules_processed: processed,
            schedules_succeeded: succeeded,
            schedules_failed: failed,
            results,
        })
    }
}

fn failed_result(schedule_id: Uuid, error: String) -> BillingRunResult {
    BillingRunResult {
        schedule_id,
        status: RunResultStatus::Failed,
        invoice_id: None,
        error: Some(error),
    }
}
