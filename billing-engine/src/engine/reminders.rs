//! Reminder dispatch: hands due triggers to the notification sink.

use std::sync::Arc;

use chrono::NaiveDate;
use tracing::instrument;

use crate::engine::notifications::notification_triggers;
use crate::error::BillingError;
use crate::models::{InvoiceStatus, ListInvoicesFilter, ListSchedulesFilter, ScheduleStatus};
use crate::services::metrics::record_reminders_sent;
use crate::store::{CustomerLookup, InvoiceStore, NotificationSink, ScheduleStore};

pub struct ReminderDispatcher {
    schedules: Arc<dyn ScheduleStore>,
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerLookup>,
    sink: Arc<dyn NotificationSink>,
}

impl ReminderDispatcher {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerLookup>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            schedules,
            invoices,
            customers,
            sink,
        }
    }

    /// Walk active schedules and hand every trigger that fires on `today` to
    /// the sink. Sink and lookup failures are logged per schedule and do not
    /// abort the sweep. Returns the number of reminders delivered.
    #[instrument(skip(self), fields(%today))]
    pub async fn dispatch_due_reminders(&self, today: NaiveDate) -> Result<usize, BillingError> {
        let filter = ListSchedulesFilter {
            status: Some(ScheduleStatus::Active),
            ..Default::default()
        };
        let schedules = self
            .schedules
            .list(&filter)
            .await
            .map_err(BillingError::Persistence)?;

        let mut sent = 0;

        for schedule in schedules {
            for trigger in
                notification_triggers(schedule.next_billing_date, &schedule.notification_days)
            {
                if trigger.trigger_date != today {
                    continue;
                }

                let customer = match self.customers.get(schedule.customer_id).await {
                    Ok(Some(customer)) => customer,
                    Ok(None) => {
                        tracing::warn!(
                            schedule_id = %schedule.schedule_id,
                            customer_id = %schedule.customer_id,
                            "Customer missing, skipping reminder"
                        );
                        continue;
                    }
                    Err(e) => {
                        tracing::warn!(
                            schedule_id = %schedule.schedule_id,
                            error = %e,
                            "Customer lookup failed, skipping reminder"
                        );
                        continue;
                    }
                };

                // The cycle's invoice exists only once generation has run;
                // day-of reminders usually carry it, earlier ones do not.
                let invoice = self
                    .invoices
                    .list(&ListInvoicesFilter {
                        billing_schedule_id: Some(schedule.schedule_id),
                        due_date: Some(schedule.next_billing_date),
                        status: Some(InvoiceStatus::Pending),
                        ..Default::default()
                    })
                    .await
                    .unwrap_or_default()
                    .into_iter()
                    .next();

                if let Err(e) = self
                    .sink
                    .notify(&customer, invoice.as_ref(), trigger.days_before)
                    .await
                {
                    tracing::warn!(
                        schedule_id = %schedule.schedule_id,
                        days_before = trigger.days_before,
                        error = %e,
                        "Notification sink rejected reminder"
                    );
                    continue;
                }

                sent += 1;
            }
        }

        record_reminders_sent(sent);
        tracing::info!(sent, "Reminder sweep finished");
        Ok(sent)
    }
}
