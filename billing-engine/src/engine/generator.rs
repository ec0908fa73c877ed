//! Invoice generation: one invoice per billing cycle.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;
use uuid::Uuid;

use crate::engine::dates::next_billing_date;
use crate::engine::locks::ScheduleLocks;
use crate::error::BillingError;
use crate::models::{
    BillingSchedule, Invoice, InvoiceStatus, ListInvoicesFilter, PaymentMethod, ScheduleStatus,
};
use crate::services::metrics::{record_error, record_generation_duration, record_invoice_generated};
use crate::store::{CustomerLookup, InvoiceStore, ScheduleStore};

pub struct InvoiceGenerator {
    schedules: Arc<dyn ScheduleStore>,
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerLookup>,
    locks: Arc<ScheduleLocks>,
}

impl InvoiceGenerator {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerLookup>,
        locks: Arc<ScheduleLocks>,
    ) -> Self {
        Self {
            schedules,
            invoices,
            customers,
            locks,
        }
    }

    /// Generate the invoice for the schedule's current cycle and advance the
    /// schedule, holding the per-schedule lock for the whole sequence.
    ///
    /// Fails with `NotActive` on non-active schedules, `DuplicateGeneration`
    /// when the current cycle already has an invoice, and `Persistence` when
    /// a store call fails; in every failure case the schedule is left
    /// unchanged as observed through the stores.
    #[instrument(skip(self), fields(schedule_id = %schedule_id))]
    pub async fn generate(&self, schedule_id: Uuid) -> Result<Invoice, BillingError> {
        let _guard = self.locks.acquire(schedule_id).await;
        let start = std::time::Instant::now();

        let result = self.generate_locked(schedule_id).await;

        record_generation_duration(start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            record_error(e.kind(), "generate");
        }
        result
    }

    async fn generate_locked(&self, schedule_id: Uuid) -> Result<Invoice, BillingError> {
        let schedule = self
            .schedules
            .get(schedule_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| BillingError::NotFound(format!("schedule {schedule_id}")))?;

        if schedule.status != ScheduleStatus::Active {
            return Err(BillingError::NotActive(schedule_id));
        }

        // One invoice per cycle: the invoice store is the authoritative
        // record of whether the current next_billing_date was already
        // billed. Cancelled invoices do not count; a compensated failure
        // must stay retryable.
        let existing = self
            .invoices
            .list(&ListInvoicesFilter {
                billing_schedule_id: Some(schedule_id),
                due_date: Some(schedule.next_billing_date),
                ..Default::default()
            })
            .await
            .map_err(BillingError::Persistence)?;

        if existing
            .iter()
            .any(|invoice| invoice.status != InvoiceStatus::Cancelled)
        {
            return Err(BillingError::DuplicateGeneration {
                schedule_id,
                due_date: schedule.next_billing_date,
            });
        }

        let payment_method = self.resolve_payment_method(&schedule).await?;

        let invoice = Invoice {
            invoice_id: Uuid::new_v4(),
            customer_id: schedule.customer_id,
            billing_schedule_id: Some(schedule.schedule_id),
            amount: schedule.amount,
            due_date: schedule.next_billing_date,
            status: InvoiceStatus::Pending,
            payment_method,
            payment_gateway_id: schedule.payment_gateway_id,
            description: format!("{} - {}", schedule.title, schedule.next_billing_date),
            payment_date: None,
            transaction_id: None,
            metadata: None,
            created_utc: Utc::now(),
        };

        self.invoices
            .create(&invoice)
            .await
            .map_err(BillingError::Persistence)?;

        let updated = advance_schedule(&schedule, invoice.invoice_id);
        if let Err(e) = self.schedules.update(&updated).await {
            // The invoice committed but the schedule did not advance: void
            // the invoice so the cycle stays observably unbilled.
            let mut voided = invoice.clone();
            voided.status = InvoiceStatus::Cancelled;
            if let Err(void_err) = self.invoices.update(&voided).await {
                tracing::error!(
                    invoice_id = %invoice.invoice_id,
                    error = %void_err,
                    "Failed to void invoice after schedule update failure"
                );
            }
            return Err(BillingError::Persistence(e));
        }

        record_invoice_generated(schedule.frequency.as_str());
        tracing::info!(
            invoice_id = %invoice.invoice_id,
            customer_id = %invoice.customer_id,
            due_date = %invoice.due_date,
            next_billing_date = %updated.next_billing_date,
            installments_generated = updated.installments_generated,
            "Generated invoice"
        );

        Ok(invoice)
    }

    /// Two-step payment-method resolution: schedule-level override unless
    /// the schedule says "default", else the customer's stored preference.
    async fn resolve_payment_method(
        &self,
        schedule: &BillingSchedule,
    ) -> Result<PaymentMethod, BillingError> {
        if schedule.payment_method != PaymentMethod::Default {
            return Ok(schedule.payment_method);
        }

        let customer = self
            .customers
            .get(schedule.customer_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| {
                BillingError::NotFound(format!("customer {}", schedule.customer_id))
            })?;

        Ok(customer.default_payment_method)
    }
}

/// The schedule as it must look after `invoice_id` committed: cycle advanced,
/// installment counted, completion applied.
fn advance_schedule(schedule: &BillingSchedule, invoice_id: Uuid) -> BillingSchedule {
    let now = Utc::now();
    let mut updated = schedule.clone();

    updated.last_generated_invoice_id = Some(invoice_id);
    updated.last_execution_date = Some(now);
    updated.next_billing_date = next_billing_date(
        schedule.next_billing_date,
        schedule.due_day,
        schedule.frequency,
        schedule.custom_days,
    );

    if schedule.installments.is_some() {
        updated.installments_generated = schedule.installments_generated + 1;
    }
    if updated.installments_exhausted() {
        updated.status = ScheduleStatus::Completed;
    }

    // A schedule never bills past its configured end date.
    if let Some(end_date) = schedule.end_date {
        if updated.next_billing_date > end_date {
            updated.status = ScheduleStatus::Completed;
        }
    }

    updated.updated_utc = now;
    updated
}
