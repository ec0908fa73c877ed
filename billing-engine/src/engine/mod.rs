//! Engine components and the wiring facade.

mod batch;
mod dates;
mod generator;
mod lifecycle;
mod locks;
mod notifications;
mod reminders;
mod surcharge;

pub use batch::BatchProcessor;
pub use dates::{initial_billing_date, next_billing_date};
pub use generator::InvoiceGenerator;
pub use lifecycle::{transition_allowed, LifecycleManager};
pub use locks::ScheduleLocks;
pub use notifications::{notification_triggers, NotificationTrigger};
pub use reminders::ReminderDispatcher;
pub use surcharge::{days_late, overdue_surcharge, SurchargePolicy};

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use tracing::instrument;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::BillingError;
use crate::models::{
    BillingRun, BillingRunType, BillingSchedule, CreateBillingSchedule, Invoice,
    ListInvoicesFilter, ListSchedulesFilter, ScheduleStatus,
};
use crate::services::metrics::record_schedule_operation;
use crate::store::{CustomerLookup, InvoiceStore, NotificationSink, ScheduleStore};

/// Facade wiring the stores, the per-schedule lock registry, and the engine
/// components behind one constructor.
pub struct BillingEngine {
    schedules: Arc<dyn ScheduleStore>,
    invoices: Arc<dyn InvoiceStore>,
    customers: Arc<dyn CustomerLookup>,
    generator: Arc<InvoiceGenerator>,
    lifecycle: LifecycleManager,
    batch: BatchProcessor,
    reminders: ReminderDispatcher,
}

impl BillingEngine {
    pub fn new(
        schedules: Arc<dyn ScheduleStore>,
        invoices: Arc<dyn InvoiceStore>,
        customers: Arc<dyn CustomerLookup>,
        sink: Arc<dyn NotificationSink>,
        config: EngineConfig,
    ) -> Self {
        let locks = Arc::new(ScheduleLocks::new());

        let generator = Arc::new(InvoiceGenerator::new(
            Arc::clone(&schedules),
            Arc::clone(&invoices),
            Arc::clone(&customers),
            Arc::clone(&locks),
        ));
        let lifecycle = LifecycleManager::new(Arc::clone(&schedules), Arc::clone(&locks));
        let batch = BatchProcessor::new(Arc::clone(&schedules), Arc::clone(&generator), config);
        let reminders = ReminderDispatcher::new(
            Arc::clone(&schedules),
            Arc::clone(&invoices),
            Arc::clone(&customers),
            sink,
        );

        Self {
            schedules,
            invoices,
            customers,
            generator,
            lifecycle,
            batch,
            reminders,
        }
    }

    /// Validate the input, compute the initial `next_billing_date`, and
    /// persist a new active schedule. Validation failures never reach the
    /// store.
    #[instrument(skip(self, input), fields(customer_id = %input.customer_id))]
    pub async fn create_schedule(
        &self,
        input: CreateBillingSchedule,
    ) -> Result<BillingSchedule, BillingError> {
        input.validate()?;

        self.customers
            .get(input.customer_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| BillingError::NotFound(format!("customer {}", input.customer_id)))?;

        if let Some(plan_id) = input.plan_id {
            self.customers
                .get_plan(plan_id)
                .await
                .map_err(BillingError::Persistence)?
                .ok_or_else(|| BillingError::NotFound(format!("plan {plan_id}")))?;
        }

        let now = Utc::now();
        let schedule = BillingSchedule {
            schedule_id: Uuid::new_v4(),
            customer_id: input.customer_id,
            plan_id: input.plan_id,
            title: input.title,
            description: input.description,
            amount: input.amount,
            frequency: input.frequency,
            custom_days: input.custom_days,
            due_day: input.due_day,
            start_date: input.start_date,
            end_date: input.end_date,
            next_billing_date: initial_billing_date(
                input.start_date,
                input.due_day,
                input.frequency,
                input.custom_days,
            ),
            notification_days: input.notification_days,
            auto_generate_invoice: input.auto_generate_invoice,
            payment_method: input.payment_method,
            payment_gateway_id: input.payment_gateway_id,
            auto_charge: input.auto_charge,
            status: ScheduleStatus::Active,
            installments: input.installments,
            installments_generated: 0,
            apply_late_fee: input.apply_late_fee,
            late_fee_percentage: input.late_fee_percentage,
            apply_daily_interest: input.apply_daily_interest,
            daily_interest_percentage: input.daily_interest_percentage,
            last_execution_date: None,
            last_generated_invoice_id: None,
            notes: input.notes,
            metadata: input.metadata,
            created_utc: now,
            updated_utc: now,
        };

        self.schedules
            .create(&schedule)
            .await
            .map_err(BillingError::Persistence)?;

        record_schedule_operation("created");
        tracing::info!(
            schedule_id = %schedule.schedule_id,
            next_billing_date = %schedule.next_billing_date,
            frequency = schedule.frequency.as_str(),
            "Created billing schedule"
        );

        Ok(schedule)
    }

    pub async fn get_schedule(&self, schedule_id: Uuid) -> Result<BillingSchedule, BillingError> {
        self.schedules
            .get(schedule_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| BillingError::NotFound(format!("schedule {schedule_id}")))
    }

    pub async fn list_schedules(
        &self,
        filter: &ListSchedulesFilter,
    ) -> Result<Vec<BillingSchedule>, BillingError> {
        self.schedules
            .list(filter)
            .await
            .map_err(BillingError::Persistence)
    }

    pub async fn list_invoices(
        &self,
        filter: &ListInvoicesFilter,
    ) -> Result<Vec<Invoice>, BillingError> {
        self.invoices
            .list(filter)
            .await
            .map_err(BillingError::Persistence)
    }

    /// Manual trigger: generate the current cycle's invoice now, regardless
    /// of `auto_generate_invoice`. Same preconditions, idempotency guard,
    /// and per-schedule mutual exclusion as the batch path.
    pub async fn generate_now(&self, schedule_id: Uuid) -> Result<Invoice, BillingError> {
        self.generator.generate(schedule_id).await
    }

    /// Run a billing sweep for every schedule due on `today`.
    pub async fn run_batch(
        &self,
        today: NaiveDate,
        run_type: BillingRunType,
    ) -> Result<BillingRun, BillingError> {
        self.batch.run(today, run_type).await
    }

    pub async fn pause_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<BillingSchedule, BillingError> {
        self.lifecycle.pause(schedule_id).await
    }

    pub async fn resume_schedule(
        &self,
        schedule_id: Uuid,
        today: NaiveDate,
    ) -> Result<BillingSchedule, BillingError> {
        self.lifecycle.resume(schedule_id, today).await
    }

    pub async fn cancel_schedule(
        &self,
        schedule_id: Uuid,
    ) -> Result<BillingSchedule, BillingError> {
        self.lifecycle.cancel(schedule_id).await
    }

    pub async fn delete_schedule(&self, schedule_id: Uuid) -> Result<(), BillingError> {
        self.lifecycle.delete(schedule_id).await
    }

    /// Hand every reminder that fires on `today` to the notification sink.
    pub async fn dispatch_due_reminders(&self, today: NaiveDate) -> Result<usize, BillingError> {
        self.reminders.dispatch_due_reminders(today).await
    }

    /// Overdue surcharge for an invoice as of `as_of`, using the owning
    /// schedule's late-fee and daily-interest policy. Invoices without a
    /// schedule back-reference carry no policy and accrue nothing.
    pub async fn invoice_surcharge(
        &self,
        invoice_id: Uuid,
        as_of: NaiveDate,
    ) -> Result<Decimal, BillingError> {
        let invoice = self
            .invoices
            .get(invoice_id)
            .await
            .map_err(BillingError::Persistence)?
            .ok_or_else(|| BillingError::NotFound(format!("invoice {invoice_id}")))?;

        let Some(schedule_id) = invoice.billing_schedule_id else {
            return Ok(Decimal::ZERO);
        };

        let schedule = self.get_schedule(schedule_id).await?;
        let policy = SurchargePolicy::from(&schedule);

        Ok(overdue_surcharge(
            invoice.amount,
            invoice.due_date,
            as_of,
            &policy,
        ))
    }
}
