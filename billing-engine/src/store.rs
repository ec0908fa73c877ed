//! Collaborator seams consumed by the engine.
//!
//! The engine never implements persistence or delivery; the surrounding
//! product supplies these traits. Errors at this boundary surface inside the
//! engine as [`crate::error::BillingError::Persistence`] and are retryable.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::models::{
    BillingSchedule, Customer, Invoice, ListInvoicesFilter, ListSchedulesFilter, Plan,
};

/// CRUD persistence for billing schedules.
#[async_trait]
pub trait ScheduleStore: Send + Sync {
    async fn list(&self, filter: &ListSchedulesFilter) -> Result<Vec<BillingSchedule>>;

    /// Schedules eligible for automatic generation on `today`: active,
    /// auto-generate enabled, and `next_billing_date <= today`.
    async fn list_due(&self, today: NaiveDate) -> Result<Vec<BillingSchedule>>;

    async fn get(&self, schedule_id: Uuid) -> Result<Option<BillingSchedule>>;

    async fn create(&self, schedule: &BillingSchedule) -> Result<()>;

    async fn update(&self, schedule: &BillingSchedule) -> Result<()>;

    async fn delete(&self, schedule_id: Uuid) -> Result<()>;
}

/// Persistence for generated invoices.
#[async_trait]
pub trait InvoiceStore: Send + Sync {
    async fn create(&self, invoice: &Invoice) -> Result<()>;

    async fn update(&self, invoice: &Invoice) -> Result<()>;

    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>>;

    async fn list(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>>;
}

/// Read-only customer and plan resolution.
#[async_trait]
pub trait CustomerLookup: Send + Sync {
    async fn get(&self, customer_id: Uuid) -> Result<Option<Customer>>;

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>>;
}

/// Delivery collaborator for billing reminders. The engine decides *when*,
/// the sink decides *how*.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    async fn notify(
        &self,
        customer: &Customer,
        invoice: Option<&Invoice>,
        days_before: u32,
    ) -> Result<()>;
}
