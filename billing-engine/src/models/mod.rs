//! Domain models for billing-engine.

mod customer;
mod invoice;
mod run;
mod schedule;

pub use customer::{Customer, Plan};
pub use invoice::{Invoice, InvoiceStatus, ListInvoicesFilter};
pub use run::{BillingRun, BillingRunResult, BillingRunStatus, BillingRunType, RunResultStatus};
pub use schedule::{
    BillingSchedule, CreateBillingSchedule, Frequency, ListSchedulesFilter, NotificationDays,
    PaymentMethod, ScheduleStatus,
};
