//! Test helper module for billing-engine integration tests.
//!
//! Provides in-memory store implementations standing in for the product's
//! persistence and delivery collaborators, plus fixture builders.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use billing_engine::config::EngineConfig;
use billing_engine::engine::BillingEngine;
use billing_engine::models::{
    BillingSchedule, CreateBillingSchedule, Customer, Frequency, Invoice, ListInvoicesFilter,
    ListSchedulesFilter, NotificationDays, PaymentMethod, Plan, ScheduleStatus,
};
use billing_engine::store::{CustomerLookup, InvoiceStore, NotificationSink, ScheduleStore};

pub const TEST_CUSTOMER_ID: Uuid = Uuid::from_u128(0x11111111_1111_1111_1111_111111111111);
pub const TEST_PLAN_ID: Uuid = Uuid::from_u128(0x22222222_2222_2222_2222_222222222222);

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).expect("valid date")
}

pub fn dec(s: &str) -> Decimal {
    s.parse().expect("valid decimal")
}

/// In-memory schedule store with a switchable update failure.
#[derive(Default)]
pub struct MemoryScheduleStore {
    rows: RwLock<HashMap<Uuid, BillingSchedule>>,
    fail_updates: AtomicBool,
}

impl MemoryScheduleStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_updates(&self, fail: bool) {
        self.fail_updates.store(fail, Ordering::SeqCst);
    }

    pub fn snapshot(&self, schedule_id: Uuid) -> Option<BillingSchedule> {
        self.rows.read().unwrap().get(&schedule_id).cloned()
    }

    pub fn count(&self) -> usize {
        self.rows.read().unwrap().len()
    }
}

#[async_trait]
impl ScheduleStore for MemoryScheduleStore {
    async fn list(&self, filter: &ListSchedulesFilter) -> Result<Vec<BillingSchedule>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .filter(|s| filter.customer_id.is_none_or(|id| s.customer_id == id))
            .filter(|s| filter.status.is_none_or(|status| s.status == status))
            .filter(|s| filter.frequency.is_none_or(|f| s.frequency == f))
            .cloned()
            .collect())
    }

    async fn list_due(&self, today: NaiveDate) -> Result<Vec<BillingSchedule>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .filter(|s| {
                s.status == ScheduleStatus::Active
                    && s.auto_generate_invoice
                    && s.next_billing_date <= today
            })
            .cloned()
            .collect())
    }

    async fn get(&self, schedule_id: Uuid) -> Result<Option<BillingSchedule>> {
        Ok(self.rows.read().unwrap().get(&schedule_id).cloned())
    }

    async fn create(&self, schedule: &BillingSchedule) -> Result<()> {
        self.rows
            .write()
            .unwrap()
            .insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }

    async fn update(&self, schedule: &BillingSchedule) -> Result<()> {
        if self.fail_updates.load(Ordering::SeqCst) {
            return Err(anyhow!("injected schedule update failure"));
        }
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&schedule.schedule_id) {
            return Err(anyhow!("schedule {} not found", schedule.schedule_id));
        }
        rows.insert(schedule.schedule_id, schedule.clone());
        Ok(())
    }

    async fn delete(&self, schedule_id: Uuid) -> Result<()> {
        self.rows.write().unwrap().remove(&schedule_id);
        Ok(())
    }
}

/// In-memory invoice store with switchable create failure and delay.
#[derive(Default)]
pub struct MemoryInvoiceStore {
    rows: RwLock<HashMap<Uuid, Invoice>>,
    fail_creates: AtomicBool,
    create_delay: RwLock<Option<Duration>>,
}

impl MemoryInvoiceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail_creates(&self, fail: bool) {
        self.fail_creates.store(fail, Ordering::SeqCst);
    }

    pub fn set_create_delay(&self, delay: Duration) {
        *self.create_delay.write().unwrap() = Some(delay);
    }

    pub fn count(&self) -> usize {
        self.rows.read().unwrap().len()
    }

    pub fn snapshot(&self, invoice_id: Uuid) -> Option<Invoice> {
        self.rows.read().unwrap().get(&invoice_id).cloned()
    }

    pub fn insert(&self, invoice: Invoice) {
        self.rows
            .write()
            .unwrap()
            .insert(invoice.invoice_id, invoice);
    }
}

#[async_trait]
impl InvoiceStore for MemoryInvoiceStore {
    async fn create(&self, invoice: &Invoice) -> Result<()> {
        let delay = *self.create_delay.read().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        if self.fail_creates.load(Ordering::SeqCst) {
            return Err(anyhow!("injected invoice create failure"));
        }
        self.rows
            .write()
            .unwrap()
            .insert(invoice.invoice_id, invoice.clone());
        Ok(())
    }

    async fn update(&self, invoice: &Invoice) -> Result<()> {
        let mut rows = self.rows.write().unwrap();
        if !rows.contains_key(&invoice.invoice_id) {
            return Err(anyhow!("invoice {} not found", invoice.invoice_id));
        }
        rows.insert(invoice.invoice_id, invoice.clone());
        Ok(())
    }

    async fn get(&self, invoice_id: Uuid) -> Result<Option<Invoice>> {
        Ok(self.rows.read().unwrap().get(&invoice_id).cloned())
    }

    async fn list(&self, filter: &ListInvoicesFilter) -> Result<Vec<Invoice>> {
        let rows = self.rows.read().unwrap();
        Ok(rows
            .values()
            .filter(|i| filter.customer_id.is_none_or(|id| i.customer_id == id))
            .filter(|i| {
                filter
                    .billing_schedule_id
                    .is_none_or(|id| i.billing_schedule_id == Some(id))
            })
            .filter(|i| filter.status.is_none_or(|status| i.status == status))
            .filter(|i| filter.due_date.is_none_or(|due| i.due_date == due))
            .cloned()
            .collect())
    }
}

/// Fixed customer/plan directory.
#[derive(Default)]
pub struct StaticCustomerLookup {
    customers: RwLock<HashMap<Uuid, Customer>>,
    plans: RwLock<HashMap<Uuid, Plan>>,
}

impl StaticCustomerLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_customer(&self, customer: Customer) {
        self.customers
            .write()
            .unwrap()
            .insert(customer.customer_id, customer);
    }

    pub fn remove_customer(&self, customer_id: Uuid) {
        self.customers.write().unwrap().remove(&customer_id);
    }

    pub fn insert_plan(&self, plan: Plan) {
        self.plans.write().unwrap().insert(plan.plan_id, plan);
    }
}

#[async_trait]
impl CustomerLookup for StaticCustomerLookup {
    async fn get(&self, customer_id: Uuid) -> Result<Option<Customer>> {
        Ok(self.customers.read().unwrap().get(&customer_id).cloned())
    }

    async fn get_plan(&self, plan_id: Uuid) -> Result<Option<Plan>> {
        Ok(self.plans.read().unwrap().get(&plan_id).cloned())
    }
}

/// Sink recording every reminder it accepts.
#[derive(Default)]
pub struct RecordingSink {
    delivered: RwLock<Vec<DeliveredReminder>>,
    fail: AtomicBool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveredReminder {
    pub customer_id: Uuid,
    pub invoice_id: Option<Uuid>,
    pub days_before: u32,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn delivered(&self) -> Vec<DeliveredReminder> {
        self.delivered.read().unwrap().clone()
    }
}

#[async_trait]
impl NotificationSink for RecordingSink {
    async fn notify(
        &self,
        customer: &Customer,
        invoice: Option<&Invoice>,
        days_before: u32,
    ) -> Result<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("injected sink failure"));
        }
        self.delivered.write().unwrap().push(DeliveredReminder {
            customer_id: customer.customer_id,
            invoice_id: invoice.map(|i| i.invoice_id),
            days_before,
        });
        Ok(())
    }
}

/// Engine wired to in-memory collaborators.
pub struct TestHarness {
    pub engine: BillingEngine,
    pub schedules: Arc<MemoryScheduleStore>,
    pub invoices: Arc<MemoryInvoiceStore>,
    pub customers: Arc<StaticCustomerLookup>,
    pub sink: Arc<RecordingSink>,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        init_test_tracing();
        billing_engine::services::init_metrics();

        let schedules = Arc::new(MemoryScheduleStore::new());
        let invoices = Arc::new(MemoryInvoiceStore::new());
        let customers = Arc::new(StaticCustomerLookup::new());
        let sink = Arc::new(RecordingSink::new());

        customers.insert_customer(Customer {
            customer_id: TEST_CUSTOMER_ID,
            name: "Ana Souza".to_string(),
            email: Some("ana@example.com".to_string()),
            default_payment_method: PaymentMethod::Pix,
        });
        customers.insert_plan(Plan {
            plan_id: TEST_PLAN_ID,
            name: "Streaming Plus".to_string(),
            base_price: dec("49.90"),
            currency: "BRL".to_string(),
        });

        let engine = BillingEngine::new(
            Arc::clone(&schedules) as Arc<dyn ScheduleStore>,
            Arc::clone(&invoices) as Arc<dyn InvoiceStore>,
            Arc::clone(&customers) as Arc<dyn CustomerLookup>,
            Arc::clone(&sink) as Arc<dyn NotificationSink>,
            config,
        );

        Self {
            engine,
            schedules,
            invoices,
            customers,
            sink,
        }
    }
}

/// Baseline schedule input: monthly, due on the 10th, starting 2024-01-05.
pub fn schedule_input() -> CreateBillingSchedule {
    CreateBillingSchedule {
        customer_id: TEST_CUSTOMER_ID,
        plan_id: None,
        title: "Streaming subscription".to_string(),
        description: String::new(),
        amount: dec("150.00"),
        frequency: Frequency::Monthly,
        custom_days: None,
        due_day: 10,
        start_date: date(2024, 1, 5),
        end_date: None,
        notification_days: NotificationDays::new([3, 0]),
        auto_generate_invoice: true,
        payment_method: PaymentMethod::Boleto,
        payment_gateway_id: None,
        auto_charge: false,
        installments: None,
        apply_late_fee: false,
        late_fee_percentage: Decimal::ZERO,
        apply_daily_interest: false,
        daily_interest_percentage: Decimal::ZERO,
        notes: String::new(),
        metadata: None,
    }
}

fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
