//! Billing schedule model.

use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError, ValidationErrors};

use crate::error::BillingError;

/// Billing frequency for schedules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Frequency {
    Monthly,
    Bimonthly,
    Quarterly,
    Semiannual,
    Annual,
    Custom,
}

impl Frequency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Frequency::Monthly => "monthly",
            Frequency::Bimonthly => "bimonthly",
            Frequency::Quarterly => "quarterly",
            Frequency::Semiannual => "semiannual",
            Frequency::Annual => "annual",
            Frequency::Custom => "custom",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "bimonthly" => Frequency::Bimonthly,
            "quarterly" => Frequency::Quarterly,
            "semiannual" => Frequency::Semiannual,
            "annual" => Frequency::Annual,
            "custom" => Frequency::Custom,
            _ => Frequency::Monthly,
        }
    }

    /// Cycle length in calendar months; `None` for day-based custom cycles.
    pub fn months(&self) -> Option<u32> {
        match self {
            Frequency::Monthly => Some(1),
            Frequency::Bimonthly => Some(2),
            Frequency::Quarterly => Some(3),
            Frequency::Semiannual => Some(6),
            Frequency::Annual => Some(12),
            Frequency::Custom => None,
        }
    }
}

/// Schedule status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Active,
    Paused,
    Cancelled,
    Completed,
}

impl ScheduleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleStatus::Active => "active",
            ScheduleStatus::Paused => "paused",
            ScheduleStatus::Cancelled => "cancelled",
            ScheduleStatus::Completed => "completed",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "paused" => ScheduleStatus::Paused,
            "cancelled" => ScheduleStatus::Cancelled,
            "completed" => ScheduleStatus::Completed,
            _ => ScheduleStatus::Active,
        }
    }

    /// Terminal statuses admit no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScheduleStatus::Cancelled | ScheduleStatus::Completed)
    }
}

impl fmt::Display for ScheduleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Payment method carried by schedules and invoices.
///
/// `Default` defers to the customer's stored preference and is resolved to a
/// concrete method before an invoice is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    Default,
    Pix,
    Boleto,
    CreditCard,
    DebitCard,
    Transfer,
    Cash,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Default => "default",
            PaymentMethod::Pix => "pix",
            PaymentMethod::Boleto => "boleto",
            PaymentMethod::CreditCard => "credit_card",
            PaymentMethod::DebitCard => "debit_card",
            PaymentMethod::Transfer => "transfer",
            PaymentMethod::Cash => "cash",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "pix" => PaymentMethod::Pix,
            "boleto" => PaymentMethod::Boleto,
            "credit_card" => PaymentMethod::CreditCard,
            "debit_card" => PaymentMethod::DebitCard,
            "transfer" => PaymentMethod::Transfer,
            "cash" => PaymentMethod::Cash,
            _ => PaymentMethod::Default,
        }
    }
}

/// Reminder offsets in days before the due date.
///
/// Offsets are unique; iteration is largest-first so the earliest reminder
/// comes out first. An offset of 0 fires on the due date itself. The value
/// is immutable: modifying operations return a new set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NotificationDays(BTreeSet<u32>);

impl NotificationDays {
    pub fn new<I>(days: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        Self(days.into_iter().collect())
    }

    pub fn with(&self, day: u32) -> Self {
        let mut days = self.0.clone();
        days.insert(day);
        Self(days)
    }

    pub fn without(&self, day: u32) -> Self {
        let mut days = self.0.clone();
        days.remove(&day);
        Self(days)
    }

    pub fn contains(&self, day: u32) -> bool {
        self.0.contains(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Offsets in descending order (earliest trigger date first).
    pub fn iter_desc(&self) -> impl Iterator<Item = u32> + '_ {
        self.0.iter().rev().copied()
    }
}

impl FromIterator<u32> for NotificationDays {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self::new(iter)
    }
}

/// Recurring-charge configuration for one customer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillingSchedule {
    pub schedule_id: Uuid,
    pub customer_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    pub custom_days: Option<u32>,
    pub due_day: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub next_billing_date: NaiveDate,
    pub notification_days: NotificationDays,
    pub auto_generate_invoice: bool,
    pub payment_method: PaymentMethod,
    pub payment_gateway_id: Option<Uuid>,
    pub auto_charge: bool,
    pub status: ScheduleStatus,
    pub installments: Option<u32>,
    pub installments_generated: u32,
    pub apply_late_fee: bool,
    pub late_fee_percentage: Decimal,
    pub apply_daily_interest: bool,
    pub daily_interest_percentage: Decimal,
    pub last_execution_date: Option<DateTime<Utc>>,
    pub last_generated_invoice_id: Option<Uuid>,
    pub notes: String,
    pub metadata: Option<serde_json::Value>,
    pub created_utc: DateTime<Utc>,
    pub updated_utc: DateTime<Utc>,
}

impl BillingSchedule {
    /// Whether the fixed installment count has been reached.
    pub fn installments_exhausted(&self) -> bool {
        match self.installments {
            Some(installments) => self.installments_generated >= installments,
            None => false,
        }
    }
}

/// Input for creating a billing schedule.
#[derive(Debug, Clone, Validate)]
pub struct CreateBillingSchedule {
    pub customer_id: Uuid,
    pub plan_id: Option<Uuid>,
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    pub description: String,
    pub amount: Decimal,
    pub frequency: Frequency,
    #[validate(range(min = 1))]
    pub custom_days: Option<u32>,
    #[validate(range(min = 1, max = 31))]
    pub due_day: u32,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub notification_days: NotificationDays,
    pub auto_generate_invoice: bool,
    pub payment_method: PaymentMethod,
    pub payment_gateway_id: Option<Uuid>,
    pub auto_charge: bool,
    #[validate(range(min = 1))]
    pub installments: Option<u32>,
    pub apply_late_fee: bool,
    pub late_fee_percentage: Decimal,
    pub apply_daily_interest: bool,
    pub daily_interest_percentage: Decimal,
    pub notes: String,
    pub metadata: Option<serde_json::Value>,
}

impl CreateBillingSchedule {
    /// Full boundary validation: derive-level field checks plus the
    /// cross-field rules the derive cannot express.
    pub fn validate(&self) -> Result<(), BillingError> {
        Validate::validate(self)?;

        let mut errors = ValidationErrors::new();

        if self.amount <= Decimal::ZERO {
            add_error(&mut errors, "amount", "positive", "amount must be positive");
        }

        match self.frequency {
            Frequency::Custom => {
                if self.custom_days.is_none() {
                    add_error(
                        &mut errors,
                        "custom_days",
                        "required",
                        "custom_days is required for custom frequency",
                    );
                }
            }
            _ => {
                if self.custom_days.is_some() {
                    add_error(
                        &mut errors,
                        "custom_days",
                        "not_allowed",
                        "custom_days is only valid for custom frequency",
                    );
                }
            }
        }

        if self.apply_late_fee
            && (self.late_fee_percentage <= Decimal::ZERO
                || self.late_fee_percentage > Decimal::from(20))
        {
            add_error(
                &mut errors,
                "late_fee_percentage",
                "range",
                "late_fee_percentage must be in (0, 20]",
            );
        }

        if self.apply_daily_interest
            && (self.daily_interest_percentage <= Decimal::ZERO
                || self.daily_interest_percentage > Decimal::ONE)
        {
            add_error(
                &mut errors,
                "daily_interest_percentage",
                "range",
                "daily_interest_percentage must be in (0, 1]",
            );
        }

        if let Some(end_date) = self.end_date {
            if end_date < self.start_date {
                add_error(
                    &mut errors,
                    "end_date",
                    "before_start",
                    "end_date must not precede start_date",
                );
            }
        }

        if errors.errors().is_empty() {
            Ok(())
        } else {
            Err(errors.into())
        }
    }
}

fn add_error(errors: &mut ValidationErrors, field: &'static str, code: &'static str, message: &str) {
    let mut error = ValidationError::new(code);
    error.message = Some(message.to_string().into());
    errors.add(field, error);
}

/// Filter parameters for listing schedules.
#[derive(Debug, Clone, Default)]
pub struct ListSchedulesFilter {
    pub customer_id: Option<Uuid>,
    pub status: Option<ScheduleStatus>,
    pub frequency: Option<Frequency>,
}
