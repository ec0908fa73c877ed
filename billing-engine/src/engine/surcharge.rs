//! Late fee and daily interest calculation.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::BillingSchedule;

/// Surcharge rules for an overdue invoice, taken from its schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SurchargePolicy {
    pub apply_late_fee: bool,
    pub late_fee_percentage: Decimal,
    pub apply_daily_interest: bool,
    pub daily_interest_percentage: Decimal,
}

impl From<&BillingSchedule> for SurchargePolicy {
    fn from(schedule: &BillingSchedule) -> Self {
        Self {
            apply_late_fee: schedule.apply_late_fee,
            late_fee_percentage: schedule.late_fee_percentage,
            apply_daily_interest: schedule.apply_daily_interest,
            daily_interest_percentage: schedule.daily_interest_percentage,
        }
    }
}

/// Whole days an invoice is late as of `as_of`; never negative.
pub fn days_late(due_date: NaiveDate, as_of: NaiveDate) -> i64 {
    (as_of - due_date).num_days().max(0)
}

/// Overdue surcharge for an invoice amount as of a given date.
///
/// The late fee is flat: charged once in full as soon as the invoice is a
/// single day late, never scaled by lateness. Daily interest is simple,
/// non-compounding. Exact decimal out; rounding is the caller's concern.
pub fn overdue_surcharge(
    amount: Decimal,
    due_date: NaiveDate,
    as_of: NaiveDate,
    policy: &SurchargePolicy,
) -> Decimal {
    let late = days_late(due_date, as_of);
    if late == 0 {
        return Decimal::ZERO;
    }

    let mut surcharge = Decimal::ZERO;

    if policy.apply_late_fee {
        surcharge += amount * policy.late_fee_percentage / Decimal::ONE_HUNDRED;
    }

    if policy.apply_daily_interest {
        surcharge +=
            amount * policy.daily_interest_percentage / Decimal::ONE_HUNDRED * Decimal::from(late);
    }

    surcharge
}
