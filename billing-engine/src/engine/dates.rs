//! Calendar arithmetic for billing cycles.
//!
//! Every caller that needs a cycle date goes through these functions; the
//! month/day rules live nowhere else. Pure `NaiveDate` arithmetic, no clocks.

use chrono::{Datelike, Duration, Months, NaiveDate};

use crate::models::Frequency;

/// Next due date after `from` for the given cadence.
///
/// Calendar frequencies add whole months and then clamp the target day to
/// the resulting month (`due_day = 31` lands on Feb 28/29). Custom
/// frequencies add a fixed day interval; `due_day` is ignored for them.
pub fn next_billing_date(
    from: NaiveDate,
    due_day: u32,
    frequency: Frequency,
    custom_days: Option<u32>,
) -> NaiveDate {
    match frequency.months() {
        Some(months) => clamp_to_due_day(from + Months::new(months), due_day),
        // custom_days presence is enforced by schedule validation
        None => from + Duration::days(i64::from(custom_days.unwrap_or(1).max(1))),
    }
}

/// First due date for a newly created schedule.
///
/// Calendar frequencies bill on the first occurrence of `due_day` on or
/// after `start`; custom frequencies bill on the start date itself.
pub fn initial_billing_date(
    start: NaiveDate,
    due_day: u32,
    frequency: Frequency,
    custom_days: Option<u32>,
) -> NaiveDate {
    match frequency.months() {
        Some(_) => {
            let candidate = clamp_to_due_day(start, due_day);
            if candidate >= start {
                candidate
            } else {
                next_billing_date(start, due_day, frequency, custom_days)
            }
        }
        None => start,
    }
}

fn clamp_to_due_day(date: NaiveDate, due_day: u32) -> NaiveDate {
    let day = due_day.min(days_in_month(date.year(), date.month()));
    date.with_day(day).unwrap_or(date)
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year + 1, 1)
    } else {
        (year, month + 1)
    };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|first| first.pred_opt())
        .map(|last| last.day())
        .unwrap_or(28)
}
