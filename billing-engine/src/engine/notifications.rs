//! Reminder trigger planning.

use chrono::{Duration, NaiveDate};

use crate::models::NotificationDays;

/// One planned reminder: fire on `trigger_date`, `days_before` days ahead of
/// the due date (0 = the due date itself).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NotificationTrigger {
    pub trigger_date: NaiveDate,
    pub days_before: u32,
}

/// Trigger dates for a cycle, ordered by `days_before` descending so the
/// earliest trigger comes first.
pub fn notification_triggers(
    next_billing_date: NaiveDate,
    days: &NotificationDays,
) -> Vec<NotificationTrigger> {
    days.iter_desc()
        .map(|days_before| NotificationTrigger {
            trigger_date: next_billing_date - Duration::days(i64::from(days_before)),
            days_before,
        })
        .collect()
}
