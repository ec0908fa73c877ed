//! Schedule creation and boundary validation tests.

mod common;

use billing_engine::error::BillingError;
use billing_engine::models::{Frequency, ScheduleStatus};
use common::{date, dec, schedule_input, TestHarness, TEST_PLAN_ID};
use rust_decimal::Decimal;
use uuid::Uuid;

#[tokio::test]
async fn create_computes_initial_state_once() {
    let harness = TestHarness::new();
    let schedule = harness
        .engine
        .create_schedule(schedule_input())
        .await
        .expect("create schedule");

    assert_eq!(schedule.status, ScheduleStatus::Active);
    assert_eq!(schedule.next_billing_date, date(2024, 1, 10));
    assert_eq!(schedule.installments_generated, 0);
    assert_eq!(schedule.last_generated_invoice_id, None);
    assert_eq!(schedule.last_execution_date, None);

    let stored = harness
        .schedules
        .snapshot(schedule.schedule_id)
        .expect("persisted");
    assert_eq!(stored, schedule);
}

#[tokio::test]
async fn create_custom_frequency_bills_from_start_date() {
    let harness = TestHarness::new();
    let mut input = schedule_input();
    input.frequency = Frequency::Custom;
    input.custom_days = Some(45);

    let schedule = harness
        .engine
        .create_schedule(input)
        .await
        .expect("create schedule");
    assert_eq!(schedule.next_billing_date, date(2024, 1, 5));
}

#[tokio::test]
async fn create_accepts_known_plan_reference() {
    let harness = TestHarness::new();
    let mut input = schedule_input();
    input.plan_id = Some(TEST_PLAN_ID);

    harness
        .engine
        .create_schedule(input)
        .await
        .expect("create schedule with plan");
}

#[tokio::test]
async fn invalid_inputs_are_rejected_before_persistence() {
    let harness = TestHarness::new();

    let cases: Vec<(&str, Box<dyn Fn(&mut billing_engine::models::CreateBillingSchedule)>)> = vec![
        ("due_day zero", Box::new(|i| i.due_day = 0)),
        ("due_day over 31", Box::new(|i| i.due_day = 32)),
        ("zero amount", Box::new(|i| i.amount = Decimal::ZERO)),
        ("negative amount", Box::new(|i| i.amount = dec("-10"))),
        ("empty title", Box::new(|i| i.title = String::new())),
        (
            "custom frequency without custom_days",
            Box::new(|i| i.frequency = Frequency::Custom),
        ),
        (
            "custom_days outside custom frequency",
            Box::new(|i| i.custom_days = Some(15)),
        ),
        (
            "custom_days zero",
            Box::new(|i| {
                i.frequency = Frequency::Custom;
                i.custom_days = Some(0);
            }),
        ),
        ("zero installments", Box::new(|i| i.installments = Some(0))),
        (
            "late fee percentage over 20",
            Box::new(|i| {
                i.apply_late_fee = true;
                i.late_fee_percentage = dec("25");
            }),
        ),
        (
            "late fee percentage zero",
            Box::new(|i| {
                i.apply_late_fee = true;
                i.late_fee_percentage = Decimal::ZERO;
            }),
        ),
        (
            "daily interest percentage over 1",
            Box::new(|i| {
                i.apply_daily_interest = true;
                i.daily_interest_percentage = dec("1.5");
            }),
        ),
        (
            "end date before start date",
            Box::new(|i| i.end_date = Some(date(2023, 12, 1))),
        ),
    ];

    for (name, mutate) in cases {
        let mut input = schedule_input();
        mutate(&mut input);
        let err = harness
            .engine
            .create_schedule(input)
            .await
            .expect_err(name);
        assert!(matches!(err, BillingError::Validation(_)), "{name}: {err}");
    }

    // Validation failures never reach the store.
    assert_eq!(harness.schedules.count(), 0);
}

#[tokio::test]
async fn percentages_are_ignored_when_flags_are_off() {
    let harness = TestHarness::new();
    let mut input = schedule_input();
    input.apply_late_fee = false;
    input.late_fee_percentage = dec("99");

    harness
        .engine
        .create_schedule(input)
        .await
        .expect("inactive percentage is not validated");
}

#[tokio::test]
async fn unknown_customer_is_rejected() {
    let harness = TestHarness::new();
    let mut input = schedule_input();
    input.customer_id = Uuid::new_v4();

    let err = harness
        .engine
        .create_schedule(input)
        .await
        .expect_err("unknown customer");
    assert!(matches!(err, BillingError::NotFound(_)));
    assert_eq!(harness.schedules.count(), 0);
}

#[tokio::test]
async fn unknown_plan_is_rejected() {
    let harness = TestHarness::new();
    let mut input = schedule_input();
    input.plan_id = Some(Uuid::new_v4());

    let err = harness
        .engine
        .create_schedule(input)
        .await
        .expect_err("unknown plan");
    assert!(matches!(err, BillingError::NotFound(_)));
}
