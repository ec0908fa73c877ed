//! Billing run report model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Billing run type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingRunType {
    Scheduled,
    Manual,
}

impl BillingRunType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingRunType::Scheduled => "scheduled",
            BillingRunType::Manual => "manual",
        }
    }

    pub fn from_string(s: &str) -> Self {
        match s {
            "manual" => BillingRunType::Manual,
            _ => BillingRunType::Scheduled,
        }
    }
}

/// Billing run status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BillingRunStatus {
    Completed,
    Failed,
}

impl BillingRunStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BillingRunStatus::Completed => "completed",
            BillingRunStatus::Failed => "failed",
        }
    }
}

/// Outcome for one schedule within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunResultStatus {
    Succeeded,
    Failed,
}

impl RunResultStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunResultStatus::Succeeded => "succeeded",
            RunResultStatus::Failed => "failed",
        }
    }
}

/// Per-schedule result of a billing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRunResult {
    pub schedule_id: Uuid,
    pub status: RunResultStatus,
    pub invoice_id: Option<Uuid>,
    pub error: Option<String>,
}

/// Report of one batch or manual billing run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillingRun {
    pub run_id: Uuid,
    pub run_type: BillingRunType,
    pub status: BillingRunStatus,
    pub started_utc: DateTime<Utc>,
    pub completed_utc: Option<DateTime<Utc>>,
    pub schedules_processed: u32,
    pub schedules_succeeded: u32,
    pub schedules_failed: u32,
    pub results: Vec<BillingRunResult>,
}
