use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::plan::{DayRecord, TimeInterval};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
pub struct TimeSlot {
    #[schema(example = "18:00")]
    pub start: String,
    #[schema(example = "21:00")]
    pub end: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PlanningRequest {
    #[schema(example = "Pass the linear algebra exam")]
    pub goal: String,
    #[schema(example = "2")]
    pub hours_per_day: String,
    pub time_slot: TimeSlot,
    /// First day of the plan; defaults to today (UTC).
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date", example = "2025-04-14")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct PlanDay {
    pub day_number: u32,
    /// `None` when the day number cannot be mapped onto a date.
    #[schema(value_type = Option<String>, format = "date", example = "2025-04-14")]
    pub date: Option<NaiveDate>,
    pub label: String,
    pub topics: String,
    pub time_intervals: Vec<TimeInterval>,
}

impl PlanDay {
    pub fn from_record(record: DayRecord, reference_date: NaiveDate) -> Self {
        Self {
            date: record.date(reference_date).ok(),
            day_number: record.day_number,
            label: record.label,
            topics: record.topics,
            time_intervals: record.time_intervals,
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
pub struct PlanResponse {
    /// Raw plan lines as produced by the model.
    pub plan: Vec<String>,
    pub days: Vec<PlanDay>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CalendarSyncRequest {
    /// Plan lines as returned by `/generate-plan`.
    pub plan: Vec<String>,
    /// OAuth access token with calendar write scope.
    pub access_token: String,
    #[serde(default)]
    #[schema(value_type = Option<String>, format = "date", example = "2025-04-14")]
    pub start_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncReport {
    pub user_id: String,
    pub created: usize,
    pub failed: usize,
    pub skipped_days: usize,
    pub event_ids: Vec<String>,
}
