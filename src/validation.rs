use chrono::NaiveTime;

use crate::error::ApiError;
use crate::models::{CalendarSyncRequest, PlanningRequest};

pub fn validate_plan_days(value: u8) -> Result<u8, ApiError> {
    if (1..=14).contains(&value) {
        Ok(value)
    } else {
        Err(ApiError::BadRequest("plan_days must be between 1 and 14".into()))
    }
}

fn parse_slot_time(value: &str, field: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| ApiError::BadRequest(format!("timeSlot.{field} must be HH:MM")))
}

pub fn validate_planning_request(request: &PlanningRequest) -> Result<(), ApiError> {
    if request.goal.trim().is_empty() {
        return Err(ApiError::BadRequest("goal must not be empty".into()));
    }

    let hours: f32 = request
        .hours_per_day
        .trim()
        .parse()
        .map_err(|_| ApiError::BadRequest("hoursPerDay must be a number".into()))?;
    if !(hours > 0.0 && hours <= 24.0) {
        return Err(ApiError::BadRequest(
            "hoursPerDay must be between 0 and 24".into(),
        ));
    }

    let start = parse_slot_time(&request.time_slot.start, "start")?;
    let end = parse_slot_time(&request.time_slot.end, "end")?;
    if start >= end {
        return Err(ApiError::BadRequest(
            "timeSlot.start must be before timeSlot.end".into(),
        ));
    }
    Ok(())
}

pub fn validate_sync_request(request: &CalendarSyncRequest) -> Result<(), ApiError> {
    if request.access_token.trim().is_empty() {
        return Err(ApiError::BadRequest("accessToken must not be empty".into()));
    }
    if request.plan.iter().all(|line| line.trim().is_empty()) {
        return Err(ApiError::BadRequest("plan must not be empty".into()));
    }
    Ok(())
}
