use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use axum_extra::extract::TypedHeader;
use axum_extra::headers::{Authorization, authorization::Bearer};
use chrono::{NaiveDate, Utc};
use http::header;

use crate::{
    AppState,
    auth::authenticate,
    calendar::push_events,
    error::ApiError,
    models::{CalendarSyncRequest, PlanDay, PlanResponse, PlanningRequest, SyncReport},
    plan::{DayRecord, parse_plan, plan_lines},
    prompt::build_prompt,
    validation::{validate_planning_request, validate_sync_request},
};

fn reference_date(start_date: Option<NaiveDate>) -> NaiveDate {
    start_date.unwrap_or_else(|| Utc::now().date_naive())
}

struct GeneratedPlan {
    lines: Vec<String>,
    days: Vec<DayRecord>,
}

async fn generate(state: &AppState, request: &PlanningRequest) -> Result<GeneratedPlan, ApiError> {
    validate_planning_request(request)?;
    let prompt = build_prompt(request, state.settings.plan_days);
    let text = state.generator.generate(&prompt).await?;
    let days = parse_plan(&text)?;
    tracing::info!(days = days.len(), "generated study plan");
    Ok(GeneratedPlan {
        lines: plan_lines(&text),
        days,
    })
}

#[utoipa::path(get, path = "/", tag = "plan")]
pub async fn root() -> impl IntoResponse {
    Json(serde_json::json!({
        "message": "Study Planner API",
        "endpoints": {
            "/generate-plan": "Generate a study plan as JSON",
            "/generate-plan-pdf": "Download a study plan as PDF",
            "/generate-plan-ical": "Download study sessions as iCal file",
            "/calendar/sync": "Insert study sessions into your calendar"
        }
    }))
}

#[utoipa::path(get, path = "/healthz/live", tag = "plan")]
pub async fn healthz_live() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(get, path = "/healthz/ready", tag = "plan")]
pub async fn healthz_ready() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

#[utoipa::path(
    post,
    path = "/generate-plan",
    request_body = PlanningRequest,
    responses(
        (status = 200, description = "Generated plan", body = PlanResponse),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Model output contained no usable days"),
        (status = 502, description = "LLM service failure")
    ),
    tag = "plan"
)]
pub async fn generate_plan(
    State(state): State<AppState>,
    Json(request): Json<PlanningRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let generated = generate(&state, &request).await?;
    let reference = reference_date(request.start_date);
    let days = generated
        .days
        .into_iter()
        .map(|record| PlanDay::from_record(record, reference))
        .collect();

    Ok(Json(PlanResponse {
        plan: generated.lines,
        days,
    }))
}

#[utoipa::path(
    post,
    path = "/generate-plan-pdf",
    request_body = PlanningRequest,
    responses(
        (status = 200, description = "PDF document", content_type = "application/pdf"),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Model output contained no usable days"),
        (status = 502, description = "LLM service failure")
    ),
    tag = "plan"
)]
pub async fn generate_plan_pdf(
    State(state): State<AppState>,
    Json(request): Json<PlanningRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let generated = generate(&state, &request).await?;
    let body = state.renderer.render(
        &request,
        &generated.days,
        reference_date(request.start_date),
    )?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "application/pdf"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=study_plan.pdf",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/generate-plan-ical",
    request_body = PlanningRequest,
    responses(
        (status = 200, description = "iCal file", content_type = "text/calendar"),
        (status = 400, description = "Invalid request"),
        (status = 422, description = "Model output contained no schedulable sessions"),
        (status = 502, description = "LLM service failure")
    ),
    tag = "plan"
)]
pub async fn generate_plan_ical(
    State(state): State<AppState>,
    Json(request): Json<PlanningRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let generated = generate(&state, &request).await?;
    let materialized = state
        .materializer
        .materialize(&generated.days, reference_date(request.start_date));
    if materialized.events.is_empty() {
        return Err(ApiError::Unprocessable(
            "plan contains no schedulable study sessions".into(),
        ));
    }

    let body = state.exporter.generate(&materialized.events);
    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, "text/calendar"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=study_plan.ics",
            ),
        ],
        body,
    ))
}

#[utoipa::path(
    post,
    path = "/calendar/sync",
    request_body = CalendarSyncRequest,
    responses(
        (status = 200, description = "Per-event insertion summary", body = SyncReport),
        (status = 400, description = "Invalid request"),
        (status = 401, description = "Invalid identity token"),
        (status = 422, description = "Plan contained no usable days")
    ),
    security(("bearer_auth" = [])),
    tag = "calendar"
)]
pub async fn sync_calendar(
    State(state): State<AppState>,
    auth: Option<TypedHeader<Authorization<Bearer>>>,
    Json(request): Json<CalendarSyncRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let auth_header = auth.map(|TypedHeader(a)| a);
    let identity = authenticate(state.verifier.as_ref(), auth_header).await?;
    validate_sync_request(&request)?;

    let days = parse_plan(&request.plan.join("\n"))?;
    let materialized = state
        .materializer
        .materialize(&days, reference_date(request.start_date));
    let outcome = push_events(
        state.calendar.as_ref(),
        &request.access_token,
        &materialized.events,
    )
    .await;

    Ok(Json(SyncReport {
        user_id: identity.user_id,
        created: outcome.event_ids.len(),
        failed: outcome.failed,
        skipped_days: materialized.skipped_days,
        event_ids: outcome.event_ids,
    }))
}
