use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::events::{EventDescriptor, Reminder, ReminderMethod};
use crate::models::{
    CalendarSyncRequest, PlanDay, PlanResponse, PlanningRequest, SyncReport, TimeSlot,
};
use crate::plan::{DayRecord, TimeInterval};

pub struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::root,
        crate::handlers::healthz_live,
        crate::handlers::healthz_ready,
        crate::handlers::generate_plan,
        crate::handlers::generate_plan_pdf,
        crate::handlers::generate_plan_ical,
        crate::handlers::sync_calendar
    ),
    components(schemas(
        PlanningRequest,
        TimeSlot,
        PlanResponse,
        PlanDay,
        DayRecord,
        TimeInterval,
        CalendarSyncRequest,
        SyncReport,
        EventDescriptor,
        Reminder,
        ReminderMethod
    )),
    tags(
        (name = "plan", description = "Study plan generation"),
        (name = "calendar", description = "Calendar synchronisation")
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;
