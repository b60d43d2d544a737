pub mod auth;
pub mod calendar;
pub mod error;
pub mod events;
pub mod handlers;
pub mod ical;
pub mod llm;
pub mod models;
pub mod openapi;
pub mod pdf;
pub mod plan;
pub mod prompt;
pub mod settings;
pub mod validation;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::http::HeaderValue;
use axum::{
    Router,
    routing::{get, post},
};
use chrono_tz::Tz;
use handlers::{
    generate_plan, generate_plan_ical, generate_plan_pdf, healthz_live, healthz_ready, root,
    sync_calendar,
};
use tower_http::LatencyUnit;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::{Level, info, warn};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::{IdentityVerifier, TokenInfoVerifier};
use crate::calendar::{CalendarService, GoogleCalendarClient};
use crate::events::EventMaterializer;
use crate::ical::ICalExporter;
use crate::llm::{GeminiClient, PlanGenerator};
use crate::openapi::ApiDoc;
use crate::pdf::PdfRenderer;
use crate::settings::Settings;
use crate::validation::validate_plan_days;

/// Process-wide collaborators, built once in [`run`] and shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub settings: Settings,
    pub generator: Arc<dyn PlanGenerator>,
    pub verifier: Arc<dyn IdentityVerifier>,
    pub calendar: Arc<dyn CalendarService>,
    pub materializer: EventMaterializer,
    pub renderer: Arc<PdfRenderer>,
    pub exporter: Arc<ICalExporter>,
}

impl AppState {
    pub fn from_settings(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        validate_plan_days(settings.plan_days)
            .map_err(|_| "APP_PLAN_DAYS must be between 1 and 14")?;
        let tz: Tz = settings
            .calendar_time_zone
            .parse()
            .map_err(|e| format!("invalid calendar_time_zone: {e}"))?;

        Ok(Self {
            generator: Arc::new(GeminiClient::new(
                settings.gemini_base_url.clone(),
                settings.gemini_model.clone(),
                settings.gemini_api_key.clone(),
            )),
            verifier: Arc::new(TokenInfoVerifier::new(
                settings.identity_verify_url.clone(),
                settings.identity_audience.clone(),
            )),
            calendar: Arc::new(GoogleCalendarClient::new(
                settings.calendar_base_url.clone(),
                settings.calendar_id.clone(),
            )),
            materializer: EventMaterializer::new(tz),
            renderer: Arc::new(PdfRenderer::new()),
            exporter: Arc::new(ICalExporter::new()),
            settings,
        })
    }
}

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_env()?;

    let env_filter = if settings.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .without_time()
        .init();

    if settings.gemini_api_key.is_empty() {
        warn!("APP_GEMINI_API_KEY is not set; plan generation will fail");
    }

    let state = AppState::from_settings(settings)?;
    let app = build_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], state.settings.port));
    info!("Starting Study Planner API on {addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn cors_layer(settings: &Settings) -> CorsLayer {
    let origins: Vec<HeaderValue> = settings
        .cors_origins()
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(err) => {
                warn!(origin = %origin, error = %err, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods(Any)
        .allow_headers(Any)
}

pub fn build_router(state: AppState) -> Router {
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_response(
            DefaultOnResponse::new()
                .level(Level::INFO)
                .latency_unit(LatencyUnit::Millis),
        );
    let cors = cors_layer(&state.settings);

    let mut router = Router::new()
        .route("/", get(root))
        .route("/healthz/live", get(healthz_live))
        .route("/healthz/ready", get(healthz_ready))
        .route("/generate-plan", post(generate_plan))
        .route("/generate-plan-pdf", post(generate_plan_pdf))
        .route("/generate-plan-ical", post(generate_plan_ical))
        .route("/calendar/sync", post(sync_calendar))
        .with_state(state.clone());

    if state.settings.enable_swagger {
        let openapi = ApiDoc::openapi();
        let swagger = SwaggerUi::new("/docs").url("/openapi.json", openapi);
        router = router.merge(swagger);
    }

    router.layer(cors).layer(trace_layer)
}
