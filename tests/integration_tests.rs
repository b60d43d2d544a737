use axum::{
    body::Body,
    http::{Request, StatusCode, header},
};
use httpmock::prelude::*;
use serde_json::{Value, json};
use study_planner::settings::Settings;
use study_planner::{AppState, build_router};
use tower::Service;
use url::Url;

const PLAN_TEXT: &str = "\
Here is your plan:
```
Day 1: Monday
Topics: Vectors and matrices
Time Allotted: 18:00-19:00;20:00-21:00
Day 2: Tuesday
Topics: Determinants
Time Allotted: 18:00-20:00
Day 3: Wednesday
Time Allotted: 18:00-20:00
```
";

/// Helper function to create test app state with every upstream pointed at the mock server
fn create_test_state(mock_server_url: &str) -> AppState {
    let base = Url::parse(mock_server_url).unwrap();
    let settings = Settings {
        debug: true,
        enable_swagger: true,
        port: 8080,
        gemini_api_key: "test-key".to_string(),
        gemini_base_url: base.clone(),
        gemini_model: "gemini-1.5-flash".to_string(),
        identity_verify_url: base.join("/tokeninfo").unwrap(),
        identity_audience: Some("client-id".to_string()),
        calendar_base_url: base.join("/calendar/v3").unwrap(),
        calendar_id: "primary".to_string(),
        calendar_time_zone: "UTC".to_string(),
        plan_days: 5,
        cors_allowed_origins: None,
    };

    AppState::from_settings(settings).unwrap()
}

fn mock_llm(server: &MockServer, text: &str) {
    server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent")
            .query_param("key", "test-key");
        then.status(200).json_body(json!({
            "candidates": [{"content": {"parts": [{"text": text}]}}]
        }));
    });
}

fn mock_identity(server: &MockServer) {
    server.mock(|when, then| {
        when.method(GET)
            .path("/tokeninfo")
            .query_param("id_token", "good-id-token");
        then.status(200).json_body(json!({
            "sub": "user-42",
            "email": "student@example.com",
            "aud": "client-id"
        }));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/tokeninfo")
            .query_param("id_token", "bad-id-token");
        then.status(400)
            .json_body(json!({"error": "invalid_token"}));
    });
    server.mock(|when, then| {
        when.method(GET)
            .path("/tokeninfo")
            .query_param("id_token", "outage-id-token");
        then.status(503).body("backend unavailable");
    });
}

fn planning_body() -> String {
    json!({
        "goal": "Pass the linear algebra exam",
        "hoursPerDay": "2",
        "timeSlot": {"start": "18:00", "end": "21:00"},
        "startDate": "2025-04-14"
    })
    .to_string()
}

fn post_json(uri: &str, body: String) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body))
        .unwrap()
}

/// Helper to extract response body as string
async fn response_body_string(body: Body) -> String {
    let bytes = axum::body::to_bytes(body, usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_root_endpoint() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    // Act
    let response = app
        .call(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("Study Planner API"));
    assert!(body.contains("/generate-plan"));
    assert!(body.contains("/calendar/sync"));
}

#[tokio::test]
async fn test_healthz_live_and_ready() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);

    for uri in ["/healthz/live", "/healthz/ready"] {
        // Act
        let response = app
            .call(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();

        // Assert
        assert_eq!(response.status(), StatusCode::OK);
        let body = response_body_string(response.into_body()).await;
        assert!(body.contains(r#""status":"ok"#));
    }
}

#[tokio::test]
async fn test_generate_plan_returns_lines_and_days() {
    // Arrange
    let mock_server = MockServer::start();
    mock_llm(&mock_server, PLAN_TEXT);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(post_json("/generate-plan", planning_body()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    let body: Value = serde_json::from_str(&body).unwrap();
    let plan = body["plan"].as_array().unwrap();
    assert_eq!(plan[0], "Here is your plan:");
    assert!(plan.iter().all(|line| !line.as_str().unwrap().starts_with("```")));

    let days = body["days"].as_array().unwrap();
    assert_eq!(days.len(), 2);
    assert_eq!(days[0]["day_number"], 1);
    assert_eq!(days[0]["date"], "2025-04-14");
    assert_eq!(days[0]["topics"], "Vectors and matrices");
    assert_eq!(
        days[0]["time_intervals"],
        json!([{"start": "18:00", "end": "19:00"}, {"start": "20:00", "end": "21:00"}])
    );
    assert_eq!(days[1]["date"], "2025-04-15");
}

#[tokio::test]
async fn test_generate_plan_invalid_request() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);
    let body = json!({
        "goal": "",
        "hoursPerDay": "2",
        "timeSlot": {"start": "18:00", "end": "21:00"}
    })
    .to_string();

    // Act
    let response = app.call(post_json("/generate-plan", body)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("goal must not be empty"));
}

#[tokio::test]
async fn test_generate_plan_unusable_output() {
    // Arrange
    let mock_server = MockServer::start();
    mock_llm(&mock_server, "I'm sorry, I can't help with that.");
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(post_json("/generate-plan", planning_body()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("could not generate a usable plan"));
}

#[tokio::test]
async fn test_generate_plan_llm_failure() {
    // Arrange
    let mock_server = MockServer::start();
    mock_server.mock(|when, then| {
        when.method(POST)
            .path("/v1beta/models/gemini-1.5-flash:generateContent");
        then.status(500).body("upstream exploded");
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(post_json("/generate-plan", planning_body()))
        .await
        .unwrap();

    // Assert - upstream detail is not leaked
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("Failed to generate plan"));
    assert!(!body.contains("upstream exploded"));
}

#[tokio::test]
async fn test_generate_plan_pdf() {
    // Arrange
    let mock_server = MockServer::start();
    mock_llm(&mock_server, PLAN_TEXT);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(post_json("/generate-plan-pdf", planning_body()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert_eq!(content_type, "application/pdf");

    let content_disposition = response.headers().get(header::CONTENT_DISPOSITION).unwrap();
    assert!(
        content_disposition
            .to_str()
            .unwrap()
            .contains("study_plan.pdf")
    );

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF-"));
}

#[tokio::test]
async fn test_generate_plan_ical() {
    // Arrange
    let mock_server = MockServer::start();
    mock_llm(&mock_server, PLAN_TEXT);
    let mut app = build_router(create_test_state(&mock_server.base_url()));

    // Act
    let response = app
        .call(post_json("/generate-plan-ical", planning_body()))
        .await
        .unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get(header::CONTENT_TYPE).unwrap();
    assert_eq!(content_type, "text/calendar");

    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("BEGIN:VCALENDAR"));
    assert_eq!(body.matches("BEGIN:VEVENT").count(), 3);
    assert!(body.contains("Study Session: Determinants"));
}

#[tokio::test]
async fn test_sync_calendar_no_auth_token() {
    // Arrange
    let state = create_test_state("http://example.com");
    let mut app = build_router(state);
    let body = json!({"plan": ["Day 1: Mon"], "accessToken": "ya29.access"}).to_string();

    // Act
    let response = app.call(post_json("/calendar/sync", body)).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sync_calendar_invalid_identity_token() {
    // Arrange
    let mock_server = MockServer::start();
    mock_identity(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let body = json!({"plan": ["Day 1: Mon"], "accessToken": "ya29.access"}).to_string();

    // Act
    let mut request = post_json("/calendar/sync", body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer bad-id-token".parse().unwrap(),
    );
    let response = app.call(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_sync_calendar_identity_provider_outage() {
    // Arrange
    let mock_server = MockServer::start();
    mock_identity(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let body = json!({"plan": ["Day 1: Mon"], "accessToken": "ya29.access"}).to_string();

    // Act
    let mut request = post_json("/calendar/sync", body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer outage-id-token".parse().unwrap(),
    );
    let response = app.call(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    let body = response_body_string(response.into_body()).await;
    assert!(body.contains("Failed to verify identity"));
}

#[tokio::test]
async fn test_sync_calendar_inserts_events() {
    // Arrange
    let mock_server = MockServer::start();
    mock_identity(&mock_server);
    let insert = mock_server.mock(|when, then| {
        when.method(POST)
            .path("/calendar/v3/calendars/primary/events")
            .header("authorization", "Bearer ya29.access");
        then.status(200).json_body(json!({"id": "evt-1"}));
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let body = json!({
        "plan": [
            "Day 0: Sunday",
            "Topics: Warm-up",
            "Time Allotted: 10:00-11:00",
            "Day 3: Wednesday",
            "Topics: Eigenvalues",
            "Time Allotted: 18:00-19:00"
        ],
        "accessToken": "ya29.access",
        "startDate": "2025-04-14"
    })
    .to_string();

    // Act
    let mut request = post_json("/calendar/sync", body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer good-id-token".parse().unwrap(),
    );
    let response = app.call(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::OK);
    insert.assert();

    let body = response_body_string(response.into_body()).await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["userId"], "user-42");
    assert_eq!(body["created"], 1);
    assert_eq!(body["failed"], 0);
    assert_eq!(body["skippedDays"], 1);
    assert_eq!(body["eventIds"], json!(["evt-1"]));
}

#[tokio::test]
async fn test_sync_calendar_reports_failed_inserts() {
    // Arrange
    let mock_server = MockServer::start();
    mock_identity(&mock_server);
    mock_server.mock(|when, then| {
        when.method(POST).path("/calendar/v3/calendars/primary/events");
        then.status(403).body("insufficient scope");
    });
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let body = json!({
        "plan": [
            "Day 1: Monday",
            "Topics: Vectors",
            "Time Allotted: 18:00-19:00;20:00-21:00"
        ],
        "accessToken": "ya29.access"
    })
    .to_string();

    // Act
    let mut request = post_json("/calendar/sync", body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer good-id-token".parse().unwrap(),
    );
    let response = app.call(request).await.unwrap();

    // Assert - each insert is attempted and counted
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_body_string(response.into_body()).await;
    let body: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(body["created"], 0);
    assert_eq!(body["failed"], 2);
}

#[tokio::test]
async fn test_sync_calendar_unparseable_plan() {
    // Arrange
    let mock_server = MockServer::start();
    mock_identity(&mock_server);
    let mut app = build_router(create_test_state(&mock_server.base_url()));
    let body = json!({"plan": ["Just study hard"], "accessToken": "ya29.access"}).to_string();

    // Act
    let mut request = post_json("/calendar/sync", body);
    request.headers_mut().insert(
        header::AUTHORIZATION,
        "Bearer good-id-token".parse().unwrap(),
    );
    let response = app.call(request).await.unwrap();

    // Assert
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}
