use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use crate::events::EventDescriptor;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("Calendar access token expired or revoked")]
    AuthExpired,
    #[error("Calendar API error {status}: {message}")]
    Api { status: u16, message: String },
    #[error("Calendar base URL cannot carry a path: {0}")]
    InvalidBaseUrl(Url),
}

/// Inserts events into the caller's calendar.
#[async_trait]
pub trait CalendarService: Send + Sync {
    /// Returns the id of the created event.
    async fn insert_event(
        &self,
        access_token: &str,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError>;
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventBody<'a> {
    summary: &'a str,
    description: &'a str,
    start: EventTime<'a>,
    end: EventTime<'a>,
    reminders: Reminders,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct EventTime<'a> {
    date_time: String,
    time_zone: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct Reminders {
    use_default: bool,
    overrides: Vec<ReminderOverride>,
}

#[derive(Serialize)]
struct ReminderOverride {
    method: &'static str,
    minutes: u32,
}

impl<'a> From<&'a EventDescriptor> for EventBody<'a> {
    fn from(event: &'a EventDescriptor) -> Self {
        let tz = event.time_zone.as_str();
        Self {
            summary: &event.title,
            description: &event.description,
            start: EventTime {
                date_time: event.start_at.to_rfc3339(),
                time_zone: tz,
            },
            end: EventTime {
                date_time: event.end_at.to_rfc3339(),
                time_zone: tz,
            },
            reminders: Reminders {
                use_default: false,
                overrides: event
                    .reminders
                    .iter()
                    .map(|r| ReminderOverride {
                        method: r.method.as_str(),
                        minutes: r.minutes_before,
                    })
                    .collect(),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedEvent {
    id: String,
}

/// Google Calendar API v3 `events.insert`.
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: reqwest::Client,
    base_url: Url,
    calendar_id: String,
}

impl GoogleCalendarClient {
    pub fn new(base_url: Url, calendar_id: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
            calendar_id: calendar_id.into(),
        }
    }

    fn events_url(&self) -> Result<Url, CalendarError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| CalendarError::InvalidBaseUrl(self.base_url.clone()))?
            .pop_if_empty()
            .extend(["calendars", self.calendar_id.as_str(), "events"]);
        Ok(url)
    }
}

#[async_trait]
impl CalendarService for GoogleCalendarClient {
    async fn insert_event(
        &self,
        access_token: &str,
        event: &EventDescriptor,
    ) -> Result<String, CalendarError> {
        let response = self
            .client
            .post(self.events_url()?)
            .bearer_auth(access_token)
            .json(&EventBody::from(event))
            .send()
            .await?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(CalendarError::AuthExpired);
        }
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CalendarError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let created: CreatedEvent = response.json().await?;
        Ok(created.id)
    }
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PushOutcome {
    pub event_ids: Vec<String>,
    pub failed: usize,
}

/// Inserts every event independently; one failure never stops the rest.
pub async fn push_events(
    service: &dyn CalendarService,
    access_token: &str,
    events: &[EventDescriptor],
) -> PushOutcome {
    let results = join_all(
        events
            .iter()
            .map(|event| service.insert_event(access_token, event)),
    )
    .await;

    let mut outcome = PushOutcome::default();
    for (event, result) in events.iter().zip(results) {
        match result {
            Ok(id) => outcome.event_ids.push(id),
            Err(err) => {
                tracing::warn!(
                    day_number = event.day_number,
                    title = %event.title,
                    error = %err,
                    "failed to insert calendar event"
                );
                outcome.failed += 1;
            }
        }
    }
    tracing::info!(
        created = outcome.event_ids.len(),
        failed = outcome.failed,
        "calendar sync finished"
    );
    outcome
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;

    use super::*;
    use crate::events::EventMaterializer;
    use crate::plan::parse_plan;

    struct FlakyCalendar;

    #[async_trait]
    impl CalendarService for FlakyCalendar {
        async fn insert_event(
            &self,
            _access_token: &str,
            event: &EventDescriptor,
        ) -> Result<String, CalendarError> {
            if event.title.contains("Geometry") {
                Err(CalendarError::Api {
                    status: 500,
                    message: "backend error".into(),
                })
            } else {
                Ok(format!("evt-{}", event.day_number))
            }
        }
    }

    fn sample_events() -> Vec<EventDescriptor> {
        let text = "\
Day 1: Mon
Topics: Algebra
Time Allotted: 09:00-10:00
Day 2: Tue
Topics: Geometry
Time Allotted: 09:00-10:00
Day 3: Wed
Topics: Calculus
Time Allotted: 09:00-10:00
";
        let days = parse_plan(text).unwrap();
        let reference = NaiveDate::from_ymd_opt(2025, 4, 14).unwrap();
        EventMaterializer::default().materialize(&days, reference).events
    }

    #[tokio::test]
    async fn test_push_events_tolerates_partial_failure() {
        let outcome = push_events(&FlakyCalendar, "token", &sample_events()).await;
        assert_eq!(outcome.event_ids, vec!["evt-1".to_string(), "evt-3".to_string()]);
        assert_eq!(outcome.failed, 1);
    }

    #[tokio::test]
    async fn test_push_events_empty() {
        let outcome = push_events(&FlakyCalendar, "token", &[]).await;
        assert_eq!(outcome, PushOutcome::default());
    }

    #[test]
    fn test_events_url_encodes_calendar_id() {
        let client = GoogleCalendarClient::new(
            Url::parse("https://example.com/calendar/v3/").unwrap(),
            "en.usa#holiday@group.v.calendar.google.com",
        );
        let url = client.events_url().unwrap();
        assert_eq!(
            url.path(),
            "/calendar/v3/calendars/en.usa%23holiday@group.v.calendar.google.com/events"
        );
        assert!(url.fragment().is_none());

        let primary = GoogleCalendarClient::new(
            Url::parse("https://example.com/calendar/v3").unwrap(),
            "primary",
        );
        assert_eq!(
            primary.events_url().unwrap().as_str(),
            "https://example.com/calendar/v3/calendars/primary/events"
        );
    }

    #[test]
    fn test_event_body_shape() {
        let events = sample_events();
        let body = serde_json::to_value(EventBody::from(&events[0])).unwrap();
        assert_eq!(body["summary"], "Study Session: Algebra");
        assert_eq!(body["start"]["dateTime"], "2025-04-14T09:00:00+00:00");
        assert_eq!(body["start"]["timeZone"], "UTC");
        assert_eq!(body["reminders"]["useDefault"], false);
        assert_eq!(
            body["reminders"]["overrides"],
            serde_json::json!([
                {"method": "email", "minutes": 1440},
                {"method": "popup", "minutes": 30}
            ])
        );
    }
}
