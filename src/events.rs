use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use utoipa::ToSchema;

use crate::plan::{DayRecord, PlanError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ReminderMethod {
    Email,
    Popup,
}

impl ReminderMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReminderMethod::Email => "email",
            ReminderMethod::Popup => "popup",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct Reminder {
    pub method: ReminderMethod,
    pub minutes_before: u32,
}

/// One day before by email, half an hour before as a popup.
pub const REMINDER_POLICY: [Reminder; 2] = [
    Reminder {
        method: ReminderMethod::Email,
        minutes_before: 24 * 60,
    },
    Reminder {
        method: ReminderMethod::Popup,
        minutes_before: 30,
    },
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct EventDescriptor {
    pub day_number: u32,
    pub title: String,
    pub description: String,
    #[schema(value_type = String, format = "date-time", example = "2025-04-14T09:00:00Z")]
    pub start_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time", example = "2025-04-14T10:00:00Z")]
    pub end_at: DateTime<Utc>,
    /// IANA name of the zone the wall-clock times were interpreted in.
    pub time_zone: String,
    pub reminders: Vec<Reminder>,
}

#[derive(Debug, Default)]
pub struct Materialized {
    pub events: Vec<EventDescriptor>,
    pub skipped_days: usize,
}

/// Turns day records into calendar-ready events anchored at a reference date.
#[derive(Debug, Clone, Copy)]
pub struct EventMaterializer {
    tz: Tz,
}

impl Default for EventMaterializer {
    fn default() -> Self {
        Self::new(Tz::UTC)
    }
}

impl EventMaterializer {
    pub fn new(tz: Tz) -> Self {
        Self { tz }
    }

    fn resolve(&self, local: NaiveDateTime) -> Option<DateTime<Utc>> {
        self.tz
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Events for a single day, one per interval.
    pub fn materialize_day(
        &self,
        record: &DayRecord,
        reference_date: NaiveDate,
    ) -> Result<Vec<EventDescriptor>, PlanError> {
        let event_date = record.date(reference_date)?;
        let title = format!("Study Session: {}", record.topics);
        let description = format!(
            "Day {} of your study plan\nTopics: {}",
            record.day_number, record.topics
        );

        let mut events = Vec::with_capacity(record.time_intervals.len());
        for interval in &record.time_intervals {
            let (Some(start_at), Some(end_at)) = (
                self.resolve(event_date.and_time(interval.start)),
                self.resolve(event_date.and_time(interval.end)),
            ) else {
                tracing::warn!(
                    day_number = record.day_number,
                    %interval,
                    tz = %self.tz,
                    "interval falls outside local time, skipping"
                );
                continue;
            };
            events.push(EventDescriptor {
                day_number: record.day_number,
                title: title.clone(),
                description: description.clone(),
                start_at,
                end_at,
                time_zone: self.tz.name().to_string(),
                reminders: REMINDER_POLICY.to_vec(),
            });
        }
        Ok(events)
    }

    /// Materializes every record, skipping (and counting) the ones that cannot be dated.
    pub fn materialize(&self, records: &[DayRecord], reference_date: NaiveDate) -> Materialized {
        let mut out = Materialized::default();
        for record in records {
            match self.materialize_day(record, reference_date) {
                Ok(events) => out.events.extend(events),
                Err(err) => {
                    tracing::warn!(day_number = record.day_number, error = %err, "skipping day");
                    out.skipped_days += 1;
                }
            }
        }
        out
    }
}
