use icalendar::{Calendar, Component, Event, EventLike};

use crate::events::EventDescriptor;

#[derive(Clone, Default)]
pub struct ICalExporter;

impl ICalExporter {
    pub fn new() -> Self {
        Self
    }

    pub fn generate(&self, events: &[EventDescriptor]) -> Vec<u8> {
        if events.is_empty() {
            return Vec::new();
        }

        let mut calendar = Calendar::new();
        calendar.name("Study Plan");

        for (index, item) in events.iter().enumerate() {
            let mut event = Event::new();
            event.summary(&item.title);
            event.starts(item.start_at);
            event.ends(item.end_at);
            event.description(&item.description);
            event.uid(&format!(
                "{}-day{}-{}-study-planner",
                item.start_at.format("%Y%m%dT%H%M%SZ"),
                item.day_number,
                index
            ));
            calendar.push(event);
        }

        calendar.to_string().into_bytes()
    }
}
