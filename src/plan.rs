use std::fmt;
use std::str::FromStr;

use chrono::{Days, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

const TIME_FORMAT: &str = "%H:%M";
const FENCE: &str = "```";
const TOPICS_MARKERS: [&str; 2] = ["Topics:", "Topics to Study:"];
const TIME_MARKER: &str = "Time Allotted:";

static DAY_HEADER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^Day\s+(\d+)\s*:\s*(.*)$").expect("regex compiles"));

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PlanError {
    #[error("could not generate a usable plan")]
    EmptyPlan,
    #[error("invalid day number {0}: days are numbered from 1")]
    InvalidDayNumber(u32),
}

/// A wall-clock `(start, end)` pair within one day. `start < end` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct TimeInterval {
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "09:00")]
    pub start: NaiveTime,
    #[serde(with = "hhmm")]
    #[schema(value_type = String, example = "10:00")]
    pub end: NaiveTime,
}

impl TimeInterval {
    pub fn new(start: NaiveTime, end: NaiveTime) -> Option<Self> {
        (start < end).then_some(Self { start, end })
    }
}

impl fmt::Display for TimeInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}-{}",
            self.start.format(TIME_FORMAT),
            self.end.format(TIME_FORMAT)
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IntervalError {
    #[error("expected HH:MM-HH:MM")]
    Shape,
    #[error("invalid time of day: {0}")]
    Time(#[from] chrono::ParseError),
    #[error("interval must end after it starts")]
    NotIncreasing,
}

impl FromStr for TimeInterval {
    type Err = IntervalError;

    /// Parses `HH:MM-HH:MM`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 2 {
            return Err(IntervalError::Shape);
        }
        let start = NaiveTime::parse_from_str(parts[0].trim(), TIME_FORMAT)?;
        let end = NaiveTime::parse_from_str(parts[1].trim(), TIME_FORMAT)?;
        TimeInterval::new(start, end).ok_or(IntervalError::NotIncreasing)
    }
}

/// One `Day N:` block of a generated plan.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DayRecord {
    pub day_number: u32,
    /// Free text after `Day N:`, kept for display only.
    pub label: String,
    pub topics: String,
    pub time_intervals: Vec<TimeInterval>,
}

impl DayRecord {
    /// Calendar date of this day: `reference + (day_number - 1)` days.
    pub fn date(&self, reference: NaiveDate) -> Result<NaiveDate, PlanError> {
        if self.day_number < 1 {
            return Err(PlanError::InvalidDayNumber(self.day_number));
        }
        reference
            .checked_add_days(Days::new(u64::from(self.day_number - 1)))
            .ok_or(PlanError::InvalidDayNumber(self.day_number))
    }
}

/// Splits `09:00-10:00;14:00-15:00` into intervals, dropping malformed candidates.
pub fn parse_intervals(raw: &str) -> Vec<TimeInterval> {
    raw.split(';')
        .map(str::trim)
        .filter(|candidate| candidate.contains('-'))
        .filter_map(|candidate| match candidate.parse::<TimeInterval>() {
            Ok(interval) => Some(interval),
            Err(err) => {
                tracing::debug!(candidate, error = %err, "skipping malformed interval");
                None
            }
        })
        .collect()
}

/// Non-empty trimmed lines of the LLM output with code-fence lines removed.
pub fn plan_lines(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with(FENCE))
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Default)]
struct PendingBlock {
    day_number: u32,
    label: String,
    topics: Option<String>,
    intervals: Option<Vec<TimeInterval>>,
}

impl PendingBlock {
    fn new(day_number: u32, label: &str) -> Self {
        Self {
            day_number,
            label: label.trim_end_matches('*').trim().to_string(),
            ..Self::default()
        }
    }

    fn into_record(self) -> Option<DayRecord> {
        Some(DayRecord {
            day_number: self.day_number,
            label: self.label,
            topics: self.topics?,
            time_intervals: self.intervals?,
        })
    }
}

#[derive(Debug)]
enum ParseState {
    SeekingDayHeader,
    InBlockSeekingTopics(PendingBlock),
    InBlockSeekingTime(PendingBlock),
    BlockComplete(PendingBlock),
}

enum Line<'a> {
    Header(Option<u32>, &'a str),
    Topics(&'a str),
    Time(&'a str),
    Other,
}

/// Drops list markers and bold wrappers LLMs like to put around markers.
fn strip_decoration(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| matches!(c, '-' | '*' | '#' | '>') || c.is_whitespace())
}

fn marker_value(rest: &str) -> &str {
    rest.trim().trim_start_matches('*').trim().trim_end_matches('*').trim()
}

fn classify(raw: &str) -> Line<'_> {
    let line = strip_decoration(raw);
    if let Some(caps) = DAY_HEADER.captures(line) {
        let number = caps.get(1).and_then(|m| m.as_str().parse::<u32>().ok());
        let label = caps.get(2).map_or("", |m| m.as_str());
        return Line::Header(number, label);
    }
    if let Some(rest) = TOPICS_MARKERS
        .iter()
        .find_map(|marker| line.strip_prefix(marker))
    {
        return Line::Topics(marker_value(rest));
    }
    if let Some(rest) = line.strip_prefix(TIME_MARKER) {
        return Line::Time(marker_value(rest));
    }
    Line::Other
}

impl ParseState {
    fn from_block(block: PendingBlock) -> Self {
        match (&block.topics, &block.intervals) {
            (None, _) => ParseState::InBlockSeekingTopics(block),
            (Some(_), None) => ParseState::InBlockSeekingTime(block),
            (Some(_), Some(_)) => ParseState::BlockComplete(block),
        }
    }

    fn into_block(self) -> Option<PendingBlock> {
        match self {
            ParseState::SeekingDayHeader => None,
            ParseState::InBlockSeekingTopics(block)
            | ParseState::InBlockSeekingTime(block)
            | ParseState::BlockComplete(block) => Some(block),
        }
    }

    /// Closes the current block, emitting it only when it is complete.
    fn finish(self, out: &mut Vec<DayRecord>) {
        match self {
            ParseState::BlockComplete(block) => out.extend(block.into_record()),
            ParseState::InBlockSeekingTopics(block) | ParseState::InBlockSeekingTime(block) => {
                tracing::debug!(day_number = block.day_number, "dropping incomplete day block");
            }
            ParseState::SeekingDayHeader => {}
        }
    }

    fn step(self, line: Line<'_>, out: &mut Vec<DayRecord>) -> Self {
        match line {
            Line::Header(number, label) => {
                self.finish(out);
                match number {
                    Some(day_number) => {
                        ParseState::InBlockSeekingTopics(PendingBlock::new(day_number, label))
                    }
                    None => ParseState::SeekingDayHeader,
                }
            }
            Line::Topics(topics) => match self.into_block() {
                Some(mut block) => {
                    if block.topics.is_none() && !topics.is_empty() {
                        block.topics = Some(topics.to_string());
                    }
                    ParseState::from_block(block)
                }
                None => ParseState::SeekingDayHeader,
            },
            Line::Time(raw) => match self.into_block() {
                Some(mut block) => {
                    if block.intervals.is_none() && !raw.is_empty() {
                        block.intervals = Some(parse_intervals(raw));
                    }
                    ParseState::from_block(block)
                }
                None => ParseState::SeekingDayHeader,
            },
            Line::Other => self,
        }
    }
}

/// Parses LLM plan text into day records, in source order.
///
/// Day numbers are kept verbatim: gaps, duplicates and zero are passed
/// through and left to the materializer.
pub fn parse_plan(text: &str) -> Result<Vec<DayRecord>, PlanError> {
    let mut records = Vec::new();
    let mut state = ParseState::SeekingDayHeader;
    for line in plan_lines(text) {
        state = state.step(classify(&line), &mut records);
    }
    state.finish(&mut records);

    if records.is_empty() {
        return Err(PlanError::EmptyPlan);
    }
    Ok(records)
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&time.format(TIME_FORMAT))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}
