//! Events: the registry of what hosts organize.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Local, NaiveDateTime};
use serde_json::Value;
use tracing::warn;

use crate::constants::EVENTS_TABLE;
use crate::error::{EventDeskError, EventDeskResult};
use crate::store::{Fields, Filter, Record, TableStore};

/// Event categories offered when creating an event.
pub const EVENT_TYPES: [&str; 14] = [
    "Conference, summit & seminar",
    "Congress, fair & exhibition",
    "Corporate & business",
    "Workshop, training & networking",
    "Technology & hackathon",
    "Festival, fair & celebration",
    "Concert, music & performing arts",
    "Sports, esports & competitions",
    "Health, wellness & charity",
    "Food, drink & gastronomy",
    "Nightlife & party",
    "Travel, tour & trip",
    "Family, kids & community",
    "Virtual & hybrid",
];

const STORED_DATETIME_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Public, store-assigned event number that other tables refer to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(i64);

impl EventId {
    pub fn new(value: i64) -> Self {
        EventId(value)
    }

    pub fn value(self) -> i64 {
        self.0
    }
}

impl FromStr for EventId {
    type Err = EventDeskError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim()
            .parse()
            .map(EventId)
            .map_err(|_| EventDeskError::InvalidEventId(s.to_string()))
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An event as stored.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub record_id: String,
    /// Public ID (`ID` column); `None` until the store assigns one.
    pub public_id: Option<String>,
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub host_id: Option<i64>,
    pub location_name: String,
    pub detailed_address: String,
    pub start_date: String,
    pub end_date: String,
    pub capacity: i64,
    pub is_visible: bool,
}

impl Event {
    pub fn from_record(record: &Record) -> Self {
        let text = |name: &str| record.str_field(name).unwrap_or_default().to_string();

        Event {
            record_id: record.id.clone(),
            public_id: public_id(&record.fields),
            name: text("name"),
            description: text("description"),
            event_type: text("type"),
            host_id: record.i64_field("host_id"),
            location_name: text("location_name"),
            detailed_address: text("detailed_address"),
            start_date: text("start_date"),
            end_date: text("end_date"),
            capacity: record.i64_field("capacity").unwrap_or(0),
            is_visible: record
                .field("is_visible")
                .and_then(Value::as_bool)
                .unwrap_or(false),
        }
    }

    pub fn start(&self) -> Option<NaiveDateTime> {
        parse_stored_datetime(&self.start_date)
    }

    pub fn end(&self) -> Option<NaiveDateTime> {
        parse_stored_datetime(&self.end_date)
    }
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Stored timestamps are either RFC 3339 (converted to local time) or
/// naive local ISO-8601.
pub fn parse_stored_datetime(s: &str) -> Option<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Local).naive_local());
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
}

/// The `ID` column, spelled however the base spells it.
fn public_id(fields: &Fields) -> Option<String> {
    ["ID", "id", "Id"]
        .iter()
        .find_map(|key| fields.get(*key))
        .and_then(|value| match value {
            Value::Number(n) => Some(n.to_string()),
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            _ => None,
        })
}

/// A host's events split by where they sit relative to now.
#[derive(Debug, Default)]
pub struct CategorizedEvents {
    pub current: Vec<Event>,
    pub upcoming: Vec<Event>,
    pub past: Vec<Event>,
    /// Events whose dates could not be read.
    pub skipped: usize,
}

/// Split events into current, upcoming and past, each sorted by end date
/// (latest first).
pub fn categorize(events: Vec<Event>, now: NaiveDateTime) -> CategorizedEvents {
    let mut result = CategorizedEvents::default();

    for event in events {
        let (Some(start), Some(end)) = (event.start(), event.end()) else {
            warn!(event = %event.name, "Skipping event with unreadable dates");
            result.skipped += 1;
            continue;
        };

        if start <= now && now <= end {
            result.current.push(event);
        } else if start > now {
            result.upcoming.push(event);
        } else {
            result.past.push(event);
        }
    }

    for bucket in [&mut result.current, &mut result.upcoming, &mut result.past] {
        bucket.sort_by_key(|e| std::cmp::Reverse(e.end()));
    }

    result
}

/// Input for creating an event.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: String,
    pub event_type: String,
    pub host_id: i64,
    pub location_name: String,
    pub detailed_address: String,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    pub capacity: i64,
    pub is_visible: bool,
}

impl NewEvent {
    /// Every problem with the input, or Ok when it can be created.
    pub fn validate(&self) -> EventDeskResult<()> {
        let mut issues = Vec::new();

        let required = [
            (&self.name, "Event name is required"),
            (&self.description, "Event description is required"),
            (&self.event_type, "Event type is required"),
            (&self.location_name, "Venue name is required"),
            (&self.detailed_address, "Detailed address is required"),
        ];
        for (value, message) in required {
            if value.trim().is_empty() {
                issues.push(message.to_string());
            }
        }

        if self.start >= self.end {
            issues.push("End date must be after the start date".to_string());
        }

        if self.capacity <= 0 {
            issues.push("Expected attendance must be greater than 0".to_string());
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(EventDeskError::Validation(issues))
        }
    }

    fn to_fields(&self) -> Fields {
        let mut fields = Fields::new();
        fields.insert("name".into(), self.name.trim().into());
        fields.insert("description".into(), self.description.trim().into());
        fields.insert("type".into(), self.event_type.clone().into());
        fields.insert("host_id".into(), self.host_id.into());
        fields.insert("location_name".into(), self.location_name.trim().into());
        fields.insert("detailed_address".into(), self.detailed_address.trim().into());
        fields.insert(
            "start_date".into(),
            self.start.format(STORED_DATETIME_FORMAT).to_string().into(),
        );
        fields.insert(
            "end_date".into(),
            self.end.format(STORED_DATETIME_FORMAT).to_string().into(),
        );
        fields.insert("capacity".into(), self.capacity.into());
        fields.insert("is_visible".into(), self.is_visible.into());
        fields
    }
}

pub struct EventRegistry<'s, S> {
    store: &'s S,
}

impl<'s, S: TableStore + Sync> EventRegistry<'s, S> {
    pub fn new(store: &'s S) -> Self {
        EventRegistry { store }
    }

    pub async fn list_for_host(&self, host_id: i64) -> EventDeskResult<Vec<Event>> {
        let records = self
            .store
            .query_all(EVENTS_TABLE, &Filter::eq("host_id", host_id))
            .await?;
        Ok(records.iter().map(Event::from_record).collect())
    }

    /// Validate and store a new event, returning its public ID.
    pub async fn create(&self, event: &NewEvent) -> EventDeskResult<String> {
        event.validate()?;

        let record = self.store.create(EVENTS_TABLE, event.to_fields()).await?;
        if let Some(id) = public_id(&record.fields) {
            return Ok(id);
        }

        // Some bases only expose computed columns on read; take the host's newest event.
        let records = self
            .store
            .query_all(EVENTS_TABLE, &Filter::eq("host_id", event.host_id))
            .await?;
        records
            .iter()
            .rev()
            .find(|r| r.id == record.id)
            .or_else(|| records.last())
            .and_then(|r| public_id(&r.fields))
            .ok_or(EventDeskError::MissingEventId)
    }
}
