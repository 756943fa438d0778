//! Typed calendar event payloads.
//!
//! [`EventBody`] mirrors the event resource of the Google Calendar v3 API:
//! camelCase wire names, every field optional, and unset fields skipped on
//! serialization so a request body contains exactly what the builder set.
//! A flattened catch-all map keeps fields this tool does not model, so a
//! fetched event survives a read-modify-write round trip without losing
//! anything the server sent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event resource, used both for parsing fetched events and for building
/// request bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventBody {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Version tag from the last fetch; sent back as `If-Match` on writes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub html_link: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<EventDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<EventDateTime>,
    /// Recurrence rules in RFC 5545 form, e.g. `RRULE:FREQ=YEARLY`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<Vec<String>>,
    /// Present on instances expanded from a recurring event.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recurring_event_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transparency: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event_type: Option<EventType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attendees: Option<Vec<Attendee>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reminders: Option<Reminders>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extended_properties: Option<ExtendedProperties>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_data: Option<ConferenceData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachments: Option<Vec<Attachment>>,
    /// Everything the server sent that this tool does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl EventBody {
    /// Returns `true` for birthday events, which the API manages as yearly
    /// recurring all-day entities that reject attendee changes.
    pub fn is_birthday(&self) -> bool {
        self.event_type == Some(EventType::Birthday)
    }

    /// The event type to display: instances of a recurring series are shown
    /// as `recurring`, everything else by its wire name.
    pub fn display_type(&self) -> &'static str {
        if self.recurring_event_id.is_some() {
            return "recurring";
        }
        self.event_type.unwrap_or(EventType::Default).as_str()
    }
}

/// Start or end of an event: either an all-day `date` or a zoned `dateTime`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    /// All-day date, `YYYY-MM-DD`. Mutually exclusive with `date_time`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    /// RFC 3339 timestamp with offset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_time: Option<String>,
    /// IANA zone name the timestamp should be interpreted in.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl EventDateTime {
    /// An all-day value.
    pub fn all_day(date: impl Into<String>) -> Self {
        Self {
            date: Some(date.into()),
            date_time: None,
            time_zone: None,
        }
    }

    /// A zoned timestamp value.
    pub fn zoned(date_time: impl Into<String>, time_zone: impl Into<String>) -> Self {
        Self {
            date: None,
            date_time: Some(date_time.into()),
            time_zone: Some(time_zone.into()),
        }
    }

    /// The value to print: the timestamp when present, otherwise the date.
    pub fn display(&self) -> &str {
        self.date_time
            .as_deref()
            .or(self.date.as_deref())
            .unwrap_or("(unset)")
    }
}

/// Event types defined by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EventType {
    Default,
    Birthday,
    FromGmail,
    FocusTime,
    OutOfOffice,
    WorkingLocation,
    /// Anything the server introduces that this build does not know.
    #[serde(other)]
    Unknown,
}

impl EventType {
    /// The wire name, as the API spells it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "default",
            Self::Birthday => "birthday",
            Self::FromGmail => "fromGmail",
            Self::FocusTime => "focusTime",
            Self::OutOfOffice => "outOfOffice",
            Self::WorkingLocation => "workingLocation",
            Self::Unknown => "unknown",
        }
    }
}

/// An attendee entry. Fetched entries may carry flags this tool does not
/// model (`organizer`, `self`, response status); the flatten map keeps them
/// intact when the list is written back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub optional: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_status: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl Attendee {
    /// A plain attendee with just an email address.
    pub fn new(email: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            ..Self::default()
        }
    }
}

/// Reminder configuration for an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    pub use_default: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overrides: Option<Vec<ReminderOverride>>,
}

/// A single reminder override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderOverride {
    /// Delivery method, `email` or `popup`.
    pub method: String,
    /// Minutes before the event start.
    pub minutes: u32,
}

/// Application-private and shared key/value metadata on an event.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtendedProperties {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub private: Option<BTreeMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<BTreeMap<String, String>>,
}

/// Conference details attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceData {
    /// Set on insert to ask the service to provision a conference.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub create_request: Option<ConferenceRequest>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_solution: Option<ConferenceSolution>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry_points: Option<Vec<EntryPoint>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_id: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl ConferenceData {
    /// The video entry point URI, when the service provisioned one.
    pub fn video_uri(&self) -> Option<&str> {
        self.entry_points
            .as_deref()?
            .iter()
            .find(|ep| ep.entry_point_type == "video")
            .and_then(|ep| ep.uri.as_deref())
    }
}

/// A request for the service to provision a conference on insert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceRequest {
    /// Client-generated id making the request idempotent.
    pub request_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conference_solution_key: Option<ConferenceSolutionKey>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// The conference product to provision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConferenceSolutionKey {
    /// Product name, e.g. `hangoutsMeet`.
    #[serde(rename = "type")]
    pub kind: String,
}

/// Conference solution details the service reports back.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConferenceSolution {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key: Option<ConferenceSolutionKey>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// One way to join a conference.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryPoint {
    pub entry_point_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// A file attached to an event.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub file_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}
