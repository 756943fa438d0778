//! Free/busy query and response types.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// A free/busy query over one or more calendars.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyRequest {
    /// RFC 3339 lower bound, inclusive.
    pub time_min: String,
    /// RFC 3339 upper bound, exclusive.
    pub time_max: String,
    pub items: Vec<FreeBusyRequestItem>,
}

impl FreeBusyRequest {
    /// A query for the given window and calendar ids.
    pub fn new(
        time_min: impl Into<String>,
        time_max: impl Into<String>,
        calendar_ids: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            time_min: time_min.into(),
            time_max: time_max.into(),
            items: calendar_ids
                .into_iter()
                .map(|id| FreeBusyRequestItem { id: id.into() })
                .collect(),
        }
    }
}

/// One calendar named in a free/busy query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FreeBusyRequestItem {
    pub id: String,
}

/// The service's answer, keyed by calendar id.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyResponse {
    #[serde(default)]
    pub calendars: BTreeMap<String, FreeBusyCalendar>,
}

/// Busy intervals (and any per-calendar lookup errors) for one calendar.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyCalendar {
    #[serde(default)]
    pub busy: Vec<BusyInterval>,
    #[serde(default)]
    pub errors: Vec<FreeBusyError>,
}

/// One busy interval, bounds in RFC 3339.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BusyInterval {
    pub start: String,
    pub end: String,
}

/// A per-calendar lookup failure inside an otherwise successful query.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FreeBusyError {
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_wire_shape() {
        let request = FreeBusyRequest::new(
            "2025-03-01T10:00:00+00:00",
            "2025-03-01T11:00:00+00:00",
            ["primary"],
        );
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["timeMin"], "2025-03-01T10:00:00+00:00");
        assert_eq!(json["timeMax"], "2025-03-01T11:00:00+00:00");
        assert_eq!(json["items"][0]["id"], "primary");
    }

    #[test]
    fn parses_busy_and_errors() {
        let json = r#"{
            "kind": "calendar#freeBusy",
            "calendars": {
                "primary": {
                    "busy": [
                        {"start": "2025-03-01T10:30:00Z", "end": "2025-03-01T10:45:00Z"}
                    ]
                },
                "ghost@example.com": {
                    "errors": [{"domain": "global", "reason": "notFound"}],
                    "busy": []
                }
            }
        }"#;

        let response: FreeBusyResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.calendars["primary"].busy.len(), 1);
        assert_eq!(
            response.calendars["ghost@example.com"].errors[0].reason,
            "notFound"
        );
    }
}
