//! Calendar-list entries and change-notification channels.

use serde::{Deserialize, Serialize};

/// One calendar from the authenticated user's calendar list.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarListEntry {
    /// The calendar id, used as the target of every other operation.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub summary: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Whether this is the account's primary calendar.
    #[serde(default)]
    pub primary: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

/// A web-hook notification channel on a calendar's events, both as sent
/// when registering and as echoed back by the service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WatchChannel {
    /// Client-chosen channel id.
    pub id: String,
    /// Delivery mechanism; the API only supports `web_hook`.
    #[serde(rename = "type")]
    pub kind: String,
    /// HTTPS address notifications are POSTed to.
    pub address: String,
    /// Server-assigned id of the watched resource.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resource_uri: Option<String>,
    /// Expiry as epoch milliseconds, returned as a string or a number
    /// depending on the endpoint.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiration: Option<serde_json::Value>,
}

impl WatchChannel {
    /// A web-hook registration for the given channel id and address.
    pub fn web_hook(id: impl Into<String>, address: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            kind: "web_hook".to_string(),
            address: address.into(),
            ..Self::default()
        }
    }
}
