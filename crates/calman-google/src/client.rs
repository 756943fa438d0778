//! Google Calendar API client.
//!
//! Low-level HTTP client for the Calendar v3 REST surface: request
//! building, bearer auth, status mapping and response parsing. Bodies
//! are the typed entities from `calman_core`, so whatever the API
//! returned survives a read-modify-write cycle unchanged.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use calman_core::acl::AclRule;
use calman_core::calendar::{CalendarListEntry, WatchChannel};
use calman_core::event::EventBody;
use calman_core::freebusy::{FreeBusyRequest, FreeBusyResponse};

use crate::batch::{parse_batch_response, BatchRequest, BatchResponsePart};
use crate::error::{ApiError, ApiResult};

/// Base URL for Google Calendar API v3.
const CALENDAR_API_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Batch endpoint for Calendar v3.
const BATCH_API_BASE: &str = "https://www.googleapis.com/batch/calendar/v3";

/// Google Calendar API client.
#[derive(Debug)]
pub struct CalendarClient {
    http_client: reqwest::Client,
    access_token: String,
}

impl CalendarClient {
    /// Creates a new client with the given access token.
    pub fn new(access_token: impl Into<String>, timeout: Duration, user_agent: &str) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .expect("failed to create HTTP client");

        Self {
            http_client,
            access_token: access_token.into(),
        }
    }

    /// Updates the access token (after refresh).
    pub fn set_access_token(&mut self, token: impl Into<String>) {
        self.access_token = token.into();
    }

    /// Lists events from a calendar within a time window.
    ///
    /// Recurring events are expanded into instances and ordered by
    /// start time; cancelled ghosts are dropped. Follows page tokens
    /// until `max_results` events are collected or the listing ends.
    pub async fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<usize>,
    ) -> ApiResult<Vec<EventBody>> {
        let mut events: Vec<EventBody> = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .list_events_page(
                    calendar_id,
                    time_min,
                    time_max,
                    max_results,
                    page_token.as_deref(),
                )
                .await?;

            events.extend(
                page.items
                    .into_iter()
                    .filter(|e| e.status.as_deref() != Some("cancelled")),
            );

            if let Some(max) = max_results {
                if events.len() >= max {
                    events.truncate(max);
                    break;
                }
            }

            match page.next_page_token {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        debug!(
            "fetched {} events from calendar {}",
            events.len(),
            calendar_id
        );
        Ok(events)
    }

    /// Fetches a single page of events.
    async fn list_events_page(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
        max_results: Option<usize>,
        page_token: Option<&str>,
    ) -> ApiResult<EventListResponse> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .query(&[
                ("timeMin", time_min.to_rfc3339()),
                ("timeMax", time_max.to_rfc3339()),
                ("singleEvents", "true".to_string()),
                ("orderBy", "startTime".to_string()),
            ]);

        if let Some(max) = max_results {
            request = request.query(&[("maxResults", max.to_string())]);
        }

        if let Some(token) = page_token {
            request = request.query(&[("pageToken", token.to_string())]);
        }

        let response = request.send().await.map_err(map_send_error)?;
        parse_json(check_status(response).await?).await
    }

    /// Fetches a single event by ID.
    pub async fn get_event(&self, calendar_id: &str, event_id: &str) -> ApiResult<EventBody> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Inserts a new event and returns the created entity.
    pub async fn insert_event(
        &self,
        calendar_id: &str,
        event: &EventBody,
    ) -> ApiResult<EventBody> {
        let url = format!(
            "{}/calendars/{}/events",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let mut request = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json");

        for (key, value) in feature_params(event) {
            request = request.query(&[(key, value)]);
        }

        let response = request
            .body(to_json(event)?)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Replaces an event and returns the updated entity.
    ///
    /// When the body carries an ETag from the fetch it is sent as
    /// `If-Match`, so a concurrent modification fails with a
    /// precondition error instead of being overwritten.
    pub async fn update_event(
        &self,
        calendar_id: &str,
        event_id: &str,
        event: &EventBody,
    ) -> ApiResult<EventBody> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let request = self.update_request(&url, event)?;
        let response = self
            .http_client
            .execute(request)
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Builds the conditional PUT for an event update.
    fn update_request(&self, url: &str, event: &EventBody) -> ApiResult<reqwest::Request> {
        let mut request = self
            .http_client
            .put(url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json");

        if let Some(etag) = &event.etag {
            request = request.header("If-Match", etag);
        }

        for (key, value) in feature_params(event) {
            request = request.query(&[(key, value)]);
        }

        request
            .body(to_json(event)?)
            .build()
            .map_err(|e| ApiError::internal(format!("failed to build request: {}", e)))
    }

    /// Deletes an event.
    pub async fn delete_event(&self, calendar_id: &str, event_id: &str) -> ApiResult<()> {
        let url = format!(
            "{}/calendars/{}/events/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(event_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response).await?;
        Ok(())
    }

    /// Queries free/busy intervals for one or more calendars.
    pub async fn query_free_busy(&self, query: &FreeBusyRequest) -> ApiResult<FreeBusyResponse> {
        let url = format!("{}/freeBusy", CALENDAR_API_BASE);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
            .body(to_json(query)?)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Lists the ACL rules of a calendar.
    pub async fn list_acl_rules(&self, calendar_id: &str) -> ApiResult<Vec<AclRule>> {
        let url = format!(
            "{}/calendars/{}/acl",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        let list: AclListResponse = parse_json(check_status(response).await?).await?;
        Ok(list.items)
    }

    /// Inserts an ACL rule and returns the created rule.
    pub async fn insert_acl_rule(&self, calendar_id: &str, rule: &AclRule) -> ApiResult<AclRule> {
        let url = format!(
            "{}/calendars/{}/acl",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
            .body(to_json(rule)?)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Deletes an ACL rule by its rule ID (e.g. `user:someone@example.com`).
    pub async fn delete_acl_rule(&self, calendar_id: &str, rule_id: &str) -> ApiResult<()> {
        let url = format!(
            "{}/calendars/{}/acl/{}",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id),
            urlencoding::encode(rule_id)
        );

        let response = self
            .http_client
            .delete(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        check_status(response).await?;
        Ok(())
    }

    /// Lists the calendars on the user's calendar list.
    pub async fn list_calendars(&self) -> ApiResult<Vec<CalendarListEntry>> {
        let url = format!("{}/users/me/calendarList", CALENDAR_API_BASE);

        let response = self
            .http_client
            .get(&url)
            .bearer_auth(&self.access_token)
            .send()
            .await
            .map_err(map_send_error)?;

        let list: CalendarListResponse = parse_json(check_status(response).await?).await?;
        Ok(list.items)
    }

    /// Registers a notification channel for event changes.
    pub async fn watch_events(
        &self,
        calendar_id: &str,
        channel: &WatchChannel,
    ) -> ApiResult<WatchChannel> {
        let url = format!(
            "{}/calendars/{}/events/watch",
            CALENDAR_API_BASE,
            urlencoding::encode(calendar_id)
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.access_token)
            .header("Content-Type", "application/json")
            .body(to_json(channel)?)
            .send()
            .await
            .map_err(map_send_error)?;

        parse_json(check_status(response).await?).await
    }

    /// Lists events from several calendars in one round trip.
    ///
    /// Queues one events.list sub-request per calendar (Content-IDs
    /// "1", "2", ...) and maps each part back to a parsed listing or
    /// its own error; a rejected part never voids the others.
    pub async fn batch_list_events(
        &self,
        calendar_ids: &[String],
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> ApiResult<Vec<BatchOutcome>> {
        let mut batch = BatchRequest::new();
        for (index, calendar_id) in calendar_ids.iter().enumerate() {
            batch.add_get(
                (index + 1).to_string(),
                events_list_path(calendar_id, time_min, time_max),
            );
        }

        let parts = self.execute_batch(&batch).await?;

        Ok(parts
            .into_iter()
            .map(|part| {
                let result = if part.is_success() {
                    serde_json::from_str::<EventListResponse>(&part.body)
                        .map(|page| page.items)
                        .map_err(|e| {
                            ApiError::invalid_response(format!("failed to parse response: {}", e))
                        })
                } else {
                    Err(part_error(&part))
                };
                BatchOutcome {
                    content_id: part.content_id,
                    result,
                }
            })
            .collect())
    }

    /// Executes a batch of sub-requests in one round trip.
    ///
    /// Each part resolves independently; a failing part comes back as
    /// a part with a non-2xx status, not as an error of the whole call.
    pub async fn execute_batch(
        &self,
        batch: &BatchRequest,
    ) -> ApiResult<Vec<BatchResponsePart>> {
        debug!("dispatching batch of {} requests", batch.len());

        let response = self
            .http_client
            .post(BATCH_API_BASE)
            .bearer_auth(&self.access_token)
            .header(
                "Content-Type",
                format!("multipart/mixed; boundary={}", batch.boundary()),
            )
            .body(batch.encode())
            .send()
            .await
            .map_err(map_send_error)?;

        let response = check_status(response).await?;

        let content_type = response
            .headers()
            .get("Content-Type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let body = response
            .text()
            .await
            .map_err(|e| ApiError::network(format!("failed to read response: {}", e)))?;

        parse_batch_response(&content_type, &body)
    }
}

/// Outcome of one sub-request in a batch listing.
#[derive(Debug)]
pub struct BatchOutcome {
    /// Content-ID assigned to the sub-request ("1", "2", ...).
    pub content_id: String,
    /// The parsed listing, or the failure of this part alone.
    pub result: ApiResult<Vec<EventBody>>,
}

/// Path of an events.list sub-request, relative to the API host.
fn events_list_path(
    calendar_id: &str,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
) -> String {
    format!(
        "/calendar/v3/calendars/{}/events?singleEvents=true&timeMin={}&timeMax={}",
        urlencoding::encode(calendar_id),
        urlencoding::encode(&time_min.to_rfc3339()),
        urlencoding::encode(&time_max.to_rfc3339()),
    )
}

/// Maps a failed batch part to the matching error kind.
fn part_error(part: &BatchResponsePart) -> ApiError {
    let message = error_message_from_body(&part.body).unwrap_or_else(|| part.body.clone());
    match part.status {
        400 => ApiError::bad_request(message),
        401 => ApiError::authentication(message),
        403 => ApiError::authorization(message),
        404 => ApiError::not_found(message),
        412 => ApiError::precondition_failed(message),
        429 => ApiError::rate_limited(message),
        _ => ApiError::server(format!("API error ({}): {}", part.status, message)),
    }
}

/// Pulls the human-readable message out of a Google error body.
fn error_message_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(String::from)
}

/// Query switches the API requires before it honors conference or
/// attachment payloads.
fn feature_params(event: &EventBody) -> Vec<(&'static str, &'static str)> {
    let mut params = Vec::new();
    if event
        .conference_data
        .as_ref()
        .is_some_and(|cd| cd.create_request.is_some())
    {
        params.push(("conferenceDataVersion", "1"));
    }
    if event.attachments.as_ref().is_some_and(|a| !a.is_empty()) {
        params.push(("supportsAttachments", "true"));
    }
    params
}

fn map_send_error(e: reqwest::Error) -> ApiError {
    if e.is_timeout() {
        ApiError::network("request timeout")
    } else if e.is_connect() {
        ApiError::network(format!("connection failed: {}", e))
    } else {
        ApiError::network(format!("request failed: {}", e))
    }
}

/// Maps an unsuccessful status to the matching error kind.
async fn check_status(response: reqwest::Response) -> ApiResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = response
        .headers()
        .get("Retry-After")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();
    Err(status_error(status, retry_after, &body))
}

/// Error for one unsuccessful status, with the Retry-After hint and
/// response body already extracted.
fn status_error(status: reqwest::StatusCode, retry_after: Option<u64>, body: &str) -> ApiError {
    match status {
        reqwest::StatusCode::TOO_MANY_REQUESTS => ApiError::rate_limited(format!(
            "rate limit exceeded{}",
            retry_after
                .map(|s| format!(", retry after {} seconds", s))
                .unwrap_or_default()
        )),
        reqwest::StatusCode::UNAUTHORIZED => {
            ApiError::authentication("access token expired or invalid")
        }
        reqwest::StatusCode::FORBIDDEN => ApiError::authorization("access denied to calendar"),
        reqwest::StatusCode::PRECONDITION_FAILED => {
            ApiError::precondition_failed("the entity changed since it was fetched")
        }
        reqwest::StatusCode::NOT_FOUND => {
            ApiError::not_found(format!("resource not found: {}", body))
        }
        reqwest::StatusCode::BAD_REQUEST => {
            ApiError::bad_request(format!("invalid request: {}", body))
        }
        _ => ApiError::server(format!("API error ({}): {}", status, body)),
    }
}

async fn parse_json<T: serde::de::DeserializeOwned>(response: reqwest::Response) -> ApiResult<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ApiError::network(format!("failed to read response: {}", e)))?;

    serde_json::from_str(&body)
        .map_err(|e| ApiError::invalid_response(format!("failed to parse response: {}", e)))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string(value)
        .map_err(|e| ApiError::internal(format!("failed to serialize request: {}", e)))
}

/// Response from the events.list endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventListResponse {
    #[serde(default)]
    items: Vec<EventBody>,
    next_page_token: Option<String>,
}

/// Response from the acl.list endpoint.
#[derive(Debug, Deserialize)]
struct AclListResponse {
    #[serde(default)]
    items: Vec<AclRule>,
}

/// Response from the calendarList.list endpoint.
#[derive(Debug, Deserialize)]
struct CalendarListResponse {
    #[serde(default)]
    items: Vec<CalendarListEntry>,
}
