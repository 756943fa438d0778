//! Payload builders.
//!
//! Pure functions from collected [`FieldValues`] (plus, for mutations, the
//! fetched current event) to complete request bodies. Nothing here touches
//! the network; a builder failure is a [`ValidationError`] and aborts the
//! command before any request is issued.

use chrono::{NaiveDateTime, TimeZone};
use chrono_tz::Tz;

use crate::event::{
    Attachment, Attendee, ConferenceData, ConferenceRequest, ConferenceSolutionKey, EventBody,
    EventDateTime, EventType, ReminderOverride, Reminders,
};
use crate::field::{FieldValues, ValidationError};

/// Default reminder lead times, minutes before the event start.
pub const DEFAULT_EMAIL_REMINDER_MINUTES: u32 = 1440;
pub const DEFAULT_POPUP_REMINDER_MINUTES: u32 = 30;

/// Resolves a wall-clock datetime in `zone` to an offset-qualified RFC 3339
/// string.
///
/// Fails when the zone's rules make the local time ambiguous or skip it
/// entirely (daylight-saving transitions).
pub fn zoned_rfc3339(dt: NaiveDateTime, zone: Tz) -> Result<String, ValidationError> {
    zone.from_local_datetime(&dt)
        .single()
        .map(|resolved| resolved.to_rfc3339())
        .ok_or_else(|| {
            ValidationError::rule(format!(
                "{} is ambiguous or does not exist in {}",
                dt.format("%Y-%m-%d %H:%M"),
                zone.name()
            ))
        })
}

/// Resolves a wall-clock datetime in `zone` to an event time carrying both
/// the timestamp and the zone name.
pub fn zoned_event_time(dt: NaiveDateTime, zone: Tz) -> Result<EventDateTime, ValidationError> {
    Ok(EventDateTime::zoned(zoned_rfc3339(dt, zone)?, zone.name()))
}

/// A plain timed event: summary, optional description, start/end resolved
/// in the collected zone, event type `default`.
///
/// Expects fields `summary`, `description` (optional), `start`, `end`,
/// `zone`.
pub fn build_create_default(values: &FieldValues) -> Result<EventBody, ValidationError> {
    let zone = values.require_zone("zone")?;
    let start = zoned_event_time(values.require_datetime("start")?, zone)?;
    let end = zoned_event_time(values.require_datetime("end")?, zone)?;

    Ok(EventBody {
        summary: Some(values.require_text("summary")?.to_string()),
        description: values.text("description").map(str::to_string),
        start: Some(start),
        end: Some(end),
        event_type: Some(EventType::Default),
        ..EventBody::default()
    })
}

/// A yearly recurring all-day birthday event.
///
/// The service manages these specially: transparent, private, and closed to
/// attendee changes. Expects fields `summary` and `date`.
pub fn build_create_birthday(values: &FieldValues) -> Result<EventBody, ValidationError> {
    let date = values
        .require_date("date")?
        .format("%Y-%m-%d")
        .to_string();

    Ok(EventBody {
        summary: Some(values.require_text("summary")?.to_string()),
        start: Some(EventDateTime::all_day(date.clone())),
        end: Some(EventDateTime::all_day(date)),
        recurrence: Some(vec!["RRULE:FREQ=YEARLY".to_string()]),
        transparency: Some("transparent".to_string()),
        visibility: Some("private".to_string()),
        event_type: Some(EventType::Birthday),
        ..EventBody::default()
    })
}

/// A timed event asking the service to provision a Google Meet conference.
///
/// `request_id` makes the provisioning request idempotent; the caller
/// generates a fresh unique id per attempt. The insert must be issued with
/// `conferenceDataVersion=1` for the request to be honored.
pub fn build_create_with_meet(
    values: &FieldValues,
    request_id: &str,
) -> Result<EventBody, ValidationError> {
    let mut body = build_create_default(values)?;
    body.conference_data = Some(ConferenceData {
        create_request: Some(ConferenceRequest {
            request_id: request_id.to_string(),
            conference_solution_key: Some(ConferenceSolutionKey {
                kind: "hangoutsMeet".to_string(),
            }),
            extra: serde_json::Map::new(),
        }),
        ..ConferenceData::default()
    });
    Ok(body)
}

/// A timed event carrying one Drive file attachment.
///
/// Expects the `build_create_default` fields plus `file_url` and
/// `attachment_title` (optional). The insert must be issued with
/// `supportsAttachments=true`.
pub fn build_create_with_attachment(values: &FieldValues) -> Result<EventBody, ValidationError> {
    let mut body = build_create_default(values)?;
    body.attachments = Some(vec![Attachment {
        file_url: values.require_url("file_url")?.to_string(),
        title: values.text("attachment_title").map(str::to_string),
        ..Attachment::default()
    }]);
    Ok(body)
}

/// Overlays user-supplied fields on a fetched event.
///
/// Absent keys leave the fetched value untouched, so a blank title keeps
/// the current title. New times are resolved in the collected zone when one
/// was supplied, otherwise in the event's existing zone, falling back to
/// UTC only when the event has none.
pub fn apply_update(
    current: &EventBody,
    values: &FieldValues,
) -> Result<EventBody, ValidationError> {
    let mut updated = current.clone();

    if let Some(summary) = values.text("summary") {
        updated.summary = Some(summary.to_string());
    }
    if let Some(description) = values.text("description") {
        updated.description = Some(description.to_string());
    }
    if let Some(location) = values.text("location") {
        updated.location = Some(location.to_string());
    }

    let zone = match values.zone("zone") {
        Some(zone) => zone,
        None => existing_zone(current)?,
    };
    if let Some(start) = values.datetime("start") {
        updated.start = Some(zoned_event_time(start, zone)?);
    }
    if let Some(end) = values.datetime("end") {
        updated.end = Some(zoned_event_time(end, zone)?);
    }

    Ok(updated)
}

/// The zone a fetched event's times are declared in, defaulting to UTC.
fn existing_zone(event: &EventBody) -> Result<Tz, ValidationError> {
    let Some(name) = event.start.as_ref().and_then(|s| s.time_zone.as_deref()) else {
        return Ok(chrono_tz::UTC);
    };
    name.parse::<Tz>()
        .map_err(|_| ValidationError::rule(format!("event carries unknown time zone {name:?}")))
}

/// Appends attendees to a fetched event.
///
/// Birthday events are rejected up front: the service refuses attendee
/// changes on them, so failing locally avoids a doomed write. With `dedupe`
/// off, repeated invites of the same address produce duplicate entries,
/// matching what the service actually stores; with it on, addresses already
/// present are skipped (case-insensitively).
pub fn apply_invite(
    current: &EventBody,
    emails: &[String],
    dedupe: bool,
) -> Result<EventBody, ValidationError> {
    if current.is_birthday() {
        return Err(ValidationError::rule(
            "cannot invite attendees to a birthday event",
        ));
    }

    let mut updated = current.clone();
    let mut attendees = updated.attendees.take().unwrap_or_default();
    for email in emails {
        if dedupe
            && attendees
                .iter()
                .any(|a| a.email.eq_ignore_ascii_case(email))
        {
            continue;
        }
        attendees.push(Attendee::new(email.clone()));
    }
    updated.attendees = Some(attendees);
    Ok(updated)
}

/// Replaces an event's reminder configuration with explicit email and popup
/// overrides, disabling the calendar defaults.
pub fn apply_reminders(current: &EventBody, email_minutes: u32, popup_minutes: u32) -> EventBody {
    let mut updated = current.clone();
    updated.reminders = Some(Reminders {
        use_default: false,
        overrides: Some(vec![
            ReminderOverride {
                method: "email".to_string(),
                minutes: email_minutes,
            },
            ReminderOverride {
                method: "popup".to_string(),
                minutes: popup_minutes,
            },
        ]),
    });
    updated
}

/// Sets one private extended property on an event.
///
/// The whole mapping is written back, so concurrent writers race with
/// last-write-wins semantics; the conditional write in the session layer
/// turns a lost race into a reported conflict instead of a silent
/// overwrite.
pub fn apply_extended_property(current: &EventBody, key: &str, value: &str) -> EventBody {
    let mut updated = current.clone();
    let mut props = updated.extended_properties.take().unwrap_or_default();
    let mut private = props.private.take().unwrap_or_default();
    private.insert(key.to_string(), value.to_string());
    props.private = Some(private);
    updated.extended_properties = Some(props);
    updated
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::field::{FieldValue, FieldValues};

    fn values(entries: &[(&'static str, FieldValue)]) -> FieldValues {
        let mut out = FieldValues::default();
        for (key, value) in entries {
            out.insert(key, value.clone());
        }
        out
    }

    fn naive(s: &str) -> NaiveDateTime {
        NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M").unwrap()
    }

    mod create {
        use super::*;

        #[test]
        fn resolves_local_time_with_offset_and_zone_name() {
            let fields = values(&[
                ("summary", FieldValue::Text("Planning".to_string())),
                ("start", FieldValue::DateTime(naive("2025-03-01 10:00"))),
                ("end", FieldValue::DateTime(naive("2025-03-01 11:00"))),
                ("zone", FieldValue::Zone(chrono_tz::Europe::London)),
            ]);

            let body = build_create_default(&fields).unwrap();
            let start = body.start.unwrap();
            assert_eq!(start.date_time.as_deref(), Some("2025-03-01T10:00:00+00:00"));
            assert_eq!(start.time_zone.as_deref(), Some("Europe/London"));
            let end = body.end.unwrap();
            assert_eq!(end.date_time.as_deref(), Some("2025-03-01T11:00:00+00:00"));
            assert_eq!(body.event_type, Some(EventType::Default));
        }

        #[test]
        fn non_utc_offset_is_qualified() {
            let fields = values(&[
                ("summary", FieldValue::Text("Sync".to_string())),
                ("start", FieldValue::DateTime(naive("2025-07-01 09:00"))),
                ("end", FieldValue::DateTime(naive("2025-07-01 09:30"))),
                ("zone", FieldValue::Zone(chrono_tz::Asia::Kolkata)),
            ]);

            let body = build_create_default(&fields).unwrap();
            assert_eq!(
                body.start.unwrap().date_time.as_deref(),
                Some("2025-07-01T09:00:00+05:30")
            );
        }

        #[test]
        fn skipped_local_time_is_rejected() {
            // Europe/London springs forward over 01:00-02:00 on 2025-03-30.
            let err = zoned_rfc3339(naive("2025-03-30 01:30"), chrono_tz::Europe::London)
                .unwrap_err();
            assert!(err.to_string().contains("does not exist"));
        }

        #[test]
        fn missing_summary_fails_before_any_request() {
            let fields = values(&[
                ("start", FieldValue::DateTime(naive("2025-03-01 10:00"))),
                ("end", FieldValue::DateTime(naive("2025-03-01 11:00"))),
                ("zone", FieldValue::Zone(chrono_tz::UTC)),
            ]);
            assert!(build_create_default(&fields).is_err());
        }

        #[test]
        fn birthday_shape() {
            let fields = values(&[
                ("summary", FieldValue::Text("Maya's Birthday".to_string())),
                (
                    "date",
                    FieldValue::Date(chrono::NaiveDate::from_ymd_opt(2025, 1, 29).unwrap()),
                ),
            ]);

            let body = build_create_birthday(&fields).unwrap();
            assert_eq!(body.start.unwrap().date.as_deref(), Some("2025-01-29"));
            assert_eq!(body.end.unwrap().date.as_deref(), Some("2025-01-29"));
            assert_eq!(
                body.recurrence.as_deref(),
                Some(&["RRULE:FREQ=YEARLY".to_string()][..])
            );
            assert_eq!(body.transparency.as_deref(), Some("transparent"));
            assert_eq!(body.visibility.as_deref(), Some("private"));
            assert_eq!(body.event_type, Some(EventType::Birthday));
        }

        #[test]
        fn meet_request_carries_id_and_solution() {
            let fields = values(&[
                ("summary", FieldValue::Text("Demo".to_string())),
                ("start", FieldValue::DateTime(naive("2025-03-01 10:00"))),
                ("end", FieldValue::DateTime(naive("2025-03-01 11:00"))),
                ("zone", FieldValue::Zone(chrono_tz::UTC)),
            ]);

            let body = build_create_with_meet(&fields, "req-42").unwrap();
            let request = body.conference_data.unwrap().create_request.unwrap();
            assert_eq!(request.request_id, "req-42");
            assert_eq!(
                request.conference_solution_key.unwrap().kind,
                "hangoutsMeet"
            );
        }

        #[test]
        fn attachment_uses_supplied_url_and_title() {
            let fields = values(&[
                ("summary", FieldValue::Text("Review".to_string())),
                ("start", FieldValue::DateTime(naive("2025-03-01 10:00"))),
                ("end", FieldValue::DateTime(naive("2025-03-01 11:00"))),
                ("zone", FieldValue::Zone(chrono_tz::UTC)),
                (
                    "file_url",
                    FieldValue::Url("https://docs.google.com/document/d/abc".to_string()),
                ),
                ("attachment_title", FieldValue::Text("Q1 notes".to_string())),
            ]);

            let body = build_create_with_attachment(&fields).unwrap();
            let attachments = body.attachments.unwrap();
            assert_eq!(attachments.len(), 1);
            assert_eq!(attachments[0].file_url, "https://docs.google.com/document/d/abc");
            assert_eq!(attachments[0].title.as_deref(), Some("Q1 notes"));
        }
    }

    mod update {
        use super::*;

        fn fetched() -> EventBody {
            serde_json::from_str(
                r#"{
                    "id": "evt1",
                    "etag": "\"v1\"",
                    "summary": "Original title",
                    "description": "Original description",
                    "start": {"dateTime": "2025-03-01T10:00:00+09:00", "timeZone": "Asia/Tokyo"},
                    "end": {"dateTime": "2025-03-01T11:00:00+09:00", "timeZone": "Asia/Tokyo"},
                    "colorId": "7"
                }"#,
            )
            .unwrap()
        }

        #[test]
        fn blank_title_keeps_fetched_title() {
            let fields = values(&[(
                "description",
                FieldValue::Text("Updated description".to_string()),
            )]);

            let updated = apply_update(&fetched(), &fields).unwrap();
            assert_eq!(updated.summary.as_deref(), Some("Original title"));
            assert_eq!(updated.description.as_deref(), Some("Updated description"));
        }

        #[test]
        fn new_time_without_zone_uses_existing_zone() {
            let fields = values(&[("start", FieldValue::DateTime(naive("2025-03-02 09:00")))]);

            let updated = apply_update(&fetched(), &fields).unwrap();
            let start = updated.start.unwrap();
            assert_eq!(start.date_time.as_deref(), Some("2025-03-02T09:00:00+09:00"));
            assert_eq!(start.time_zone.as_deref(), Some("Asia/Tokyo"));
            // End was not supplied, so the fetched value stays.
            assert_eq!(
                updated.end.unwrap().date_time.as_deref(),
                Some("2025-03-01T11:00:00+09:00")
            );
        }

        #[test]
        fn new_zone_applies_to_new_times() {
            let fields = values(&[
                ("start", FieldValue::DateTime(naive("2025-03-02 09:00"))),
                ("zone", FieldValue::Zone(chrono_tz::Europe::Paris)),
            ]);

            let updated = apply_update(&fetched(), &fields).unwrap();
            let start = updated.start.unwrap();
            assert_eq!(start.date_time.as_deref(), Some("2025-03-02T09:00:00+01:00"));
            assert_eq!(start.time_zone.as_deref(), Some("Europe/Paris"));
        }

        #[test]
        fn zone_falls_back_to_utc_when_event_has_none() {
            let bare: EventBody = serde_json::from_str(
                r#"{"id": "evt2", "summary": "No zone", "start": {"date": "2025-03-01"}}"#,
            )
            .unwrap();
            let fields = values(&[("start", FieldValue::DateTime(naive("2025-03-02 09:00")))]);

            let updated = apply_update(&bare, &fields).unwrap();
            assert_eq!(
                updated.start.unwrap().date_time.as_deref(),
                Some("2025-03-02T09:00:00+00:00")
            );
        }

        #[test]
        fn unmodeled_fields_ride_along() {
            let fields = values(&[("summary", FieldValue::Text("Renamed".to_string()))]);
            let updated = apply_update(&fetched(), &fields).unwrap();
            let out = serde_json::to_value(&updated).unwrap();
            assert_eq!(out["colorId"], "7");
            assert_eq!(out["etag"], "\"v1\"");
        }
    }

    mod invite {
        use super::*;

        fn with_attendees() -> EventBody {
            serde_json::from_str(
                r#"{
                    "id": "evt1",
                    "summary": "Kickoff",
                    "attendees": [
                        {"email": "host@example.com", "organizer": true, "responseStatus": "accepted"}
                    ]
                }"#,
            )
            .unwrap()
        }

        #[test]
        fn birthday_is_rejected() {
            let birthday: EventBody =
                serde_json::from_str(r#"{"id": "b1", "eventType": "birthday"}"#).unwrap();
            let err = apply_invite(&birthday, &["a@example.com".to_string()], false).unwrap_err();
            assert!(err.to_string().contains("birthday"));
        }

        #[test]
        fn appends_without_dedupe_by_default() {
            let current = with_attendees();
            let updated = apply_invite(
                &current,
                &["host@example.com".to_string(), "new@example.com".to_string()],
                false,
            )
            .unwrap();

            let attendees = updated.attendees.unwrap();
            // The duplicate of host@example.com is kept, matching what the
            // service stores on repeated invites.
            assert_eq!(attendees.len(), 3);
            assert_eq!(attendees[1].email, "host@example.com");
            assert_eq!(attendees[2].email, "new@example.com");
        }

        #[test]
        fn dedupe_skips_present_addresses_case_insensitively() {
            let current = with_attendees();
            let updated = apply_invite(
                &current,
                &["HOST@example.com".to_string(), "new@example.com".to_string()],
                true,
            )
            .unwrap();

            let attendees = updated.attendees.unwrap();
            assert_eq!(attendees.len(), 2);
            assert_eq!(attendees[1].email, "new@example.com");
        }

        #[test]
        fn existing_entries_keep_their_flags() {
            let updated =
                apply_invite(&with_attendees(), &["new@example.com".to_string()], false).unwrap();
            let out = serde_json::to_value(&updated).unwrap();
            assert_eq!(out["attendees"][0]["organizer"], true);
            assert_eq!(out["attendees"][0]["responseStatus"], "accepted");
        }

        #[test]
        fn event_without_attendees_starts_a_list() {
            let bare: EventBody = serde_json::from_str(r#"{"id": "evt3"}"#).unwrap();
            let updated = apply_invite(&bare, &["solo@example.com".to_string()], false).unwrap();
            assert_eq!(updated.attendees.unwrap().len(), 1);
        }
    }

    mod reminders_and_properties {
        use super::*;

        #[test]
        fn reminders_replace_defaults_wholesale() {
            let current: EventBody = serde_json::from_str(
                r#"{"id": "evt1", "reminders": {"useDefault": true}}"#,
            )
            .unwrap();

            let updated = apply_reminders(
                &current,
                DEFAULT_EMAIL_REMINDER_MINUTES,
                DEFAULT_POPUP_REMINDER_MINUTES,
            );
            let reminders = updated.reminders.unwrap();
            assert!(!reminders.use_default);
            let overrides = reminders.overrides.unwrap();
            assert_eq!(overrides[0].method, "email");
            assert_eq!(overrides[0].minutes, 1440);
            assert_eq!(overrides[1].method, "popup");
            assert_eq!(overrides[1].minutes, 30);
        }

        #[test]
        fn extended_property_from_empty() {
            let current: EventBody = serde_json::from_str(r#"{"id": "evt1"}"#).unwrap();
            let updated = apply_extended_property(&current, "k", "v");
            let private = updated.extended_properties.unwrap().private.unwrap();
            assert_eq!(private.len(), 1);
            assert_eq!(private["k"], "v");
        }

        #[test]
        fn extended_property_overwrites_existing_key() {
            let current: EventBody = serde_json::from_str(
                r#"{
                    "id": "evt1",
                    "extendedProperties": {"private": {"k": "old", "other": "kept"}}
                }"#,
            )
            .unwrap();

            let updated = apply_extended_property(&current, "k", "new");
            let private = updated.extended_properties.unwrap().private.unwrap();
            assert_eq!(private["k"], "new");
            assert_eq!(private["other"], "kept");
        }
    }
}
