//! Golden tests for menu output formatting.
//!
//! These tests pin the complete rendered reports with insta inline
//! snapshots so a wording or layout change fails visibly. Run
//! `cargo insta review` to update snapshots after intentional changes.

use crate::calendar::CalendarListEntry;
use crate::event::EventBody;
use crate::freebusy::FreeBusyResponse;

use super::{
    availability_report, batch_report, calendar_list_report, event_details, event_list_report,
};

fn event(json: &str) -> EventBody {
    serde_json::from_str(json).unwrap()
}

#[test]
fn golden_listing_mixed_types() {
    let planning = event(
        r#"{
            "id": "e1",
            "summary": "Planning",
            "start": {"dateTime": "2025-03-03T09:00:00+09:00", "timeZone": "Asia/Tokyo"}
        }"#,
    );
    let birthday = event(
        r#"{
            "id": "e2",
            "summary": "Dad's Birthday",
            "start": {"date": "2025-03-07"},
            "eventType": "birthday"
        }"#,
    );
    let standup = event(
        r#"{
            "id": "e3",
            "summary": "Standup",
            "start": {"dateTime": "2025-03-04T10:00:00Z"},
            "recurringEventId": "parent1"
        }"#,
    );

    let output = event_list_report(&[&planning, &birthday, &standup], None);

    insta::assert_snapshot!(output, @r"
    2025-03-03T09:00:00+09:00 - Planning (ID: e1, Type: default)
    2025-03-07 - Dad's Birthday (ID: e2, Type: birthday)
    2025-03-04T10:00:00Z - Standup (ID: e3, Type: recurring)
    ");
}

#[test]
fn golden_details_card_full() {
    let e = event(
        r#"{
            "id": "e9",
            "summary": "Quarterly Review",
            "start": {"dateTime": "2025-03-10T14:00:00+00:00", "timeZone": "Europe/London"},
            "end": {"dateTime": "2025-03-10T15:30:00+00:00", "timeZone": "Europe/London"},
            "location": "Room 4",
            "description": "Slides in the shared drive",
            "conferenceData": {
                "entryPoints": [
                    {"entryPointType": "video", "uri": "https://meet.google.com/abc-defg-hij"}
                ]
            }
        }"#,
    );

    insta::assert_snapshot!(event_details(&e), @r"
    --- Event Details ---
    Title: Quarterly Review
    Start Time: 2025-03-10T14:00:00+00:00
    End Time: 2025-03-10T15:30:00+00:00
    Location: Room 4
    Event Type: default
    Description: Slides in the shared drive
    Google Meet Link: https://meet.google.com/abc-defg-hij
    ---------------------
    ");
}

#[test]
fn golden_details_card_sparse() {
    let e = event(r#"{"id": "e10"}"#);

    insta::assert_snapshot!(event_details(&e), @r"
    --- Event Details ---
    Title: No Title
    Start Time: (unset)
    End Time: (unset)
    Location: No Location
    Event Type: default
    Description: No Description
    Google Meet Link: None
    ---------------------
    ");
}

#[test]
fn golden_availability_across_calendars() {
    let response: FreeBusyResponse = serde_json::from_str(
        r#"{
            "calendars": {
                "alpha@example.com": {
                    "busy": [
                        {"start": "2025-03-01T10:00:00Z", "end": "2025-03-01T10:30:00Z"},
                        {"start": "2025-03-01T10:45:00Z", "end": "2025-03-01T11:00:00Z"}
                    ]
                },
                "bravo@example.com": {"busy": []},
                "ghost@example.com": {
                    "errors": [{"domain": "global", "reason": "notFound"}]
                }
            }
        }"#,
    )
    .unwrap();

    insta::assert_snapshot!(availability_report(&response), @r"
    alpha@example.com: Time slot is NOT available.
    alpha@example.com: Busy from 2025-03-01T10:00:00Z to 2025-03-01T10:30:00Z
    alpha@example.com: Busy from 2025-03-01T10:45:00Z to 2025-03-01T11:00:00Z
    bravo@example.com: Time slot is available.
    ghost@example.com: Could not check availability (notFound)
    ");
}

#[test]
fn golden_batch_outcomes() {
    let output = batch_report([
        ("1", Ok("3 events".to_string())),
        ("2", Err("not_found: resource not found: calendar".to_string())),
        ("3", Ok("0 events".to_string())),
    ]);

    insta::assert_snapshot!(output, @r"
    Request 1 executed successfully: 3 events
    Error in request 2: not_found: resource not found: calendar
    Request 3 executed successfully: 0 events
    Batch request executed.
    ");
}

#[test]
fn golden_calendar_listing() {
    let entries: Vec<CalendarListEntry> = serde_json::from_str(
        r#"[
            {"id": "primary", "summary": "Personal", "primary": true},
            {"id": "team@example.com", "summary": "Team Calendar"},
            {"id": "rooms@example.com", "summary": "Meeting Rooms"}
        ]"#,
    )
    .unwrap();

    insta::assert_snapshot!(calendar_list_report(&entries), @r"
    Resource Name: Personal, ID: primary
    Resource Name: Team Calendar, ID: team@example.com
    Resource Name: Meeting Rooms, ID: rooms@example.com
    ");
}
