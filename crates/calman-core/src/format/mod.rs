//! Response formatting.
//!
//! Renders fetched entities and operation outcomes as the plain text the
//! menu prints. Formatters take parsed types and return `String`s; they
//! never talk to the network, so every command's output is testable without
//! a session.

use crate::acl::AclRule;
use crate::calendar::{CalendarListEntry, WatchChannel};
use crate::event::EventBody;
use crate::freebusy::FreeBusyResponse;

fn title_of(event: &EventBody) -> &str {
    event.summary.as_deref().unwrap_or("No Title")
}

fn id_of(event: &EventBody) -> &str {
    event.id.as_deref().unwrap_or("(no id)")
}

fn link_of(event: &EventBody) -> &str {
    event.html_link.as_deref().unwrap_or("(no link)")
}

fn time_of(slot: Option<&crate::event::EventDateTime>) -> &str {
    slot.map(|s| s.display()).unwrap_or("(unset)")
}

/// One listing line: `{start} - {summary} (ID: {id}, Type: {type})`.
pub fn event_line(event: &EventBody) -> String {
    format!(
        "{} - {} (ID: {}, Type: {})",
        time_of(event.start.as_ref()),
        title_of(event),
        id_of(event),
        event.display_type()
    )
}

/// A listing of already-filtered events; `filter_label` names the type
/// filter for the empty message.
pub fn event_list_report(events: &[&EventBody], filter_label: Option<&str>) -> String {
    if events.is_empty() {
        return format!("No {} events found.", filter_label.unwrap_or("all"));
    }
    events
        .iter()
        .map(|e| event_line(e))
        .collect::<Vec<_>>()
        .join("\n")
}

/// The detail card printed by the read command.
pub fn event_details(event: &EventBody) -> String {
    let meet_link = event
        .conference_data
        .as_ref()
        .and_then(|cd| cd.video_uri())
        .unwrap_or("None");

    format!(
        "--- Event Details ---\n\
         Title: {}\n\
         Start Time: {}\n\
         End Time: {}\n\
         Location: {}\n\
         Event Type: {}\n\
         Description: {}\n\
         Google Meet Link: {}\n\
         ---------------------",
        title_of(event),
        time_of(event.start.as_ref()),
        time_of(event.end.as_ref()),
        event.location.as_deref().unwrap_or("No Location"),
        event.display_type(),
        event.description.as_deref().unwrap_or("No Description"),
        meet_link,
    )
}

/// Outcome of a plain create.
pub fn created(event: &EventBody) -> String {
    format!("Event created successfully!\nEvent ID: {}", id_of(event))
}

/// Outcome of a create that is best followed by its link (attachments).
pub fn created_with_link(event: &EventBody) -> String {
    format!("Event created: {}", link_of(event))
}

/// Outcome of a create that provisioned a Google Meet conference.
pub fn created_with_meet(event: &EventBody) -> String {
    let meet_link = event
        .conference_data
        .as_ref()
        .and_then(|cd| cd.video_uri())
        .unwrap_or("None");
    format!(
        "Event created: {}\nGoogle Meet Link: {}",
        link_of(event),
        meet_link
    )
}

/// Outcome of an update.
pub fn updated(event: &EventBody) -> String {
    format!("Event Updated successfully!\nEvent ID: {}", id_of(event))
}

/// Outcome of a delete.
pub fn deleted() -> &'static str {
    "Event deleted successfully."
}

/// Availability report over one or more calendars.
///
/// A calendar with no busy intervals is available; one with intervals is
/// not, and every conflicting interval's bounds are listed. Per-calendar
/// lookup errors are reported without failing the other calendars. With a
/// single calendar the lines carry no id prefix.
pub fn availability_report(response: &FreeBusyResponse) -> String {
    let single = response.calendars.len() == 1;
    let mut lines = Vec::new();

    for (id, calendar) in &response.calendars {
        let prefix = if single {
            String::new()
        } else {
            format!("{id}: ")
        };

        if !calendar.errors.is_empty() {
            let reasons: Vec<&str> = calendar.errors.iter().map(|e| e.reason.as_str()).collect();
            lines.push(format!(
                "{prefix}Could not check availability ({})",
                reasons.join(", ")
            ));
            continue;
        }

        if calendar.busy.is_empty() {
            lines.push(format!("{prefix}Time slot is available."));
        } else {
            lines.push(format!("{prefix}Time slot is NOT available."));
            for interval in &calendar.busy {
                lines.push(format!(
                    "{prefix}Busy from {} to {}",
                    interval.start, interval.end
                ));
            }
        }
    }

    lines.join("\n")
}

/// Outcome of granting access.
pub fn access_granted(rule: &AclRule) -> String {
    let who = rule.scope.value.as_deref().unwrap_or("(unknown)");
    format!("Access granted to {} as {}.", who, rule.role)
}

/// Outcome of revoking access.
pub fn access_revoked(email: &str) -> String {
    format!("Access revoked for {email}.")
}

/// Printed when a revoke finds no matching user rule.
pub fn no_explicit_access() -> &'static str {
    "User does not have explicit access to this calendar."
}

/// Outcome of inviting attendees.
pub fn invited(event: &EventBody) -> String {
    format!("Users invited successfully to event: {}", link_of(event))
}

/// Outcome of setting reminders.
pub fn reminders_added(event: &EventBody) -> String {
    format!("Reminders added successfully to event: {}", link_of(event))
}

/// Outcome of setting an extended property.
pub fn extended_property_added(event: &EventBody) -> String {
    format!(
        "Extended property added successfully to event: {}",
        link_of(event)
    )
}

/// One calendar-list line.
pub fn calendar_line(entry: &CalendarListEntry) -> String {
    format!("Resource Name: {}, ID: {}", entry.summary, entry.id)
}

/// The calendar listing.
pub fn calendar_list_report(entries: &[CalendarListEntry]) -> String {
    if entries.is_empty() {
        return "No calendars found.".to_string();
    }
    entries
        .iter()
        .map(calendar_line)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Outcome of registering a watch channel.
pub fn watch_created(channel: &WatchChannel) -> String {
    let expiration = match &channel.expiration {
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
        None => "-".to_string(),
    };
    format!(
        "Watch Channel Created: id={}, resource={}, expires={}",
        channel.id,
        channel.resource_id.as_deref().unwrap_or("-"),
        expiration,
    )
}

/// Per-part batch outcomes followed by the closing line. `outcomes` pairs
/// each part's Content-ID with its rendered result or error message.
pub fn batch_report<'a>(
    outcomes: impl IntoIterator<Item = (&'a str, Result<String, String>)>,
) -> String {
    let mut lines = Vec::new();
    for (id, outcome) in outcomes {
        match outcome {
            Ok(summary) => lines.push(format!("Request {id} executed successfully: {summary}")),
            Err(message) => lines.push(format!("Error in request {id}: {message}")),
        }
    }
    lines.push("Batch request executed.".to_string());
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::freebusy::FreeBusyResponse;

    fn event(json: &str) -> EventBody {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn list_line_shape() {
        let e = event(
            r#"{
                "id": "evt1",
                "summary": "Team Sync",
                "start": {"dateTime": "2025-03-01T10:00:00+00:00"}
            }"#,
        );
        assert_eq!(
            event_line(&e),
            "2025-03-01T10:00:00+00:00 - Team Sync (ID: evt1, Type: default)"
        );
    }

    #[test]
    fn list_line_all_day_uses_date() {
        let e = event(
            r#"{"id": "evt2", "summary": "Holiday", "start": {"date": "2025-03-01"}, "eventType": "birthday"}"#,
        );
        assert_eq!(
            event_line(&e),
            "2025-03-01 - Holiday (ID: evt2, Type: birthday)"
        );
    }

    #[test]
    fn empty_listing_names_the_filter() {
        assert_eq!(event_list_report(&[], None), "No all events found.");
        assert_eq!(
            event_list_report(&[], Some("birthday")),
            "No birthday events found."
        );
    }

    #[test]
    fn details_card_includes_meet_link() {
        let e = event(
            r#"{
                "id": "evt1",
                "summary": "Demo",
                "start": {"dateTime": "2025-03-01T10:00:00Z"},
                "end": {"dateTime": "2025-03-01T11:00:00Z"},
                "conferenceData": {
                    "entryPoints": [{"entryPointType": "video", "uri": "https://meet.google.com/abc"}]
                }
            }"#,
        );
        let card = event_details(&e);
        assert!(card.starts_with("--- Event Details ---"));
        assert!(card.contains("Title: Demo"));
        assert!(card.contains("Location: No Location"));
        assert!(card.contains("Google Meet Link: https://meet.google.com/abc"));
    }

    #[test]
    fn details_card_without_conference() {
        let e = event(r#"{"id": "evt1", "summary": "Plain"}"#);
        assert!(event_details(&e).contains("Google Meet Link: None"));
    }

    #[test]
    fn availability_single_calendar_reports_bounds() {
        let response: FreeBusyResponse = serde_json::from_str(
            r#"{
                "calendars": {
                    "primary": {
                        "busy": [{"start": "2025-03-01T10:30:00Z", "end": "2025-03-01T10:45:00Z"}]
                    }
                }
            }"#,
        )
        .unwrap();

        assert_eq!(
            availability_report(&response),
            "Time slot is NOT available.\n\
             Busy from 2025-03-01T10:30:00Z to 2025-03-01T10:45:00Z"
        );
    }

    #[test]
    fn availability_single_calendar_free() {
        let response: FreeBusyResponse =
            serde_json::from_str(r#"{"calendars": {"primary": {"busy": []}}}"#).unwrap();
        assert_eq!(availability_report(&response), "Time slot is available.");
    }

    #[test]
    fn availability_multi_calendar_prefixes_and_surfaces_errors() {
        let response: FreeBusyResponse = serde_json::from_str(
            r#"{
                "calendars": {
                    "a@example.com": {"busy": []},
                    "ghost@example.com": {"errors": [{"domain": "global", "reason": "notFound"}]}
                }
            }"#,
        )
        .unwrap();

        let report = availability_report(&response);
        assert!(report.contains("a@example.com: Time slot is available."));
        assert!(report.contains("ghost@example.com: Could not check availability (notFound)"));
    }

    #[test]
    fn batch_report_keeps_successes_next_to_failures() {
        let report = batch_report([
            ("1", Ok("2 events".to_string())),
            ("2", Err("API error (403): forbidden".to_string())),
        ]);
        assert_eq!(
            report,
            "Request 1 executed successfully: 2 events\n\
             Error in request 2: API error (403): forbidden\n\
             Batch request executed."
        );
    }

    #[test]
    fn outcome_lines() {
        let e = event(
            r#"{"id": "evt9", "htmlLink": "https://calendar.google.com/event?eid=abc"}"#,
        );
        assert_eq!(
            created(&e),
            "Event created successfully!\nEvent ID: evt9"
        );
        assert_eq!(
            updated(&e),
            "Event Updated successfully!\nEvent ID: evt9"
        );
        assert_eq!(
            invited(&e),
            "Users invited successfully to event: https://calendar.google.com/event?eid=abc"
        );
        assert_eq!(deleted(), "Event deleted successfully.");
    }

    #[test]
    fn calendar_listing() {
        let entries: Vec<CalendarListEntry> = serde_json::from_str(
            r#"[
                {"id": "primary", "summary": "Me", "primary": true},
                {"id": "rooms@example.com", "summary": "Rooms"}
            ]"#,
        )
        .unwrap();
        assert_eq!(
            calendar_list_report(&entries),
            "Resource Name: Me, ID: primary\nResource Name: Rooms, ID: rooms@example.com"
        );
        assert_eq!(calendar_list_report(&[]), "No calendars found.");
    }

    #[test]
    fn watch_line() {
        let channel: WatchChannel = serde_json::from_str(
            r#"{"id": "chan-1", "type": "web_hook", "address": "https://example.com/hook",
                "resourceId": "res-9", "expiration": "1426325213000"}"#,
        )
        .unwrap();
        assert_eq!(
            watch_created(&channel),
            "Watch Channel Created: id=chan-1, resource=res-9, expires=1426325213000"
        );
    }
}

#[cfg(test)]
mod golden_tests;
