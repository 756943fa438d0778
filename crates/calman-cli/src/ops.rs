//! The menu commands, in the order the menu lists them.
//!
//! Every command has the same shape: a field spec collected up front, a
//! payload built from the collected values (for edits, overlaid on the
//! fetched current event), one or two session calls, and a formatted
//! report. The interesting logic lives in `calman_core::payload` and
//! `calman_core::format`; the structs here wire it to the API.

use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use uuid::Uuid;

use calman_core::acl::{ACL_ROLES, AclRule};
use calman_core::calendar::WatchChannel;
use calman_core::event::EventBody;
use calman_core::field::{FieldDef, FieldKind, FieldValues};
use calman_core::freebusy::FreeBusyRequest;
use calman_core::{format, payload};
use calman_google::BoxFuture;

use crate::error::CliResult;
use crate::menu::{CommandContext, MenuCommand};

/// Listable event types, plus `all` (no filter) and `recurring` (instances
/// expanded from a recurring series, reported under their parent's type).
const EVENT_TYPE_FILTERS: &[&str] = &[
    "all",
    "default",
    "birthday",
    "fromGmail",
    "focusTime",
    "outOfOffice",
    "workingLocation",
    "recurring",
];

/// The listing window: blank start means now, blank end thirty days out.
fn window(values: &FieldValues) -> (DateTime<Utc>, DateTime<Utc>) {
    let now = Utc::now();
    let start = values.datetime("start").map(as_utc).unwrap_or(now);
    let end = values
        .datetime("end")
        .map(as_utc)
        .unwrap_or_else(|| now + Duration::days(30));
    (start, end)
}

fn as_utc(dt: NaiveDateTime) -> DateTime<Utc> {
    Utc.from_utc_datetime(&dt)
}

/// Comma-separated calendar ids, falling back to the context calendar when
/// left blank.
fn calendar_ids(values: &FieldValues, fallback: &str) -> Vec<String> {
    let ids: Vec<String> = values
        .text("calendars")
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .collect();
    if ids.is_empty() {
        vec![fallback.to_string()]
    } else {
        ids
    }
}

pub struct ListEvents;

const LIST_EVENTS_FIELDS: &[FieldDef] = &[
    FieldDef::keep_current("start", "Start time (blank = now)", FieldKind::DateTime),
    FieldDef::keep_current(
        "end",
        "End time (blank = 30 days from now)",
        FieldKind::DateTime,
    ),
    FieldDef::with_default(
        "max_results",
        "Maximum number of events",
        FieldKind::Integer,
        "100",
    ),
    FieldDef::with_default(
        "type",
        "Event type",
        FieldKind::Choice(EVENT_TYPE_FILTERS),
        "all",
    ),
];

impl MenuCommand for ListEvents {
    fn description(&self) -> &'static str {
        "List Events"
    }

    fn fields(&self) -> &'static [FieldDef] {
        LIST_EVENTS_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let (time_min, time_max) = window(&values);
            let max_results = values.require_integer("max_results")? as usize;
            let filter = values.require_choice("type")?;

            let events = ctx
                .api
                .list_events(ctx.calendar_id, time_min, time_max, Some(max_results))
                .await?;

            // Filtering is client-side: the service has no list parameter
            // for event type.
            let filter_label = (filter != "all").then_some(filter);
            let matching: Vec<&EventBody> = events
                .iter()
                .filter(|event| filter_label.is_none_or(|t| event.display_type() == t))
                .collect();
            Ok(format::event_list_report(&matching, filter_label))
        })
    }
}

pub struct ReadEvent;

const READ_EVENT_FIELDS: &[FieldDef] =
    &[FieldDef::required("event_id", "Event ID to read", FieldKind::Text)];

impl MenuCommand for ReadEvent {
    fn description(&self) -> &'static str {
        "Read Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        READ_EVENT_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            let event = ctx.api.get_event(ctx.calendar_id, event_id).await?;
            Ok(format::event_details(&event))
        })
    }
}

pub struct CreateEvent;

const CREATE_EVENT_FIELDS: &[FieldDef] = &[
    FieldDef::required("summary", "Event title", FieldKind::Text),
    FieldDef::keep_current("description", "Event description (blank = none)", FieldKind::Text),
    FieldDef::required("start", "Start time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::required("end", "End time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::with_default("zone", "Time zone", FieldKind::Zone, "UTC"),
];

impl MenuCommand for CreateEvent {
    fn description(&self) -> &'static str {
        "Create Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        CREATE_EVENT_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let body = payload::build_create_default(&values)?;
            let created = ctx.api.insert_event(ctx.calendar_id, &body).await?;
            Ok(format::created(&created))
        })
    }
}

pub struct CreateBirthdayEvent;

const BIRTHDAY_FIELDS: &[FieldDef] = &[
    FieldDef::required("summary", "Birthday event title", FieldKind::Text),
    FieldDef::required("date", "Birthday date (YYYY-MM-DD)", FieldKind::Date),
];

impl MenuCommand for CreateBirthdayEvent {
    fn description(&self) -> &'static str {
        "Create Birthday Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        BIRTHDAY_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let body = payload::build_create_birthday(&values)?;
            let created = ctx.api.insert_event(ctx.calendar_id, &body).await?;
            Ok(format::created(&created))
        })
    }
}

pub struct UpdateEvent;

const UPDATE_EVENT_FIELDS: &[FieldDef] = &[
    FieldDef::required("event_id", "Event ID to update", FieldKind::Text),
    FieldDef::keep_current("summary", "New title (blank = keep)", FieldKind::Text),
    FieldDef::keep_current("description", "New description (blank = keep)", FieldKind::Text),
    FieldDef::keep_current("location", "New location (blank = keep)", FieldKind::Text),
    FieldDef::keep_current("start", "New start time (blank = keep)", FieldKind::DateTime),
    FieldDef::keep_current("end", "New end time (blank = keep)", FieldKind::DateTime),
    FieldDef::keep_current("zone", "Time zone (blank = keep)", FieldKind::Zone),
];

impl MenuCommand for UpdateEvent {
    fn description(&self) -> &'static str {
        "Update Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        UPDATE_EVENT_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            let current = ctx.api.get_event(ctx.calendar_id, event_id).await?;
            let updated = payload::apply_update(&current, &values)?;
            let saved = ctx
                .api
                .update_event(ctx.calendar_id, event_id, &updated)
                .await?;
            Ok(format::updated(&saved))
        })
    }
}

pub struct DeleteEvent;

const DELETE_EVENT_FIELDS: &[FieldDef] =
    &[FieldDef::required("event_id", "Event ID to delete", FieldKind::Text)];

impl MenuCommand for DeleteEvent {
    fn description(&self) -> &'static str {
        "Delete Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        DELETE_EVENT_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            ctx.api.delete_event(ctx.calendar_id, event_id).await?;
            Ok(format::deleted().to_string())
        })
    }
}

pub struct CheckAvailability;

const AVAILABILITY_FIELDS: &[FieldDef] = &[
    FieldDef::required("start", "Start time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::required("end", "End time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::with_default("zone", "Time zone", FieldKind::Zone, "UTC"),
    FieldDef::keep_current(
        "calendars",
        "Calendar IDs, comma-separated (blank = this calendar)",
        FieldKind::Text,
    ),
];

impl MenuCommand for CheckAvailability {
    fn description(&self) -> &'static str {
        "Check Availability"
    }

    fn fields(&self) -> &'static [FieldDef] {
        AVAILABILITY_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let zone = values.require_zone("zone")?;
            let time_min = payload::zoned_rfc3339(values.require_datetime("start")?, zone)?;
            let time_max = payload::zoned_rfc3339(values.require_datetime("end")?, zone)?;
            let query =
                FreeBusyRequest::new(time_min, time_max, calendar_ids(&values, ctx.calendar_id));

            let response = ctx.api.query_free_busy(&query).await?;
            Ok(format::availability_report(&response))
        })
    }
}

pub struct CreateEventWithAttachment;

const ATTACHMENT_FIELDS: &[FieldDef] = &[
    FieldDef::required("summary", "Event title", FieldKind::Text),
    FieldDef::required("start", "Start time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::required("end", "End time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::with_default("zone", "Time zone", FieldKind::Zone, "UTC"),
    FieldDef::required("file_url", "Google Drive file URL", FieldKind::HttpsUrl),
    FieldDef::with_default("attachment_title", "Attachment title", FieldKind::Text, "Attachment"),
];

impl MenuCommand for CreateEventWithAttachment {
    fn description(&self) -> &'static str {
        "Create Event with Attachment"
    }

    fn fields(&self) -> &'static [FieldDef] {
        ATTACHMENT_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let body = payload::build_create_with_attachment(&values)?;
            let created = ctx.api.insert_event(ctx.calendar_id, &body).await?;
            Ok(format::created_with_link(&created))
        })
    }
}

pub struct CreateEventWithMeet;

const MEET_FIELDS: &[FieldDef] = &[
    FieldDef::required("summary", "Event title", FieldKind::Text),
    FieldDef::required("start", "Start time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::required("end", "End time (YYYY-MM-DD HH:MM)", FieldKind::DateTime),
    FieldDef::with_default("zone", "Time zone", FieldKind::Zone, "UTC"),
];

impl MenuCommand for CreateEventWithMeet {
    fn description(&self) -> &'static str {
        "Create Event with Google Meet"
    }

    fn fields(&self) -> &'static [FieldDef] {
        MEET_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            // A fresh id per attempt; the service uses it to make conference
            // provisioning idempotent.
            let request_id = format!("meeting-{}", Uuid::new_v4());
            let body = payload::build_create_with_meet(&values, &request_id)?;
            let created = ctx.api.insert_event(ctx.calendar_id, &body).await?;
            Ok(format::created_with_meet(&created))
        })
    }
}

pub struct WatchCalendar;

const WATCH_FIELDS: &[FieldDef] = &[
    FieldDef::required("address", "Webhook URL", FieldKind::HttpsUrl),
    FieldDef::required("id", "Webhook channel ID", FieldKind::Text),
];

impl MenuCommand for WatchCalendar {
    fn description(&self) -> &'static str {
        "Watch Calendar for Changes"
    }

    fn fields(&self) -> &'static [FieldDef] {
        WATCH_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let channel =
                WatchChannel::web_hook(values.require_text("id")?, values.require_url("address")?);
            let created = ctx.api.watch_events(ctx.calendar_id, &channel).await?;
            Ok(format::watch_created(&created))
        })
    }
}

pub struct GrantAccess;

const GRANT_ACCESS_FIELDS: &[FieldDef] = &[
    FieldDef::required("email", "Email of the user to grant access", FieldKind::Email),
    FieldDef::with_default("role", "Role", FieldKind::Choice(ACL_ROLES), "reader"),
];

impl MenuCommand for GrantAccess {
    fn description(&self) -> &'static str {
        "Grant Calendar Access"
    }

    fn fields(&self) -> &'static [FieldDef] {
        GRANT_ACCESS_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let rule =
                AclRule::user(values.require_email("email")?, values.require_choice("role")?);
            let created = ctx.api.insert_acl_rule(ctx.calendar_id, &rule).await?;
            Ok(format::access_granted(&created))
        })
    }
}

pub struct RemoveAccess;

const REMOVE_ACCESS_FIELDS: &[FieldDef] = &[FieldDef::required(
    "email",
    "Email of the user to remove access",
    FieldKind::Email,
)];

impl MenuCommand for RemoveAccess {
    fn description(&self) -> &'static str {
        "Remove Calendar Access"
    }

    fn fields(&self) -> &'static [FieldDef] {
        REMOVE_ACCESS_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let email = values.require_email("email")?;
            let rules = ctx.api.list_acl_rules(ctx.calendar_id).await?;
            for rule in &rules {
                if rule.is_user(email)
                    && let Some(rule_id) = rule.id.as_deref()
                {
                    ctx.api.delete_acl_rule(ctx.calendar_id, rule_id).await?;
                    return Ok(format::access_revoked(email));
                }
            }
            Ok(format::no_explicit_access().to_string())
        })
    }
}

pub struct InviteUsers;

const INVITE_FIELDS: &[FieldDef] = &[
    FieldDef::required("event_id", "Event ID to invite users", FieldKind::Text),
    FieldDef::required(
        "emails",
        "Attendee emails (comma-separated)",
        FieldKind::EmailList,
    ),
];

impl MenuCommand for InviteUsers {
    fn description(&self) -> &'static str {
        "Invite Users to an Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        INVITE_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            let emails = values.require_emails("emails")?;

            let current = ctx.api.get_event(ctx.calendar_id, event_id).await?;
            let updated = payload::apply_invite(&current, emails, ctx.dedupe_attendees)?;
            let saved = ctx
                .api
                .update_event(ctx.calendar_id, event_id, &updated)
                .await?;
            Ok(format::invited(&saved))
        })
    }
}

pub struct AddReminders;

const REMINDERS_FIELDS: &[FieldDef] = &[
    FieldDef::required("event_id", "Event ID to add reminders", FieldKind::Text),
    FieldDef::with_default(
        "email_minutes",
        "Minutes before event for email reminder",
        FieldKind::Integer,
        "1440",
    ),
    FieldDef::with_default(
        "popup_minutes",
        "Minutes before event for popup reminder",
        FieldKind::Integer,
        "30",
    ),
];

impl MenuCommand for AddReminders {
    fn description(&self) -> &'static str {
        "Add Reminders to an Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        REMINDERS_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            let current = ctx.api.get_event(ctx.calendar_id, event_id).await?;
            let updated = payload::apply_reminders(
                &current,
                values.require_integer("email_minutes")?,
                values.require_integer("popup_minutes")?,
            );
            let saved = ctx
                .api
                .update_event(ctx.calendar_id, event_id, &updated)
                .await?;
            Ok(format::reminders_added(&saved))
        })
    }
}

pub struct ListCalendars;

impl MenuCommand for ListCalendars {
    fn description(&self) -> &'static str {
        "List Domain Resources, Rooms & Calendars"
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        _values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let entries = ctx.api.list_calendars().await?;
            Ok(format::calendar_list_report(&entries))
        })
    }
}

pub struct AddExtendedProperties;

const EXTENDED_PROPERTY_FIELDS: &[FieldDef] = &[
    FieldDef::required("event_id", "Event ID to add extended properties", FieldKind::Text),
    FieldDef::required("key", "Extended property key", FieldKind::Text),
    FieldDef::required("value", "Extended property value", FieldKind::Text),
];

impl MenuCommand for AddExtendedProperties {
    fn description(&self) -> &'static str {
        "Add Extended Properties to Event"
    }

    fn fields(&self) -> &'static [FieldDef] {
        EXTENDED_PROPERTY_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let event_id = values.require_text("event_id")?;
            let current = ctx.api.get_event(ctx.calendar_id, event_id).await?;
            let updated = payload::apply_extended_property(
                &current,
                values.require_text("key")?,
                values.require_text("value")?,
            );
            let saved = ctx
                .api
                .update_event(ctx.calendar_id, event_id, &updated)
                .await?;
            Ok(format::extended_property_added(&saved))
        })
    }
}

pub struct SendBatchRequests;

const BATCH_FIELDS: &[FieldDef] = &[
    FieldDef::keep_current(
        "calendars",
        "Calendar IDs, comma-separated (blank = this calendar)",
        FieldKind::Text,
    ),
    FieldDef::keep_current("start", "Start time (blank = now)", FieldKind::DateTime),
    FieldDef::keep_current(
        "end",
        "End time (blank = 30 days from now)",
        FieldKind::DateTime,
    ),
];

impl MenuCommand for SendBatchRequests {
    fn description(&self) -> &'static str {
        "Send Batch Requests"
    }

    fn fields(&self) -> &'static [FieldDef] {
        BATCH_FIELDS
    }

    fn run<'a>(
        &'a self,
        ctx: &'a CommandContext<'a>,
        values: FieldValues,
    ) -> BoxFuture<'a, CliResult<String>> {
        Box::pin(async move {
            let ids = calendar_ids(&values, ctx.calendar_id);
            let (time_min, time_max) = window(&values);

            let outcomes = ctx.api.batch_list_events(&ids, time_min, time_max).await?;
            Ok(format::batch_report(outcomes.iter().map(|outcome| {
                (
                    outcome.content_id.as_str(),
                    outcome
                        .result
                        .as_ref()
                        .map(|events| format!("{} events", events.len()))
                        .map_err(|e| e.to_string()),
                )
            })))
        })
    }
}
