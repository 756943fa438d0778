//! Core types: field collection, event payloads, response formatting

pub mod acl;
pub mod calendar;
pub mod event;
pub mod field;
pub mod format;
pub mod freebusy;
pub mod payload;
pub mod tracing;

pub use acl::{AclRule, AclScope, ACL_ROLES};
pub use calendar::{CalendarListEntry, WatchChannel};
pub use event::{
    Attachment, Attendee, ConferenceData, ConferenceRequest, ConferenceSolution,
    ConferenceSolutionKey, EntryPoint, EventBody, EventDateTime, EventType, ExtendedProperties,
    ReminderOverride, Reminders,
};
pub use field::{
    collect_fields, BlankPolicy, FieldDef, FieldError, FieldKind, FieldSource, FieldValue,
    FieldValues, ScriptedSource, ValidationError,
};
pub use freebusy::{
    BusyInterval, FreeBusyCalendar, FreeBusyError, FreeBusyRequest, FreeBusyRequestItem,
    FreeBusyResponse,
};
pub use tracing::{init_tracing, TracingConfig, TracingError, TracingOutputFormat};
