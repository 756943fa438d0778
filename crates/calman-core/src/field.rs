//! Field specifications and input collection.
//!
//! Every menu command declares the inputs it needs as an ordered list of
//! [`FieldDef`]s. A [`FieldSource`] supplies one raw string per definition
//! (an interactive prompt in the CLI, a scripted queue in tests), and
//! [`collect_fields`] validates and converts the strings into typed
//! [`FieldValues`]. The first invalid value aborts collection with a
//! [`ValidationError`] naming the offending field, before any remote call
//! is made.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};
use chrono_tz::Tz;
use thiserror::Error;

/// Datetime formats accepted for [`FieldKind::DateTime`] input, tried in
/// order. Covers the 24-hour forms and the 12-hour AM/PM form.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %I:%M %p",
];

/// A value that failed local validation.
///
/// These are raised while collecting input or assembling a payload, always
/// before the session issues a request, so a validation failure never
/// mutates remote state.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field was left blank.
    #[error("{field}: a value is required")]
    Missing { field: &'static str },

    /// Not a `YYYY-MM-DD` date.
    #[error("{field}: {input:?} is not a valid date (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, input: String },

    /// Not a recognized datetime form.
    #[error(
        "{field}: {input:?} is not a valid datetime (expected YYYY-MM-DD HH:MM, \
         YYYY-MM-DDTHH:MM:SS or YYYY-MM-DD HH:MM AM/PM)"
    )]
    InvalidDateTime { field: &'static str, input: String },

    /// Not a known IANA time zone name.
    #[error("{field}: {input:?} is not a known time zone")]
    InvalidZone { field: &'static str, input: String },

    /// Does not look like an email address.
    #[error("{field}: {input:?} does not look like an email address")]
    InvalidEmail { field: &'static str, input: String },

    /// Not a non-negative integer.
    #[error("{field}: {input:?} is not a non-negative number")]
    InvalidInteger { field: &'static str, input: String },

    /// Not one of the declared choices.
    #[error("{field}: {input:?} is not one of {choices:?}")]
    InvalidChoice {
        field: &'static str,
        input: String,
        choices: &'static [&'static str],
    },

    /// Not an https URL.
    #[error("{field}: {input:?} is not a valid https URL")]
    InvalidUrl { field: &'static str, input: String },

    /// A cross-field or entity-level rule was violated.
    #[error("{0}")]
    Rule(String),
}

impl ValidationError {
    /// Creates a rule violation with the given message.
    pub fn rule(message: impl Into<String>) -> Self {
        Self::Rule(message.into())
    }
}

/// Errors surfaced by [`collect_fields`].
#[derive(Debug, Error)]
pub enum FieldError {
    /// The input device failed before a value could be read.
    #[error("failed to read input for {field}: {source}")]
    Read {
        field: &'static str,
        source: std::io::Error,
    },

    /// The value failed validation.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// What a field accepts and how its raw input is converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Calendar date, `YYYY-MM-DD`.
    Date,
    /// Wall-clock datetime without zone; see [`DATETIME_FORMATS`].
    DateTime,
    /// IANA time zone name, e.g. `Europe/London`.
    Zone,
    /// A single email address.
    Email,
    /// Comma-separated email addresses; entries are trimmed and each is
    /// validated on its own.
    EmailList,
    /// A non-negative integer.
    Integer,
    /// One of a fixed set of choices, matched case-insensitively; the
    /// canonical spelling is stored.
    Choice(&'static [&'static str]),
    /// An `https` URL.
    HttpsUrl,
    /// Free text, stored as typed.
    Text,
}

impl FieldKind {
    /// Validates raw input against this kind and converts it to a typed
    /// value. `field` is only used to name the failure.
    pub fn parse(&self, field: &'static str, raw: &str) -> Result<FieldValue, ValidationError> {
        match self {
            Self::Date => NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .map(FieldValue::Date)
                .map_err(|_| ValidationError::InvalidDate {
                    field,
                    input: raw.to_string(),
                }),
            Self::DateTime => DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
                .map(FieldValue::DateTime)
                .ok_or_else(|| ValidationError::InvalidDateTime {
                    field,
                    input: raw.to_string(),
                }),
            Self::Zone => raw
                .parse::<Tz>()
                .map(FieldValue::Zone)
                .map_err(|_| ValidationError::InvalidZone {
                    field,
                    input: raw.to_string(),
                }),
            Self::Email => {
                if looks_like_email(raw) {
                    Ok(FieldValue::Email(raw.to_string()))
                } else {
                    Err(ValidationError::InvalidEmail {
                        field,
                        input: raw.to_string(),
                    })
                }
            }
            Self::EmailList => {
                let mut emails = Vec::new();
                for entry in raw.split(',') {
                    let entry = entry.trim();
                    if entry.is_empty() {
                        continue;
                    }
                    if !looks_like_email(entry) {
                        return Err(ValidationError::InvalidEmail {
                            field,
                            input: entry.to_string(),
                        });
                    }
                    emails.push(entry.to_string());
                }
                if emails.is_empty() {
                    return Err(ValidationError::InvalidEmail {
                        field,
                        input: raw.to_string(),
                    });
                }
                Ok(FieldValue::EmailList(emails))
            }
            Self::Integer => raw
                .parse::<u32>()
                .map(FieldValue::Integer)
                .map_err(|_| ValidationError::InvalidInteger {
                    field,
                    input: raw.to_string(),
                }),
            Self::Choice(choices) => choices
                .iter()
                .copied()
                .find(|c| c.eq_ignore_ascii_case(raw))
                .map(FieldValue::Choice)
                .ok_or_else(|| ValidationError::InvalidChoice {
                    field,
                    input: raw.to_string(),
                    choices,
                }),
            Self::HttpsUrl => match url::Url::parse(raw) {
                Ok(parsed) if parsed.scheme() == "https" => {
                    Ok(FieldValue::Url(raw.to_string()))
                }
                _ => Err(ValidationError::InvalidUrl {
                    field,
                    input: raw.to_string(),
                }),
            },
            Self::Text => Ok(FieldValue::Text(raw.to_string())),
        }
    }
}

/// What a blank input means for a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlankPolicy {
    /// Blank is rejected.
    Required,
    /// Blank falls back to this default, which is validated like any other
    /// input.
    Default(&'static str),
    /// Blank means "keep the current remote value": the key is simply absent
    /// from the collected values and the payload builder leaves the
    /// corresponding field untouched.
    Keep,
}

/// A single input a command collects before it runs.
#[derive(Debug, Clone)]
pub struct FieldDef {
    /// Key the collected value is stored under.
    pub key: &'static str,
    /// Prompt label shown to the user.
    pub label: &'static str,
    /// Input kind, driving validation and conversion.
    pub kind: FieldKind,
    /// Blank-input handling.
    pub blank: BlankPolicy,
}

impl FieldDef {
    /// A field the user must fill in.
    pub const fn required(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            blank: BlankPolicy::Required,
        }
    }

    /// A field that falls back to `default` when left blank.
    pub const fn with_default(
        key: &'static str,
        label: &'static str,
        kind: FieldKind,
        default: &'static str,
    ) -> Self {
        Self {
            key,
            label,
            kind,
            blank: BlankPolicy::Default(default),
        }
    }

    /// A field that preserves the current remote value when left blank.
    pub const fn keep_current(key: &'static str, label: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            kind,
            blank: BlankPolicy::Keep,
        }
    }
}

/// A validated, typed field value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Date(NaiveDate),
    DateTime(NaiveDateTime),
    Zone(Tz),
    Email(String),
    EmailList(Vec<String>),
    Integer(u32),
    Choice(&'static str),
    Url(String),
    Text(String),
}

/// Validated values keyed by field name.
///
/// Keys collected under [`BlankPolicy::Keep`] are absent when the user left
/// them blank; the `require_*` accessors treat absence (or a kind mismatch)
/// as [`ValidationError::Missing`], while the plain accessors return `None`
/// so payload builders can interpret absence as "keep the current value".
#[derive(Debug, Default, Clone)]
pub struct FieldValues {
    values: BTreeMap<&'static str, FieldValue>,
}

impl FieldValues {
    /// Stores a value under `key`, replacing any previous one.
    pub fn insert(&mut self, key: &'static str, value: FieldValue) {
        self.values.insert(key, value);
    }

    /// Returns `true` if a value was collected for `key`.
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn date(&self, key: &str) -> Option<NaiveDate> {
        match self.values.get(key) {
            Some(FieldValue::Date(d)) => Some(*d),
            _ => None,
        }
    }

    pub fn datetime(&self, key: &str) -> Option<NaiveDateTime> {
        match self.values.get(key) {
            Some(FieldValue::DateTime(dt)) => Some(*dt),
            _ => None,
        }
    }

    pub fn zone(&self, key: &str) -> Option<Tz> {
        match self.values.get(key) {
            Some(FieldValue::Zone(tz)) => Some(*tz),
            _ => None,
        }
    }

    pub fn email(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Email(e)) => Some(e),
            _ => None,
        }
    }

    pub fn emails(&self, key: &str) -> Option<&[String]> {
        match self.values.get(key) {
            Some(FieldValue::EmailList(list)) => Some(list),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<u32> {
        match self.values.get(key) {
            Some(FieldValue::Integer(n)) => Some(*n),
            _ => None,
        }
    }

    pub fn choice(&self, key: &str) -> Option<&'static str> {
        match self.values.get(key) {
            Some(FieldValue::Choice(c)) => Some(c),
            _ => None,
        }
    }

    pub fn url(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Url(u)) => Some(u),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.values.get(key) {
            Some(FieldValue::Text(t)) => Some(t),
            _ => None,
        }
    }

    pub fn require_date(&self, key: &'static str) -> Result<NaiveDate, ValidationError> {
        self.date(key).ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_datetime(&self, key: &'static str) -> Result<NaiveDateTime, ValidationError> {
        self.datetime(key)
            .ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_zone(&self, key: &'static str) -> Result<Tz, ValidationError> {
        self.zone(key).ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_email(&self, key: &'static str) -> Result<&str, ValidationError> {
        self.email(key).ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_emails(&self, key: &'static str) -> Result<&[String], ValidationError> {
        self.emails(key)
            .ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_integer(&self, key: &'static str) -> Result<u32, ValidationError> {
        self.integer(key)
            .ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_choice(&self, key: &'static str) -> Result<&'static str, ValidationError> {
        self.choice(key)
            .ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_url(&self, key: &'static str) -> Result<&str, ValidationError> {
        self.url(key).ok_or(ValidationError::Missing { field: key })
    }

    pub fn require_text(&self, key: &'static str) -> Result<&str, ValidationError> {
        self.text(key).ok_or(ValidationError::Missing { field: key })
    }
}

/// Supplies raw input strings during field collection.
///
/// The CLI implements this over interactive prompts; [`ScriptedSource`]
/// answers from a fixed queue for tests.
pub trait FieldSource {
    /// Produces the raw input for `def`. Leading and trailing whitespace is
    /// stripped by the collector, so sources may return input verbatim.
    fn read(&mut self, def: &FieldDef) -> std::io::Result<String>;
}

/// A [`FieldSource`] that answers from a fixed queue, useful for testing
/// collection and dispatch without a terminal.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    answers: Vec<String>,
    next: usize,
}

impl ScriptedSource {
    /// Creates a source that yields `answers` in order, then blanks.
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            next: 0,
        }
    }
}

impl FieldSource for ScriptedSource {
    fn read(&mut self, _def: &FieldDef) -> std::io::Result<String> {
        let answer = self.answers.get(self.next).cloned().unwrap_or_default();
        self.next += 1;
        Ok(answer)
    }
}

/// Collects and validates one value per definition, in order.
///
/// The first failure aborts collection. Nothing has been sent anywhere at
/// that point, so the caller just reports the error and returns to the menu.
pub fn collect_fields(
    defs: &[FieldDef],
    source: &mut dyn FieldSource,
) -> Result<FieldValues, FieldError> {
    let mut values = FieldValues::default();
    for def in defs {
        let raw = source.read(def).map_err(|e| FieldError::Read {
            field: def.key,
            source: e,
        })?;
        let raw = raw.trim();
        if raw.is_empty() {
            match def.blank {
                BlankPolicy::Required => {
                    return Err(ValidationError::Missing { field: def.key }.into());
                }
                BlankPolicy::Default(default) => {
                    values.insert(def.key, def.kind.parse(def.key, default)?);
                }
                BlankPolicy::Keep => {}
            }
            continue;
        }
        values.insert(def.key, def.kind.parse(def.key, raw)?);
    }
    Ok(values)
}

/// Structural email check: one `@`, a non-empty local part, and a domain
/// with at least one dot. The remote service is the real authority.
fn looks_like_email(s: &str) -> bool {
    if s.chars().any(char::is_whitespace) {
        return false;
    }
    let Some((local, domain)) = s.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

#[cfg(test)]
mod tests {
    use super::*;

    mod kinds {
        use super::*;

        #[test]
        fn date_roundtrip() {
            let parsed = FieldKind::Date.parse("value", "2025-03-01").unwrap();
            let FieldValue::Date(date) = parsed else {
                panic!("expected a date");
            };
            assert_eq!(date.format("%Y-%m-%d").to_string(), "2025-03-01");
        }

        #[test]
        fn date_rejects_other_forms() {
            assert!(FieldKind::Date.parse("value", "01/03/2025").is_err());
            assert!(FieldKind::Date.parse("value", "2025-13-01").is_err());
            assert!(FieldKind::Date.parse("value", "tomorrow").is_err());
        }

        #[test]
        fn datetime_accepts_all_documented_forms() {
            for input in [
                "2025-03-01 10:00",
                "2025-03-01T10:00:00",
                "2025-03-01 10:00:00",
                "2025-03-01 10:00 AM",
            ] {
                let parsed = FieldKind::DateTime.parse("value", input).unwrap();
                let FieldValue::DateTime(dt) = parsed else {
                    panic!("expected a datetime for {input}");
                };
                assert_eq!(dt.format("%Y-%m-%d %H:%M").to_string(), "2025-03-01 10:00");
            }
        }

        #[test]
        fn datetime_pm_crosses_noon() {
            let parsed = FieldKind::DateTime.parse("value", "2025-03-01 2:30 PM").unwrap();
            let FieldValue::DateTime(dt) = parsed else {
                panic!("expected a datetime");
            };
            assert_eq!(dt.format("%H:%M").to_string(), "14:30");
        }

        #[test]
        fn datetime_rejects_garbage() {
            assert!(FieldKind::DateTime.parse("value", "10:00").is_err());
            assert!(FieldKind::DateTime.parse("value", "2025-03-01").is_err());
        }

        #[test]
        fn zone_resolves_iana_names() {
            let parsed = FieldKind::Zone.parse("value", "Europe/London").unwrap();
            assert_eq!(parsed, FieldValue::Zone(chrono_tz::Europe::London));
            assert!(FieldKind::Zone.parse("value", "Mars/Olympus").is_err());
        }

        #[test]
        fn email_structure() {
            assert!(FieldKind::Email.parse("value", "a@example.com").is_ok());
            assert!(FieldKind::Email.parse("value", "no-at-sign").is_err());
            assert!(FieldKind::Email.parse("value", "a@nodot").is_err());
            assert!(FieldKind::Email.parse("value", "a b@example.com").is_err());
        }

        #[test]
        fn email_list_splits_and_trims() {
            let parsed = FieldKind::EmailList
                .parse("value", "a@example.com , b@example.com,")
                .unwrap();
            assert_eq!(
                parsed,
                FieldValue::EmailList(vec![
                    "a@example.com".to_string(),
                    "b@example.com".to_string()
                ])
            );
        }

        #[test]
        fn email_list_rejects_bad_entry() {
            let err = FieldKind::EmailList
                .parse("value", "a@example.com, not-an-email")
                .unwrap_err();
            assert!(err.to_string().contains("not-an-email"));
        }

        #[test]
        fn integer_bounds() {
            assert_eq!(
                FieldKind::Integer.parse("value", "30").unwrap(),
                FieldValue::Integer(30)
            );
            assert!(FieldKind::Integer.parse("value", "-1").is_err());
            assert!(FieldKind::Integer.parse("value", "ten").is_err());
        }

        #[test]
        fn choice_is_case_insensitive_and_canonical() {
            const ROLES: &[&str] = &["reader", "writer", "owner"];
            assert_eq!(
                FieldKind::Choice(ROLES).parse("value", "Writer").unwrap(),
                FieldValue::Choice("writer")
            );
            assert!(FieldKind::Choice(ROLES).parse("value", "admin").is_err());
        }

        #[test]
        fn https_url_only() {
            assert!(FieldKind::HttpsUrl
                .parse("value", "https://example.com/hook")
                .is_ok());
            assert!(FieldKind::HttpsUrl
                .parse("value", "http://example.com/hook")
                .is_err());
            assert!(FieldKind::HttpsUrl.parse("value", "not a url").is_err());
        }
    }

    mod collection {
        use super::*;

        #[test]
        fn collects_in_order() {
            let defs = [
                FieldDef::required("summary", "Title", FieldKind::Text),
                FieldDef::required("start", "Start", FieldKind::DateTime),
            ];
            let mut source = ScriptedSource::new(["Standup", "2025-03-01 10:00"]);
            let values = collect_fields(&defs, &mut source).unwrap();
            assert_eq!(values.require_text("summary").unwrap(), "Standup");
            assert!(values.datetime("start").is_some());
        }

        #[test]
        fn blank_required_aborts() {
            let defs = [FieldDef::required("summary", "Title", FieldKind::Text)];
            let mut source = ScriptedSource::new([""]);
            let err = collect_fields(&defs, &mut source).unwrap_err();
            assert!(matches!(
                err,
                FieldError::Invalid(ValidationError::Missing { field: "summary" })
            ));
        }

        #[test]
        fn blank_applies_default() {
            let defs = [FieldDef::with_default(
                "role",
                "Role",
                FieldKind::Choice(&["reader", "writer", "owner"]),
                "reader",
            )];
            let mut source = ScriptedSource::new([""]);
            let values = collect_fields(&defs, &mut source).unwrap();
            assert_eq!(values.require_choice("role").unwrap(), "reader");
        }

        #[test]
        fn blank_keep_omits_key() {
            let defs = [FieldDef::keep_current("summary", "Title", FieldKind::Text)];
            let mut source = ScriptedSource::new([""]);
            let values = collect_fields(&defs, &mut source).unwrap();
            assert!(!values.contains("summary"));
            assert!(values.require_text("summary").is_err());
        }

        #[test]
        fn invalid_input_names_the_field() {
            let defs = [FieldDef::required("start", "Start", FieldKind::DateTime)];
            let mut source = ScriptedSource::new(["soon"]);
            let err = collect_fields(&defs, &mut source).unwrap_err();
            assert!(err.to_string().starts_with("start:"));
        }

        #[test]
        fn input_is_trimmed_before_validation() {
            let defs = [FieldDef::required("date", "Date", FieldKind::Date)];
            let mut source = ScriptedSource::new(["  2025-03-01  "]);
            let values = collect_fields(&defs, &mut source).unwrap();
            assert!(values.date("date").is_some());
        }
    }
}
