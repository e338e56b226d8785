//! Typed-value validation.
//!
//! Every form widget delivers raw text. This module checks that text against the value kind the
//! widget declares and converts it to the canonical wire form of that kind.
//!
//! Notes:
//! - A failed check is not an error: the message goes into the row's [`ErrorArea`] and the
//!   outcome is [`Outcome::Rejected`]
//! - Error text is fixed English, `"<label> <reason>"`

use crate::registry::ErrorArea;
use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use fhir::{Reference, TypedValue, ValueKind};
use regex::Regex;
use std::sync::LazyLock;
use url::Url;

/// Largest integer a form accepts (`Number.MAX_SAFE_INTEGER`, 2^53 - 1).
const MAX_SAFE_INTEGER: i64 = 9_007_199_254_740_991;

static TIME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(2[0-3]|[01]?[0-9]):([0-5]?[0-9])(:[0-5]?[0-9])?$")
        .expect("time pattern is a valid regex")
});

const NAIVE_DATE_TIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Result of validating one field.
#[derive(Clone, Debug, PartialEq)]
pub enum Outcome<T> {
    /// The input was non-empty and valid.
    Present(T),
    /// The input was empty and the field is optional.
    Absent,
    /// The input was invalid, or empty while required. A message was recorded.
    Rejected,
}

impl<T> Outcome<T> {
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Outcome<U> {
        match self {
            Self::Present(value) => Outcome::Present(f(value)),
            Self::Absent => Outcome::Absent,
            Self::Rejected => Outcome::Rejected,
        }
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, Self::Rejected)
    }

    pub fn present(self) -> Option<T> {
        match self {
            Self::Present(value) => Some(value),
            _ => None,
        }
    }
}

/// Returns true if the input is missing or blank.
pub fn is_empty(raw: Option<&str>) -> bool {
    raw.is_none_or(|text| text.trim().is_empty())
}

/// Validates `raw` as a value of `kind`.
///
/// Kinds without a single-widget representation (`boolean`, `Coding`, `Identifier`) are
/// rejected as unsupported; they are read through the pair builders in [`crate::composite`].
pub fn validate(
    kind: ValueKind,
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<TypedValue> {
    match kind {
        ValueKind::String => string(raw, optional, label, errors).map(TypedValue::String),
        ValueKind::Integer => integer(raw, optional, label, errors).map(TypedValue::Integer),
        ValueKind::Decimal => decimal(raw, optional, label, errors).map(TypedValue::Decimal),
        ValueKind::Date => date(raw, optional, label, errors).map(TypedValue::Date),
        ValueKind::Time => time(raw, optional, label, errors).map(TypedValue::Time),
        ValueKind::DateTime => date_time(raw, optional, label, errors).map(TypedValue::DateTime),
        ValueKind::Instant => date_time(raw, optional, label, errors).map(TypedValue::Instant),
        ValueKind::Uri => url(raw, optional, label, errors).map(TypedValue::Uri),
        ValueKind::Url => url(raw, optional, label, errors).map(TypedValue::Url),
        ValueKind::Reference => reference(raw, optional, label, errors)
            .map(|target| TypedValue::Reference(Reference::literal(target))),
        ValueKind::Boolean | ValueKind::Coding | ValueKind::Identifier => {
            unsupported(kind.type_code(), label, errors)
        }
    }
}

/// Records an "unsupported kind" failure for a widget tag this engine cannot read.
pub fn unsupported<T>(tag: &str, label: &str, errors: &mut ErrorArea) -> Outcome<T> {
    errors.push(format!("{label} has unsupported kind {tag}"));
    Outcome::Rejected
}

pub fn string(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "", |text| Some(text.to_owned()))
}

pub fn integer(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<i64> {
    check(raw, optional, label, errors, "not an integer", parse_integer)
}

pub fn decimal(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<f64> {
    check(raw, optional, label, errors, "not a decimal", |text| {
        text.trim().parse::<f64>().ok().filter(|n| n.is_finite())
    })
}

/// Accepts a date or date-time; keeps the `YYYY-MM-DD` part of its UTC form.
pub fn date(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "is not a date", |text| {
        parse_instant(text).map(|instant| instant.format("%Y-%m-%d").to_string())
    })
}

/// Accepts `H:M` or `H:M:S`; pads every part to two digits and defaults seconds to `00`.
pub fn time(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "is not a time", canonical_time)
}

/// Accepts a date or date-time; converts it to a UTC instant with millisecond precision.
pub fn date_time(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "is not a date-time", |text| {
        parse_instant(text).map(|instant| instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    })
}

pub fn url(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "is not a url", absolute_url)
}

pub fn reference(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<String> {
    check(raw, optional, label, errors, "is not a reference", absolute_url)
}

/// Shared emptiness/acceptance flow of every kind.
fn check<T>(
    raw: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
    reason: &str,
    convert: impl FnOnce(&str) -> Option<T>,
) -> Outcome<T> {
    let text = match raw {
        Some(text) if !text.trim().is_empty() => text,
        _ if optional => return Outcome::Absent,
        _ => {
            errors.push(format!("{label} mandatory"));
            return Outcome::Rejected;
        }
    };

    match convert(text) {
        Some(value) => Outcome::Present(value),
        None => {
            errors.push(format!("{label} {reason}"));
            Outcome::Rejected
        }
    }
}

/// The leading integer prefix must equal the numeric value of the whole text.
fn parse_integer(text: &str) -> Option<i64> {
    let text = text.trim();
    let digits_start = usize::from(text.starts_with(['+', '-']));
    let digits_len = text[digits_start..]
        .chars()
        .take_while(char::is_ascii_digit)
        .count();
    if digits_len == 0 {
        return None;
    }

    let prefix: i64 = text[..digits_start + digits_len].parse().ok()?;
    let whole: f64 = text.parse().ok()?;

    (prefix.abs() <= MAX_SAFE_INTEGER && whole == prefix as f64).then_some(prefix)
}

fn canonical_time(text: &str) -> Option<String> {
    let text = text.trim();
    if !TIME_PATTERN.is_match(text) {
        return None;
    }

    let mut parts: Vec<String> = text.split(':').map(|part| format!("{part:0>2}")).collect();
    if parts.len() == 2 {
        parts.push("00".to_owned());
    }
    Some(parts.join(":"))
}

/// Parses a calendar date or date-time. Values without an offset are read as UTC.
fn parse_instant(text: &str) -> Option<DateTime<Utc>> {
    let text = text.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(text) {
        return Some(instant.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATE_TIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
    {
        return Some(naive.and_utc());
    }

    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn absolute_url(text: &str) -> Option<String> {
    Url::parse(text.trim()).ok().map(|_| text.to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(kind: ValueKind, raw: &str, optional: bool) -> (Outcome<TypedValue>, Vec<String>) {
        let mut errors = ErrorArea::default();
        let outcome = validate(kind, Some(raw), optional, "Input", &mut errors);
        (outcome, errors.messages().to_vec())
    }

    const TEXT_KINDS: [ValueKind; 10] = [
        ValueKind::String,
        ValueKind::Integer,
        ValueKind::Decimal,
        ValueKind::Date,
        ValueKind::Time,
        ValueKind::DateTime,
        ValueKind::Instant,
        ValueKind::Uri,
        ValueKind::Url,
        ValueKind::Reference,
    ];

    #[test]
    fn empty_optional_is_absent_and_empty_required_is_mandatory() {
        for kind in TEXT_KINDS {
            let (outcome, errors) = run(kind, "   ", true);
            assert_eq!(outcome, Outcome::Absent, "{kind}");
            assert!(errors.is_empty(), "{kind}");

            let mut area = ErrorArea::default();
            let outcome = validate(kind, None, false, "Input", &mut area);
            assert_eq!(outcome, Outcome::Rejected, "{kind}");
            assert_eq!(area.messages(), ["Input mandatory"], "{kind}");
        }
    }

    #[test]
    fn integer_requires_whole_text_to_be_integral() {
        let integer = |raw| run(ValueKind::Integer, raw, false).0;
        assert_eq!(integer("42"), Outcome::Present(TypedValue::Integer(42)));
        assert_eq!(integer("-7"), Outcome::Present(TypedValue::Integer(-7)));
        assert_eq!(integer("42.0"), Outcome::Present(TypedValue::Integer(42)));

        let (outcome, errors) = run(ValueKind::Integer, "42.5", false);
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(errors, ["Input not an integer"]);

        assert_eq!(integer("abc"), Outcome::Rejected);
        assert_eq!(integer("1e3"), Outcome::Rejected);
        assert_eq!(integer("9007199254740992"), Outcome::Rejected);
    }

    #[test]
    #[allow(clippy::approx_constant)]
    fn decimal_must_be_finite() {
        assert_eq!(
            run(ValueKind::Decimal, "3.14", false).0,
            Outcome::Present(TypedValue::Decimal(3.14))
        );
        let (outcome, errors) = run(ValueKind::Decimal, "abc", false);
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(errors, ["Input not a decimal"]);
        assert_eq!(run(ValueKind::Decimal, "inf", false).0, Outcome::Rejected);
    }

    #[test]
    fn time_is_padded_and_bounded() {
        assert_eq!(
            run(ValueKind::Time, "9:5", false).0,
            Outcome::Present(TypedValue::Time("09:05:00".into()))
        );
        assert_eq!(
            run(ValueKind::Time, "23:59:7", false).0,
            Outcome::Present(TypedValue::Time("23:59:07".into()))
        );
        let (outcome, errors) = run(ValueKind::Time, "25:00", false);
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(errors, ["Input is not a time"]);
    }

    #[test]
    fn dates_normalise_to_utc() {
        assert_eq!(
            run(ValueKind::Date, "2024-01-31", false).0,
            Outcome::Present(TypedValue::Date("2024-01-31".into()))
        );
        assert_eq!(
            run(ValueKind::Date, "2024-01-31T23:30:00-02:00", false).0,
            Outcome::Present(TypedValue::Date("2024-02-01".into()))
        );
        assert_eq!(
            run(ValueKind::DateTime, "2024-01-31T10:15", false).0,
            Outcome::Present(TypedValue::DateTime("2024-01-31T10:15:00.000Z".into()))
        );
        assert_eq!(
            run(ValueKind::Instant, "2024-01-31T11:15:00+01:00", false).0,
            Outcome::Present(TypedValue::Instant("2024-01-31T10:15:00.000Z".into()))
        );

        let (outcome, errors) = run(ValueKind::DateTime, "tomorrow", false);
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(errors, ["Input is not a date-time"]);
        assert_eq!(run(ValueKind::Date, "2024-02-30", false).1, ["Input is not a date"]);
    }

    #[test]
    fn urls_and_references_must_be_absolute() {
        assert_eq!(
            run(ValueKind::Url, "https://dsf.dev/x", false).0,
            Outcome::Present(TypedValue::Url("https://dsf.dev/x".into()))
        );
        assert_eq!(run(ValueKind::Uri, "relative/path", false).1, ["Input is not a url"]);
        assert_eq!(
            run(ValueKind::Reference, "Organization/1", false).1,
            ["Input is not a reference"]
        );
        assert_eq!(
            run(ValueKind::Reference, "https://dsf.dev/fhir/Organization/1", false).0,
            Outcome::Present(TypedValue::Reference(Reference::literal(
                "https://dsf.dev/fhir/Organization/1"
            )))
        );
    }

    #[test]
    fn strings_are_kept_verbatim() {
        assert_eq!(
            run(ValueKind::String, " hello ", false).0,
            Outcome::Present(TypedValue::String(" hello ".into()))
        );
    }

    #[test]
    fn pair_kinds_are_unsupported_as_single_widgets() {
        let (outcome, errors) = run(ValueKind::Coding, "x", false);
        assert_eq!(outcome, Outcome::Rejected);
        assert_eq!(errors, ["Input has unsupported kind Coding"]);
    }
}
