//! Composite values built from two widgets.
//!
//! Coded pairs, identifier pairs and identifier-qualified references are entered as a system plus
//! a code/value. An optional pair left completely empty is absent; once either half is filled in,
//! both halves are required.

use crate::registry::ErrorArea;
use crate::validator::{self, is_empty, Outcome};
use fhir::{Coding, Identifier, Reference};

/// Validates two sub-fields together.
///
/// Optional and both empty yields [`Outcome::Absent`]. Otherwise both sub-validators run as
/// required (so both can record errors) and the pair is present only if both halves are.
pub fn optional_pair<A, B, R>(
    (first, second): (Option<&str>, Option<&str>),
    optional: bool,
    errors: &mut ErrorArea,
    validate_first: impl FnOnce(Option<&str>, &mut ErrorArea) -> Outcome<A>,
    validate_second: impl FnOnce(Option<&str>, &mut ErrorArea) -> Outcome<B>,
    combine: impl FnOnce(A, B) -> R,
) -> Outcome<R> {
    if optional && is_empty(first) && is_empty(second) {
        return Outcome::Absent;
    }

    let first = validate_first(first, errors);
    let second = validate_second(second, errors);

    match (first, second) {
        (Outcome::Present(a), Outcome::Present(b)) => Outcome::Present(combine(a, b)),
        _ => Outcome::Rejected,
    }
}

/// `system` (url) + `code` (string).
pub fn coding(
    system: Option<&str>,
    code: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<Coding> {
    optional_pair(
        (system, code),
        optional,
        errors,
        |raw, errors| validator::url(raw, false, &format!("{label} system"), errors),
        |raw, errors| validator::string(raw, false, &format!("{label} code"), errors),
        Coding::new,
    )
}

/// `system` (url) + `value` (string).
pub fn identifier(
    system: Option<&str>,
    value: Option<&str>,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<Identifier> {
    optional_pair(
        (system, value),
        optional,
        errors,
        |raw, errors| validator::url(raw, false, &format!("{label} system"), errors),
        |raw, errors| validator::string(raw, false, &format!("{label} value"), errors),
        Identifier::new,
    )
}

/// An identifier pair wrapped as a logical reference to a resource of `target_type`.
pub fn reference_identifier(
    system: Option<&str>,
    value: Option<&str>,
    optional: bool,
    label: &str,
    target_type: Option<String>,
    errors: &mut ErrorArea,
) -> Outcome<Reference> {
    identifier(system, value, optional, label, errors)
        .map(|identifier| Reference::by_identifier(identifier, target_type))
}

/// Two exclusive yes/no toggles.
///
/// If both toggles are set, `true` wins.
pub fn boolean_pair(
    checked_true: bool,
    checked_false: bool,
    optional: bool,
    label: &str,
    errors: &mut ErrorArea,
) -> Outcome<bool> {
    match (checked_true, checked_false) {
        (true, _) => Outcome::Present(true),
        (false, true) => Outcome::Present(false),
        (false, false) if optional => Outcome::Absent,
        (false, false) => {
            errors.push(format!("{label} mandatory"));
            Outcome::Rejected
        }
    }
}
