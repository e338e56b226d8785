//! The form row registry.
//!
//! A rendered form is a sequence of rows. Each row belongs to one field (a Task input type or a
//! QuestionnaireResponse item), owns one or two typed widgets and an error area, and may carry an
//! affordance to add or remove an occurrence of a repeatable field.
//!
//! Rows are grouped by field identity in document order. Looking a field up returns its rows in
//! order: the original row first, then its clones (`|1`, `|2`, ...).

use crate::{FormError, FormResult};
use fhir::ValueKind;
use form_types::{FieldIdentity, RowKey};
use std::fmt;

/// Inline error messages of one row.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ErrorArea {
    messages: Vec<String>,
}

impl ErrorArea {
    pub fn push(&mut self, message: impl Into<String>) {
        self.messages.push(message.into());
    }

    pub fn clear(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

/// Declarative marker on a widget stating which typed value it captures.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum WidgetKind {
    /// A single text input for a primitive value (`string`, `integer`, `dateTime`, ...).
    Value(ValueKind),
    ReferenceReference,
    CodingSystem,
    CodingCode,
    IdentifierSystem,
    IdentifierValue,
    ReferenceIdentifierSystem,
    ReferenceIdentifierValue,
    BooleanTrue,
    BooleanFalse,
    /// A tag this form engine does not know.
    Unknown(String),
}

impl WidgetKind {
    const COMPOSITE_TAGS: [(&'static str, WidgetKind); 9] = [
        ("Reference.reference", WidgetKind::ReferenceReference),
        ("Coding.system", WidgetKind::CodingSystem),
        ("Coding.code", WidgetKind::CodingCode),
        ("Identifier.system", WidgetKind::IdentifierSystem),
        ("Identifier.value", WidgetKind::IdentifierValue),
        (
            "Reference.identifier.system",
            WidgetKind::ReferenceIdentifierSystem,
        ),
        (
            "Reference.identifier.value",
            WidgetKind::ReferenceIdentifierValue,
        ),
        ("boolean.true", WidgetKind::BooleanTrue),
        ("boolean.false", WidgetKind::BooleanFalse),
    ];

    /// Parses a widget tag, ignoring ASCII case.
    pub fn from_tag(tag: &str) -> Self {
        let tag = tag.trim();

        if let Some((_, kind)) = Self::COMPOSITE_TAGS
            .iter()
            .find(|(known, _)| known.eq_ignore_ascii_case(tag))
        {
            return kind.clone();
        }

        match ValueKind::from_type_code(tag) {
            Some(kind) => Self::Value(kind),
            None => Self::Unknown(tag.to_owned()),
        }
    }

    /// The widget tag, e.g. `Coding.system` or `dateTime`.
    pub fn tag(&self) -> &str {
        match self {
            Self::Value(kind) => kind.type_code(),
            Self::Unknown(tag) => tag,
            known => Self::COMPOSITE_TAGS
                .iter()
                .find(|(_, kind)| kind == known)
                .map_or("", |(tag, _)| tag),
        }
    }

    fn is_toggle(&self) -> bool {
        matches!(self, Self::BooleanTrue | Self::BooleanFalse)
    }
}

impl fmt::Display for WidgetKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// One input of a form row: a text field or a radio toggle.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Widget {
    kind: WidgetKind,
    value: String,
    checked: bool,
    placeholder: Option<String>,
}

impl Widget {
    pub fn new(kind: WidgetKind) -> Self {
        Self {
            kind,
            value: String::new(),
            checked: false,
            placeholder: None,
        }
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn kind(&self) -> &WidgetKind {
        &self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn set_value(&mut self, value: impl Into<String>) {
        self.value = value.into();
    }

    pub fn checked(&self) -> bool {
        self.checked
    }

    pub fn set_checked(&mut self, checked: bool) {
        self.checked = checked;
    }

    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    fn clear(&mut self) {
        self.value.clear();
        self.checked = false;
    }

    /// Copies the placeholder into the widget. Toggles are checked iff the placeholder is `true`.
    fn restore_placeholder(&mut self) {
        let Some(placeholder) = self.placeholder.as_deref().filter(|p| !p.is_empty()) else {
            return;
        };

        if self.kind.is_toggle() {
            self.checked = placeholder == "true";
        } else {
            self.value = placeholder.to_owned();
        }
    }
}

/// Occurrence control attached to a row.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Affordance {
    /// Adds another occurrence of the field (on the original row of a repeatable field).
    AddOccurrence,
    /// Removes this occurrence (on cloned rows).
    RemoveOccurrence,
}

/// One row of the form.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormRow {
    key: RowKey,
    label: String,
    widgets: Vec<Widget>,
    errors: ErrorArea,
    optional: bool,
    cardinality: Option<String>,
    affordance: Option<Affordance>,
}

impl FormRow {
    pub fn new(key: RowKey, label: impl Into<String>, widgets: Vec<Widget>) -> Self {
        Self {
            key,
            label: label.into(),
            widgets,
            errors: ErrorArea::default(),
            optional: false,
            cardinality: None,
            affordance: None,
        }
    }

    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    pub fn key(&self) -> &RowKey {
        &self.key
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn widgets(&self) -> &[Widget] {
        &self.widgets
    }

    pub fn widget_mut(&mut self, position: usize) -> FormResult<&mut Widget> {
        let row = self.key.to_string();
        self.widgets
            .get_mut(position)
            .ok_or(FormError::UnknownWidget { row, position })
    }

    pub fn errors(&self) -> &ErrorArea {
        &self.errors
    }

    pub fn errors_mut(&mut self) -> &mut ErrorArea {
        &mut self.errors
    }

    /// Widgets to read from plus the error area to report into.
    pub(crate) fn widgets_and_errors(&mut self) -> (&[Widget], &mut ErrorArea) {
        (&self.widgets, &mut self.errors)
    }

    pub fn is_optional(&self) -> bool {
        self.optional
    }

    pub fn set_optional(&mut self, optional: bool) {
        self.optional = optional;
    }

    /// Cardinality annotation, e.g. `[0..*]`.
    pub fn cardinality(&self) -> Option<&str> {
        self.cardinality.as_deref()
    }

    pub fn set_cardinality(&mut self, cardinality: impl Into<String>) {
        self.cardinality = Some(cardinality.into());
    }

    pub fn affordance(&self) -> Option<Affordance> {
        self.affordance
    }

    pub fn set_affordance(&mut self, affordance: Option<Affordance>) {
        self.affordance = affordance;
    }

    /// Copy of this row as occurrence `index`: empty widgets, no errors, removable.
    fn clone_as_occurrence(&self, index: u32) -> Self {
        let mut clone = self.clone();
        clone.key = RowKey::with_index(self.key.identity().clone(), index);
        clone.errors.clear();
        clone.widgets.iter_mut().for_each(Widget::clear);
        clone.affordance = Some(Affordance::RemoveOccurrence);
        clone
    }
}

#[derive(Clone, Debug)]
struct RowGroup {
    identity: FieldIdentity,
    rows: Vec<FormRow>,
}

/// All rows of a form, grouped by field identity in document order.
#[derive(Clone, Debug, Default)]
pub struct RowRegistry {
    groups: Vec<RowGroup>,
}

impl RowRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a row after the existing rows of its field.
    pub fn insert(&mut self, row: FormRow) {
        let identity = row.key().identity().clone();
        match self.groups.iter_mut().find(|g| g.identity == identity) {
            Some(group) => group.rows.push(row),
            None => self.groups.push(RowGroup {
                identity,
                rows: vec![row],
            }),
        }
    }

    /// Rows of one field, original first.
    pub fn rows_for(&self, identity: &FieldIdentity) -> &[FormRow] {
        self.group(identity).map_or(&[], |g| g.rows.as_slice())
    }

    pub fn rows_for_mut(&mut self, identity: &FieldIdentity) -> &mut [FormRow] {
        match self.groups.iter_mut().find(|g| &g.identity == identity) {
            Some(group) => group.rows.as_mut_slice(),
            None => &mut [],
        }
    }

    pub fn row(&self, key: &RowKey) -> Option<&FormRow> {
        self.rows_for(key.identity()).iter().find(|r| r.key() == key)
    }

    pub fn row_mut(&mut self, key: &RowKey) -> Option<&mut FormRow> {
        self.rows_for_mut(key.identity())
            .iter_mut()
            .find(|r| r.key() == key)
    }

    /// All rows in document order.
    pub fn rows(&self) -> impl Iterator<Item = &FormRow> {
        self.groups.iter().flat_map(|g| g.rows.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|g| g.rows.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Empties every error area.
    pub fn clear_errors(&mut self) {
        self.groups
            .iter_mut()
            .flat_map(|g| g.rows.iter_mut())
            .for_each(|row| row.errors.clear());
    }

    /// Total number of error messages currently shown.
    pub fn error_count(&self) -> usize {
        self.rows().map(|row| row.errors().len()).sum()
    }

    /// Adds another occurrence of a repeatable field after its last row.
    ///
    /// The new row copies the field's original row with emptied widgets and error area, is
    /// keyed with the next repeat index and can be removed again.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownRow`] if the field has no rows,
    /// [`FormError::NotRepeatable`] if its original row has no add affordance and
    /// [`FormError::Key`] if the last row already has the largest repeat index.
    pub fn add_occurrence(&mut self, identity: &FieldIdentity) -> FormResult<RowKey> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| &g.identity == identity)
            .ok_or_else(|| FormError::UnknownRow(identity.to_string()))?;

        let (Some(first), Some(last)) = (group.rows.first(), group.rows.last()) else {
            return Err(FormError::UnknownRow(identity.to_string()));
        };

        if first.affordance() != Some(Affordance::AddOccurrence) {
            return Err(FormError::NotRepeatable(identity.to_string()));
        }

        let clone = first.clone_as_occurrence(last.key().next_index()?);
        let key = clone.key().clone();
        group.rows.push(clone);

        tracing::debug!(row = %key, "added occurrence");
        Ok(key)
    }

    /// Detaches a cloned occurrence.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::UnknownRow`] if no row has this key and [`FormError::NotRemovable`]
    /// if the row is not a clone.
    pub fn remove_occurrence(&mut self, key: &RowKey) -> FormResult<FormRow> {
        let group = self
            .groups
            .iter_mut()
            .find(|g| &g.identity == key.identity())
            .ok_or_else(|| FormError::UnknownRow(key.to_string()))?;

        let position = group
            .rows
            .iter()
            .position(|r| r.key() == key)
            .ok_or_else(|| FormError::UnknownRow(key.to_string()))?;

        if group.rows[position].affordance() != Some(Affordance::RemoveOccurrence) {
            return Err(FormError::NotRemovable(key.to_string()));
        }

        tracing::debug!(row = %key, "removed occurrence");
        Ok(group.rows.remove(position))
    }

    /// Copies a widget's placeholder into its value (or toggle state).
    pub fn restore_placeholder(&mut self, key: &RowKey, position: usize) -> FormResult<()> {
        let row = self
            .row_mut(key)
            .ok_or_else(|| FormError::UnknownRow(key.to_string()))?;
        row.widget_mut(position)?.restore_placeholder();
        Ok(())
    }

    fn group(&self, identity: &FieldIdentity) -> Option<&RowGroup> {
        self.groups.iter().find(|g| &g.identity == identity)
    }
}
