//! Reading a resource's fields back from the form rows.
//!
//! The reader walks the fields declared by the current resource, finds the row(s) rendered for
//! each field and converts what the user entered into typed values. How a row is read depends
//! only on the widget signature it carries (see [`RowShape`]).
//!
//! Notes:
//! - Every read starts by clearing all error areas
//! - Reading never stops at the first failure: every row is checked so every error is shown

use crate::composite;
use crate::constants::{
    BPMN_MESSAGE_SYSTEM, BUSINESS_KEY_LINK_ID, MESSAGE_NAME_CODE, QUESTIONNAIRE_ITEM_LABEL,
    TASK_INPUT_LABEL, USER_TASK_ID_LINK_ID,
};
use crate::registry::{FormRow, RowRegistry, Widget, WidgetKind};
use crate::validator::{self, Outcome};
use fhir::{
    QuestionnaireResponse, QuestionnaireResponseItem, Task, TaskInput, TypedValue, ValueKind,
};
use form_types::{FieldIdentity, RowKey};
use std::collections::HashSet;

/// Fields read from the form, plus whether every row validated.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadOutcome<F> {
    pub fields: Vec<F>,
    pub valid: bool,
}

/// Widget signature of a row.
#[derive(Debug)]
enum RowShape<'a> {
    Reference(&'a Widget),
    Single(ValueKind, &'a Widget),
    Coding(&'a Widget, &'a Widget),
    Identifier(&'a Widget, &'a Widget),
    ReferenceIdentifier(&'a Widget, &'a Widget),
    BooleanPair(&'a Widget, &'a Widget),
    /// A single widget whose tag has no validator.
    Unsupported(&'a str),
    /// Any other combination; the row yields no value.
    Unrecognised,
}

impl<'a> RowShape<'a> {
    fn of(widgets: &'a [Widget]) -> Self {
        use WidgetKind as K;

        match widgets {
            [widget] => match widget.kind() {
                K::ReferenceReference => Self::Reference(widget),
                K::Value(kind) => Self::Single(*kind, widget),
                other => Self::Unsupported(other.tag()),
            },
            [first, second] => match (first.kind(), second.kind()) {
                (K::CodingSystem, K::CodingCode) => Self::Coding(first, second),
                (K::IdentifierSystem, K::IdentifierValue) => Self::Identifier(first, second),
                (K::ReferenceIdentifierSystem, K::ReferenceIdentifierValue) => {
                    Self::ReferenceIdentifier(first, second)
                }
                (K::BooleanTrue, K::BooleanFalse) => Self::BooleanPair(first, second),
                _ => Self::Unrecognised,
            },
            _ => Self::Unrecognised,
        }
    }
}

/// Reads one row.
///
/// `reference_type` is the declared target type carried over into identifier-qualified
/// references.
fn read_row(
    row: &mut FormRow,
    label: &str,
    reference_type: Option<String>,
) -> Outcome<TypedValue> {
    let optional = row.is_optional();
    let key = row.key().to_string();
    let (widgets, errors) = row.widgets_and_errors();

    match RowShape::of(widgets) {
        RowShape::Reference(widget) => validator::validate(
            ValueKind::Reference,
            text(widget),
            optional,
            label,
            errors,
        ),
        RowShape::Single(kind, widget) => {
            validator::validate(kind, text(widget), optional, label, errors)
        }
        RowShape::Coding(system, code) => composite::coding(
            text(system),
            text(code),
            optional,
            label,
            errors,
        )
        .map(TypedValue::Coding),
        RowShape::Identifier(system, value) => composite::identifier(
            text(system),
            text(value),
            optional,
            label,
            errors,
        )
        .map(TypedValue::Identifier),
        RowShape::ReferenceIdentifier(system, value) => composite::reference_identifier(
            text(system),
            text(value),
            optional,
            label,
            reference_type,
            errors,
        )
        .map(TypedValue::Reference),
        RowShape::BooleanPair(yes, no) => {
            composite::boolean_pair(yes.checked(), no.checked(), optional, label, errors)
                .map(TypedValue::Boolean)
        }
        RowShape::Unsupported(tag) => validator::unsupported(tag, label, errors),
        RowShape::Unrecognised => {
            tracing::debug!(row = %key, "no reader for widget signature");
            Outcome::Absent
        }
    }
}

fn text(widget: &Widget) -> Option<&str> {
    Some(widget.value())
}

fn is_message_name(system: &str, code: &str) -> bool {
    system == BPMN_MESSAGE_SYSTEM && code == MESSAGE_NAME_CODE
}

/// Reads the new `Task.input` list from the form.
///
/// The message-name input is carried over unchanged. Every other input with a type coding is
/// read from all rows of its field (original and clones); inputs without a type coding are
/// dropped. An input whose type coding cannot key a row makes the read invalid.
///
/// A row that yields no value, because it is empty or its value was rejected, invalidates the
/// read only when it is not optional.
pub fn read_task(task: &Task, registry: &mut RowRegistry) -> ReadOutcome<TaskInput> {
    registry.clear_errors();

    let mut fields = Vec::new();
    let mut valid = true;
    let mut seen: HashSet<FieldIdentity> = HashSet::new();

    for input in &task.input {
        let Some((system, code)) = input.type_system_and_code() else {
            continue;
        };

        if is_message_name(system, code) {
            fields.push(input.clone());
            continue;
        }

        let identity = match FieldIdentity::coded(system, code) {
            Ok(identity) => identity,
            Err(e) => {
                tracing::warn!(system, code, error = %e, "input type cannot key a form row");
                valid = false;
                continue;
            }
        };

        // Repeated template inputs of the same type share one row group.
        if !seen.insert(identity.clone()) {
            continue;
        }

        let reference_type = input.reference_type();
        for row in registry.rows_for_mut(&identity) {
            let optional = row.is_optional();
            match read_row(row, TASK_INPUT_LABEL, reference_type.clone()) {
                Outcome::Present(value) => fields.push(TaskInput::new(input.type_.clone(), value)),
                // A rejected optional row keeps its error but does not block submission.
                Outcome::Absent | Outcome::Rejected => valid &= optional,
            }
        }
    }

    ReadOutcome { fields, valid }
}

/// Reads the new `QuestionnaireResponse.item` list from the form.
///
/// Only items with both `linkId` and `answer` are read; the business-key and user-task-id items
/// are carried over unchanged. An optional item left empty keeps only its `linkId` and `text`.
pub fn read_questionnaire_response(
    response: &QuestionnaireResponse,
    registry: &mut RowRegistry,
) -> ReadOutcome<QuestionnaireResponseItem> {
    registry.clear_errors();

    let mut fields = Vec::new();
    let mut valid = true;

    for item in &response.item {
        let (Some(link_id), Some(_)) = (item.link_id.as_deref(), item.answer.as_ref()) else {
            continue;
        };

        if link_id == BUSINESS_KEY_LINK_ID || link_id == USER_TASK_ID_LINK_ID {
            fields.push(item.clone());
            continue;
        }

        let row = FieldIdentity::link(link_id)
            .ok()
            .and_then(|identity| registry.row_mut(&RowKey::new(identity)));
        let Some(row) = row else {
            tracing::warn!(link_id, "no form row for questionnaire item");
            valid = false;
            continue;
        };

        let optional = row.is_optional();
        match read_row(row, QUESTIONNAIRE_ITEM_LABEL, None) {
            Outcome::Present(value) => fields.push(QuestionnaireResponseItem::answered(
                link_id,
                item.text.clone(),
                value,
            )),
            Outcome::Absent | Outcome::Rejected if optional => fields.push(
                QuestionnaireResponseItem::unanswered(link_id, item.text.clone()),
            ),
            Outcome::Absent | Outcome::Rejected => valid = false,
        }
    }

    ReadOutcome { fields, valid }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Affordance;
    use fhir::{CodeableConcept, Coding, Identifier, QuestionnaireResponseAnswer};

    const CS: &str = "http://dsf.dev/fhir/CodeSystem/test";

    fn coded(code: &str) -> FieldIdentity {
        FieldIdentity::coded(CS, code).unwrap()
    }

    fn row(identity: FieldIdentity, tags: &[&str]) -> FormRow {
        let widgets = tags
            .iter()
            .map(|tag| Widget::new(WidgetKind::from_tag(tag)))
            .collect();
        FormRow::new(RowKey::new(identity), "label", widgets)
    }

    fn input(code: &str, value: TypedValue) -> TaskInput {
        TaskInput::new(CodeableConcept::from_coding(Coding::new(CS, code)), value)
    }

    fn draft(inputs: Vec<TaskInput>) -> Task {
        let mut task = Task::parse(r#"{"resourceType":"Task","status":"draft"}"#).unwrap();
        task.input = inputs;
        task
    }

    fn set_text(registry: &mut RowRegistry, key: &RowKey, position: usize, text: &str) {
        registry
            .row_mut(key)
            .unwrap()
            .widget_mut(position)
            .unwrap()
            .set_value(text);
    }

    #[test]
    fn dispatches_on_widget_signature() {
        let mut registry = RowRegistry::new();
        registry.insert(row(coded("count"), &["integer"]));
        registry.insert(row(
            coded("target"),
            &["Reference.identifier.system", "Reference.identifier.value"],
        ));
        registry.insert(row(coded("flag"), &["boolean.true", "boolean.false"]));

        set_text(&mut registry, &RowKey::new(coded("count")), 0, "7");
        let target = RowKey::new(coded("target"));
        set_text(&mut registry, &target, 0, "http://dsf.dev/sid/organization-identifier");
        set_text(&mut registry, &target, 1, "Test_DIC");
        registry
            .row_mut(&RowKey::new(coded("flag")))
            .unwrap()
            .widget_mut(1)
            .unwrap()
            .set_checked(true);

        let template_reference = fhir::Reference::by_identifier(
            Identifier::new("http://dsf.dev/sid/organization-identifier", "placeholder"),
            Some("Organization".into()),
        );
        let task = draft(vec![
            input("count", TypedValue::Integer(0)),
            input("target", TypedValue::Reference(template_reference)),
            input("flag", TypedValue::Boolean(true)),
        ]);

        let read = read_task(&task, &mut registry);
        assert!(read.valid);
        assert_eq!(read.fields.len(), 3);
        assert_eq!(read.fields[0].value(), Some(TypedValue::Integer(7)));
        assert_eq!(read.fields[1].reference_type().as_deref(), Some("Organization"));
        assert_eq!(read.fields[2].value(), Some(TypedValue::Boolean(false)));
    }

    #[test]
    fn message_name_passes_through_and_untyped_inputs_drop() {
        let message_name = TaskInput::new(
            CodeableConcept::from_coding(Coding::new(BPMN_MESSAGE_SYSTEM, MESSAGE_NAME_CODE)),
            TypedValue::String("helloWorld".into()),
        );
        let mut untyped = input("x", TypedValue::String("x".into()));
        untyped.type_ = CodeableConcept::default();

        let mut registry = RowRegistry::new();
        let read = read_task(&draft(vec![message_name.clone(), untyped]), &mut registry);

        assert!(read.valid);
        assert_eq!(read.fields, vec![message_name]);
    }

    #[test]
    fn every_error_surfaces_and_invalidates() {
        let mut registry = RowRegistry::new();
        registry.insert(row(coded("a"), &["integer"]));
        registry.insert(row(coded("b"), &["url"]).optional(true));
        set_text(&mut registry, &RowKey::new(coded("a")), 0, "x");
        set_text(&mut registry, &RowKey::new(coded("b")), 0, "no url");

        let task = draft(vec![
            input("a", TypedValue::Integer(1)),
            input("b", TypedValue::Url("http://x".into())),
        ]);
        let read = read_task(&task, &mut registry);

        assert!(!read.valid);
        assert!(read.fields.is_empty());
        assert_eq!(registry.error_count(), 2);

        // errors from the previous read are cleared
        set_text(&mut registry, &RowKey::new(coded("a")), 0, "5");
        set_text(&mut registry, &RowKey::new(coded("b")), 0, "");
        let read = read_task(&task, &mut registry);
        assert!(read.valid);
        assert_eq!(read.fields.len(), 1);
        assert_eq!(registry.error_count(), 0);
    }

    #[test]
    fn rejected_optional_row_keeps_error_without_invalidating() {
        let mut registry = RowRegistry::new();
        registry.insert(row(coded("count"), &["integer"]).optional(true));
        set_text(&mut registry, &RowKey::new(coded("count")), 0, "abc");

        let task = draft(vec![input("count", TypedValue::Integer(1))]);
        let read = read_task(&task, &mut registry);

        assert!(read.valid);
        assert!(read.fields.is_empty());
        let key = RowKey::new(coded("count"));
        assert_eq!(
            registry.row(&key).unwrap().errors().messages(),
            ["Input not an integer"]
        );
    }

    #[test]
    fn input_type_with_separator_invalidates() {
        let mut registry = RowRegistry::new();
        let task = draft(vec![TaskInput::new(
            CodeableConcept::from_coding(Coding::new(CS, "a|b")),
            TypedValue::String("x".into()),
        )]);

        let read = read_task(&task, &mut registry);

        assert!(!read.valid);
        assert!(read.fields.is_empty());
    }

    #[test]
    fn unsupported_single_widget_is_rejected() {
        let mut registry = RowRegistry::new();
        registry.insert(row(coded("c"), &["canonical"]));

        let task = draft(vec![input("c", TypedValue::String("x".into()))]);
        let read = read_task(&task, &mut registry);

        assert!(!read.valid);
        let key = RowKey::new(coded("c"));
        assert_eq!(
            registry.row(&key).unwrap().errors().messages(),
            ["Input has unsupported kind canonical"]
        );
    }

    #[test]
    fn clones_are_read_once_per_field() {
        let mut first = row(coded("s"), &["string"]);
        first.set_affordance(Some(Affordance::AddOccurrence));
        let mut registry = RowRegistry::new();
        registry.insert(first);
        let clone = registry.add_occurrence(&coded("s")).unwrap();
        set_text(&mut registry, &RowKey::new(coded("s")), 0, "one");
        set_text(&mut registry, &clone, 0, "two");

        // the template lists the same input type twice
        let task = draft(vec![
            input("s", TypedValue::String("a".into())),
            input("s", TypedValue::String("b".into())),
        ]);
        let read = read_task(&task, &mut registry);

        let values: Vec<_> = read.fields.iter().filter_map(TaskInput::value).collect();
        assert_eq!(
            values,
            vec![TypedValue::String("one".into()), TypedValue::String("two".into())]
        );
    }

    fn user_task(items: Vec<QuestionnaireResponseItem>) -> QuestionnaireResponse {
        let mut response = QuestionnaireResponse::parse(
            r#"{"resourceType":"QuestionnaireResponse","status":"in-progress"}"#,
        )
        .unwrap();
        response.item = items;
        response
    }

    #[test]
    fn questionnaire_items_read_by_link_id() {
        let business_key = QuestionnaireResponseItem::answered(
            BUSINESS_KEY_LINK_ID,
            Some("The business-key of the process execution".into()),
            TypedValue::String("b-1".into()),
        );
        let display = QuestionnaireResponseItem::unanswered("display", Some("Read me".into()));
        let release = QuestionnaireResponseItem::answered(
            "release",
            Some("Release data?".into()),
            TypedValue::Boolean(false),
        );
        let comment = QuestionnaireResponseItem::answered(
            "comment",
            Some("Comment".into()),
            TypedValue::String("placeholder".into()),
        );

        let mut registry = RowRegistry::new();
        let release_key = RowKey::new(FieldIdentity::link("release").unwrap());
        registry.insert(row(
            FieldIdentity::link("release").unwrap(),
            &["boolean.true", "boolean.false"],
        ));
        registry.insert(row(FieldIdentity::link("comment").unwrap(), &["string"]).optional(true));
        registry
            .row_mut(&release_key)
            .unwrap()
            .widget_mut(0)
            .unwrap()
            .set_checked(true);

        let response = user_task(vec![business_key.clone(), display, release, comment]);
        let read = read_questionnaire_response(&response, &mut registry);

        assert!(read.valid);
        assert_eq!(read.fields.len(), 3);
        assert_eq!(read.fields[0], business_key);
        assert_eq!(read.fields[1].first_answer_value(), Some(TypedValue::Boolean(true)));
        assert_eq!(read.fields[2].link_id.as_deref(), Some("comment"));
        assert_eq!(read.fields[2].answer, None);
    }

    #[test]
    fn missing_mandatory_item_invalidates() {
        let mut registry = RowRegistry::new();
        let release = FieldIdentity::link("release").unwrap();
        registry.insert(row(release, &["boolean.true", "boolean.false"]));

        let response = user_task(vec![
            QuestionnaireResponseItem::answered("release", None, TypedValue::Boolean(true)),
            QuestionnaireResponseItem {
                answer: Some(vec![QuestionnaireResponseAnswer::default()]),
                ..QuestionnaireResponseItem::unanswered("unrendered", None)
            },
        ]);
        let read = read_questionnaire_response(&response, &mut registry);

        assert!(!read.valid);
        let key = RowKey::new(FieldIdentity::link("release").unwrap());
        assert_eq!(registry.row(&key).unwrap().errors().messages(), ["Item mandatory"]);
    }
}
