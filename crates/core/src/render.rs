//! Initial form rows for a resource.
//!
//! One row per editable field: every Task input except the message name (keyed by its type
//! coding, labelled by the code) and every answerable QuestionnaireResponse item except the
//! business key and user task id (keyed and labelled by `linkId`/`text`). The widgets follow the
//! field's current value type and carry the current value as placeholder.

use crate::constants::{
    BPMN_MESSAGE_SYSTEM, BUSINESS_KEY_LINK_ID, MESSAGE_NAME_CODE, USER_TASK_ID_LINK_ID,
};
use crate::registry::{FormRow, RowRegistry, Widget, WidgetKind};
use fhir::{FormResource, QuestionnaireResponse, Task, TypedValue};
use form_types::{FieldIdentity, RowKey};

/// Builds the row registry for a resource.
pub fn render_rows(resource: &FormResource) -> RowRegistry {
    let registry = match resource {
        FormResource::Task(task) => task_rows(task),
        FormResource::QuestionnaireResponse(response) => questionnaire_rows(response),
    };

    tracing::debug!(
        resource_type = resource.resource_type(),
        rows = registry.len(),
        "rendered form rows"
    );
    registry
}

fn task_rows(task: &Task) -> RowRegistry {
    let mut registry = RowRegistry::new();

    for input in &task.input {
        let Some((system, code)) = input.type_system_and_code() else {
            continue;
        };
        if system == BPMN_MESSAGE_SYSTEM && code == MESSAGE_NAME_CODE {
            continue;
        }

        let Ok(identity) = FieldIdentity::coded(system, code) else {
            tracing::warn!(system, code, "input type cannot key a form row");
            continue;
        };
        let Some(value) = input.value() else {
            tracing::warn!(field = %identity, "input has no supported value");
            continue;
        };

        // Template inputs repeating a type become numbered occurrences.
        let occurrences = registry.rows_for(&identity).len();
        let key = match u32::try_from(occurrences) {
            Ok(0) => RowKey::new(identity),
            Ok(index) => RowKey::with_index(identity, index),
            Err(_) => continue,
        };

        registry.insert(FormRow::new(key, code, widgets_for(&value)));
    }

    registry
}

fn questionnaire_rows(response: &QuestionnaireResponse) -> RowRegistry {
    let mut registry = RowRegistry::new();

    for item in &response.item {
        let (Some(link_id), Some(_)) = (item.link_id.as_deref(), item.answer.as_ref()) else {
            continue;
        };
        if link_id == BUSINESS_KEY_LINK_ID || link_id == USER_TASK_ID_LINK_ID {
            continue;
        }

        let Ok(identity) = FieldIdentity::link(link_id) else {
            tracing::warn!(link_id, "linkId cannot key a form row");
            continue;
        };
        let Some(value) = item.first_answer_value() else {
            tracing::warn!(link_id, "item has no supported answer value");
            continue;
        };

        let label = item.text.as_deref().unwrap_or(link_id);
        registry.insert(FormRow::new(
            RowKey::new(identity),
            label,
            widgets_for(&value),
        ));
    }

    registry
}

fn text_widget(kind: WidgetKind, placeholder: Option<&str>) -> Widget {
    let widget = Widget::new(kind);
    match placeholder {
        Some(placeholder) => widget.with_placeholder(placeholder),
        None => widget,
    }
}

/// Widgets for a field whose current value is `value`.
fn widgets_for(value: &TypedValue) -> Vec<Widget> {
    let kind = WidgetKind::Value(value.kind());

    match value {
        TypedValue::String(text)
        | TypedValue::Date(text)
        | TypedValue::Time(text)
        | TypedValue::DateTime(text)
        | TypedValue::Instant(text)
        | TypedValue::Uri(text)
        | TypedValue::Url(text) => vec![text_widget(kind, Some(text))],
        TypedValue::Integer(n) => vec![text_widget(kind, Some(&n.to_string()))],
        TypedValue::Decimal(n) => vec![text_widget(kind, Some(&n.to_string()))],
        TypedValue::Reference(reference) => match (&reference.reference, &reference.identifier) {
            (None, Some(identifier)) => vec![
                text_widget(
                    WidgetKind::ReferenceIdentifierSystem,
                    identifier.system.as_deref(),
                ),
                text_widget(
                    WidgetKind::ReferenceIdentifierValue,
                    identifier.value.as_deref(),
                ),
            ],
            (target, _) => vec![text_widget(
                WidgetKind::ReferenceReference,
                target.as_deref(),
            )],
        },
        TypedValue::Coding(coding) => vec![
            text_widget(WidgetKind::CodingSystem, coding.system.as_deref()),
            text_widget(WidgetKind::CodingCode, coding.code.as_deref()),
        ],
        TypedValue::Identifier(identifier) => vec![
            text_widget(WidgetKind::IdentifierSystem, identifier.system.as_deref()),
            text_widget(WidgetKind::IdentifierValue, identifier.value.as_deref()),
        ],
        TypedValue::Boolean(flag) => {
            // each toggle's placeholder says whether it is the one to check on restore
            let mut yes = Widget::new(WidgetKind::BooleanTrue).with_placeholder(flag.to_string());
            let mut no = Widget::new(WidgetKind::BooleanFalse).with_placeholder((!flag).to_string());
            yes.set_checked(*flag);
            no.set_checked(!flag);
            vec![yes, no]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TASK: &str = r#"{
        "resourceType": "Task",
        "status": "draft",
        "input": [
            {"type": {"coding": [{"system": "http://dsf.dev/fhir/CodeSystem/bpmn-message", "code": "message-name"}]},
             "valueString": "helloWorld"},
            {"type": {"coding": [{"system": "http://x/cs", "code": "target"}]},
             "valueReference": {"type": "Organization",
                "identifier": {"system": "http://dsf.dev/sid/organization-identifier", "value": "Test_DIC"}}},
            {"type": {"coding": [{"system": "http://x/cs", "code": "flag"}]}, "valueBoolean": false},
            {"type": {"coding": [{"system": "http://x/cs", "code": "note"}]}, "valueString": "a"},
            {"type": {"coding": [{"system": "http://x/cs", "code": "note"}]}, "valueString": "b"},
            {"type": {"coding": [{"system": "http://x/cs", "code": "canon"}]}, "valueCanonical": "http://x"}
        ]
    }"#;

    fn kinds(row: &FormRow) -> Vec<&str> {
        row.widgets().iter().map(|w| w.kind().tag()).collect()
    }

    #[test]
    fn task_inputs_become_rows() {
        let registry = render_rows(&FormResource::parse(TASK).unwrap());
        let rows: Vec<&FormRow> = registry.rows().collect();

        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].key().to_string(), "http://x/cs|target");
        assert_eq!(rows[0].label(), "target");
        assert_eq!(
            kinds(rows[0]),
            ["Reference.identifier.system", "Reference.identifier.value"]
        );
        assert_eq!(rows[0].widgets()[1].placeholder(), Some("Test_DIC"));

        assert_eq!(kinds(rows[1]), ["boolean.true", "boolean.false"]);
        assert!(!rows[1].widgets()[0].checked());
        assert!(rows[1].widgets()[1].checked());
        assert_eq!(rows[1].widgets()[1].placeholder(), Some("true"));

        assert_eq!(rows[2].key().to_string(), "http://x/cs|note");
        assert_eq!(rows[3].key().to_string(), "http://x/cs|note|1");
        assert_eq!(rows[3].widgets()[0].placeholder(), Some("b"));
    }

    #[test]
    fn questionnaire_items_become_rows() {
        let response = FormResource::parse(
            r#"{"resourceType":"QuestionnaireResponse","status":"in-progress","item":[
                {"linkId":"business-key","text":"The business-key","answer":[{"valueString":"k"}]},
                {"linkId":"user-task-id","answer":[{"valueString":"u"}]},
                {"linkId":"info","text":"Display only"},
                {"linkId":"contact","text":"Contact","answer":[{"valueCoding":{"system":"http://s","code":"c"}}]},
                {"linkId":"when","answer":[{"valueDateTime":"2024-01-31T10:15:00.000Z"}]}
            ]}"#,
        )
        .unwrap();

        let registry = render_rows(&response);
        let rows: Vec<&FormRow> = registry.rows().collect();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].label(), "Contact");
        assert_eq!(kinds(rows[0]), ["Coding.system", "Coding.code"]);
        assert_eq!(rows[1].label(), "when");
        assert_eq!(kinds(rows[1]), ["dateTime"]);
        assert_eq!(
            rows[1].widgets()[0].placeholder(),
            Some("2024-01-31T10:15:00.000Z")
        );
    }
}
