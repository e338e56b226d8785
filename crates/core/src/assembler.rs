//! Assembling the resource to submit.
//!
//! The candidate resource is built fresh from the bound resource on every submission attempt and
//! discarded if any row failed to validate.

use crate::reader::{self, ReadOutcome};
use crate::registry::RowRegistry;
use chrono::{DateTime, SecondsFormat, Utc};
use fhir::{
    FormResource, QuestionnaireResponse, QuestionnaireResponseItem, QuestionnaireResponseStatus,
    Task, TaskInput, TaskStatus,
};

/// Builds the Task to create from a draft Task and the inputs read from the form.
///
/// Server-assigned bookkeeping (`id`, `meta.versionId`, `meta.lastUpdated`) and the business
/// identifiers are dropped, status becomes `requested` and `authoredOn` is set to `now`.
pub fn assemble_task(
    template: &Task,
    read: ReadOutcome<TaskInput>,
    now: DateTime<Utc>,
) -> Option<Task> {
    if !read.valid {
        return None;
    }

    let mut task = template.clone();
    task.id = None;
    if let Some(meta) = task.meta.as_mut() {
        meta.clear_server_markers();
    }
    task.identifier.clear();
    task.status = TaskStatus::Requested;
    task.authored_on = Some(now.to_rfc3339_opts(SecondsFormat::Millis, true));
    task.input = read.fields;

    Some(task)
}

/// Completes a user task with the items read from the form.
///
/// Identity and metadata are kept: the response replaces the stored one in place.
pub fn assemble_questionnaire_response(
    template: &QuestionnaireResponse,
    read: ReadOutcome<QuestionnaireResponseItem>,
) -> Option<QuestionnaireResponse> {
    if !read.valid {
        return None;
    }

    let mut response = template.clone();
    response.status = QuestionnaireResponseStatus::Completed;
    response.item = read.fields;

    Some(response)
}

/// Reads the form and assembles the resource to submit.
///
/// Returns `None` if any row failed; the errors are left in the rows' error areas.
pub fn assemble(
    resource: &FormResource,
    registry: &mut RowRegistry,
    now: DateTime<Utc>,
) -> Option<FormResource> {
    let assembled = match resource {
        FormResource::Task(task) => {
            let read = reader::read_task(task, registry);
            assemble_task(task, read, now).map(FormResource::Task)
        }
        FormResource::QuestionnaireResponse(response) => {
            let read = reader::read_questionnaire_response(response, registry);
            assemble_questionnaire_response(response, read).map(FormResource::QuestionnaireResponse)
        }
    };

    if assembled.is_none() {
        tracing::debug!(
            resource_type = resource.resource_type(),
            errors = registry.error_count(),
            "form did not validate"
        );
    }

    assembled
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{FormRow, Widget, WidgetKind};
    use chrono::TimeZone;
    use fhir::{CodeableConcept, Coding, TypedValue, ValueKind};
    use form_types::{FieldIdentity, RowKey};

    const DRAFT: &str = r#"{
        "resourceType": "Task",
        "id": "123",
        "meta": {
            "versionId": "v1",
            "lastUpdated": "2024-01-01T00:00:00.000Z",
            "profile": ["http://dsf.dev/fhir/StructureDefinition/task-hello|1.0"],
            "tag": [{"system": "http://dsf.dev/fhir/CodeSystem/read-access-tag", "code": "ALL"}]
        },
        "identifier": [{"system": "http://dsf.dev/sid/task-identifier", "value": "x/hello"}],
        "instantiatesCanonical": "http://dsf.dev/bpe/Process/hello|1.0",
        "status": "draft",
        "intent": "order",
        "input": [{
            "type": {"coding": [{"system": "http://x/cs", "code": "y"}]},
            "valueString": "placeholder"
        }]
    }"#;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap()
    }

    fn string_registry(text: &str) -> RowRegistry {
        let key = RowKey::new(FieldIdentity::coded("http://x/cs", "y").unwrap());
        let mut widget = Widget::new(WidgetKind::Value(ValueKind::String));
        widget.set_value(text);
        let mut registry = RowRegistry::new();
        registry.insert(FormRow::new(key, "y", vec![widget]));
        registry
    }

    #[test]
    fn task_drops_bookkeeping_and_becomes_requested() {
        let template = Task::parse(DRAFT).unwrap();
        let read = ReadOutcome {
            fields: vec![TaskInput::new(
                CodeableConcept::from_coding(Coding::new("http://x/cs", "y")),
                TypedValue::String("hello".into()),
            )],
            valid: true,
        };

        let task = assemble_task(&template, read, now()).expect("valid task");

        assert_eq!(task.id, None);
        let meta = task.meta.as_ref().expect("meta kept");
        assert_eq!(meta.version_id, None);
        assert_eq!(meta.last_updated, None);
        assert!(meta.other.contains_key("tag"));
        assert!(task.identifier.is_empty());
        assert_eq!(task.status, TaskStatus::Requested);
        assert_eq!(task.authored_on.as_deref(), Some("2024-05-06T07:08:09.000Z"));
        assert_eq!(task.input.len(), 1);
        assert_eq!(task.other["intent"], "order");
    }

    #[test]
    fn invalid_read_assembles_nothing() {
        let template = Task::parse(DRAFT).unwrap();
        let read = ReadOutcome {
            fields: Vec::new(),
            valid: false,
        };
        assert!(assemble_task(&template, read, now()).is_none());
    }

    #[test]
    fn string_survives_assemble_and_reread() {
        let resource = FormResource::parse(DRAFT).unwrap();
        let mut registry = string_registry("hello");

        let Some(FormResource::Task(task)) = assemble(&resource, &mut registry, now()) else {
            panic!("expected an assembled Task");
        };
        assert_eq!(task.input[0].value(), Some(TypedValue::String("hello".into())));

        // the submitted Task read back through the same form yields the same value
        let rendered = task.render().unwrap();
        let reparsed = Task::parse(&rendered).unwrap();
        let reread = reader::read_task(&reparsed, &mut registry);
        assert!(reread.valid);
        assert_eq!(reread.fields, task.input);
    }

    #[test]
    fn questionnaire_response_is_completed_in_place() {
        let template = QuestionnaireResponse::parse(
            r#"{"resourceType":"QuestionnaireResponse","id":"7","meta":{"versionId":"2"},
                "status":"in-progress","questionnaire":"http://dsf.dev/fhir/Questionnaire/hello|1.0"}"#,
        )
        .unwrap();
        let read = ReadOutcome {
            fields: vec![QuestionnaireResponseItem::answered(
                "release",
                None,
                TypedValue::Boolean(true),
            )],
            valid: true,
        };

        let response = assemble_questionnaire_response(&template, read).expect("valid response");

        assert_eq!(response.id.as_deref(), Some("7"));
        assert_eq!(response.meta.unwrap().version_id.as_deref(), Some("2"));
        assert_eq!(response.status, QuestionnaireResponseStatus::Completed);
        assert_eq!(response.item.len(), 1);
        assert!(response.other.contains_key("questionnaire"));
    }
}
