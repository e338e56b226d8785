//! FHIR `Task` wire model.
//!
//! A DSF process is started by creating a `Task` in status `requested`. The server renders a
//! `draft` Task (a template) as a form; the form fills in the `input` values and posts a new
//! Task built from the template.
//!
//! Notes:
//! - Members other than the ones modelled here (`instantiatesCanonical`, `intent`,
//!   `requester`, `restriction`, ...) are kept verbatim in [`Task::other`]
//! - Each input keeps its own unmodelled members next to the `value[x]` member

use crate::value::{read_value_member, write_value_member};
use crate::{parse_json, CodeableConcept, FhirError, FhirResult, Identifier, Meta, TypedValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) const RESOURCE_TYPE: &str = "Task";

/// `Task.status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    Draft,
    Requested,
    Received,
    Accepted,
    Rejected,
    Ready,
    Cancelled,
    InProgress,
    OnHold,
    Failed,
    Completed,
    EnteredInError,
}

/// A FHIR `Task` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub identifier: Vec<Identifier>,

    pub status: TaskStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authored_on: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub input: Vec<TaskInput>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl Task {
    /// Parse a Task from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if:
    /// - the JSON does not match the wire model (with the path of the first mismatch),
    /// - `resourceType` is not `"Task"`.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let task: Task = parse_json(json_text, "Task")?;

        if task.resource_type != RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'Task', got '{}'",
                task.resource_type
            )));
        }

        Ok(task)
    }

    /// Render the Task as compact JSON text.
    pub fn render(&self) -> FhirResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Canonical URLs of the profiles this Task claims.
    pub fn profiles(&self) -> &[String] {
        self.meta.as_ref().map_or(&[], |meta| meta.profile.as_slice())
    }
}

/// One entry of `Task.input`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskInput {
    #[serde(rename = "type")]
    pub type_: CodeableConcept,

    /// The `value[x]` member and any other unmodelled members.
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl TaskInput {
    pub fn new(type_: CodeableConcept, value: TypedValue) -> Self {
        let mut input = Self {
            type_,
            other: Map::new(),
        };
        input.set_value(&value);
        input
    }

    /// `(system, code)` of the input type's first coding.
    pub fn type_system_and_code(&self) -> Option<(&str, &str)> {
        self.type_.first_system_and_code()
    }

    /// The decoded `value[x]`, if present and supported.
    pub fn value(&self) -> Option<TypedValue> {
        read_value_member(&self.other)
    }

    pub fn set_value(&mut self, value: &TypedValue) {
        write_value_member(&mut self.other, value);
    }

    /// Declared target type of a `valueReference`, e.g. `Organization`.
    pub fn reference_type(&self) -> Option<String> {
        match self.value() {
            Some(TypedValue::Reference(reference)) => reference.type_,
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Coding, Reference};

    const DRAFT_TASK: &str = r#"{
        "resourceType": "Task",
        "id": "123",
        "meta": {
            "versionId": "v1",
            "lastUpdated": "2024-01-01T10:00:00.000+00:00",
            "profile": ["http://dsf.dev/fhir/StructureDefinition/task-hello-world|1.0"]
        },
        "identifier": [{"system": "http://dsf.dev/sid/task-identifier", "value": "hello"}],
        "instantiatesCanonical": "http://dsf.dev/bpe/Process/helloWorld|1.0",
        "status": "draft",
        "intent": "order",
        "authoredOn": "2024-01-01T10:00:00.000+00:00",
        "input": [
            {
                "type": {"coding": [{"system": "http://dsf.dev/fhir/CodeSystem/bpmn-message", "code": "message-name"}]},
                "valueString": "helloWorld"
            },
            {
                "type": {"coding": [{"system": "http://x/cs", "code": "target"}]},
                "valueReference": {
                    "type": "Organization",
                    "identifier": {"system": "http://dsf.dev/sid/organization-identifier", "value": "Test_DIC"}
                }
            }
        ]
    }"#;

    #[test]
    fn parses_draft_task_and_keeps_unmodelled_members() {
        let task = Task::parse(DRAFT_TASK).expect("parse draft task");

        assert_eq!(task.status, TaskStatus::Draft);
        assert_eq!(task.id.as_deref(), Some("123"));
        assert_eq!(task.profiles().len(), 1);
        assert_eq!(task.input.len(), 2);
        assert_eq!(task.other["intent"], "order");

        let rendered = task.render().expect("render task");
        let reparsed = Task::parse(&rendered).expect("reparse task");
        assert_eq!(task, reparsed);
    }

    #[test]
    fn reads_input_values_and_reference_type() {
        let task = Task::parse(DRAFT_TASK).unwrap();

        assert_eq!(
            task.input[0].value(),
            Some(TypedValue::String("helloWorld".into()))
        );
        assert_eq!(
            task.input[0].type_system_and_code(),
            Some(("http://dsf.dev/fhir/CodeSystem/bpmn-message", "message-name"))
        );
        assert_eq!(task.input[1].reference_type().as_deref(), Some("Organization"));
    }

    #[test]
    fn new_input_renders_value_member() {
        let input = TaskInput::new(
            CodeableConcept::from_coding(Coding::new("http://x/cs", "y")),
            TypedValue::Reference(Reference::literal("https://dsf.dev/fhir/Task/1")),
        );
        let json = serde_json::to_value(&input).unwrap();
        assert_eq!(json["type"]["coding"][0]["code"], "y");
        assert_eq!(json["valueReference"]["reference"], "https://dsf.dev/fhir/Task/1");
    }

    #[test]
    fn rejects_wrong_resource_type() {
        let err = Task::parse(r#"{"resourceType":"QuestionnaireResponse","status":"draft"}"#)
            .expect_err("should reject resource type");
        assert!(matches!(err, FhirError::InvalidInput(msg) if msg.contains("Task")));
    }
}
