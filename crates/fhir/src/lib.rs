//! FHIR wire/boundary support for DSF task and questionnaire forms.
//!
//! This crate provides **wire models** and **format/translation helpers** for the resources a
//! form works on:
//! - `Task` (a process start request with typed inputs)
//! - `QuestionnaireResponse` (a user task with typed answers)
//! - `Bundle` / `StructureDefinition` (the profile schema searched at form load)
//!
//! This crate focuses on:
//! - FHIR JSON serialisation/deserialisation
//! - lossless round trips: members that are not modelled explicitly are kept verbatim
//! - translation between typed values and their `value[x]` wire members
//!
//! It does not validate user input; that lives in `form_core`.

pub mod datatypes;
pub mod questionnaire_response;
pub mod structure_definition;
pub mod task;
pub mod value;

pub use datatypes::{CodeableConcept, Coding, Identifier, Meta, Reference};
pub use questionnaire_response::{
    QuestionnaireResponse, QuestionnaireResponseAnswer, QuestionnaireResponseItem,
    QuestionnaireResponseStatus,
};
pub use structure_definition::{
    Bundle, BundleEntry, Differential, ElementDefinition, ElementType, StructureDefinition,
};
pub use task::{Task, TaskInput, TaskStatus};
pub use value::{TypedValue, ValueKind};

use serde::de::DeserializeOwned;

/// Errors returned by the `fhir` boundary crate.
#[derive(Debug, thiserror::Error)]
pub enum FhirError {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    #[error("translation error: {0}")]
    Translation(String),

    #[error("unsupported resource type: {0}")]
    UnsupportedResourceType(String),
}

/// Type alias for Results that can fail with a [`FhirError`].
pub type FhirResult<T> = Result<T, FhirError>;

/// Parse JSON text into a wire model, reporting the path of the first mismatch.
///
/// This uses `serde_path_to_error` to surface a best-effort "path" (e.g. `input[2].type`)
/// to the failing field when the JSON does not match the wire schema.
pub(crate) fn parse_json<T: DeserializeOwned>(json_text: &str, what: &str) -> FhirResult<T> {
    let mut deserializer = serde_json::Deserializer::from_str(json_text);

    match serde_path_to_error::deserialize::<_, T>(&mut deserializer) {
        Ok(parsed) => Ok(parsed),
        Err(err) => {
            let path = err.path().to_string();
            let source = err.into_inner();
            let path = if path.is_empty() || path == "." {
                "<root>"
            } else {
                path.as_str()
            };
            Err(FhirError::Translation(format!(
                "{what} schema mismatch at {path}: {source}"
            )))
        }
    }
}

/// The resource a form is bound to.
#[derive(Clone, Debug, PartialEq)]
pub enum FormResource {
    Task(Task),
    QuestionnaireResponse(QuestionnaireResponse),
}

impl FormResource {
    /// Parse either a `Task` or a `QuestionnaireResponse` from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError::UnsupportedResourceType`] for any other `resourceType`, and
    /// [`FhirError::Translation`] when the JSON does not match the wire model.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        #[derive(serde::Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Probe {
            resource_type: String,
        }

        let probe: Probe = parse_json(json_text, "Resource")?;
        match probe.resource_type.as_str() {
            task::RESOURCE_TYPE => Ok(Self::Task(Task::parse(json_text)?)),
            questionnaire_response::RESOURCE_TYPE => Ok(Self::QuestionnaireResponse(
                QuestionnaireResponse::parse(json_text)?,
            )),
            other => Err(FhirError::UnsupportedResourceType(other.to_owned())),
        }
    }

    /// Render the resource as compact JSON text.
    pub fn render(&self) -> FhirResult<String> {
        match self {
            Self::Task(task) => task.render(),
            Self::QuestionnaireResponse(response) => response.render(),
        }
    }

    pub fn resource_type(&self) -> &'static str {
        match self {
            Self::Task(_) => task::RESOURCE_TYPE,
            Self::QuestionnaireResponse(_) => questionnaire_response::RESOURCE_TYPE,
        }
    }
}
