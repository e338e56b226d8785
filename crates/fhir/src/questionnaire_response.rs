//! FHIR `QuestionnaireResponse` wire model.
//!
//! A DSF user task is a `QuestionnaireResponse` in status `in-progress` whose items carry
//! placeholder answers. Completing the form replaces the answers and sets status `completed`.

use crate::value::{read_value_member, write_value_member};
use crate::{parse_json, FhirError, FhirResult, Meta, TypedValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub(crate) const RESOURCE_TYPE: &str = "QuestionnaireResponse";

/// `QuestionnaireResponse.status`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionnaireResponseStatus {
    InProgress,
    Completed,
    Amended,
    EnteredInError,
    Stopped,
}

/// A FHIR `QuestionnaireResponse` resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponse {
    pub resource_type: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<Meta>,

    pub status: QuestionnaireResponseStatus,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub item: Vec<QuestionnaireResponseItem>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl QuestionnaireResponse {
    /// Parse a QuestionnaireResponse from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FhirError`] if the JSON does not match the wire model or `resourceType` is not
    /// `"QuestionnaireResponse"`.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        let response: QuestionnaireResponse = parse_json(json_text, "QuestionnaireResponse")?;

        if response.resource_type != RESOURCE_TYPE {
            return Err(FhirError::InvalidInput(format!(
                "Expected resourceType 'QuestionnaireResponse', got '{}'",
                response.resource_type
            )));
        }

        Ok(response)
    }

    /// Render the QuestionnaireResponse as compact JSON text.
    pub fn render(&self) -> FhirResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}

/// One entry of `QuestionnaireResponse.item`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireResponseItem {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,

    /// `None` and an empty list are different: items without `answer` are display-only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub answer: Option<Vec<QuestionnaireResponseAnswer>>,

    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl QuestionnaireResponseItem {
    /// An item carrying only its link id and text.
    pub fn unanswered(link_id: impl Into<String>, text: Option<String>) -> Self {
        Self {
            link_id: Some(link_id.into()),
            text,
            ..Self::default()
        }
    }

    pub fn answered(link_id: impl Into<String>, text: Option<String>, value: TypedValue) -> Self {
        Self {
            answer: Some(vec![QuestionnaireResponseAnswer::new(value)]),
            ..Self::unanswered(link_id, text)
        }
    }

    /// Value of the first answer, if any.
    pub fn first_answer_value(&self) -> Option<TypedValue> {
        self.answer.as_ref()?.first()?.value()
    }
}

/// One entry of `QuestionnaireResponse.item.answer`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct QuestionnaireResponseAnswer {
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl QuestionnaireResponseAnswer {
    pub fn new(value: TypedValue) -> Self {
        let mut answer = Self::default();
        write_value_member(&mut answer.other, &value);
        answer
    }

    pub fn value(&self) -> Option<TypedValue> {
        read_value_member(&self.other)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const USER_TASK: &str = r#"{
        "resourceType": "QuestionnaireResponse",
        "id": "qr-1",
        "meta": {"versionId": "2"},
        "questionnaire": "http://dsf.dev/fhir/Questionnaire/hello|1.0",
        "status": "in-progress",
        "item": [
            {"linkId": "business-key", "text": "The business-key of the process execution", "answer": [{"valueString": "bk-1"}]},
            {"linkId": "user-task-id", "text": "The user-task-id of the process execution", "answer": [{"valueString": "ut-1"}]},
            {"linkId": "release", "text": "Release data?", "answer": [{"valueBoolean": false}]},
            {"linkId": "info", "text": "Display only"}
        ]
    }"#;

    #[test]
    fn parses_user_task() {
        let response = QuestionnaireResponse::parse(USER_TASK).expect("parse user task");

        assert_eq!(response.status, QuestionnaireResponseStatus::InProgress);
        assert_eq!(response.item.len(), 4);
        assert_eq!(
            response.item[2].first_answer_value(),
            Some(TypedValue::Boolean(false))
        );
        assert!(response.item[3].answer.is_none());
        assert_eq!(
            response.other["questionnaire"],
            "http://dsf.dev/fhir/Questionnaire/hello|1.0"
        );
    }

    #[test]
    fn unanswered_item_renders_link_id_and_text_only() {
        let item = QuestionnaireResponseItem::unanswered("comment", Some("Comment".into()));
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json, serde_json::json!({"linkId": "comment", "text": "Comment"}));
    }

    #[test]
    fn answered_item_renders_value_member() {
        let item = QuestionnaireResponseItem::answered(
            "release",
            Some("Release data?".into()),
            TypedValue::Boolean(true),
        );
        let json = serde_json::to_value(&item).unwrap();
        assert_eq!(json["answer"][0]["valueBoolean"], true);
    }
}
