//! Request URLs derived from the page a form was loaded from.
//!
//! Only the origin and path of the page matter; query and fragment are ignored.
//!
//! | page                                        | derived URL                            |
//! |---------------------------------------------|----------------------------------------|
//! | `.../fhir/Task/1`                           | create: `.../fhir/Task`                |
//! | `.../fhir/QuestionnaireResponse/7/_history/2` | update: `.../fhir/QuestionnaireResponse/7` |
//! | `.../fhir/Task/1`                           | schema: `.../fhir/StructureDefinition` |

use crate::{ClientError, ClientResult};
use url::Url;

const TASK_SEGMENT: &str = "/Task";
const QUESTIONNAIRE_RESPONSE_SEGMENT: &str = "/QuestionnaireResponse";
const HISTORY_SEGMENT: &str = "/_history";
const STRUCTURE_DEFINITION_SEGMENT: &str = "/StructureDefinition";

/// Origin and path of the form page.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PageLocation {
    url: Url,
}

impl PageLocation {
    pub fn new(page_url: &Url) -> Self {
        let mut url = page_url.clone();
        url.set_query(None);
        url.set_fragment(None);
        Self { url }
    }

    /// The page itself: where the bound resource is read from.
    pub fn resource_url(&self) -> &Url {
        &self.url
    }

    /// `<base>/Task`, where new Tasks are posted.
    pub fn task_collection(&self) -> ClientResult<Url> {
        let end = self.segment_start(TASK_SEGMENT)? + TASK_SEGMENT.len();
        self.parse_prefix(end)
    }

    /// The QuestionnaireResponse without any `/_history/...` suffix.
    pub fn questionnaire_response_url(&self) -> ClientResult<Url> {
        let full = self.url.as_str();
        let end = full.find(HISTORY_SEGMENT).unwrap_or(full.len());
        self.parse_prefix(end)
    }

    /// `<base>/QuestionnaireResponse`, the collection an updated response is found in.
    pub fn questionnaire_response_collection(&self) -> ClientResult<Url> {
        let end = self.segment_start(QUESTIONNAIRE_RESPONSE_SEGMENT)?
            + QUESTIONNAIRE_RESPONSE_SEGMENT.len();
        self.parse_prefix(end)
    }

    /// `<base>/StructureDefinition`, searched with `?url=<profile>`.
    pub fn structure_definition_search(&self) -> ClientResult<Url> {
        let base = &self.url.as_str()[..self.segment_start(TASK_SEGMENT)?];
        Url::parse(&format!("{base}{STRUCTURE_DEFINITION_SEGMENT}"))
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))
    }

    fn segment_start(&self, marker: &'static str) -> ClientResult<usize> {
        self.url
            .as_str()
            .find(marker)
            .ok_or_else(|| ClientError::Location {
                url: self.url.to_string(),
                marker,
            })
    }

    fn parse_prefix(&self, end: usize) -> ClientResult<Url> {
        Url::parse(&self.url.as_str()[..end])
            .map_err(|e| ClientError::InvalidConfig(e.to_string()))
    }
}

/// `<collection>/<id>`.
pub(crate) fn resource_in(collection: &Url, id: &str) -> ClientResult<Url> {
    Url::parse(&format!("{}/{id}", collection.as_str().trim_end_matches('/')))
        .map_err(|e| ClientError::MalformedResponse(format!("resource id '{id}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn location(url: &str) -> PageLocation {
        PageLocation::new(&Url::parse(url).unwrap())
    }

    #[test]
    fn task_urls() {
        let page = location("https://dsf.dev/fhir/Task/1?_format=html#top");
        assert_eq!(page.resource_url().as_str(), "https://dsf.dev/fhir/Task/1");
        assert_eq!(
            page.task_collection().unwrap().as_str(),
            "https://dsf.dev/fhir/Task"
        );
        assert_eq!(
            page.structure_definition_search().unwrap().as_str(),
            "https://dsf.dev/fhir/StructureDefinition"
        );
    }

    #[test]
    fn questionnaire_response_urls_drop_history() {
        let page = location("https://dsf.dev/fhir/QuestionnaireResponse/7/_history/2");
        assert_eq!(
            page.questionnaire_response_url().unwrap().as_str(),
            "https://dsf.dev/fhir/QuestionnaireResponse/7"
        );
        assert_eq!(
            page.questionnaire_response_collection().unwrap().as_str(),
            "https://dsf.dev/fhir/QuestionnaireResponse"
        );

        let page = location("https://dsf.dev/fhir/QuestionnaireResponse/7");
        assert_eq!(
            page.questionnaire_response_url().unwrap().as_str(),
            "https://dsf.dev/fhir/QuestionnaireResponse/7"
        );
    }

    #[test]
    fn missing_segment_is_reported() {
        let page = location("https://dsf.dev/fhir/Patient/1");
        let err = page.task_collection().expect_err("no Task segment");
        assert!(matches!(err, ClientError::Location { marker: "/Task", .. }));
    }

    #[test]
    fn resource_in_joins_id() {
        let collection = Url::parse("https://dsf.dev/fhir/Task").unwrap();
        assert_eq!(
            resource_in(&collection, "42").unwrap().as_str(),
            "https://dsf.dev/fhir/Task/42"
        );
    }
}
