//! HTTP access to the FHIR server behind a form page.

use crate::location::{resource_in, PageLocation};
use crate::{BusyIndicator, ClientError, ClientResult};
use fhir::{Bundle, FormResource};
use form_core::FormConfig;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::{Method, RequestBuilder, Response};
use std::time::Duration;
use url::Url;

const FHIR_JSON: &str = "application/json";

/// Where the browser goes after a successful submission.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Navigation {
    pub target: Url,
}

/// Client for the server the form page was loaded from.
#[derive(Clone, Debug)]
pub struct FhirClient {
    http: reqwest::Client,
    location: PageLocation,
    redirect_delay: Duration,
}

impl FhirClient {
    /// # Errors
    ///
    /// Returns [`ClientError::Transport`] if the HTTP client cannot be built.
    pub fn new(config: &FormConfig) -> ClientResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self {
            http,
            location: PageLocation::new(config.page_url()),
            redirect_delay: config.redirect_delay(),
        })
    }

    pub fn location(&self) -> &PageLocation {
        &self.location
    }

    /// Reads the Task or QuestionnaireResponse the page is bound to.
    pub async fn fetch_resource(&self) -> ClientResult<FormResource> {
        let url = self.location.resource_url().clone();
        tracing::debug!(%url, "fetching form resource");

        let body = self.send(self.request(Method::GET, url)).await?;
        Ok(FormResource::parse(&body)?)
    }

    /// Searches `StructureDefinition?url=<profile>`.
    pub async fn search_structure_definition(&self, profile: &str) -> ClientResult<Bundle> {
        let url = self.location.structure_definition_search()?;
        tracing::debug!(%url, profile, "searching structure definition");

        let request = self
            .request(Method::GET, url)
            .query(&[("url", profile)]);
        let body = self.send(request).await?;
        Ok(Bundle::parse(&body)?)
    }

    /// Posts a new Task or puts the completed QuestionnaireResponse.
    ///
    /// The busy indicator stays on from the request until the redirect delay has passed, and is
    /// switched off again whatever the outcome.
    ///
    /// # Errors
    ///
    /// - [`ClientError::Rejected`] if the server answers with a non-success status
    /// - [`ClientError::MalformedResponse`] if the created or updated resource has no `id`
    pub async fn submit(
        &self,
        resource: &FormResource,
        busy: &dyn BusyIndicator,
    ) -> ClientResult<Navigation> {
        busy.enable();
        let result = self.submit_inner(resource).await;
        busy.disable();
        result
    }

    async fn submit_inner(&self, resource: &FormResource) -> ClientResult<Navigation> {
        let (method, url, collection) = match resource {
            FormResource::Task(_) => {
                let collection = self.location.task_collection()?;
                (Method::POST, collection.clone(), collection)
            }
            FormResource::QuestionnaireResponse(_) => (
                Method::PUT,
                self.location.questionnaire_response_url()?,
                self.location.questionnaire_response_collection()?,
            ),
        };

        tracing::info!(%method, %url, resource_type = resource.resource_type(), "submitting form");

        let request = self
            .request(method, url)
            .header(CONTENT_TYPE, FHIR_JSON)
            .body(resource.render()?);
        let body = self.send(request).await?;

        let id = created_id(&body)?;
        let target = resource_in(&collection, &id)?;

        tokio::time::sleep(self.redirect_delay).await;

        tracing::info!(%target, "form submitted");
        Ok(Navigation { target })
    }

    fn request(&self, method: Method, url: Url) -> RequestBuilder {
        self.http.request(method, url).header(ACCEPT, FHIR_JSON)
    }

    async fn send(&self, request: RequestBuilder) -> ClientResult<String> {
        let response = request.send().await?;
        text_or_rejection(response).await
    }
}

async fn text_or_rejection(response: Response) -> ClientResult<String> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        tracing::warn!(status = status.as_u16(), "server rejected request");
        return Err(ClientError::Rejected {
            status: status.as_u16(),
            status_text: status.canonical_reason().unwrap_or_default().to_owned(),
            body,
        });
    }

    Ok(body)
}

fn created_id(body: &str) -> ClientResult<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| ClientError::MalformedResponse(format!("response is not JSON: {e}")))?;

    value
        .get("id")
        .and_then(serde_json::Value::as_str)
        .filter(|id| !id.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| ClientError::MalformedResponse("response has no id".into()))
}
