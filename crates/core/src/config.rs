//! Form runtime configuration.
//!
//! This module defines configuration that should be resolved once at process startup and then
//! passed into the form session and the FHIR client. Environment variables are read by the
//! binaries only; this module receives their raw values.

use crate::constants::{DEFAULT_REDIRECT_DELAY_MS, DEFAULT_REQUEST_TIMEOUT_SECS};
use crate::{FormError, FormResult};
use std::time::Duration;
use url::Url;

/// Form configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct FormConfig {
    page_url: Url,
    request_timeout: Duration,
    redirect_delay: Duration,
}

impl FormConfig {
    /// Create a new `FormConfig`.
    ///
    /// `page_url` is the address of the resource the form is bound to, e.g.
    /// `https://dsf.dev/fhir/Task/123` or `https://dsf.dev/fhir/QuestionnaireResponse/7/_history/2`.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidConfig`] if the page URL is not an absolute `http(s)` URL or
    /// the request timeout is zero.
    pub fn new(
        page_url: &str,
        request_timeout: Duration,
        redirect_delay: Duration,
    ) -> FormResult<Self> {
        let page_url = Url::parse(page_url.trim())
            .map_err(|e| FormError::InvalidConfig(format!("page URL '{page_url}': {e}")))?;

        if !matches!(page_url.scheme(), "http" | "https") {
            return Err(FormError::InvalidConfig(format!(
                "page URL must use http or https, got '{}'",
                page_url.scheme()
            )));
        }

        if request_timeout.is_zero() {
            return Err(FormError::InvalidConfig(
                "request timeout cannot be zero".into(),
            ));
        }

        Ok(Self {
            page_url,
            request_timeout,
            redirect_delay,
        })
    }

    /// Build a `FormConfig` from raw (environment) values.
    ///
    /// Missing or blank timeout/delay values fall back to the defaults.
    pub fn from_env_values(
        page_url: Option<String>,
        request_timeout_secs: Option<String>,
        redirect_delay_ms: Option<String>,
    ) -> FormResult<Self> {
        let page_url = non_blank(page_url)
            .ok_or_else(|| FormError::InvalidConfig("page URL is required".into()))?;
        let timeout = parse_number(request_timeout_secs, "request timeout")?
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECS);
        let delay =
            parse_number(redirect_delay_ms, "redirect delay")?.unwrap_or(DEFAULT_REDIRECT_DELAY_MS);

        Self::new(
            &page_url,
            Duration::from_secs(timeout),
            Duration::from_millis(delay),
        )
    }

    pub fn page_url(&self) -> &Url {
        &self.page_url
    }

    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }

    pub fn redirect_delay(&self) -> Duration {
        self.redirect_delay
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_number(value: Option<String>, what: &str) -> FormResult<Option<u64>> {
    non_blank(value)
        .map(|v| {
            v.parse::<u64>()
                .map_err(|_| FormError::InvalidConfig(format!("{what} is not a number: '{v}'")))
        })
        .transpose()
}
