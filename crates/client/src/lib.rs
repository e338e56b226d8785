//! # Form Client
//!
//! Talks to the FHIR server a form was loaded from.
//!
//! Handles:
//! - deriving request URLs from the page location ([`PageLocation`])
//! - fetching the bound resource and the profile's `StructureDefinition`
//! - submitting the assembled resource and turning the response into a navigation target
//!
//! Validation and assembly live in `form_core`; this crate only moves JSON.

pub mod busy;
pub mod client;
pub mod location;

pub use busy::{BusyIndicator, TracingBusyIndicator};
pub use client::{FhirClient, Navigation};
pub use location::PageLocation;

/// Errors returned by the form client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("invalid client configuration: {0}")]
    InvalidConfig(String),

    #[error("page URL '{url}' has no '{marker}' segment")]
    Location { url: String, marker: &'static str },

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status.
    #[error("Status: {status} {status_text}\n\n{body}")]
    Rejected {
        status: u16,
        status_text: String,
        body: String,
    },

    #[error("malformed response: {0}")]
    MalformedResponse(String),

    #[error(transparent)]
    Fhir(#[from] fhir::FhirError),
}

pub type ClientResult<T> = std::result::Result<T, ClientError>;
