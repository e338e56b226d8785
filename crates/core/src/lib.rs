//! # Form Core
//!
//! Core logic of the DSF task and questionnaire forms.
//!
//! This crate turns a bound FHIR resource into form rows, reshapes those rows from the resource's
//! profile, validates what the user entered and assembles the resource to submit:
//! - [`render`]: initial rows for a `Task` or `QuestionnaireResponse`
//! - [`schema`]: per-input cardinality from a `StructureDefinition` differential
//! - [`registry`]: rows, widgets, error areas and occurrence affordances
//! - [`validator`] and [`composite`]: typed-value checks and pair builders
//! - [`reader`] and [`assembler`]: from rows back to a submittable resource
//!
//! **No transport concerns**: fetching and submitting resources belongs in `form-client`.

pub mod assembler;
pub mod composite;
pub mod config;
pub mod constants;
pub mod error;
pub mod input;
pub mod reader;
pub mod registry;
pub mod render;
pub mod schema;
pub mod validator;

pub use assembler::{assemble, assemble_questionnaire_response, assemble_task};
pub use config::FormConfig;
pub use error::{FormError, FormResult};
pub use input::{FormInputs, WidgetInput};
pub use reader::{read_questionnaire_response, read_task, ReadOutcome};
pub use registry::{Affordance, ErrorArea, FormRow, RowRegistry, Widget, WidgetKind};
pub use render::render_rows;
pub use schema::{adapt_rows, extract_field_schemas, profile_to_adapt, FieldSchema};
pub use validator::{validate, Outcome};
