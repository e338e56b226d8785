/// Errors returned by the form core.
///
/// Field validation failures are not errors: they are recorded in the row's error area and
/// reported as [`crate::Outcome::Rejected`].
#[derive(Debug, thiserror::Error)]
pub enum FormError {
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("no form row with key '{0}'")]
    UnknownRow(String),
    #[error("row '{row}' has no widget at position {position}")]
    UnknownWidget { row: String, position: usize },
    #[error("field '{0}' is not repeatable")]
    NotRepeatable(String),
    #[error("row '{0}' is not a removable occurrence")]
    NotRemovable(String),
    #[error("invalid row key: {0}")]
    Key(#[from] form_types::KeyError),
    #[error("FHIR error: {0}")]
    Fhir(#[from] fhir::FhirError),
}

pub type FormResult<T> = std::result::Result<T, FormError>;
