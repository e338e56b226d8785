//! User input applied to form rows.
//!
//! Inputs are given as a JSON object mapping row keys to the widget values of that row, in widget
//! order. Text widgets take a string, toggles take a boolean:
//!
//! ```json
//! {
//!   "http://dsf.dev/fhir/CodeSystem/test|target": ["http://dsf.dev/sid/organization-identifier", "Test_DIC"],
//!   "http://dsf.dev/fhir/CodeSystem/test|note|1": ["second note"],
//!   "release": [true, false]
//! }
//! ```
//!
//! A key naming the repeat index right after a field's last occurrence adds that occurrence.
//! Keys are applied in order, so `code|1` followed by `code|2` creates both.

use crate::{FormError, FormResult, RowRegistry};
use form_types::RowKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Value entered into one widget.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WidgetInput {
    Checked(bool),
    Text(String),
}

/// Widget values per row key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FormInputs(BTreeMap<RowKey, Vec<WidgetInput>>);

impl FormInputs {
    /// Parse inputs from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`FormError::InvalidInput`] if the text is not an object of row keys to lists of
    /// strings and booleans.
    pub fn parse(json_text: &str) -> FormResult<Self> {
        serde_json::from_str(json_text)
            .map_err(|e| FormError::InvalidInput(format!("form inputs: {e}")))
    }

    pub fn insert(&mut self, key: RowKey, values: Vec<WidgetInput>) {
        self.0.insert(key, values);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Writes every value into its widget. Returns the number of rows touched.
    ///
    /// # Errors
    ///
    /// - [`FormError::UnknownRow`] if a key names no row and cannot be created
    /// - [`FormError::NotRepeatable`] if an indexed key names a field that does not repeat
    /// - [`FormError::UnknownWidget`] if a row has fewer widgets than values given
    pub fn apply(&self, registry: &mut RowRegistry) -> FormResult<usize> {
        for (key, values) in &self.0 {
            ensure_row(registry, key)?;
            let row = registry
                .row_mut(key)
                .ok_or_else(|| FormError::UnknownRow(key.to_string()))?;

            for (position, value) in values.iter().enumerate() {
                let widget = row.widget_mut(position)?;
                match value {
                    WidgetInput::Text(text) => widget.set_value(text.as_str()),
                    WidgetInput::Checked(checked) => widget.set_checked(*checked),
                }
            }
        }

        tracing::debug!(rows = self.0.len(), "applied form inputs");
        Ok(self.0.len())
    }
}

/// Adds one occurrence of the key's field if the key names the next repeat index.
///
/// Indexes must be filled in order: a key may name an existing row or the row right after the
/// field's last occurrence. Anything else is rejected before the registry changes.
fn ensure_row(registry: &mut RowRegistry, key: &RowKey) -> FormResult<()> {
    if registry.row(key).is_some() {
        return Ok(());
    }

    let unknown = || FormError::UnknownRow(key.to_string());
    let target = key.index().ok_or_else(unknown)?;
    let last = registry
        .rows_for(key.identity())
        .last()
        .ok_or_else(unknown)?;
    if last.key().next_index()? != target {
        return Err(unknown());
    }

    registry.add_occurrence(key.identity())?;
    Ok(())
}
