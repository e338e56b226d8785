//! Schema-driven form adaptation.
//!
//! A draft Task names the profile it conforms to. The profile's differential declares, per input
//! slice, the fixed input type and how often the input may occur. This module reads those
//! declarations and reshapes the rendered rows accordingly: a cardinality annotation, the
//! optional marker when the minimum is zero, and an add-occurrence affordance when the input may
//! repeat.
//!
//! Only the second segment of an element id is used to group declarations
//! (`Task.input:target.value[x]` belongs to `input:target`); deeper slices are not supported.

use crate::constants::{
    RESERVED_SLICE_MARKERS, TASK_INPUT_PATH, TASK_INPUT_SLICE_PREFIX, TASK_INPUT_TYPE_CODE_PATH,
    TASK_INPUT_TYPE_SYSTEM_PATH, TASK_INPUT_VALUE_PATH,
};
use crate::registry::{Affordance, RowRegistry};
use fhir::{Bundle, ElementDefinition, FormResource, TaskStatus};
use form_types::FieldIdentity;

/// Cardinality and identity of one Task input slice.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct FieldSchema {
    pub type_system: Option<String>,
    pub type_code: Option<String>,
    /// `type[0].code` of the slice's `value[x]`.
    pub value_type: Option<String>,
    pub min: Option<u32>,
    /// `*` or a number.
    pub max: Option<String>,
}

impl FieldSchema {
    /// The row identity this slice adapts, if both type system and code are fixed.
    pub fn identity(&self) -> Option<FieldIdentity> {
        let system = self.type_system.as_deref()?;
        let code = self.type_code.as_deref()?;
        FieldIdentity::coded(system, code).ok()
    }

    /// `[min..max]`; a missing bound shows as `?`.
    pub fn cardinality(&self) -> String {
        let min = self.min.map_or_else(|| "?".to_owned(), |min| min.to_string());
        let max = self.max.as_deref().unwrap_or("?");
        format!("[{min}..{max}]")
    }

    pub fn is_optional(&self) -> bool {
        self.min.is_none_or(|min| min < 1)
    }

    pub fn is_repeatable(&self) -> bool {
        match self.max.as_deref().map(str::trim) {
            Some("*") => true,
            Some(max) => max.parse::<u32>().is_ok_and(|max| max > 1),
            None => false,
        }
    }
}

/// Profile to fetch for the bound resource.
///
/// Only a draft Task with at least one `meta.profile` is adapted; the first profile is used.
pub fn profile_to_adapt(resource: &FormResource) -> Option<&str> {
    match resource {
        FormResource::Task(task) if task.status == TaskStatus::Draft => {
            task.profiles().first().map(String::as_str)
        }
        _ => None,
    }
}

fn is_input_slice(element: &ElementDefinition) -> bool {
    element.id.as_deref().is_some_and(|id| {
        id.starts_with(TASK_INPUT_SLICE_PREFIX)
            && !RESERVED_SLICE_MARKERS
                .iter()
                .any(|marker| id.contains(marker))
    })
}

fn slice_group(element: &ElementDefinition) -> &str {
    element
        .id
        .as_deref()
        .and_then(|id| id.split('.').nth(1))
        .unwrap_or_default()
}

/// First element of a group with exactly this `path`.
fn at_path<'a>(group: &[&'a ElementDefinition], path: &str) -> Option<&'a ElementDefinition> {
    group
        .iter()
        .find(|element| element.path.as_deref() == Some(path))
        .copied()
}

/// Extracts one [`FieldSchema`] per Task input slice, in declaration order.
///
/// A bundle without entries, or a first entry without a differential, yields nothing.
pub fn extract_field_schemas(bundle: &Bundle) -> Vec<FieldSchema> {
    let Some(differential) = bundle
        .first_structure_definition()
        .and_then(|definition| definition.differential)
    else {
        tracing::debug!("schema search returned no differential");
        return Vec::new();
    };

    let mut groups: Vec<(&str, Vec<&ElementDefinition>)> = Vec::new();
    for element in differential.element.iter().filter(|e| is_input_slice(e)) {
        let key = slice_group(element);
        match groups.iter_mut().find(|(group, _)| *group == key) {
            Some((_, members)) => members.push(element),
            None => groups.push((key, vec![element])),
        }
    }

    groups
        .into_iter()
        .map(|(_, group)| {
            let input = at_path(&group, TASK_INPUT_PATH);
            FieldSchema {
                type_system: at_path(&group, TASK_INPUT_TYPE_SYSTEM_PATH)
                    .and_then(|e| e.fixed_uri.clone()),
                type_code: at_path(&group, TASK_INPUT_TYPE_CODE_PATH)
                    .and_then(|e| e.fixed_code.clone()),
                value_type: at_path(&group, TASK_INPUT_VALUE_PATH)
                    .and_then(|e| e.type_.as_ref()?.first()?.code.clone()),
                min: input.and_then(|e| e.min),
                max: input.and_then(|e| e.max.clone()),
            }
        })
        .collect()
}

/// Applies slice cardinalities to the rendered rows. Returns how many fields were adapted.
pub fn adapt_rows(registry: &mut RowRegistry, schemas: &[FieldSchema]) -> usize {
    let mut adapted = 0;

    for schema in schemas {
        let Some(identity) = schema.identity() else {
            tracing::debug!(?schema, "input slice without fixed type coding");
            continue;
        };

        let Some(row) = registry.rows_for_mut(&identity).first_mut() else {
            tracing::warn!(field = %identity, "no form row for input slice");
            continue;
        };

        row.set_cardinality(schema.cardinality());
        if schema.is_optional() {
            row.set_optional(true);
        }
        if schema.is_repeatable() {
            row.set_affordance(Some(Affordance::AddOccurrence));
        }
        adapted += 1;
    }

    tracing::debug!(adapted, declared = schemas.len(), "adapted form rows");
    adapted
}
