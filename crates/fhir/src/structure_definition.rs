//! Search bundles and the `StructureDefinition` differential.
//!
//! Only the members needed to read per-input cardinality from a Task profile are modelled.
//! Everything is lenient: a profile has many more members, and a missing member simply reads as
//! absent.

use crate::{parse_json, FhirResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A FHIR search-set `Bundle`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Bundle {
    #[serde(default)]
    pub entry: Vec<BundleEntry>,
}

/// One entry of a search-set bundle.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    #[serde(default)]
    pub resource: Option<Value>,
}

impl Bundle {
    /// Parse a Bundle from JSON text.
    pub fn parse(json_text: &str) -> FhirResult<Self> {
        parse_json(json_text, "Bundle")
    }

    /// The first entry's resource as a `StructureDefinition`.
    ///
    /// Returns `None` when the bundle is empty, the first entry has no resource, or the resource
    /// is not shaped like a StructureDefinition.
    pub fn first_structure_definition(&self) -> Option<StructureDefinition> {
        let resource = self.entry.first()?.resource.clone()?;
        serde_json::from_value(resource).ok()
    }
}

/// A FHIR `StructureDefinition` (profile).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct StructureDefinition {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub differential: Option<Differential>,
}

/// `StructureDefinition.differential`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Differential {
    #[serde(default)]
    pub element: Vec<ElementDefinition>,
}

/// One constraint of a differential.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementDefinition {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub slice_name: Option<String>,
    #[serde(default)]
    pub fixed_uri: Option<String>,
    #[serde(default)]
    pub fixed_code: Option<String>,
    #[serde(rename = "type", default)]
    pub type_: Option<Vec<ElementType>>,
    #[serde(default)]
    pub min: Option<u32>,
    /// `"*"` or a non-negative integer as text.
    #[serde(default)]
    pub max: Option<String>,
}

/// `ElementDefinition.type`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ElementType {
    #[serde(default)]
    pub code: Option<String>,
}
