//! Generator request schema and filter selection.
//!
//! The accepted request shape is derived from the catalog: each component
//! contributes its filter keys, and `components_list` only admits known
//! component names. Schema violations are reported together by the
//! runner; [`GenerationRequest::from_block`] adds the cross-field checks
//! and reports every problem in one error as well.

use crate::generator::Catalog;
use ccc_orch_common::{ArgSpec, FieldSpec, FieldType, OrchError, OrchResult};
use serde_json::{Map, Value};
use std::path::PathBuf;

/// Schema of one generator config block.
pub fn request_spec(catalog: &Catalog) -> ArgSpec {
    let names: Vec<&'static str> = catalog.components().iter().map(|c| c.name()).collect();
    let mut component_filters = ArgSpec::new().field(
        "components_list",
        FieldSpec::list(FieldType::Str).choices(names),
    );
    for component in catalog.components() {
        component_filters = component_filters.field(component.name(), FieldSpec::list_of(component.filter_spec()));
    }

    ArgSpec::new()
        .field("file_path", FieldSpec::str())
        .field("global_filters", FieldSpec::dict(catalog.global_spec().clone()))
        .field("component_specific_filters", FieldSpec::dict(component_filters))
}

/// A validated generator request.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    /// Explicit output path; `None` means a timestamped default.
    pub file_path: Option<PathBuf>,
    pub global_filters: Value,
    /// Requested components in catalog order, with their filter entries.
    pub components: Vec<(&'static str, Vec<Value>)>,
}

impl GenerationRequest {
    /// Builds a request from a validated block.
    ///
    /// Components are those named in `components_list` plus those with
    /// filter entries; with neither, every component in the catalog.
    pub fn from_block(block: &Value, catalog: &Catalog) -> OrchResult<Self> {
        let empty = Map::new();
        let specific = block
            .get("component_specific_filters")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let listed: Vec<&str> = specific
            .get("components_list")
            .and_then(Value::as_array)
            .map(|names| names.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        let mut problems = Vec::new();
        let mut components = Vec::new();
        for component in catalog.components() {
            let name = component.name();
            let filters: Vec<Value> = specific
                .get(name)
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default();
            for (i, filter) in filters.iter().enumerate() {
                if filter.as_object().is_some_and(|f| f.is_empty()) {
                    problems.push(format!(
                        "component_specific_filters.{}[{}]: filter entry names no filter",
                        name, i
                    ));
                }
            }
            if listed.contains(&name) || !filters.is_empty() {
                components.push((name, filters));
            }
        }
        if !problems.is_empty() {
            return Err(OrchError::invalid_input(problems.join("; ")));
        }
        if components.is_empty() {
            components = catalog.components().iter().map(|c| (c.name(), Vec::new())).collect();
        }

        Ok(Self {
            file_path: block
                .get("file_path")
                .and_then(Value::as_str)
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            global_filters: block
                .get("global_filters")
                .cloned()
                .unwrap_or_else(|| Value::Object(Map::new())),
            components,
        })
    }

    pub fn component_names(&self) -> Vec<&'static str> {
        self.components.iter().map(|(n, _)| *n).collect()
    }
}
