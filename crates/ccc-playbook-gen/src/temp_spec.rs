//! Declarative remapping of controller objects into playbook entries.
//!
//! A [`TempSpec`] is an ordered list of target keys. Each target reads one
//! source key of the raw object (the target name unless `source_key` says
//! otherwise), or derives its value through a [`NamedTransform`]. Nested
//! specs apply to mappings and to each element of lists of mappings.
//!
//! Null, empty-string, and empty-list results are dropped, so the output
//! never carries a key without a value. Declaration order is emission
//! order.

use crate::resolve::ResolutionTable;
use serde_json::{Map, Value};
use tracing::debug;

/// Declared shape of a target field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TempType {
    Str,
    Int,
    Bool,
    List,
    Dict,
}

/// Derivations that need more than a key rename.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedTransform {
    /// One fabric id to `{site_name_hierarchy, fabric_type}`.
    ResolveFabricSite,
    /// A list of fabric ids to a list of `{site_name_hierarchy, fabric_type}`.
    ResolveFabricSites,
    /// An anchor fabric id to its site name.
    ResolveAnchoredSite,
}

impl NamedTransform {
    pub fn name(&self) -> &'static str {
        match self {
            NamedTransform::ResolveFabricSite => "resolve_fabric_site",
            NamedTransform::ResolveFabricSites => "resolve_fabric_sites",
            NamedTransform::ResolveAnchoredSite => "resolve_anchored_site",
        }
    }

    /// Derives a value from the whole raw object.
    pub fn apply(&self, raw: &Value, source: &str, table: &ResolutionTable) -> Value {
        let input = raw.get(source);
        let resolved = match self {
            NamedTransform::ResolveFabricSite => input
                .and_then(Value::as_str)
                .and_then(|id| table.fabric(id))
                .map(|f| f.to_value()),
            NamedTransform::ResolveFabricSites => input.and_then(Value::as_array).map(|ids| {
                Value::Array(
                    ids.iter()
                        .filter_map(Value::as_str)
                        .filter_map(|id| table.fabric(id))
                        .map(|f| f.to_value())
                        .collect(),
                )
            }),
            NamedTransform::ResolveAnchoredSite => input
                .and_then(Value::as_str)
                .and_then(|id| table.fabric(id))
                .map(|f| Value::String(f.site_name_hierarchy.clone())),
        };
        if resolved.is_none() && input.is_some_and(|v| !v.is_null()) {
            debug!(transform = self.name(), source, "Value did not resolve");
        }
        resolved.unwrap_or(Value::Null)
    }
}

/// One target field.
#[derive(Debug, Clone)]
pub struct TempField {
    pub field_type: TempType,
    pub source_key: Option<String>,
    pub options: Option<TempSpec>,
    pub transform: Option<NamedTransform>,
}

impl TempField {
    fn new(field_type: TempType) -> Self {
        Self {
            field_type,
            source_key: None,
            options: None,
            transform: None,
        }
    }

    pub fn str() -> Self {
        Self::new(TempType::Str)
    }

    pub fn int() -> Self {
        Self::new(TempType::Int)
    }

    pub fn bool() -> Self {
        Self::new(TempType::Bool)
    }

    pub fn list() -> Self {
        Self::new(TempType::List)
    }

    pub fn list_of(options: TempSpec) -> Self {
        Self {
            options: Some(options),
            ..Self::new(TempType::List)
        }
    }

    pub fn dict_of(options: TempSpec) -> Self {
        Self {
            options: Some(options),
            ..Self::new(TempType::Dict)
        }
    }

    /// Reads from `key` instead of the target name.
    pub fn from(mut self, key: impl Into<String>) -> Self {
        self.source_key = Some(key.into());
        self
    }

    /// Derives the value through `transform` instead of copying it.
    pub fn special(mut self, transform: NamedTransform) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn special_handling(&self) -> bool {
        self.transform.is_some()
    }
}

/// Ordered target fields.
#[derive(Debug, Clone, Default)]
pub struct TempSpec {
    fields: Vec<(String, TempField)>,
}

impl TempSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, name: impl Into<String>, field: TempField) -> Self {
        self.fields.push((name.into(), field));
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TempField)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    /// Renders one raw object. Returns `None` when nothing survived.
    pub fn apply(&self, raw: &Value, table: &ResolutionTable) -> Option<Value> {
        let mut out = Map::new();
        for (name, field) in &self.fields {
            let source = field.source_key.as_deref().unwrap_or(name);
            let value = match field.transform {
                Some(transform) => transform.apply(raw, source, table),
                None => raw.get(source).cloned().unwrap_or(Value::Null),
            };
            if let Some(shaped) = shape(field, value, table) {
                out.insert(name.clone(), shaped);
            }
        }
        (!out.is_empty()).then_some(Value::Object(out))
    }

    /// Renders a list of raw objects, dropping those that come out empty.
    pub fn apply_all(&self, raw: &[Value], table: &ResolutionTable) -> Vec<Value> {
        raw.iter().filter_map(|item| self.apply(item, table)).collect()
    }
}

fn shape(field: &TempField, value: Value, table: &ResolutionTable) -> Option<Value> {
    let shaped = match (field.field_type, value) {
        (_, Value::Null) => return None,
        (TempType::List, Value::Array(items)) => Value::Array(match &field.options {
            Some(options) => items.iter().filter_map(|i| options.apply(i, table)).collect(),
            None => items.into_iter().filter(|i| !is_empty(i)).collect(),
        }),
        (TempType::Dict, value @ Value::Object(_)) => match &field.options {
            Some(options) => options.apply(&value, table)?,
            None => value,
        },
        (TempType::Int, Value::String(s)) => s
            .trim()
            .parse::<i64>()
            .map(Value::from)
            .unwrap_or(Value::String(s)),
        (TempType::Str, Value::Number(n)) => Value::String(n.to_string()),
        (TempType::Bool, Value::String(s)) => match s.to_ascii_lowercase().as_str() {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            _ => Value::String(s),
        },
        (_, other) => other,
    };
    (!is_empty(&shaped)).then_some(shaped)
}

fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(obj) => obj.is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ccc_orch_common::FabricType;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn table() -> ResolutionTable {
        let mut table = ResolutionTable::new();
        table.insert("f1", "Global/USA/SJC", FabricType::FabricSite);
        table.insert("z1", "Global/USA/SJC/Floor1", FabricType::FabricZone);
        table
    }

    fn location() -> TempSpec {
        TempSpec::new()
            .field("site_name_hierarchy", TempField::str())
            .field("fabric_type", TempField::str())
    }

    #[test]
    fn test_declaration_order_and_renames() {
        let spec = TempSpec::new()
            .field("vn_name", TempField::str().from("virtualNetworkName"))
            .field("vlan_id", TempField::int().from("vlanId"))
            .field("is_critical_pool", TempField::bool().from("isCriticalPool"));
        let out = spec
            .apply(
                &json!({"isCriticalPool": false, "vlanId": "1021", "virtualNetworkName": "VN1", "id": "x"}),
                &table(),
            )
            .unwrap();
        assert_eq!(out, json!({"vn_name": "VN1", "vlan_id": 1021, "is_critical_pool": false}));
        let keys: Vec<&String> = out.as_object().unwrap().keys().collect();
        assert_eq!(keys, vec!["vn_name", "vlan_id", "is_critical_pool"]);
    }

    #[test]
    fn test_null_and_empty_values_dropped() {
        let spec = TempSpec::new()
            .field("a", TempField::str())
            .field("b", TempField::str())
            .field("c", TempField::list())
            .field("d", TempField::int());
        let out = spec
            .apply(&json!({"a": null, "b": "", "c": [], "d": 0}), &table())
            .unwrap();
        assert_eq!(out, json!({"d": 0}));
        assert!(spec.apply(&json!({"a": null}), &table()).is_none());
    }

    #[test]
    fn test_fabric_transforms() {
        let spec = TempSpec::new()
            .field(
                "fabric_site_locations",
                TempField::list_of(location())
                    .from("fabricIds")
                    .special(NamedTransform::ResolveFabricSites),
            )
            .field(
                "fabric_site_location",
                TempField::dict_of(location())
                    .from("fabricId")
                    .special(NamedTransform::ResolveFabricSite),
            )
            .field(
                "anchored_site_name",
                TempField::str()
                    .from("anchoredSiteId")
                    .special(NamedTransform::ResolveAnchoredSite),
            );
        let out = spec
            .apply(
                &json!({"fabricIds": ["f1", "unknown", "z1"], "fabricId": "z1", "anchoredSiteId": "f1"}),
                &table(),
            )
            .unwrap();
        assert_eq!(
            out,
            json!({
                "fabric_site_locations": [
                    {"site_name_hierarchy": "Global/USA/SJC", "fabric_type": "fabric_site"},
                    {"site_name_hierarchy": "Global/USA/SJC/Floor1", "fabric_type": "fabric_zone"}
                ],
                "fabric_site_location": {"site_name_hierarchy": "Global/USA/SJC/Floor1", "fabric_type": "fabric_zone"},
                "anchored_site_name": "Global/USA/SJC"
            })
        );
        assert!(spec.iter().all(|(_, f)| f.special_handling()));
    }

    #[test]
    fn test_unresolved_transform_is_dropped() {
        let spec = TempSpec::new()
            .field("name", TempField::str())
            .field(
                "anchored_site_name",
                TempField::str()
                    .from("anchoredSiteId")
                    .special(NamedTransform::ResolveAnchoredSite),
            );
        let out = spec.apply(&json!({"name": "n", "anchoredSiteId": "gone"}), &table()).unwrap();
        assert_eq!(out, json!({"name": "n"}));
    }

    #[test]
    fn test_nested_list_drops_empty_elements() {
        let spec = TempSpec::new().field(
            "servers",
            TempField::list_of(TempSpec::new().field("ip", TempField::str().from("ipAddress"))),
        );
        let out = spec
            .apply(&json!({"servers": [{"ipAddress": "10.0.0.1"}, {"ipAddress": null}, {}]}), &table())
            .unwrap();
        assert_eq!(out, json!({"servers": [{"ip": "10.0.0.1"}]}));
    }
}
