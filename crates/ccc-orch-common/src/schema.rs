//! Declarative argument schema and its validator.
//!
//! A module's accepted configuration is described as data: an ordered
//! [`ArgSpec`] of named [`FieldSpec`]s, each carrying a type, required-ness,
//! a default, choices, numeric ranges, string limits, and nested options.
//! The same tree drives validation ([`ArgSpec::validate`]) and secret
//! elision ([`ArgSpec::redact`]).
//!
//! Validation never fails outright. It returns the coerced blocks together
//! with a list of every offending parameter path, and the caller decides
//! whether to abort.

use ccc_types::{is_valid_ip, is_valid_ipv4, is_valid_uuid, SiteHierarchy};
use regex::Regex;
use serde_json::{Map, Value};
use std::collections::HashSet;
use thiserror::Error;

/// Replacement text for `no_log` values.
pub const NO_LOG_PLACEHOLDER: &str = "VALUE_SPECIFIED_IN_NO_LOG_PARAMETER";

/// A malformed schema. This is a programming error, not a user error.
#[derive(Debug, Clone, Error)]
#[error("Invalid schema at '{path}': {message}")]
pub struct SchemaError {
    pub path: String,
    pub message: String,
}

impl SchemaError {
    fn new(path: &str, message: impl Into<String>) -> Self {
        Self {
            path: path.to_string(),
            message: message.into(),
        }
    }
}

/// Declared type of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Str,
    Int,
    Bool,
    List,
    Dict,
    Raw,
}

impl FieldType {
    fn name(&self) -> &'static str {
        match self {
            FieldType::Str => "str",
            FieldType::Int => "int",
            FieldType::Bool => "bool",
            FieldType::List => "list",
            FieldType::Dict => "dict",
            FieldType::Raw => "raw",
        }
    }
}

/// Named string formats checked after coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Ipv4,
    Ip,
    Uuid,
    SiteHierarchy,
}

impl Format {
    fn accepts(&self, s: &str) -> bool {
        match self {
            Format::Ipv4 => is_valid_ipv4(s),
            Format::Ip => is_valid_ip(s),
            Format::Uuid => is_valid_uuid(s),
            Format::SiteHierarchy => s.parse::<SiteHierarchy>().is_ok(),
        }
    }

    fn describe(&self) -> &'static str {
        match self {
            Format::Ipv4 => "an IPv4 address",
            Format::Ip => "an IP address",
            Format::Uuid => "a UUID",
            Format::SiteHierarchy => "a site hierarchy starting with 'Global'",
        }
    }
}

/// Rules for one field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub field_type: FieldType,
    pub elements: Option<FieldType>,
    pub options: Option<ArgSpec>,
    pub required: bool,
    pub default: Option<Value>,
    pub choices: Vec<Value>,
    pub no_log: bool,
    pub aliases: Vec<String>,
    pub range_min: Option<i64>,
    pub range_max: Option<i64>,
    pub length_max: Option<usize>,
    pub pattern: Option<String>,
    pub format: Option<Format>,
}

impl FieldSpec {
    pub fn new(field_type: FieldType) -> Self {
        Self {
            field_type,
            elements: None,
            options: None,
            required: false,
            default: None,
            choices: Vec::new(),
            no_log: false,
            aliases: Vec::new(),
            range_min: None,
            range_max: None,
            length_max: None,
            pattern: None,
            format: None,
        }
    }

    pub fn str() -> Self {
        Self::new(FieldType::Str)
    }

    pub fn int() -> Self {
        Self::new(FieldType::Int)
    }

    pub fn bool() -> Self {
        Self::new(FieldType::Bool)
    }

    pub fn raw() -> Self {
        Self::new(FieldType::Raw)
    }

    /// A mapping validated against nested `options`.
    pub fn dict(options: ArgSpec) -> Self {
        Self {
            options: Some(options),
            ..Self::new(FieldType::Dict)
        }
    }

    /// A list of scalars of the given type.
    pub fn list(elements: FieldType) -> Self {
        Self {
            elements: Some(elements),
            ..Self::new(FieldType::List)
        }
    }

    /// A list of mappings validated against nested `options`.
    pub fn list_of(options: ArgSpec) -> Self {
        Self {
            elements: Some(FieldType::Dict),
            options: Some(options),
            ..Self::new(FieldType::List)
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn choices<I, V>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<Value>,
    {
        self.choices = choices.into_iter().map(Into::into).collect();
        self
    }

    pub fn no_log(mut self) -> Self {
        self.no_log = true;
        self
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    /// Inclusive numeric range.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.range_min = Some(min);
        self.range_max = Some(max);
        self
    }

    pub fn min(mut self, min: i64) -> Self {
        self.range_min = Some(min);
        self
    }

    pub fn length_max(mut self, max: usize) -> Self {
        self.length_max = Some(max);
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    fn check(&self, path: &str) -> Result<(), SchemaError> {
        if self.elements.is_some() && self.field_type != FieldType::List {
            return Err(SchemaError::new(path, "'elements' is only valid for lists"));
        }
        if self.options.is_some() {
            let nested_ok = self.field_type == FieldType::Dict
                || (self.field_type == FieldType::List && self.elements == Some(FieldType::Dict));
            if !nested_ok {
                return Err(SchemaError::new(
                    path,
                    "'options' requires type dict or a list of dict",
                ));
            }
        }
        if let (Some(min), Some(max)) = (self.range_min, self.range_max) {
            if min > max {
                return Err(SchemaError::new(path, format!("range {}..={} is empty", min, max)));
            }
        }
        if let Some(pattern) = &self.pattern {
            Regex::new(pattern).map_err(|e| SchemaError::new(path, e.to_string()))?;
        }
        if self.required && self.default.is_some() {
            return Err(SchemaError::new(path, "a required field cannot have a default"));
        }
        if let Some(default) = &self.default {
            let mut problems = Vec::new();
            coerce_field(self, default, path, &mut problems);
            if !problems.is_empty() {
                return Err(SchemaError::new(
                    path,
                    format!("default does not satisfy the field: {}", problems.join(", ")),
                ));
            }
        }
        if let Some(options) = &self.options {
            options.check_at(path)?;
        }
        Ok(())
    }
}

/// An ordered set of field rules.
#[derive(Debug, Clone, Default)]
pub struct ArgSpec {
    fields: Vec<(String, FieldSpec)>,
}

impl ArgSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a field. Declaration order is preserved in validated output.
    pub fn field(mut self, name: impl Into<String>, spec: FieldSpec) -> Self {
        self.fields.push((name.into(), spec));
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|(n, _)| n == name).map(|(_, f)| f)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldSpec)> {
        self.fields.iter().map(|(n, f)| (n.as_str(), f))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Finds a field by its name or one of its aliases.
    pub fn resolve(&self, key: &str) -> Option<(&str, &FieldSpec)> {
        self.fields
            .iter()
            .find(|(n, f)| n == key || f.aliases.iter().any(|a| a == key))
            .map(|(n, f)| (n.as_str(), f))
    }

    /// Checks the schema itself for construction mistakes.
    pub fn check(&self) -> Result<(), SchemaError> {
        self.check_at("")
    }

    fn check_at(&self, path: &str) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for (name, field) in &self.fields {
            let field_path = join_path(path, name);
            for key in std::iter::once(name).chain(field.aliases.iter()) {
                if !seen.insert(key.as_str()) {
                    return Err(SchemaError::new(&field_path, format!("duplicate key '{}'", key)));
                }
            }
            field.check(&field_path)?;
        }
        Ok(())
    }

    /// Validates every block of a configuration document.
    ///
    /// Returns the coerced blocks and the paths of every invalid parameter.
    pub fn validate(&self, config: &[Value]) -> (Vec<Value>, Vec<String>) {
        let mut invalid = Vec::new();
        let validated = config
            .iter()
            .enumerate()
            .filter_map(|(idx, block)| match block {
                Value::Object(obj) => Some(Value::Object(validate_map(self, obj, "", &mut invalid))),
                _ => {
                    invalid.push(format!("config[{}]: expected a mapping", idx));
                    None
                }
            })
            .collect();
        (validated, invalid)
    }

    /// Returns a copy of `value` with every `no_log` field replaced.
    pub fn redact(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(items.iter().map(|i| self.redact(i)).collect()),
            Value::Object(obj) => Value::Object(
                obj.iter()
                    .map(|(k, v)| {
                        let redacted = match self.resolve(k) {
                            Some((_, f)) if f.no_log && !v.is_null() => {
                                Value::String(NO_LOG_PLACEHOLDER.to_string())
                            }
                            Some((_, f)) => match &f.options {
                                Some(options) => options.redact(v),
                                None => v.clone(),
                            },
                            None => v.clone(),
                        };
                        (k.clone(), redacted)
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }
}

/// Validates `config` against `spec`. See [`ArgSpec::validate`].
pub fn validate(config: &[Value], spec: &ArgSpec) -> (Vec<Value>, Vec<String>) {
    spec.validate(config)
}

fn join_path(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{}.{}", prefix, key)
    }
}

fn validate_map(
    spec: &ArgSpec,
    obj: &Map<String, Value>,
    path: &str,
    invalid: &mut Vec<String>,
) -> Map<String, Value> {
    for key in obj.keys() {
        if spec.resolve(key).is_none() {
            invalid.push(format!("{}: unsupported parameter", join_path(path, key)));
        }
    }

    let mut out = Map::new();
    for (name, field) in &spec.fields {
        let field_path = join_path(path, name);
        let raw = std::iter::once(name)
            .chain(field.aliases.iter())
            .find_map(|k| obj.get(k.as_str()))
            .filter(|v| !v.is_null());

        match raw {
            Some(value) => {
                if let Some(coerced) = coerce_field(field, value, &field_path, invalid) {
                    out.insert(name.clone(), coerced);
                }
            }
            None if field.required => {
                invalid.push(format!("{}: missing required parameter", field_path));
            }
            None => {
                if let Some(default) = &field.default {
                    out.insert(name.clone(), default.clone());
                }
            }
        }
    }
    out
}

fn coerce_field(
    field: &FieldSpec,
    value: &Value,
    path: &str,
    invalid: &mut Vec<String>,
) -> Option<Value> {
    if field.field_type != FieldType::List {
        let coerced = coerce(field.field_type, field.options.as_ref(), value, path, invalid)?;
        return check_constraints(field, &coerced, path, invalid).then_some(coerced);
    }

    let items = match value {
        Value::Array(items) => items.clone(),
        other => vec![other.clone()],
    };
    let elem_type = field.elements.unwrap_or(FieldType::Raw);
    let before = invalid.len();
    let out: Vec<Value> = items
        .iter()
        .enumerate()
        .filter_map(|(i, item)| {
            let item_path = format!("{}[{}]", path, i);
            let coerced = coerce(elem_type, field.options.as_ref(), item, &item_path, invalid)?;
            check_constraints(field, &coerced, &item_path, invalid).then_some(coerced)
        })
        .collect();
    (invalid.len() == before).then_some(Value::Array(out))
}

fn coerce(
    ty: FieldType,
    options: Option<&ArgSpec>,
    value: &Value,
    path: &str,
    invalid: &mut Vec<String>,
) -> Option<Value> {
    let coerced = match (ty, value) {
        (FieldType::Raw, v) => Some(v.clone()),
        (FieldType::Str, Value::String(s)) => Some(Value::String(s.clone())),
        (FieldType::Str, Value::Number(n)) => Some(Value::String(n.to_string())),
        (FieldType::Str, Value::Bool(b)) => Some(Value::String(b.to_string())),
        (FieldType::Int, Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().and_then(exact_i64))
            .map(Value::from),
        (FieldType::Int, Value::String(s)) => s.trim().parse::<i64>().ok().map(Value::from),
        (FieldType::Bool, Value::Bool(b)) => Some(Value::Bool(*b)),
        (FieldType::Bool, Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(Value::Bool(true)),
            "false" | "no" | "off" | "0" => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldType::Bool, Value::Number(n)) => match n.as_i64() {
            Some(1) => Some(Value::Bool(true)),
            Some(0) => Some(Value::Bool(false)),
            _ => None,
        },
        (FieldType::List, Value::Array(items)) => Some(Value::Array(items.clone())),
        (FieldType::Dict, Value::Object(obj)) => Some(match options {
            Some(options) => Value::Object(validate_map(options, obj, path, invalid)),
            None => Value::Object(obj.clone()),
        }),
        _ => None,
    };

    if coerced.is_none() {
        invalid.push(format!("{}: expected {}, got {}", path, ty.name(), value));
    }
    coerced
}

/// `f` as an integer when no rounding or saturation is involved.
fn exact_i64(f: f64) -> Option<i64> {
    // 2^63; `i64::MAX as f64` rounds up to it.
    const LIMIT: f64 = 9_223_372_036_854_775_808.0;
    (f.fract() == 0.0 && (-LIMIT..LIMIT).contains(&f)).then_some(f as i64)
}

fn check_constraints(field: &FieldSpec, value: &Value, path: &str, invalid: &mut Vec<String>) -> bool {
    let before = invalid.len();

    if !field.choices.is_empty() && !value.is_object() && !field.choices.contains(value) {
        let choices: Vec<String> = field.choices.iter().map(display_scalar).collect();
        invalid.push(format!(
            "{}: value '{}' is not one of [{}]",
            path,
            display_scalar(value),
            choices.join(", ")
        ));
    }

    if let Some(n) = value.as_i64() {
        let below = field.range_min.is_some_and(|min| n < min);
        let above = field.range_max.is_some_and(|max| n > max);
        if below || above {
            let min = field.range_min.map_or("-inf".to_string(), |v| v.to_string());
            let max = field.range_max.map_or("inf".to_string(), |v| v.to_string());
            invalid.push(format!("{}: value {} is out of range [{}, {}]", path, n, min, max));
        }
    }

    if let Some(s) = value.as_str() {
        if let Some(max) = field.length_max {
            if s.chars().count() > max {
                invalid.push(format!("{}: length exceeds {} characters", path, max));
            }
        }
        if let Some(pattern) = &field.pattern {
            match Regex::new(pattern) {
                Ok(re) if re.is_match(s) => {}
                Ok(_) => invalid.push(format!("{}: value '{}' does not match '{}'", path, s, pattern)),
                Err(_) => invalid.push(format!("{}: pattern '{}' is not a valid regex", path, pattern)),
            }
        }
        if let Some(format) = field.format {
            if !format.accepts(s) {
                invalid.push(format!("{}: '{}' is not {}", path, s, format.describe()));
            }
        }
    }

    invalid.len() == before
}

fn display_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
