//! Field comparison between desired and current controller objects.
//!
//! Equality is lenient in the ways the controller is inconsistent: a
//! `null` equals an absent field, lists of scalars compare as multisets,
//! and a numeric string equals the number it spells.

use serde_json::{Map, Value};

/// Lenient equality of two optional values.
pub fn values_equal(a: Option<&Value>, b: Option<&Value>) -> bool {
    match (non_null(a), non_null(b)) {
        (None, None) => true,
        (Some(a), Some(b)) => value_eq(a, b),
        _ => false,
    }
}

fn non_null(v: Option<&Value>) -> Option<&Value> {
    v.filter(|v| !v.is_null())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Array(xs), Value::Array(ys)) => list_eq(xs, ys),
        (Value::Object(x), Value::Object(y)) => object_eq(x, y),
        (Value::Number(x), Value::String(s)) | (Value::String(s), Value::Number(x)) => {
            s.trim().parse::<f64>().ok() == x.as_f64()
        }
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn object_eq(x: &Map<String, Value>, y: &Map<String, Value>) -> bool {
    x.keys()
        .chain(y.keys())
        .all(|k| values_equal(x.get(k), y.get(k)))
}

/// Order-insensitive for scalars; element-wise for anything else.
fn list_eq(xs: &[Value], ys: &[Value]) -> bool {
    if xs.len() != ys.len() {
        return false;
    }
    let scalar = |v: &Value| !v.is_array() && !v.is_object();
    if xs.iter().all(scalar) && ys.iter().all(scalar) {
        let mut used = vec![false; ys.len()];
        return xs.iter().all(|x| {
            match ys
                .iter()
                .enumerate()
                .find(|(i, y)| !used[*i] && value_eq(x, y))
            {
                Some((i, _)) => {
                    used[i] = true;
                    true
                }
                None => false,
            }
        });
    }
    xs.iter().zip(ys).all(|(x, y)| value_eq(x, y))
}

/// Names of the desired fields that differ from the current object.
///
/// `fields` pairs the controller field name with the name used in the
/// desired object. A desired field that is absent or `null` is not
/// managed and never counts as a difference.
pub fn changed_fields<'a>(have: &Value, want: &Value, fields: &[(&'a str, &'a str)]) -> Vec<&'a str> {
    fields
        .iter()
        .filter_map(|(have_key, want_key)| {
            let desired = non_null(want.get(*want_key))?;
            if values_equal(have.get(*have_key), Some(desired)) {
                None
            } else {
                Some(*want_key)
            }
        })
        .collect()
}

/// True when any managed field differs.
pub fn requires_update(have: &Value, want: &Value, fields: &[(&str, &str)]) -> bool {
    !changed_fields(have, want, fields).is_empty()
}

/// Copy of `value` with every `null` member removed, recursively.
pub fn drop_nulls(value: &Value) -> Value {
    match value {
        Value::Object(obj) => Value::Object(
            obj.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), drop_nulls(v)))
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().filter(|v| !v.is_null()).map(drop_nulls).collect()),
        other => other.clone(),
    }
}
