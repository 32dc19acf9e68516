//! Schema drift detection
//!
//! A decoded record is re-encoded and compared against the raw JSON it came from.
//! Both sides are canonicalized first: object keys are compared as sets (the
//! `serde_json::Map` is ordered by key) and members whose value is `null` are dropped,
//! so an absent optional field and an explicit `null` count as the same thing.
//!
//! Differences are reported as JSON pointer paths, never as errors.

use serde::Serialize;
use serde_json::{Map, Value};

/// Differences between a re-encoded record and the raw payload it was decoded from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SchemaDrift {
    /// Paths present in the raw payload but dropped by the record type
    pub unmodelled: Vec<String>,
    /// Paths produced by the record type but absent from the raw payload
    pub unexpected: Vec<String>,
    /// Paths present on both sides with different values
    pub changed: Vec<String>,
}

impl SchemaDrift {
    /// Whether the record round-trips exactly
    pub fn is_empty(&self) -> bool {
        self.unmodelled.is_empty() && self.unexpected.is_empty() && self.changed.is_empty()
    }

    /// Total number of differing paths
    pub fn len(&self) -> usize {
        self.unmodelled.len() + self.unexpected.len() + self.changed.len()
    }
}

/// Compare the re-encoding of `record` against the raw payload
pub fn detect<T: Serialize>(record: &T, raw: &Value) -> serde_json::Result<SchemaDrift> {
    let encoded = serde_json::to_value(record)?;
    Ok(diff(&canonicalize(raw), &canonicalize(&encoded)))
}

/// Drop `null` object members recursively
pub fn canonicalize(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        other => other.clone(),
    }
}

/// Structural diff of two canonical values
pub fn diff(raw: &Value, encoded: &Value) -> SchemaDrift {
    let mut drift = SchemaDrift::default();
    walk(raw, encoded, String::new(), &mut drift);
    drift
}

fn walk(raw: &Value, encoded: &Value, path: String, drift: &mut SchemaDrift) {
    match (raw, encoded) {
        (Value::Object(r), Value::Object(e)) => {
            for (key, rv) in r {
                let child = format!("{}/{}", path, escape(key));
                match e.get(key) {
                    Some(ev) => walk(rv, ev, child, drift),
                    None => drift.unmodelled.push(child),
                }
            }
            for key in e.keys().filter(|k| !r.contains_key(*k)) {
                drift.unexpected.push(format!("{}/{}", path, escape(key)));
            }
        }
        (Value::Array(r), Value::Array(e)) => {
            for (i, (rv, ev)) in r.iter().zip(e.iter()).enumerate() {
                walk(rv, ev, format!("{}/{}", path, i), drift);
            }
            for i in e.len()..r.len() {
                drift.unmodelled.push(format!("{}/{}", path, i));
            }
            for i in r.len()..e.len() {
                drift.unexpected.push(format!("{}/{}", path, i));
            }
        }
        (r, e) if r == e => {}
        _ => drift.changed.push(if path.is_empty() {
            "/".to_string()
        } else {
            path
        }),
    }
}

// RFC 6901 escaping
fn escape(key: &str) -> String {
    key.replace('~', "~0").replace('/', "~1")
}
