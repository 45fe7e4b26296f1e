//! Raw checklist shapes as they arrive in `Output_C`.
//!
//! Two layouts have been observed:
//!
//! ```text
//! Direct:         { "FIR Copy": <entry>, "Seizure Memo": <entry>, ... }
//! By crime type:  { "theft": { "FIR Copy": <entry>, ... } }
//! ```
//!
//! The keyed layout is only accepted when the key matches the case's
//! classification, so a direct checklist that happens to contain
//! structured entries is never unwrapped by accident.

use serde_json::{Map, Value};

/// One raw checklist value, tagged by JSON shape.
#[derive(Debug, Clone, PartialEq)]
pub enum RawChecklistEntry {
    /// The backend already emitted a canonical-looking object.
    Structured(Map<String, Value>),
    /// Free text such as `"✅ PRESENT - signed witness statement"`.
    Text(String),
    /// Anything else (numbers, arrays, null).
    Other(Value),
}

impl From<Value> for RawChecklistEntry {
    fn from(value: Value) -> Self {
        match value {
            Value::Object(map) => Self::Structured(map),
            Value::String(text) => Self::Text(text),
            other => Self::Other(other),
        }
    }
}

/// Which layout `Output_C` had.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChecklistShape {
    Direct,
    KeyedByCrimeType { crime_type: String },
    /// `Output_C` absent or null.
    Missing,
    /// `Output_C` present but not an object.
    NotAnObject,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawChecklist {
    pub shape: ChecklistShape,
    pub entries: Vec<(String, RawChecklistEntry)>,
}

impl RawChecklist {
    pub fn detect(raw: &Value, crime_type: Option<&str>) -> Self {
        let map = match raw {
            Value::Null => return Self::empty(ChecklistShape::Missing),
            Value::Object(map) => map,
            other => {
                tracing::warn!(kind = json_kind(other), "Checklist is not an object, ignoring");
                return Self::empty(ChecklistShape::NotAnObject);
            }
        };

        if let Some((key, inner)) = crime_type.and_then(|ct| keyed_section(map, ct)) {
            tracing::debug!(crime_type = %key, "Checklist keyed by crime type");
            return Self {
                shape: ChecklistShape::KeyedByCrimeType {
                    crime_type: key.to_string(),
                },
                entries: collect_entries(inner),
            };
        }

        Self {
            shape: ChecklistShape::Direct,
            entries: collect_entries(map),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn empty(shape: ChecklistShape) -> Self {
        Self {
            shape,
            entries: Vec::new(),
        }
    }
}

/// The inner checklist if `map` is keyed by `crime_type`. An object carrying
/// a `status` field is a structured entry, not a section.
fn keyed_section<'a>(map: &'a Map<String, Value>, crime_type: &str) -> Option<(&'a str, &'a Map<String, Value>)> {
    map.iter().find_map(|(key, value)| match value {
        Value::Object(inner) if key.eq_ignore_ascii_case(crime_type) && !inner.contains_key("status") => {
            Some((key.as_str(), inner))
        }
        _ => None,
    })
}

fn collect_entries(map: &Map<String, Value>) -> Vec<(String, RawChecklistEntry)> {
    map.iter()
        .map(|(key, value)| (key.clone(), RawChecklistEntry::from(value.clone())))
        .collect()
}

pub(crate) fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn tags_entries_by_json_shape() {
        assert!(matches!(RawChecklistEntry::from(json!({"status": "present"})), RawChecklistEntry::Structured(_)));
        assert!(matches!(RawChecklistEntry::from(json!("❌ MISSING")), RawChecklistEntry::Text(_)));
        assert!(matches!(RawChecklistEntry::from(json!(42)), RawChecklistEntry::Other(_)));
        assert!(matches!(RawChecklistEntry::from(Value::Null), RawChecklistEntry::Other(Value::Null)));
    }

    #[test]
    fn direct_checklist_keeps_order() {
        let raw = json!({
            "FIR Copy": "✅ PRESENT - FIR registered",
            "Arrest Memo": "❌ MISSING",
            "Site Plan": {"status": "partial", "detail": "unsigned"}
        });
        let checklist = RawChecklist::detect(&raw, Some("theft"));
        assert_eq!(checklist.shape, ChecklistShape::Direct);
        let keys: Vec<&str> = checklist.entries.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["FIR Copy", "Arrest Memo", "Site Plan"]);
    }

    #[test]
    fn unwraps_checklist_keyed_by_crime_type() {
        let raw = json!({
            "Theft": {
                "FIR Copy": "✅ PRESENT - FIR registered",
                "Stolen Property List": "⚠ PARTIAL - values missing"
            }
        });
        let checklist = RawChecklist::detect(&raw, Some("theft"));
        assert_eq!(
            checklist.shape,
            ChecklistShape::KeyedByCrimeType {
                crime_type: "Theft".into()
            }
        );
        assert_eq!(checklist.entries.len(), 2);
    }

    #[test]
    fn structured_entry_named_like_crime_type_is_not_unwrapped() {
        let raw = json!({"theft": {"status": "present", "detail": "FIR lists theft"}});
        let checklist = RawChecklist::detect(&raw, Some("theft"));
        assert_eq!(checklist.shape, ChecklistShape::Direct);
        assert_eq!(checklist.entries.len(), 1);
    }

    #[test]
    fn keyed_layout_requires_classification() {
        let raw = json!({"theft": {"FIR Copy": "✅ PRESENT - x"}});
        let checklist = RawChecklist::detect(&raw, None);
        assert_eq!(checklist.shape, ChecklistShape::Direct);
    }

    #[test]
    fn missing_and_non_object_are_empty() {
        let missing = RawChecklist::detect(&Value::Null, None);
        assert_eq!(missing.shape, ChecklistShape::Missing);
        assert!(missing.is_empty());

        let list = RawChecklist::detect(&json!(["FIR Copy"]), None);
        assert_eq!(list.shape, ChecklistShape::NotAnObject);
        assert!(list.is_empty());
    }
}
