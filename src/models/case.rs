use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use super::enums::CaseStatus;
use super::ordered::OrderedMap;
use super::pipeline::StageRecord;

/// Backend-assigned case identifier (short uuid prefix).
pub type CaseId = String;

/// One uploaded document and everything the backend knows about it.
///
/// Cases are observed, never edited locally. Once `status` is `Completed`
/// the record does not change again.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Case {
    pub id: CaseId,
    #[serde(default)]
    pub filename: String,
    #[serde(default)]
    pub status: CaseStatus,
    #[serde(default)]
    pub result: Option<CaseResult>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub stages: Vec<StageRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// The four report sections produced by the analysis phases.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CaseResult {
    #[serde(rename = "Output_A", default, deserialize_with = "null_as_default")]
    pub facts: Facts,
    #[serde(rename = "Output_B", default, deserialize_with = "null_as_default")]
    pub classification: Classification,
    /// Kept raw: the checklist arrives in more than one shape and is
    /// normalized per view session, see `checklist::shape`.
    #[serde(rename = "Output_C", default)]
    pub checklist: Value,
    #[serde(rename = "Output_D", default, deserialize_with = "null_as_default")]
    pub entities: EntityMap,
}

/// FIR metadata and the incident narrative.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facts {
    #[serde(rename = "FIR_Number", default, deserialize_with = "lenient_text")]
    pub fir_number: Option<String>,
    #[serde(rename = "Date", default, deserialize_with = "lenient_text")]
    pub date: Option<String>,
    #[serde(rename = "Police_Station", default, deserialize_with = "lenient_text")]
    pub police_station: Option<String>,
    #[serde(rename = "Accused_Details", default, deserialize_with = "lenient_text")]
    pub accused_details: Option<String>,
    #[serde(rename = "Victim_Details", default, deserialize_with = "lenient_text")]
    pub victim_details: Option<String>,
    #[serde(rename = "Incident_Facts", default, deserialize_with = "lenient_text")]
    pub incident_facts: Option<String>,
    #[serde(rename = "Legal_Sections", default, deserialize_with = "lenient_text")]
    pub legal_sections: Option<String>,
}

/// Crime-type label plus the model's justification.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(default, deserialize_with = "lenient_text")]
    pub crime_type: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub reason: Option<String>,
}

impl Classification {
    /// `theft_burglary` → `THEFT BURGLARY`.
    pub fn display_label(&self) -> String {
        match self.crime_type.as_deref() {
            Some(crime_type) => crime_type.replace('_', " ").to_uppercase(),
            None => "NOT CLASSIFIED".to_string(),
        }
    }
}

/// A named entity found by the NER phase.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(default)]
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// Entity category (`PERSON`, `LEGAL_SECTION`, ...) → entities.
pub type EntityMap = OrderedMap<Vec<Entity>>;

/// Response of `POST /upload`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseCreated {
    pub case_id: CaseId,
    #[serde(default)]
    pub status: CaseStatus,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// The analysis model does not always respect the declared types: numbers,
/// lists of sections and nested objects all show up where text is expected.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(text_from_value))
}

pub(crate) fn text_from_value(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(text_from_value).collect();
            if parts.is_empty() {
                None
            } else {
                Some(parts.join(", "))
            }
        }
        Value::Object(_) => Some(value.to_string()),
    }
}
