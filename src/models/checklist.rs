use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use super::enums::ChecklistStatus;
use super::ordered::OrderedMap;

/// Score threshold for a strong match.
pub const STRONG_MATCH_THRESHOLD: f64 = 0.7;
/// Score threshold for a moderate match.
pub const MODERATE_MATCH_THRESHOLD: f64 = 0.4;

/// Similarity between a checklist item and the case narrative.
///
/// `Unscored` means "not enriched yet" and is never a number: the UI must be
/// able to tell a missing measurement from a measured zero. On the wire it is
/// `null`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum SimilarityScore {
    #[default]
    Unscored,
    Scored(f64),
}

impl SimilarityScore {
    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Unscored => None,
            Self::Scored(score) => Some(*score),
        }
    }

    /// Sort key: unscored items rank with zero.
    pub fn rank_value(&self) -> f64 {
        self.value().unwrap_or(0.0)
    }

    pub fn band(&self) -> Option<SimilarityBand> {
        self.value().map(SimilarityBand::classify)
    }
}

impl Serialize for SimilarityScore {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Unscored => serializer.serialize_none(),
            Self::Scored(score) => serializer.serialize_f64(*score),
        }
    }
}

impl<'de> Deserialize<'de> for SimilarityScore {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(match Option::<f64>::deserialize(deserializer)? {
            Some(score) => Self::Scored(score),
            None => Self::Unscored,
        })
    }
}

/// Coarse match strength used for colouring scores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityBand {
    Strong,
    Moderate,
    Weak,
}

impl SimilarityBand {
    pub fn classify(score: f64) -> Self {
        if score >= STRONG_MATCH_THRESHOLD {
            Self::Strong
        } else if score >= MODERATE_MATCH_THRESHOLD {
            Self::Moderate
        } else {
            Self::Weak
        }
    }
}

/// Canonical checklist record, independent of the backend's raw format.
///
/// Fields the backend sends beyond the canonical five are kept in `extra`
/// so that structured entries survive a pass-through unchanged.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChecklistItem {
    pub status: ChecklistStatus,
    pub detail: String,
    pub matched_text: Option<String>,
    pub source_page: Option<u32>,
    pub similarity_score: SimilarityScore,
    pub extra: Map<String, Value>,
}

impl ChecklistItem {
    pub fn is_present(&self) -> bool {
        self.status == ChecklistStatus::Present
    }

    /// Build an item from a backend object without rejecting it.
    ///
    /// Known fields are coerced where the intent is clear (`"4"` as a page,
    /// `"0.8"` as a score, a number as detail text). A value that still does
    /// not fit is kept in `extra` under its own key and the field stays at
    /// its default.
    pub fn from_object(mut map: Map<String, Value>) -> Self {
        let mut item = Self::default();

        if let Some(value) = map.remove("status") {
            match value {
                Value::String(raw) => item.status = ChecklistStatus::from_wire(&raw),
                Value::Null => {}
                other => {
                    map.insert("status".into(), other);
                }
            }
        }
        if let Some(value) = map.remove("detail") {
            item.detail = match value {
                Value::String(text) => text,
                Value::Null => String::new(),
                other => other.to_string(),
            };
        }
        if let Some(value) = map.remove("matched_text") {
            match value {
                Value::String(text) => item.matched_text = Some(text),
                Value::Null => {}
                Value::Number(n) => item.matched_text = Some(n.to_string()),
                Value::Bool(b) => item.matched_text = Some(b.to_string()),
                other => {
                    map.insert("matched_text".into(), other);
                }
            }
        }
        if let Some(value) = map.remove("source_page") {
            match page_number(&value) {
                Some(page) => item.source_page = Some(page),
                None if value.is_null() => {}
                None => {
                    map.insert("source_page".into(), value);
                }
            }
        }
        if let Some(value) = map.remove("similarity_score") {
            match score_value(&value) {
                Some(score) => item.similarity_score = SimilarityScore::Scored(score),
                None if value.is_null() => {}
                None => {
                    map.insert("similarity_score".into(), value);
                }
            }
        }

        item.extra = map;
        item
    }
}

impl Serialize for ChecklistItem {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        // A value kept in `extra` under a canonical key replaces the field.
        if !self.extra.contains_key("status") {
            map.serialize_entry("status", &self.status)?;
        }
        map.serialize_entry("detail", &self.detail)?;
        if !self.extra.contains_key("matched_text") {
            map.serialize_entry("matched_text", &self.matched_text)?;
        }
        if !self.extra.contains_key("source_page") {
            map.serialize_entry("source_page", &self.source_page)?;
        }
        if !self.extra.contains_key("similarity_score") {
            map.serialize_entry("similarity_score", &self.similarity_score)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for ChecklistItem {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Map::deserialize(deserializer).map(Self::from_object)
    }
}

/// Requirement name → canonical item, in backend order.
pub type CanonicalChecklist = OrderedMap<ChecklistItem>;

fn page_number(value: &Value) -> Option<u32> {
    let page = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    let in_range = page.fract() == 0.0 && (0.0..=f64::from(u32::MAX)).contains(&page);
    in_range.then_some(page as u32)
}

fn score_value(value: &Value) -> Option<f64> {
    let score = match value {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    score.is_finite().then_some(score)
}
