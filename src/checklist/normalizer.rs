//! Raw checklist → canonical checklist.
//!
//! A total, stateless function of its input: the same raw checklist always
//! yields the same canonical map, and a bad entry only affects itself.

use super::shape::{json_kind, ChecklistShape, RawChecklist, RawChecklistEntry};
use super::ChecklistIssue;
use crate::models::{CanonicalChecklist, ChecklistItem, ChecklistStatus, SimilarityScore};

const PRESENT_GLYPH: &str = "✅";
const MISSING_GLYPH: &str = "❌";
const PARTIAL_GLYPH: &str = "⚠";

/// Label prefixes removed from text entries, in removal order. Removal is
/// literal (first occurrence of each), other prefix spellings stay in the
/// detail text.
const STATUS_PREFIXES: [&str; 4] = ["✅ PRESENT -", "❌ MISSING -", "❌ MISSING", "⚠ PARTIAL -"];

/// Result of normalizing one raw checklist.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedChecklist {
    pub shape: ChecklistShape,
    pub items: CanonicalChecklist,
    pub issues: Vec<ChecklistIssue>,
}

pub fn normalize(raw: &RawChecklist) -> NormalizedChecklist {
    let mut items = CanonicalChecklist::new();
    let mut issues = Vec::new();

    for (key, entry) in &raw.entries {
        let item = match normalize_entry(key, entry) {
            Ok(item) => item,
            Err(issue) => {
                tracing::warn!(%issue, "Checklist entry replaced with empty record");
                issues.push(issue);
                ChecklistItem::default()
            }
        };
        items.insert(key.clone(), item);
    }

    NormalizedChecklist {
        shape: raw.shape.clone(),
        items,
        issues,
    }
}

pub fn normalize_entry(key: &str, entry: &RawChecklistEntry) -> Result<ChecklistItem, ChecklistIssue> {
    match entry {
        // Canonical already: trusted as-is, status is not re-derived.
        RawChecklistEntry::Structured(map) => Ok(ChecklistItem::from_object(map.clone())),
        RawChecklistEntry::Text(text) => Ok(item_from_text(text)),
        RawChecklistEntry::Other(value) => Err(ChecklistIssue::MalformedEntry {
            key: key.to_string(),
            reason: format!("unsupported {} value", json_kind(value)),
        }),
    }
}

fn item_from_text(text: &str) -> ChecklistItem {
    let status = status_from_glyph(text);
    let detail = strip_status_prefixes(text);
    let matched_text = match status {
        ChecklistStatus::Present | ChecklistStatus::Partial => Some(detail.clone()),
        ChecklistStatus::Missing | ChecklistStatus::Unknown => None,
    };

    ChecklistItem {
        status,
        detail,
        matched_text,
        source_page: None,
        similarity_score: SimilarityScore::Unscored,
        extra: Default::default(),
    }
}

fn status_from_glyph(text: &str) -> ChecklistStatus {
    if text.contains(PRESENT_GLYPH) {
        ChecklistStatus::Present
    } else if text.contains(MISSING_GLYPH) {
        ChecklistStatus::Missing
    } else if text.contains(PARTIAL_GLYPH) {
        ChecklistStatus::Partial
    } else {
        ChecklistStatus::Unknown
    }
}

fn strip_status_prefixes(text: &str) -> String {
    STATUS_PREFIXES
        .iter()
        .fold(text.to_string(), |acc, prefix| acc.replacen(prefix, "", 1))
        .trim()
        .to_string()
}
