//! Evidence checklist reconciliation.
//!
//! The analysis phase emits the checklist either as already-structured
//! objects or as free-text status lines with a glyph prefix. Everything
//! downstream works on the canonical form built here.

pub mod shape;
pub mod normalizer;
pub mod enricher;

pub use shape::{ChecklistShape, RawChecklist, RawChecklistEntry};
pub use normalizer::{normalize, normalize_entry, NormalizedChecklist};
pub use enricher::{EnrichmentOutcome, EnrichmentState, SimilarityEnricher};

use serde::Serialize;
use thiserror::Error;

use crate::models::{CanonicalChecklist, ChecklistStatus};

/// Problem with a single raw entry. Never aborts the rest of the checklist.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChecklistIssue {
    #[error("Malformed checklist entry '{key}': {reason}")]
    MalformedEntry { key: String, reason: String },
}

/// Per-status counts for the checklist header.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChecklistSummary {
    pub present: usize,
    pub partial: usize,
    pub missing: usize,
    pub unknown: usize,
    pub total: usize,
}

pub fn summarize(checklist: &CanonicalChecklist) -> ChecklistSummary {
    let mut summary = ChecklistSummary {
        total: checklist.len(),
        ..Default::default()
    };
    for item in checklist.values() {
        match item.status {
            ChecklistStatus::Present => summary.present += 1,
            ChecklistStatus::Partial => summary.partial += 1,
            ChecklistStatus::Missing => summary.missing += 1,
            ChecklistStatus::Unknown => summary.unknown += 1,
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ChecklistItem;

    #[test]
    fn summary_counts_each_status() {
        let mut checklist = CanonicalChecklist::new();
        for (key, status) in [
            ("FIR Copy", ChecklistStatus::Present),
            ("Seizure Memo", ChecklistStatus::Present),
            ("MLC Report", ChecklistStatus::Missing),
            ("Site Plan", ChecklistStatus::Partial),
            ("Odd", ChecklistStatus::Unknown),
        ] {
            checklist.insert(
                key,
                ChecklistItem {
                    status,
                    ..Default::default()
                },
            );
        }
        let summary = summarize(&checklist);
        assert_eq!(summary.present, 2);
        assert_eq!(summary.missing, 1);
        assert_eq!(summary.partial, 1);
        assert_eq!(summary.unknown, 1);
        assert_eq!(summary.total, 5);
    }

    #[test]
    fn empty_checklist_summary() {
        assert_eq!(summarize(&CanonicalChecklist::new()), ChecklistSummary::default());
    }
}
