//! Read-only view model.
//!
//! Plain data built from the registry snapshot and the selected case's
//! session. Nothing here talks to the backend.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::checklist::{summarize, ChecklistIssue, ChecklistSummary, EnrichmentState};
use crate::models::{
    CanonicalChecklist, CaseResult, CaseStatus, ChecklistStatus, Entity, PhaseStatus, PipelineStatus, SimilarityBand,
    SimilarityScore,
};
use crate::pipeline::{PhaseId, PhaseModel, PipelineStatusTracker};
use crate::registry::CaseSnapshot;
use crate::session::{CaseSession, ResultsTab};

/// Longest matched-text excerpt shown on the similarity tab, in characters.
pub const MATCHED_EXCERPT_CHARS: usize = 150;

// ──── Dashboard ────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardView {
    /// Newest first.
    pub cases: Vec<CaseRow>,
    pub selected: Option<SelectedCaseView>,
    pub last_refresh: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseRow {
    pub id: String,
    pub filename: String,
    pub status: CaseStatus,
    pub selected: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum SelectedCaseView {
    Processing { case_id: String, pipeline: PipelineView },
    Completed { case_id: String, results: ResultsView },
    /// Queued, or completed with the result not in yet.
    Waiting { case_id: String, status: CaseStatus },
    Failed { case_id: String, error: Option<String> },
}

impl DashboardView {
    pub fn build(snapshot: &CaseSnapshot, session: Option<&CaseSession>) -> Self {
        let selected_id = session.map(CaseSession::case_id);
        let cases = snapshot
            .cases
            .iter()
            .rev()
            .map(|case| CaseRow {
                id: case.id.clone(),
                filename: case.filename.clone(),
                status: case.status,
                selected: selected_id == Some(case.id.as_str()),
            })
            .collect();

        Self {
            cases,
            selected: session.map(SelectedCaseView::build),
            last_refresh: snapshot.fetched_at,
        }
    }
}

impl SelectedCaseView {
    pub fn build(session: &CaseSession) -> Self {
        let case_id = session.case_id().to_string();
        match session.status() {
            CaseStatus::Processing => Self::Processing {
                case_id,
                pipeline: PipelineView::build(session.pipeline_status().as_ref()),
            },
            CaseStatus::Completed => match session.results_view() {
                Some(results) => Self::Completed { case_id, results },
                None => Self::Waiting {
                    case_id,
                    status: CaseStatus::Completed,
                },
            },
            CaseStatus::Queued => Self::Waiting {
                case_id,
                status: CaseStatus::Queued,
            },
            CaseStatus::Failed => Self::Failed {
                case_id,
                error: session.case().error,
            },
        }
    }
}

// ──── Pipeline ────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineView {
    pub percent: u8,
    pub phases: Vec<PhaseRow>,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PhaseRow {
    pub id: PhaseId,
    pub label: &'static str,
    pub description: &'static str,
    pub state: PhaseStatus,
    pub badge: &'static str,
}

impl PipelineView {
    pub fn build(status: Option<&PipelineStatus>) -> Self {
        let tracker = PipelineStatusTracker::new(status);
        if tracker.is_out_of_order() {
            tracing::debug!("Pipeline phases reported out of order");
        }

        let phases = PhaseModel::order()
            .iter()
            .map(|&id| {
                let descriptor = PhaseModel::describe(id);
                let state = tracker.phase_visual_state(id);
                PhaseRow {
                    id,
                    label: descriptor.label,
                    description: descriptor.description,
                    state,
                    badge: state.badge(),
                }
            })
            .collect();

        Self {
            percent: tracker.progress_percent(),
            phases,
            message: tracker.live_message().map(str::to_string),
        }
    }
}

// ──── Results ────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ResultsView {
    pub tab: ResultsTab,
    pub summary: SummarySection,
    pub checklist: ChecklistSection,
    pub entities: Vec<EntityGroup>,
    pub similarity: SimilaritySection,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummarySection {
    pub fir_number: Option<String>,
    pub date: Option<String>,
    pub police_station: Option<String>,
    pub legal_sections: Option<String>,
    pub crime_type: String,
    pub reason: Option<String>,
    pub incident_facts: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistSection {
    pub counts: ChecklistSummary,
    pub items: Vec<ChecklistRow>,
    /// One line per raw entry that could not be read.
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChecklistRow {
    pub requirement: String,
    pub status: ChecklistStatus,
    pub detail: String,
    pub matched_text: Option<String>,
    pub source_page: Option<u32>,
    pub score: SimilarityScore,
    pub band: Option<SimilarityBand>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntityGroup {
    pub category: String,
    pub label: String,
    pub entities: Vec<Entity>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityProgress {
    NotRequested,
    Loading,
    Scored,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilaritySection {
    pub progress: SimilarityProgress,
    /// Highest score first, unscored last.
    pub rows: Vec<SimilarityRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SimilarityRow {
    pub requirement: String,
    pub score: SimilarityScore,
    /// `81.2%`, absent while unscored.
    pub percent: Option<String>,
    pub band: Option<SimilarityBand>,
    pub matched_excerpt: Option<String>,
}

impl ResultsView {
    pub fn build(
        result: &CaseResult,
        checklist: &CanonicalChecklist,
        issues: &[ChecklistIssue],
        enrichment: &EnrichmentState,
        tab: ResultsTab,
    ) -> Self {
        Self {
            tab,
            summary: SummarySection::build(result),
            checklist: ChecklistSection::build(checklist, issues),
            entities: entity_groups(result),
            similarity: SimilaritySection::build(checklist, enrichment),
        }
    }
}

impl SummarySection {
    fn build(result: &CaseResult) -> Self {
        let facts = &result.facts;
        Self {
            fir_number: facts.fir_number.clone(),
            date: facts.date.clone(),
            police_station: facts.police_station.clone(),
            legal_sections: facts.legal_sections.clone(),
            crime_type: result.classification.display_label(),
            reason: result.classification.reason.clone(),
            incident_facts: facts.incident_facts.clone(),
        }
    }
}

impl ChecklistSection {
    fn build(checklist: &CanonicalChecklist, issues: &[ChecklistIssue]) -> Self {
        let items = checklist
            .iter()
            .map(|(requirement, item)| ChecklistRow {
                requirement: requirement.to_string(),
                status: item.status,
                detail: item.detail.clone(),
                matched_text: item.matched_text.clone(),
                source_page: item.source_page,
                score: item.similarity_score,
                band: item.similarity_score.band(),
            })
            .collect();

        Self {
            counts: summarize(checklist),
            items,
            issues: issues.iter().map(ToString::to_string).collect(),
        }
    }

    /// Header text, e.g. `3 / 5 Present`.
    pub fn present_label(&self) -> String {
        format!("{} / {} Present", self.counts.present, self.counts.total)
    }
}

fn entity_groups(result: &CaseResult) -> Vec<EntityGroup> {
    result
        .entities
        .iter()
        .filter(|(_, entities)| !entities.is_empty())
        .map(|(category, entities)| EntityGroup {
            category: category.to_string(),
            label: category.replace('_', " "),
            entities: entities.clone(),
        })
        .collect()
}

impl SimilaritySection {
    fn build(checklist: &CanonicalChecklist, enrichment: &EnrichmentState) -> Self {
        let progress = match enrichment {
            EnrichmentState::Idle => SimilarityProgress::NotRequested,
            EnrichmentState::InFlight => SimilarityProgress::Loading,
            EnrichmentState::Enriched(_) => SimilarityProgress::Scored,
        };

        let mut rows: Vec<SimilarityRow> = checklist
            .iter()
            .map(|(requirement, item)| SimilarityRow {
                requirement: requirement.to_string(),
                score: item.similarity_score,
                percent: item.similarity_score.value().map(|s| format!("{:.1}%", s * 100.0)),
                band: item.similarity_score.band(),
                matched_excerpt: item.matched_text.as_deref().map(excerpt),
            })
            .collect();
        // Stable: equal scores keep checklist order.
        rows.sort_by(|a, b| b.score.rank_value().total_cmp(&a.score.rank_value()));

        Self { progress, rows }
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(MATCHED_EXCERPT_CHARS).collect()
}
