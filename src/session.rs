//! View session for the selected case.
//!
//! Holds everything derived from one case while it is selected: the
//! normalized checklist, the active results tab and the similarity enricher.
//! Derived state is rebuilt whenever the raw checklist changes and dropped
//! with the session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use serde_json::Value;

use crate::backend::CaseBackend;
use crate::checklist::{normalize, EnrichmentOutcome, EnrichmentState, NormalizedChecklist, RawChecklist, SimilarityEnricher};
use crate::models::{CanonicalChecklist, Case, CaseId, CaseStatus, PipelineStatus};
use crate::pipeline::status_from_stages;
use crate::view::{PipelineView, ResultsView};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResultsTab {
    #[default]
    Summary,
    Checklist,
    Entities,
    Similarity,
}

struct SessionState {
    case: Case,
    /// `Output_C` and crime type the checklist was last normalized from.
    source: (Value, Option<String>),
    normalized: NormalizedChecklist,
    tab: ResultsTab,
}

pub struct CaseSession {
    case_id: CaseId,
    state: Mutex<SessionState>,
    enricher: SimilarityEnricher,
}

impl CaseSession {
    pub fn new(backend: Arc<dyn CaseBackend>, case: Case) -> Self {
        let source = checklist_source(&case);
        let normalized = normalize_source(&case.id, &source);
        Self {
            case_id: case.id.clone(),
            enricher: SimilarityEnricher::new(backend, case.id.clone()),
            state: Mutex::new(SessionState {
                case,
                source,
                normalized,
                tab: ResultsTab::default(),
            }),
        }
    }

    pub fn case_id(&self) -> &str {
        &self.case_id
    }

    pub fn case(&self) -> Case {
        self.lock().case.clone()
    }

    pub fn status(&self) -> CaseStatus {
        self.lock().case.status
    }

    pub fn active_tab(&self) -> ResultsTab {
        self.lock().tab
    }

    /// Take in a newer copy of the case. Returns true when the checklist had
    /// to be rebuilt.
    pub fn update(&self, case: Case) -> bool {
        let mut state = self.lock();
        if case.status != state.case.status {
            tracing::info!(
                case_id = %self.case_id,
                from = %state.case.status,
                to = %case.status,
                "Case status changed"
            );
        }

        let source = checklist_source(&case);
        state.case = case;
        if source == state.source {
            return false;
        }

        state.normalized = normalize_source(&self.case_id, &source);
        state.source = source;
        // Under the session lock so `activate_tab` never pairs the new
        // checklist with the old generation.
        self.enricher.invalidate();
        true
    }

    pub fn normalized(&self) -> NormalizedChecklist {
        self.lock().normalized.clone()
    }

    /// Canonical checklist for display: the scored one once enrichment has
    /// succeeded, the normalized one before.
    pub fn checklist(&self) -> CanonicalChecklist {
        match self.enricher.enriched() {
            Some(enriched) => (*enriched).clone(),
            None => self.lock().normalized.items.clone(),
        }
    }

    pub fn enrichment_state(&self) -> EnrichmentState {
        self.enricher.state()
    }

    /// Switch tabs. Opening the similarity tab on a completed case fetches
    /// scores the first time. Enrichment problems are logged, never returned.
    pub async fn activate_tab(&self, tab: ResultsTab) -> Option<EnrichmentOutcome> {
        let (generation, narrative, checklist) = {
            let mut state = self.lock();
            state.tab = tab;
            if tab != ResultsTab::Similarity {
                return None;
            }
            let Some(result) = state.case.result.as_ref().filter(|_| state.case.status == CaseStatus::Completed) else {
                tracing::debug!(case_id = %self.case_id, "No result yet, similarity not requested");
                return None;
            };
            (
                self.enricher.generation(),
                result.facts.incident_facts.clone(),
                state.normalized.items.clone(),
            )
        };

        match self.enricher.enrich(generation, narrative.as_deref(), &checklist).await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::debug!(case_id = %self.case_id, error = %e, "Similarity tab shows unscored checklist");
                None
            }
        }
    }

    /// Live pipeline state while the case is processing.
    pub fn pipeline_status(&self) -> Option<PipelineStatus> {
        let state = self.lock();
        if state.case.status != CaseStatus::Processing {
            return None;
        }
        status_from_stages(&state.case.stages)
    }

    pub fn pipeline_view(&self) -> Option<PipelineView> {
        if self.status() != CaseStatus::Processing {
            return None;
        }
        Some(PipelineView::build(self.pipeline_status().as_ref()))
    }

    pub fn results_view(&self) -> Option<ResultsView> {
        let checklist = self.checklist();
        let enrichment = self.enrichment_state();
        let state = self.lock();
        if state.case.status != CaseStatus::Completed {
            return None;
        }
        let result = state.case.result.as_ref()?;
        Some(ResultsView::build(
            result,
            &checklist,
            &state.normalized.issues,
            &enrichment,
            state.tab,
        ))
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn checklist_source(case: &Case) -> (Value, Option<String>) {
    match &case.result {
        Some(result) => (result.checklist.clone(), result.classification.crime_type.clone()),
        None => (Value::Null, None),
    }
}

fn normalize_source(case_id: &str, (raw, crime_type): &(Value, Option<String>)) -> NormalizedChecklist {
    let normalized = normalize(&RawChecklist::detect(raw, crime_type.as_deref()));
    if !normalized.items.is_empty() {
        tracing::debug!(
            case_id,
            items = normalized.items.len(),
            issues = normalized.issues.len(),
            "Checklist normalized"
        );
    }
    normalized
}
