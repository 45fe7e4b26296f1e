//! Derives a `PipelineStatus` from the stage list the backend stores on
//! each case.
//!
//! The backend names its stages after its own code layout
//! (`upload, extract, translate, analyze, format`), not after the display
//! catalogue, so names go through an alias table. Several stages may feed the
//! same phase; unknown stage names are skipped.

use super::phases::{PhaseId, PhaseModel};
use crate::models::{PhaseState, PhaseStatus, PipelineStatus, StageRecord};

const STAGE_ALIASES: &[(&str, PhaseId)] = &[
    ("extract", PhaseId::Upload),
    ("extraction", PhaseId::Upload),
    ("translation", PhaseId::Translate),
    ("embed", PhaseId::Embeddings),
    ("vector_db", PhaseId::Embeddings),
    ("analyze", PhaseId::Classify),
    ("analysis", PhaseId::Classify),
    ("classification", PhaseId::Classify),
    ("similarity", PhaseId::Rag),
    ("ner", PhaseId::Rag),
    ("format", PhaseId::Report),
];

/// Map a backend stage name onto a catalogue phase.
pub fn phase_for_stage(name: &str) -> Option<PhaseId> {
    let name = name.trim().to_ascii_lowercase();
    PhaseId::from_id(&name).or_else(|| {
        STAGE_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, phase)| *phase)
    })
}

/// Build the live status for a processing case. Returns `None` when no stage
/// maps onto the catalogue.
pub fn status_from_stages(stages: &[StageRecord]) -> Option<PipelineStatus> {
    let mut phases = Vec::new();
    for phase in PhaseModel::order() {
        let feeding: Vec<PhaseStatus> = stages
            .iter()
            .filter(|stage| phase_for_stage(&stage.name) == Some(*phase))
            .map(|stage| stage.status)
            .collect();
        if feeding.is_empty() {
            continue;
        }
        phases.push(PhaseState {
            id: *phase,
            status: combine(&feeding),
        });
    }

    for stage in stages {
        if phase_for_stage(&stage.name).is_none() {
            tracing::debug!(stage = %stage.name, "Skipping stage with no matching phase");
        }
    }

    if phases.is_empty() {
        return None;
    }

    Some(PipelineStatus::new(phases, current_message(stages)))
}

fn combine(statuses: &[PhaseStatus]) -> PhaseStatus {
    if statuses.iter().all(|s| *s == PhaseStatus::Completed) {
        PhaseStatus::Completed
    } else if statuses.iter().all(|s| *s == PhaseStatus::Pending) {
        PhaseStatus::Pending
    } else {
        PhaseStatus::InProgress
    }
}

/// Message of the running stage, else of the last finished one.
fn current_message(stages: &[StageRecord]) -> Option<String> {
    let running = stages
        .iter()
        .find(|s| s.status == PhaseStatus::InProgress)
        .and_then(|s| s.message.clone());
    running.or_else(|| {
        stages
            .iter()
            .rev()
            .find(|s| s.status == PhaseStatus::Completed)
            .and_then(|s| s.message.clone())
    })
}
