//! Projects a live `PipelineStatus` onto the phase catalogue.
//!
//! Stateless: build a tracker per status update and read from it.

use super::phases::{PhaseId, PhaseModel};
use crate::models::{PhaseStatus, PipelineStatus};

#[derive(Debug, Clone, Copy)]
pub struct PipelineStatusTracker<'a> {
    status: Option<&'a PipelineStatus>,
}

impl<'a> PipelineStatusTracker<'a> {
    pub fn new(status: Option<&'a PipelineStatus>) -> Self {
        Self { status }
    }

    /// Reported state of a phase. Phases the backend has not mentioned yet
    /// are pending, whatever the others say.
    pub fn phase_visual_state(&self, phase: PhaseId) -> PhaseStatus {
        self.status
            .and_then(|s| s.phases.iter().find(|p| p.id == phase))
            .map(|p| p.status)
            .unwrap_or(PhaseStatus::Pending)
    }

    /// Share of completed phases over the whole catalogue, rounded half-up.
    pub fn progress_percent(&self) -> u8 {
        let Some(status) = self.status else {
            return 0;
        };
        if status.phases.is_empty() {
            return 0;
        }

        let completed = status
            .phases
            .iter()
            .filter(|p| p.status == PhaseStatus::Completed)
            .count();
        let total = PhaseModel::count();
        // round(100 * c / t) == floor((200 * c + t) / (2 * t)) for non-negative ints
        let percent = (200 * completed + total) / (2 * total);
        percent.min(100) as u8
    }

    pub fn live_message(&self) -> Option<&'a str> {
        self.status.and_then(|s| s.current_message.as_deref())
    }

    /// True when a later phase has started while an earlier one is still
    /// pending. Rendered as-is, but worth a log line.
    pub fn is_out_of_order(&self) -> bool {
        let states: Vec<PhaseStatus> = PhaseModel::order()
            .iter()
            .map(|phase| self.phase_visual_state(*phase))
            .collect();
        states
            .iter()
            .enumerate()
            .any(|(i, s)| *s == PhaseStatus::Pending && states[i + 1..].iter().any(|l| *l != PhaseStatus::Pending))
    }
}
