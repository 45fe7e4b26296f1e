use serde::{Deserialize, Serialize};

use super::enums::PhaseStatus;
use crate::pipeline::phases::PhaseId;

/// One stage entry as the backend records it on the case.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageRecord {
    pub name: String,
    #[serde(default)]
    pub status: PhaseStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Progress of a single phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseState {
    pub id: PhaseId,
    pub status: PhaseStatus,
}

/// Live status of a processing case.
///
/// Only meaningful while the case is `Processing`; dropped as soon as the
/// case leaves that state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PipelineStatus {
    pub phases: Vec<PhaseState>,
    #[serde(rename = "currentMessage", default)]
    pub current_message: Option<String>,
}

impl PipelineStatus {
    pub fn new(phases: Vec<PhaseState>, current_message: Option<String>) -> Self {
        Self {
            phases,
            current_message,
        }
    }
}
