//! Fixed catalogue of backend pipeline phases.
//!
//! Pure lookup: order and display metadata never change at runtime.

use serde::{Deserialize, Serialize};

/// A discrete backend processing stage, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseId {
    Upload,
    Translate,
    Embeddings,
    Classify,
    Rag,
    Report,
}

/// Display metadata for one phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PhaseDescriptor {
    pub label: &'static str,
    pub description: &'static str,
}

const PHASE_ORDER: [PhaseId; 6] = [
    PhaseId::Upload,
    PhaseId::Translate,
    PhaseId::Embeddings,
    PhaseId::Classify,
    PhaseId::Rag,
    PhaseId::Report,
];

impl PhaseId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::Translate => "translate",
            Self::Embeddings => "embeddings",
            Self::Classify => "classify",
            Self::Rag => "rag",
            Self::Report => "report",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        PHASE_ORDER.iter().copied().find(|phase| phase.as_str() == id)
    }
}

impl std::fmt::Display for PhaseId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Phase catalogue.
pub struct PhaseModel;

impl PhaseModel {
    pub fn order() -> &'static [PhaseId] {
        &PHASE_ORDER
    }

    pub fn count() -> usize {
        PHASE_ORDER.len()
    }

    pub fn describe(phase: PhaseId) -> PhaseDescriptor {
        let (label, description) = match phase {
            PhaseId::Upload => ("Upload", "PDF received"),
            PhaseId::Translate => ("Translation", "Hindi → English"),
            PhaseId::Embeddings => ("Vector DB", "Creating embeddings"),
            PhaseId::Classify => ("Classification", "Detecting crime type"),
            PhaseId::Rag => ("RAG Analysis", "Similarity search"),
            PhaseId::Report => ("Report", "Generating output"),
        };
        PhaseDescriptor { label, description }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_has_six_phases_in_pipeline_order() {
        let ids: Vec<&str> = PhaseModel::order().iter().map(|p| p.as_str()).collect();
        assert_eq!(
            ids,
            vec!["upload", "translate", "embeddings", "classify", "rag", "report"]
        );
        assert_eq!(PhaseModel::count(), 6);
    }

    #[test]
    fn describe_returns_display_metadata() {
        let d = PhaseModel::describe(PhaseId::Embeddings);
        assert_eq!(d.label, "Vector DB");
        assert_eq!(d.description, "Creating embeddings");
        assert_eq!(PhaseModel::describe(PhaseId::Rag).label, "RAG Analysis");
    }

    #[test]
    fn from_id_matches_catalogue() {
        for phase in PhaseModel::order() {
            assert_eq!(PhaseId::from_id(phase.as_str()), Some(*phase));
        }
        assert_eq!(PhaseId::from_id("extract"), None);
    }

    #[test]
    fn ids_compare_in_pipeline_order() {
        assert!(PhaseId::Upload < PhaseId::Translate);
        assert!(PhaseId::Translate < PhaseId::Classify);
    }

    #[test]
    fn serializes_snake_case() {
        assert_eq!(serde_json::to_string(&PhaseId::Embeddings).unwrap(), "\"embeddings\"");
    }
}
