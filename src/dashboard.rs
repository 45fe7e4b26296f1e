//! Top-level orchestrator: uploads, case selection and the view model.

use std::path::Path;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::backend::{BackendError, CaseBackend, DocumentUpload, HttpCaseBackend};
use crate::checklist::EnrichmentOutcome;
use crate::config::DashboardConfig;
use crate::error::DashboardError;
use crate::models::CaseId;
use crate::registry::CaseRegistry;
use crate::session::{CaseSession, ResultsTab};
use crate::view::DashboardView;

pub struct Dashboard {
    backend: Arc<dyn CaseBackend>,
    registry: CaseRegistry,
    selection: RwLock<Option<Arc<CaseSession>>>,
}

impl Dashboard {
    pub fn new(backend: Arc<dyn CaseBackend>, poll_interval: Duration) -> Self {
        Self {
            registry: CaseRegistry::new(Arc::clone(&backend), poll_interval),
            backend,
            selection: RwLock::new(None),
        }
    }

    /// Dashboard talking to the HTTP backend named in `config`.
    pub fn connect(config: &DashboardConfig) -> Result<Self, BackendError> {
        let backend = HttpCaseBackend::from_config(config)?;
        tracing::info!(api_base = %backend.base_url(), "Using chargesheet backend");
        Ok(Self::new(Arc::new(backend), config.poll_interval))
    }

    pub fn registry(&self) -> &CaseRegistry {
        &self.registry
    }

    pub fn start(&self) {
        self.registry.start();
    }

    pub fn stop(&self) {
        self.registry.stop();
    }

    /// Send a document for processing and refresh the case list once so the
    /// new case shows up without waiting for the next tick.
    pub async fn upload(&self, upload: DocumentUpload) -> Result<CaseId, DashboardError> {
        if !upload.is_pdf() {
            return Err(DashboardError::UnsupportedFile(upload.filename));
        }

        let filename = upload.filename.clone();
        let created = self.backend.upload_document(upload).await.map_err(|e| {
            tracing::warn!(filename = %filename, error = %e, "Upload failed");
            DashboardError::UploadFailed(e)
        })?;
        tracing::info!(case_id = %created.case_id, filename = %filename, "Document uploaded");

        // Failure already logged; the poller catches up.
        let _ = self.registry.refresh().await;
        Ok(created.case_id)
    }

    pub async fn upload_path(&self, path: &Path) -> Result<CaseId, DashboardError> {
        let upload = DocumentUpload::from_path(path).await?;
        self.upload(upload).await
    }

    /// Select a case from the current snapshot. Reselecting the open case
    /// keeps its session (and any similarity scores).
    pub fn select(&self, case_id: &str) -> Result<Arc<CaseSession>, DashboardError> {
        let case = self
            .registry
            .find(case_id)
            .ok_or_else(|| DashboardError::CaseNotFound(case_id.to_string()))?;

        let mut selection = self.selection.write().unwrap_or_else(|e| e.into_inner());
        if let Some(session) = selection.as_ref().filter(|s| s.case_id() == case_id) {
            session.update(case);
            return Ok(Arc::clone(session));
        }

        tracing::debug!(case_id, "Case selected");
        let session = Arc::new(CaseSession::new(Arc::clone(&self.backend), case));
        *selection = Some(Arc::clone(&session));
        Ok(session)
    }

    pub fn clear_selection(&self) {
        *self.selection.write().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// The selected session, brought up to date with the latest snapshot.
    pub fn selected(&self) -> Option<Arc<CaseSession>> {
        let session = self.selection.read().unwrap_or_else(|e| e.into_inner()).clone()?;
        if let Some(case) = self.registry.find(session.case_id()) {
            session.update(case);
        }
        Some(session)
    }

    pub async fn activate_tab(&self, tab: ResultsTab) -> Option<EnrichmentOutcome> {
        let session = self.selected()?;
        session.activate_tab(tab).await
    }

    pub fn view(&self) -> DashboardView {
        let session = self.selected();
        DashboardView::build(&self.registry.snapshot(), session.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{MockCaseBackend, SimilarityReply};
    use crate::models::{CaseResult, CaseStatus, PhaseStatus, SimilarityScore};
    use crate::view::SelectedCaseView;
    use serde_json::json;

    fn dashboard(backend: &Arc<MockCaseBackend>) -> Dashboard {
        Dashboard::new(Arc::clone(backend) as Arc<dyn CaseBackend>, Duration::from_millis(3000))
    }

    #[tokio::test]
    async fn rejects_non_pdf_locally() {
        let backend = Arc::new(MockCaseBackend::new());
        let dashboard = dashboard(&backend);

        let err = dashboard
            .upload(DocumentUpload::new("statement.docx", vec![1, 2, 3]))
            .await
            .unwrap_err();
        assert!(matches!(err, DashboardError::UnsupportedFile(name) if name == "statement.docx"));
        assert_eq!(backend.upload_calls(), 0);
    }

    #[tokio::test]
    async fn select_unknown_case_fails() {
        let backend = Arc::new(MockCaseBackend::new());
        let dashboard = dashboard(&backend);
        assert!(matches!(
            dashboard.select("nope"),
            Err(DashboardError::CaseNotFound(_))
        ));
    }

    #[tokio::test]
    async fn upload_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("FIR_88.pdf");
        std::fs::write(&path, b"%PDF-1.7").unwrap();

        let backend = Arc::new(MockCaseBackend::new());
        let dashboard = dashboard(&backend);
        let case_id = dashboard.upload_path(&path).await.unwrap();

        assert_eq!(dashboard.registry().find(&case_id).unwrap().filename, "FIR_88.pdf");
        assert!(matches!(
            dashboard.upload_path(&dir.path().join("missing.pdf")).await,
            Err(DashboardError::Io(_))
        ));
    }

    #[tokio::test]
    async fn upload_to_completed_results() {
        let backend = Arc::new(MockCaseBackend::new().with_similarity(SimilarityReply::Uniform(0.72)));
        let dashboard = dashboard(&backend);

        // Upload: case appears queued straight away.
        let case_id = dashboard
            .upload(DocumentUpload::new("FIR_301.pdf", b"%PDF-1.4".to_vec()))
            .await
            .unwrap();
        let view = dashboard.view();
        assert_eq!(view.cases.len(), 1);
        assert_eq!(view.cases[0].status, CaseStatus::Queued);

        dashboard.select(&case_id).unwrap();
        assert!(matches!(
            dashboard.view().selected,
            Some(SelectedCaseView::Waiting {
                status: CaseStatus::Queued,
                ..
            })
        ));

        // Processing: pipeline derived from backend stages.
        backend.update_case(&case_id, |case| {
            case.status = CaseStatus::Processing;
            case.stages[1].status = PhaseStatus::Completed;
            case.stages[2].status = PhaseStatus::InProgress;
            case.stages[2].message = Some("Translating to English...".into());
        });
        dashboard.registry().refresh().await.unwrap();
        match dashboard.view().selected {
            Some(SelectedCaseView::Processing { pipeline, .. }) => {
                assert_eq!(pipeline.percent, 17);
                assert_eq!(pipeline.message.as_deref(), Some("Translating to English..."));
            }
            other => panic!("expected processing view, got {other:?}"),
        }

        // Completed with a mixed-format checklist.
        let result: CaseResult = serde_json::from_value(json!({
            "Output_A": {"FIR_Number": "301/2024", "Incident_Facts": "Two accused stole a motorcycle from the parking lot"},
            "Output_B": {"crime_type": "theft", "reason": "Vehicle taken without consent"},
            "Output_C": {
                "theft": {
                    "FIR Copy": "✅ PRESENT - FIR 301/2024 registered",
                    "Seizure Memo": {"status": "present", "detail": "Motorcycle recovered", "source_page": 4},
                    "Site Plan": "⚠ PARTIAL - unsigned sketch",
                    "MLC Report": "❌ MISSING"
                }
            },
            "Output_D": {"PERSON": [{"text": "Vikram", "role": "accused"}]}
        }))
        .unwrap();
        backend.update_case(&case_id, |case| {
            case.status = CaseStatus::Completed;
            case.result = Some(result);
        });
        dashboard.registry().refresh().await.unwrap();

        let results = match dashboard.view().selected {
            Some(SelectedCaseView::Completed { results, .. }) => results,
            other => panic!("expected results view, got {other:?}"),
        };
        assert_eq!(results.summary.crime_type, "THEFT");
        assert_eq!(results.checklist.counts.present, 2);
        assert_eq!(results.checklist.counts.total, 4);
        assert_eq!(results.checklist.present_label(), "2 / 4 Present");
        assert!(results.checklist.items.iter().all(|row| row.score == SimilarityScore::Unscored));

        // Similarity tab: one request, scores replace the checklist.
        assert!(matches!(
            dashboard.activate_tab(ResultsTab::Similarity).await,
            Some(EnrichmentOutcome::Enriched(_))
        ));
        dashboard.activate_tab(ResultsTab::Similarity).await;
        assert_eq!(backend.similarity_calls(), 1);

        let results = match dashboard.view().selected {
            Some(SelectedCaseView::Completed { results, .. }) => results,
            other => panic!("expected results view, got {other:?}"),
        };
        assert_eq!(results.tab, ResultsTab::Similarity);
        assert!(results
            .similarity
            .rows
            .iter()
            .all(|row| row.score == SimilarityScore::Scored(0.72)));
        assert_eq!(results.checklist.counts.present, 2);
    }

    #[tokio::test]
    async fn failed_case_shows_error() {
        let backend = Arc::new(MockCaseBackend::new());
        let dashboard = dashboard(&backend);
        let case_id = dashboard
            .upload(DocumentUpload::new("FIR_9.pdf", vec![]))
            .await
            .unwrap();
        backend.update_case(&case_id, |case| {
            case.status = CaseStatus::Failed;
            case.error = Some("Translation quota exceeded".into());
        });
        dashboard.registry().refresh().await.unwrap();
        dashboard.select(&case_id).unwrap();

        assert_eq!(
            dashboard.view().selected,
            Some(SelectedCaseView::Failed {
                case_id,
                error: Some("Translation quota exceeded".into())
            })
        );
    }

    #[tokio::test]
    async fn reselect_keeps_session() {
        let backend = Arc::new(MockCaseBackend::new());
        let dashboard = dashboard(&backend);
        let case_id = dashboard
            .upload(DocumentUpload::new("FIR_10.pdf", vec![]))
            .await
            .unwrap();

        let first = dashboard.select(&case_id).unwrap();
        let second = dashboard.select(&case_id).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        dashboard.clear_selection();
        assert!(dashboard.selected().is_none());
        assert!(dashboard.view().selected.is_none());
    }
}
