//! Headless case monitor.
//!
//! Uploads the documents given on the command line, then follows the newest
//! case: pipeline progress while it runs, checklist and similarity scores
//! once it completes. Runs until Ctrl-C.

use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::backend::BackendError;
use crate::checklist::EnrichmentOutcome;
use crate::config::DashboardConfig;
use crate::dashboard::Dashboard;
use crate::registry::CaseSnapshot;
use crate::session::ResultsTab;
use crate::view::{ResultsView, SelectedCaseView};

/// How many similarity rows to log for a completed case.
const TOP_MATCHES: usize = 5;

#[derive(Error, Debug)]
pub enum MonitorError {
    #[error("Cannot create backend client: {0}")]
    Backend(#[from] BackendError),

    #[error("Signal handler error: {0}")]
    Signal(#[from] std::io::Error),
}

pub async fn run(config: DashboardConfig, files: Vec<PathBuf>) -> Result<(), MonitorError> {
    let dashboard = Dashboard::connect(&config)?;

    for path in &files {
        match dashboard.upload_path(path).await {
            Ok(case_id) => tracing::info!(case_id = %case_id, path = %path.display(), "Queued for processing"),
            Err(e) => tracing::error!(path = %path.display(), error = %e, "Could not upload document"),
        }
    }

    let mut snapshots = dashboard.registry().subscribe();
    dashboard.start();

    let mut follower = Follower::default();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            signal = &mut ctrl_c => {
                signal?;
                tracing::info!("Interrupted, stopping monitor");
                break;
            }
            changed = snapshots.changed() => {
                if changed.is_err() {
                    break;
                }
                let snapshot = Arc::clone(&snapshots.borrow_and_update());
                follower.on_snapshot(&dashboard, &snapshot).await;
            }
        }
    }

    dashboard.stop();
    Ok(())
}

/// Tracks which case is followed and what was last reported about it.
#[derive(Default)]
struct Follower {
    last_report: Option<String>,
    scored: bool,
}

impl Follower {
    async fn on_snapshot(&mut self, dashboard: &Dashboard, snapshot: &CaseSnapshot) {
        let Some(newest) = snapshot.newest() else {
            return;
        };
        let following = dashboard.selected().map(|s| s.case_id().to_string());
        if following.as_deref() != Some(newest.id.as_str()) {
            if dashboard.select(&newest.id).is_err() {
                return;
            }
            tracing::info!(case_id = %newest.id, filename = %newest.filename, "Following case");
            self.last_report = None;
            self.scored = false;
        }

        let Some(selected) = dashboard.view().selected else {
            return;
        };

        if let SelectedCaseView::Completed { .. } = selected {
            if !self.scored {
                // Anything short of scores in hand is retried on the next snapshot.
                let outcome = dashboard.activate_tab(ResultsTab::Similarity).await;
                self.scored = matches!(
                    outcome,
                    Some(EnrichmentOutcome::Enriched(_) | EnrichmentOutcome::Cached(_))
                );
            }
        }

        // Re-read: enrichment may have changed the results.
        let Some(selected) = dashboard.view().selected else {
            return;
        };
        let report = describe(&selected);
        if self.last_report.as_deref() != Some(report.as_str()) {
            for line in report.lines() {
                tracing::info!("{line}");
            }
            self.last_report = Some(report);
        }
    }
}

/// Multi-line console summary of the selected case.
pub(crate) fn describe(selected: &SelectedCaseView) -> String {
    match selected {
        SelectedCaseView::Processing { case_id, pipeline } => {
            let running = pipeline
                .phases
                .iter()
                .find(|p| p.badge == "Running")
                .map(|p| p.label)
                .unwrap_or("-");
            format!(
                "[{case_id}] {}% ({running}) {}",
                pipeline.percent,
                pipeline.message.as_deref().unwrap_or("")
            )
            .trim_end()
            .to_string()
        }
        SelectedCaseView::Waiting { case_id, status } => format!("[{case_id}] {status}"),
        SelectedCaseView::Failed { case_id, error } => {
            format!("[{case_id}] failed: {}", error.as_deref().unwrap_or("unknown error"))
        }
        SelectedCaseView::Completed { case_id, results } => describe_results(case_id, results),
    }
}

fn describe_results(case_id: &str, results: &ResultsView) -> String {
    let mut lines = vec![format!(
        "[{case_id}] completed: {} | FIR {} | checklist {}",
        results.summary.crime_type,
        results.summary.fir_number.as_deref().unwrap_or("n/a"),
        results.checklist.present_label()
    )];

    for issue in &results.checklist.issues {
        lines.push(format!("  ! {issue}"));
    }

    for row in results.similarity.rows.iter().take(TOP_MATCHES) {
        if let Some(percent) = &row.percent {
            lines.push(format!("  {percent:>6}  {}", row.requirement));
        }
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{CaseBackend, MockCaseBackend, SimilarityReply};
    use crate::checklist::EnrichmentState;
    use crate::models::{
        CanonicalChecklist, Case, CaseResult, CaseStatus, ChecklistItem, ChecklistStatus, SimilarityScore,
    };
    use crate::view::PipelineView;
    use serde_json::json;
    use std::time::Duration;

    #[test]
    fn describes_processing_case() {
        let view = SelectedCaseView::Processing {
            case_id: "a1b2c3d4".into(),
            pipeline: PipelineView::build(None),
        };
        assert_eq!(describe(&view), "[a1b2c3d4] 0% (-)");
    }

    #[test]
    fn describes_waiting_and_failed() {
        let waiting = SelectedCaseView::Waiting {
            case_id: "c1".into(),
            status: CaseStatus::Queued,
        };
        assert_eq!(describe(&waiting), "[c1] queued");

        let failed = SelectedCaseView::Failed {
            case_id: "c1".into(),
            error: None,
        };
        assert_eq!(describe(&failed), "[c1] failed: unknown error");
    }

    #[test]
    fn describes_completed_case_with_scores() {
        let result: CaseResult = serde_json::from_value(json!({
            "Output_A": {"FIR_Number": "77/2024"},
            "Output_B": {"crime_type": "assault"}
        }))
        .unwrap();
        let mut checklist = CanonicalChecklist::new();
        checklist.insert(
            "MLC Report",
            ChecklistItem {
                status: ChecklistStatus::Present,
                similarity_score: SimilarityScore::Scored(0.912),
                ..Default::default()
            },
        );
        checklist.insert("Weapon Memo", ChecklistItem::default());
        let results = ResultsView::build(&result, &checklist, &[], &EnrichmentState::Idle, ResultsTab::Similarity);

        let text = describe(&SelectedCaseView::Completed {
            case_id: "c9".into(),
            results,
        });
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "[c9] completed: ASSAULT | FIR 77/2024 | checklist 1 / 2 Present");
        assert_eq!(lines[1], "   91.2%  MLC Report");
        assert_eq!(lines.len(), 2);
    }

    #[tokio::test]
    async fn failed_scoring_is_retried_on_next_snapshot() {
        let result: CaseResult = serde_json::from_value(json!({
            "Output_A": {"FIR_Number": "12/2024", "Incident_Facts": "Chain snatching near the bus stand"},
            "Output_B": {"crime_type": "robbery"},
            "Output_C": {"FIR Copy": "✅ PRESENT - FIR 12/2024"}
        }))
        .unwrap();
        let case = Case {
            id: "c7".into(),
            filename: "FIR_12.pdf".into(),
            status: CaseStatus::Completed,
            result: Some(result),
            stages: Vec::new(),
            created_at: None,
            error: None,
        };
        let backend = Arc::new(
            MockCaseBackend::new()
                .with_cases(vec![case])
                .with_similarity(SimilarityReply::Fail(BackendError::Unavailable("embedding model loading".into()))),
        );
        let dashboard = Dashboard::new(Arc::clone(&backend) as Arc<dyn CaseBackend>, Duration::from_millis(3000));
        let mut follower = Follower::default();

        let snapshot = dashboard.registry().refresh().await.unwrap();
        follower.on_snapshot(&dashboard, &snapshot).await;
        assert_eq!(backend.similarity_calls(), 1);
        assert!(!follower.scored);

        backend.set_similarity(SimilarityReply::Uniform(0.64));
        let snapshot = dashboard.registry().refresh().await.unwrap();
        follower.on_snapshot(&dashboard, &snapshot).await;
        assert_eq!(backend.similarity_calls(), 2);
        assert!(follower.scored);
        assert!(follower.last_report.as_deref().unwrap_or_default().contains("64.0%"));

        let snapshot = dashboard.registry().refresh().await.unwrap();
        follower.on_snapshot(&dashboard, &snapshot).await;
        assert_eq!(backend.similarity_calls(), 2);
    }
}
