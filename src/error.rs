use thiserror::Error;

use crate::backend::BackendError;
use crate::checklist::ChecklistIssue;
use crate::models::CaseId;

/// Failures surfaced by the dashboard layer.
///
/// None of these end the session: a failed poll keeps the last snapshot, a
/// failed similarity request leaves the checklist unscored.
#[derive(Error, Debug)]
pub enum DashboardError {
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] BackendError),

    #[error("Case poll failed: {0}")]
    PollFailed(#[source] BackendError),

    #[error("Similarity scores unavailable: {0}")]
    SimilarityUnavailable(#[source] BackendError),

    #[error(transparent)]
    MalformedChecklistEntry(#[from] ChecklistIssue),

    #[error("Only PDF documents can be uploaded: {0}")]
    UnsupportedFile(String),

    #[error("Case not found: {0}")]
    CaseNotFound(CaseId),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
