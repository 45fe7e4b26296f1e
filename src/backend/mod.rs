//! The processing backend, seen from the dashboard.
//!
//! Everything the reconciliation layer needs from the outside world goes
//! through `CaseBackend`: start processing a document, list cases, fetch one
//! case, and score a checklist against the case narrative.

pub mod http;
pub mod mock;

pub use http::HttpCaseBackend;
pub use mock::{MockCaseBackend, SimilarityReply};

use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::{CanonicalChecklist, Case, CaseCreated};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Backend is not reachable at {0}")]
    Connection(String),

    #[error("Backend returned error (status {status}): {body}")]
    Status { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),

    #[error("Backend unavailable: {0}")]
    Unavailable(String),
}

/// A document ready to be sent to `POST /upload`.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentUpload {
    pub filename: String,
    pub content: Vec<u8>,
}

impl DocumentUpload {
    pub fn new(filename: impl Into<String>, content: Vec<u8>) -> Self {
        Self {
            filename: filename.into(),
            content,
        }
    }

    /// Read a document from disk. The file name (without directories) is
    /// what the backend records on the case.
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let content = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self { filename, content })
    }

    /// The backend only accepts PDFs and checks by extension.
    pub fn is_pdf(&self) -> bool {
        self.filename.to_ascii_lowercase().ends_with(".pdf")
    }
}

#[async_trait]
pub trait CaseBackend: Send + Sync {
    /// Start processing a document. Returns as soon as the backend has
    /// accepted the file.
    async fn upload_document(&self, upload: DocumentUpload) -> Result<CaseCreated, BackendError>;

    /// All cases, oldest first.
    async fn list_cases(&self) -> Result<Vec<Case>, BackendError>;

    async fn get_case(&self, case_id: &str) -> Result<Case, BackendError>;

    /// Score every checklist item against the narrative. The reply carries
    /// the same keys with `similarity_score` filled in.
    async fn compute_similarity(
        &self,
        document_text: &str,
        checklist: &CanonicalChecklist,
    ) -> Result<CanonicalChecklist, BackendError>;
}
