use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;

use super::{BackendError, CaseBackend, DocumentUpload};
use crate::models::{
    CanonicalChecklist, Case, CaseCreated, CaseStatus, PhaseStatus, SimilarityScore, StageRecord,
};

/// How the mock answers `compute_similarity`.
#[derive(Debug, Clone)]
pub enum SimilarityReply {
    /// Echo the checklist back with every item scored the same.
    Uniform(f64),
    /// Reply with this checklist regardless of input.
    Fixed(CanonicalChecklist),
    Fail(BackendError),
}

struct ScriptedPoll {
    delay: Duration,
    reply: Result<Vec<Case>, BackendError>,
}

/// In-memory backend for tests and offline runs.
///
/// `list_cases` serves scripted replies first (each after its own delay),
/// then falls back to the current case list. Uploads behave like the real
/// backend: PDFs only, new case queued with the five backend stages.
pub struct MockCaseBackend {
    cases: Mutex<Vec<Case>>,
    poll_script: Mutex<VecDeque<ScriptedPoll>>,
    similarity: Mutex<SimilarityReply>,
    similarity_delay: Duration,
    upload_calls: AtomicUsize,
    list_calls: AtomicUsize,
    similarity_calls: AtomicUsize,
}

impl Default for MockCaseBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCaseBackend {
    pub fn new() -> Self {
        Self {
            cases: Mutex::new(Vec::new()),
            poll_script: Mutex::new(VecDeque::new()),
            similarity: Mutex::new(SimilarityReply::Uniform(0.5)),
            similarity_delay: Duration::ZERO,
            upload_calls: AtomicUsize::new(0),
            list_calls: AtomicUsize::new(0),
            similarity_calls: AtomicUsize::new(0),
        }
    }

    pub fn with_cases(self, cases: Vec<Case>) -> Self {
        self.set_cases(cases);
        self
    }

    pub fn with_similarity(self, reply: SimilarityReply) -> Self {
        self.set_similarity(reply);
        self
    }

    pub fn with_similarity_delay(mut self, delay: Duration) -> Self {
        self.similarity_delay = delay;
        self
    }

    pub fn set_cases(&self, cases: Vec<Case>) {
        *lock(&self.cases) = cases;
    }

    pub fn set_similarity(&self, reply: SimilarityReply) {
        *lock(&self.similarity) = reply;
    }

    /// Apply `f` to the case with `case_id`. Returns false if there is none.
    pub fn update_case(&self, case_id: &str, f: impl FnOnce(&mut Case)) -> bool {
        let mut cases = lock(&self.cases);
        match cases.iter_mut().find(|c| c.id == case_id) {
            Some(case) => {
                f(case);
                true
            }
            None => false,
        }
    }

    /// Queue a reply for a future `list_cases` call.
    pub fn script_poll(&self, delay: Duration, reply: Result<Vec<Case>, BackendError>) {
        lock(&self.poll_script).push_back(ScriptedPoll { delay, reply });
    }

    pub fn cases(&self) -> Vec<Case> {
        lock(&self.cases).clone()
    }

    pub fn upload_calls(&self) -> usize {
        self.upload_calls.load(Ordering::SeqCst)
    }

    pub fn list_calls(&self) -> usize {
        self.list_calls.load(Ordering::SeqCst)
    }

    pub fn similarity_calls(&self) -> usize {
        self.similarity_calls.load(Ordering::SeqCst)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

fn initial_stages() -> Vec<StageRecord> {
    let stage = |name: &str, status, message: &str| StageRecord {
        name: name.to_string(),
        status,
        message: Some(message.to_string()),
    };
    vec![
        stage("upload", PhaseStatus::Completed, "File uploaded"),
        stage("extract", PhaseStatus::Pending, "Waiting..."),
        stage("translate", PhaseStatus::Pending, "Waiting..."),
        stage("analyze", PhaseStatus::Pending, "Waiting..."),
        stage("format", PhaseStatus::Pending, "Waiting..."),
    ]
}

#[async_trait]
impl CaseBackend for MockCaseBackend {
    async fn upload_document(&self, upload: DocumentUpload) -> Result<CaseCreated, BackendError> {
        self.upload_calls.fetch_add(1, Ordering::SeqCst);
        if !upload.is_pdf() {
            return Err(BackendError::Status {
                status: 400,
                body: "Only PDF files allowed".to_string(),
            });
        }

        let case_id: String = uuid::Uuid::new_v4().simple().to_string().chars().take(8).collect();
        lock(&self.cases).push(Case {
            id: case_id.clone(),
            filename: upload.filename,
            status: CaseStatus::Queued,
            result: None,
            stages: initial_stages(),
            created_at: Some(chrono::Utc::now().to_rfc3339()),
            error: None,
        });

        Ok(CaseCreated {
            case_id,
            status: CaseStatus::Processing,
        })
    }

    async fn list_cases(&self) -> Result<Vec<Case>, BackendError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        let scripted = lock(&self.poll_script).pop_front();
        match scripted {
            Some(poll) => {
                if !poll.delay.is_zero() {
                    tokio::time::sleep(poll.delay).await;
                }
                poll.reply
            }
            None => Ok(self.cases()),
        }
    }

    async fn get_case(&self, case_id: &str) -> Result<Case, BackendError> {
        lock(&self.cases)
            .iter()
            .find(|c| c.id == case_id)
            .cloned()
            .ok_or_else(|| BackendError::Status {
                status: 404,
                body: "Case not found".to_string(),
            })
    }

    async fn compute_similarity(
        &self,
        _document_text: &str,
        checklist: &CanonicalChecklist,
    ) -> Result<CanonicalChecklist, BackendError> {
        self.similarity_calls.fetch_add(1, Ordering::SeqCst);
        if !self.similarity_delay.is_zero() {
            tokio::time::sleep(self.similarity_delay).await;
        }

        let reply = lock(&self.similarity).clone();
        match reply {
            SimilarityReply::Uniform(score) => Ok(checklist
                .iter()
                .map(|(key, item)| {
                    let mut item = item.clone();
                    item.similarity_score = SimilarityScore::Scored(score);
                    (key.to_string(), item)
                })
                .collect()),
            SimilarityReply::Fixed(fixed) => Ok(fixed),
            SimilarityReply::Fail(err) => Err(err),
        }
    }
}
