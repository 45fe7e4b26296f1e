//! On-demand similarity scoring for one case's checklist.
//!
//! Scores are fetched at most once per view session. A request is only sent
//! when there is a narrative to compare against and at least one item to
//! score; a failed request leaves the checklist unscored and may be retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::backend::CaseBackend;
use crate::error::DashboardError;
use crate::models::{CanonicalChecklist, CaseId};

#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentState {
    Idle,
    InFlight,
    Enriched(Arc<CanonicalChecklist>),
}

/// What a call to `SimilarityEnricher::enrich` did.
#[derive(Debug, Clone, PartialEq)]
pub enum EnrichmentOutcome {
    /// Scores fetched by this call.
    Enriched(Arc<CanonicalChecklist>),
    /// Scores were already cached; no request made.
    Cached(Arc<CanonicalChecklist>),
    /// Another call is waiting on the backend; this one did nothing.
    AlreadyInFlight,
    /// No narrative text on the case.
    NoDocumentText,
    EmptyChecklist,
    /// The checklist changed before the request was sent or while it was
    /// out; nothing was cached.
    Superseded,
}

struct EnricherInner {
    generation: u64,
    state: EnrichmentState,
}

pub struct SimilarityEnricher {
    backend: Arc<dyn CaseBackend>,
    case_id: CaseId,
    inner: Mutex<EnricherInner>,
}

impl SimilarityEnricher {
    pub fn new(backend: Arc<dyn CaseBackend>, case_id: impl Into<CaseId>) -> Self {
        Self {
            backend,
            case_id: case_id.into(),
            inner: Mutex::new(EnricherInner {
                generation: 0,
                state: EnrichmentState::Idle,
            }),
        }
    }

    pub fn state(&self) -> EnrichmentState {
        self.lock().state.clone()
    }

    pub fn enriched(&self) -> Option<Arc<CanonicalChecklist>> {
        match &self.lock().state {
            EnrichmentState::Enriched(checklist) => Some(Arc::clone(checklist)),
            _ => None,
        }
    }

    /// Counter bumped by every `invalidate`. Pair it with the checklist it
    /// was read alongside when calling `enrich`.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    /// Forget cached scores. A reply still in flight is discarded on arrival.
    pub fn invalidate(&self) {
        let mut inner = self.lock();
        inner.generation += 1;
        inner.state = EnrichmentState::Idle;
    }

    /// Score `checklist`, which must be the one current at `generation`.
    /// If the enricher has been invalidated since, nothing is sent.
    pub async fn enrich(
        &self,
        generation: u64,
        document_text: Option<&str>,
        checklist: &CanonicalChecklist,
    ) -> Result<EnrichmentOutcome, DashboardError> {
        let text = {
            let mut inner = self.lock();
            if inner.generation != generation {
                tracing::debug!(case_id = %self.case_id, "Checklist changed before similarity request");
                return Ok(EnrichmentOutcome::Superseded);
            }
            match &inner.state {
                EnrichmentState::Enriched(cached) => {
                    return Ok(EnrichmentOutcome::Cached(Arc::clone(cached)));
                }
                EnrichmentState::InFlight => {
                    tracing::debug!(case_id = %self.case_id, "Similarity request already in flight");
                    return Ok(EnrichmentOutcome::AlreadyInFlight);
                }
                EnrichmentState::Idle => {}
            }

            let text = match document_text.map(str::trim) {
                Some(text) if !text.is_empty() => text,
                _ => return Ok(EnrichmentOutcome::NoDocumentText),
            };
            if checklist.is_empty() {
                return Ok(EnrichmentOutcome::EmptyChecklist);
            }

            inner.state = EnrichmentState::InFlight;
            text
        };

        tracing::info!(
            case_id = %self.case_id,
            items = checklist.len(),
            "Requesting similarity scores"
        );
        let reply = self.backend.compute_similarity(text, checklist).await;

        let mut inner = self.lock();
        if inner.generation != generation {
            tracing::debug!(case_id = %self.case_id, "Discarding similarity reply for stale checklist");
            return Ok(EnrichmentOutcome::Superseded);
        }

        match reply {
            Ok(scored) => {
                if scored.len() != checklist.len() || !checklist.keys().all(|k| scored.contains_key(k)) {
                    tracing::warn!(
                        case_id = %self.case_id,
                        sent = checklist.len(),
                        received = scored.len(),
                        "Similarity reply keys differ from request"
                    );
                }
                let scored = Arc::new(scored);
                inner.state = EnrichmentState::Enriched(Arc::clone(&scored));
                tracing::info!(case_id = %self.case_id, "Similarity scores cached");
                Ok(EnrichmentOutcome::Enriched(scored))
            }
            Err(e) => {
                inner.state = EnrichmentState::Idle;
                tracing::warn!(case_id = %self.case_id, error = %e, "Similarity request failed");
                Err(DashboardError::SimilarityUnavailable(e))
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, EnricherInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
