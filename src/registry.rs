//! Case registry: the latest known list of cases, kept fresh by polling.
//!
//! Every refresh is stamped with a sequence number when it is sent. A reply
//! is applied only if its number is higher than the snapshot on hand, so a
//! slow response can never overwrite a newer one. Failed polls leave the
//! snapshot untouched.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::backend::{BackendError, CaseBackend};
use crate::error::DashboardError;
use crate::models::Case;

/// One applied case list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaseSnapshot {
    /// Sequence number of the refresh that produced this list. 0 before the
    /// first successful poll.
    pub seq: u64,
    pub cases: Vec<Case>,
    pub fetched_at: Option<DateTime<Utc>>,
}

impl CaseSnapshot {
    pub fn find(&self, case_id: &str) -> Option<&Case> {
        self.cases.iter().find(|c| c.id == case_id)
    }

    /// Newest case by `created_at`, falling back to list order.
    pub fn newest(&self) -> Option<&Case> {
        self.cases
            .iter()
            .enumerate()
            .max_by(|(ia, a), (ib, b)| a.created_at.cmp(&b.created_at).then(ia.cmp(ib)))
            .map(|(_, case)| case)
    }
}

struct RegistryShared {
    backend: Arc<dyn CaseBackend>,
    next_seq: AtomicU64,
    snapshot_tx: watch::Sender<Arc<CaseSnapshot>>,
}

pub struct CaseRegistry {
    shared: Arc<RegistryShared>,
    poll_interval: Duration,
    shutdown_tx: Mutex<Option<oneshot::Sender<()>>>,
}

impl CaseRegistry {
    pub fn new(backend: Arc<dyn CaseBackend>, poll_interval: Duration) -> Self {
        let (snapshot_tx, _) = watch::channel(Arc::new(CaseSnapshot::default()));
        Self {
            shared: Arc::new(RegistryShared {
                backend,
                next_seq: AtomicU64::new(0),
                snapshot_tx,
            }),
            poll_interval,
            shutdown_tx: Mutex::new(None),
        }
    }

    pub fn snapshot(&self) -> Arc<CaseSnapshot> {
        self.shared.snapshot_tx.borrow().clone()
    }

    /// Receiver notified each time a newer snapshot is applied.
    pub fn subscribe(&self) -> watch::Receiver<Arc<CaseSnapshot>> {
        self.shared.snapshot_tx.subscribe()
    }

    pub fn find(&self, case_id: &str) -> Option<Case> {
        self.shared.snapshot_tx.borrow().find(case_id).cloned()
    }

    /// Poll once now. Returns the snapshot current after the reply was
    /// handled, which may be newer than the reply itself.
    pub async fn refresh(&self) -> Result<Arc<CaseSnapshot>, DashboardError> {
        self.shared.refresh().await
    }

    /// Fetch a single case directly, bypassing the snapshot.
    pub async fn fetch_case(&self, case_id: &str) -> Result<Case, DashboardError> {
        match self.shared.backend.get_case(case_id).await {
            Ok(case) => Ok(case),
            Err(BackendError::Status { status: 404, .. }) => Err(DashboardError::CaseNotFound(case_id.to_string())),
            Err(e) => Err(DashboardError::PollFailed(e)),
        }
    }

    /// Start periodic polling. The first poll is sent immediately. Calling
    /// this while already polling does nothing.
    pub fn start(&self) {
        let mut running = self.lock_shutdown();
        if running.is_some() {
            tracing::debug!("Case polling already running");
            return;
        }

        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let shared = Arc::clone(&self.shared);
        let period = self.poll_interval;
        tokio::spawn(poll_loop(shared, period, shutdown_rx));

        tracing::info!(interval_ms = period.as_millis() as u64, "Case polling started");
        *running = Some(shutdown_tx);
    }

    /// Stop polling. No new requests are sent; one already sent still
    /// completes and is applied unless a newer snapshot beat it. Idempotent.
    pub fn stop(&self) {
        if let Some(tx) = self.lock_shutdown().take() {
            let _ = tx.send(());
            tracing::info!("Case polling stopped");
        }
    }

    pub fn is_polling(&self) -> bool {
        self.lock_shutdown().is_some()
    }

    fn lock_shutdown(&self) -> MutexGuard<'_, Option<oneshot::Sender<()>>> {
        self.shutdown_tx.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for CaseRegistry {
    fn drop(&mut self) {
        self.stop();
    }
}

impl RegistryShared {
    async fn refresh(&self) -> Result<Arc<CaseSnapshot>, DashboardError> {
        let seq = self.next_seq.fetch_add(1, Ordering::SeqCst) + 1;

        let cases = match self.backend.list_cases().await {
            Ok(cases) => cases,
            Err(e) => {
                tracing::warn!(seq, error = %e, "Case poll failed, keeping last snapshot");
                return Err(DashboardError::PollFailed(e));
            }
        };

        let fresh = Arc::new(CaseSnapshot {
            seq,
            cases,
            fetched_at: Some(Utc::now()),
        });
        let applied = self.snapshot_tx.send_if_modified(|current| {
            if seq > current.seq {
                *current = Arc::clone(&fresh);
                true
            } else {
                false
            }
        });

        if applied {
            tracing::debug!(seq, cases = fresh.cases.len(), "Case snapshot updated");
        } else {
            tracing::debug!(seq, "Dropping stale case list reply");
        }

        Ok(self.snapshot_tx.borrow().clone())
    }
}

async fn poll_loop(shared: Arc<RegistryShared>, period: Duration, mut shutdown_rx: oneshot::Receiver<()>) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut in_flight = JoinSet::new();

    loop {
        tokio::select! {
            _ = &mut shutdown_rx => break,
            _ = ticker.tick() => {
                // Requests overlap when the backend is slower than the
                // period; sequence numbers sort it out.
                let shared = Arc::clone(&shared);
                in_flight.spawn(async move {
                    let _ = shared.refresh().await;
                });
            }
            Some(_) = in_flight.join_next(), if !in_flight.is_empty() => {}
        }
    }

    while in_flight.join_next().await.is_some() {}
    tracing::debug!("Case poll loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockCaseBackend;
    use crate::models::CaseStatus;

    fn case(id: &str, status: CaseStatus) -> Case {
        Case {
            id: id.into(),
            filename: format!("{id}.pdf"),
            status,
            result: None,
            stages: Vec::new(),
            created_at: None,
            error: None,
        }
    }

    fn registry(backend: &Arc<MockCaseBackend>) -> CaseRegistry {
        CaseRegistry::new(Arc::clone(backend) as Arc<dyn CaseBackend>, Duration::from_millis(3000))
    }

    #[tokio::test]
    async fn refresh_applies_case_list() {
        let backend = Arc::new(MockCaseBackend::new().with_cases(vec![case("c1", CaseStatus::Processing)]));
        let registry = registry(&backend);
        assert_eq!(registry.snapshot().seq, 0);

        let snapshot = registry.refresh().await.unwrap();
        assert_eq!(snapshot.seq, 1);
        assert_eq!(snapshot.cases.len(), 1);
        assert!(snapshot.fetched_at.is_some());
        assert_eq!(registry.find("c1").unwrap().status, CaseStatus::Processing);
        assert!(registry.find("c2").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn late_reply_never_overwrites_newer_snapshot() {
        let backend = Arc::new(MockCaseBackend::new());
        backend.script_poll(Duration::from_millis(300), Ok(vec![case("c1", CaseStatus::Processing)]));
        backend.script_poll(Duration::from_millis(10), Ok(vec![case("c1", CaseStatus::Completed)]));
        let registry = registry(&backend);

        let (first, second) = tokio::join!(registry.refresh(), registry.refresh());

        // Reply 2 landed first; reply 1 arrived later and was ignored.
        assert_eq!(second.unwrap().seq, 2);
        assert_eq!(first.unwrap().seq, 2);
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.seq, 2);
        assert_eq!(snapshot.cases[0].status, CaseStatus::Completed);
    }

    #[tokio::test]
    async fn failed_poll_keeps_snapshot() {
        let backend = Arc::new(MockCaseBackend::new().with_cases(vec![case("c1", CaseStatus::Queued)]));
        let registry = registry(&backend);
        registry.refresh().await.unwrap();

        backend.script_poll(Duration::ZERO, Err(BackendError::Connection("http://localhost:8000".into())));
        let err = registry.refresh().await.unwrap_err();
        assert!(matches!(err, DashboardError::PollFailed(_)));

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.seq, 1);
        assert_eq!(snapshot.cases.len(), 1);
    }

    #[tokio::test]
    async fn subscribers_see_new_snapshots() {
        let backend = Arc::new(MockCaseBackend::new().with_cases(vec![case("c1", CaseStatus::Queued)]));
        let registry = registry(&backend);
        let mut rx = registry.subscribe();

        registry.refresh().await.unwrap();
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().cases[0].id, "c1");
    }

    #[tokio::test(start_paused = true)]
    async fn polls_immediately_then_every_period_until_stopped() {
        let backend = Arc::new(MockCaseBackend::new());
        let registry = registry(&backend);

        registry.start();
        registry.start();
        assert!(registry.is_polling());

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.list_calls(), 1);

        tokio::time::sleep(Duration::from_millis(3000)).await;
        assert_eq!(backend.list_calls(), 2);

        registry.stop();
        registry.stop();
        assert!(!registry.is_polling());

        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(backend.list_calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn stop_lets_outstanding_poll_finish() {
        let backend = Arc::new(MockCaseBackend::new());
        backend.script_poll(Duration::from_millis(1000), Ok(vec![case("c1", CaseStatus::Processing)]));
        let registry = registry(&backend);

        registry.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        registry.stop();
        assert_eq!(registry.snapshot().seq, 0);

        tokio::time::sleep(Duration::from_millis(2000)).await;
        let snapshot = registry.snapshot();
        assert_eq!(snapshot.seq, 1);
        assert_eq!(snapshot.cases[0].id, "c1");
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_registry_stops_polling() {
        let backend = Arc::new(MockCaseBackend::new());
        let registry = registry(&backend);

        registry.start();
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(backend.list_calls(), 1);

        drop(registry);
        tokio::time::sleep(Duration::from_millis(10_000)).await;
        assert_eq!(backend.list_calls(), 1);
    }

    #[tokio::test]
    async fn fetch_case_maps_missing_to_not_found() {
        let backend = Arc::new(MockCaseBackend::new().with_cases(vec![case("c1", CaseStatus::Queued)]));
        let registry = registry(&backend);

        assert_eq!(registry.fetch_case("c1").await.unwrap().id, "c1");
        assert!(matches!(
            registry.fetch_case("zz").await.unwrap_err(),
            DashboardError::CaseNotFound(id) if id == "zz"
        ));
    }

    #[test]
    fn newest_prefers_latest_created_at() {
        let mut older = case("old", CaseStatus::Completed);
        older.created_at = Some("2024-03-01T09:00:00".into());
        let mut newer = case("new", CaseStatus::Processing);
        newer.created_at = Some("2024-03-01T10:00:00".into());
        let snapshot = CaseSnapshot {
            seq: 1,
            cases: vec![newer, older],
            fetched_at: None,
        };
        assert_eq!(snapshot.newest().unwrap().id, "new");
        assert!(CaseSnapshot::default().newest().is_none());
    }
}
