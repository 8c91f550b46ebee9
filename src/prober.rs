use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, OwnedSemaphorePermit, Semaphore};

use crate::classify::{Classification, Classifier};
use crate::config::ProbeConfig;
use crate::report::{MatchResult, ProbeEvent, Report, SkipReason};
use crate::transport::Transport;

/// Fixed-capacity admission gate. The slot is returned when the permit drops.
#[derive(Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl PermitPool {
    pub fn new(capacity: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Waits until a slot is free. The semaphore is never closed.
    pub async fn acquire(&self) -> OwnedSemaphorePermit {
        self.semaphore.clone().acquire_owned().await.expect("permit pool closed")
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// Fans one request per target out over the transport and folds the results
/// into a [`Report`]. A worker is only spawned once it holds a permit, so the
/// number of live workers follows the pool size rather than the range.
pub struct Prober {
    config: Arc<ProbeConfig>,
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn Classifier>,
    pool: PermitPool,
    launched: AtomicUsize,
    completed: Arc<AtomicUsize>,
}

impl Prober {
    pub fn new(config: ProbeConfig, transport: Arc<dyn Transport>, classifier: Arc<dyn Classifier>) -> Self {
        let pool = PermitPool::new(config.concurrency_limit.max(1));
        Self {
            config: Arc::new(config),
            transport,
            classifier,
            pool,
            launched: AtomicUsize::new(0),
            completed: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of workers spawned so far.
    pub fn launched(&self) -> usize {
        self.launched.load(Ordering::Relaxed)
    }

    /// Number of workers that have finished so far.
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    pub async fn run(&self) -> Report {
        self.run_with(|_| {}).await
    }

    /// Probe every target. `observe` sees each event in completion order,
    /// before it is folded into the report.
    pub async fn run_with<F>(&self, mut observe: F) -> Report
    where
        F: FnMut(&ProbeEvent),
    {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProbeEvent>();
        let mut workers = FuturesUnordered::new();
        let mut targets = self.config.targets().peekable();
        let mut report = Report::default();

        tracing::debug!(
            start = self.config.range_start,
            end = self.config.range_end,
            concurrency = self.pool.capacity(),
            "running"
        );

        // Launch as permits free up and drain events in the same loop, so the
        // number of live workers tracks the pool, not the range.
        loop {
            let more = targets.peek().is_some();
            if !more && workers.is_empty() {
                break;
            }
            tokio::select! {
                biased;

                Some(event) = rx.recv() => {
                    tracing::trace!(probe = event.target(), "collected");
                    observe(&event);
                    report.record(event);
                }
                Some((target, joined)) = workers.next(), if !workers.is_empty() => {
                    if let Err(e) = joined {
                        let event = ProbeEvent::Failed { target, error: format!("worker aborted: {}", e) };
                        observe(&event);
                        report.record(event);
                    }
                }
                permit = self.pool.acquire(), if more => {
                    let Some(target) = targets.next() else { continue };
                    let worker = Worker {
                        target,
                        url: self.config.url_for(target),
                        expected_status: self.config.expected_status,
                        transport: self.transport.clone(),
                        classifier: self.classifier.clone(),
                    };
                    let tx = tx.clone();
                    let completed = self.completed.clone();
                    let handle = tokio::spawn(async move {
                        let event = worker.run(permit).await;
                        completed.fetch_add(1, Ordering::Relaxed);
                        // receiver outlives every worker
                        let _ = tx.send(event);
                    });
                    self.launched.fetch_add(1, Ordering::Relaxed);
                    workers.push(async move { (target, handle.await) });
                }
            }
        }

        tracing::debug!("draining");
        // Every worker has joined, so the only sender left is ours.
        drop(tx);
        while let Some(event) = rx.recv().await {
            observe(&event);
            report.record(event);
        }

        tracing::debug!(matched = report.matches.len(), "done");
        report
    }
}

struct Worker {
    target: u64,
    url: String,
    expected_status: u16,
    transport: Arc<dyn Transport>,
    classifier: Arc<dyn Classifier>,
}

impl Worker {
    async fn run(self, permit: OwnedSemaphorePermit) -> ProbeEvent {
        let target = self.target;
        let outcome = self.transport.fetch(&self.url).await;
        drop(permit);

        let outcome = match outcome {
            Ok(o) => o,
            Err(e) => {
                tracing::warn!(probe = target, url = %self.url, error = %e, "request failed");
                return ProbeEvent::Failed { target, error: e.to_string() };
            }
        };

        if outcome.status != self.expected_status {
            tracing::debug!(probe = target, status = %outcome.status_line, "unexpected status");
            return ProbeEvent::Skipped { target, reason: SkipReason::Status(outcome.status) };
        }

        match self.classifier.classify(&outcome.body) {
            Classification::Match { label } => ProbeEvent::Found(MatchResult { number: target, label }),
            Classification::Ambiguous { count } => ProbeEvent::Ambiguous { target, count },
            Classification::Skip { count } => {
                tracing::debug!(probe = target, count, "pattern count below threshold");
                ProbeEvent::Skipped { target, reason: SkipReason::NoMatch(count) }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn permit_released_on_drop() {
        let pool = PermitPool::new(2);
        let a = pool.acquire().await;
        let _b = pool.acquire().await;
        assert_eq!(pool.available(), 0);
        drop(a);
        assert_eq!(pool.available(), 1);
    }

    #[tokio::test]
    async fn acquire_waits_for_a_free_slot() {
        let pool = PermitPool::new(1);
        let held = pool.acquire().await;
        let waiter = {
            let pool = pool.clone();
            tokio::spawn(async move {
                let _p = pool.acquire().await;
            })
        };
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());
        drop(held);
        waiter.await.unwrap();
        assert_eq!(pool.available(), 1);
    }

    struct Hang;

    #[async_trait::async_trait]
    impl Transport for Hang {
        async fn fetch(&self, _url: &str) -> Result<crate::transport::RequestOutcome, crate::error::TransportError> {
            std::future::pending().await
        }
    }

    #[tokio::test]
    async fn workers_are_spawned_only_with_a_permit() {
        let cfg = ProbeConfig {
            range_start: 1,
            range_end: 100_000,
            concurrency_limit: 2,
            url_template: "http://site.test/?l={i}".to_string(),
            ..Default::default()
        };
        let classifier = Arc::new(crate::classify::PatternCountClassifier::from_config(&cfg));
        let prober = Prober::new(cfg, Arc::new(Hang), classifier);

        let run = tokio::time::timeout(std::time::Duration::from_millis(100), prober.run()).await;
        assert!(run.is_err());
        assert_eq!(prober.launched(), 2);
        assert_eq!(prober.completed(), 0);
    }
}
