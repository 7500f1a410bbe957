//! Batch-barrier dispatch of probe workers.
//!
//! Targets are cut into consecutive batches of at most `max_concurrency`.
//! Every worker of a batch is spawned at once, then the scheduler blocks on
//! the batch's [`WaitGroup`] until all of them have signalled completion.
//! Only then is the next batch taken from the generator. This is coarser than
//! a sliding-window pool on purpose: batch boundaries are synchronization
//! points and no work streams across them.

use super::traits::Probe;
use crate::types::ScanTarget;
use indicatif::ProgressBar;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, info};

/// Completion counter for one batch of workers.
///
/// Each [`Completion`] handed out holds a sender on an internal channel;
/// [`WaitGroup::wait`] resolves once every one of them has been consumed
/// or dropped.
#[derive(Debug)]
pub struct WaitGroup {
    tx: mpsc::Sender<()>,
    rx: mpsc::Receiver<()>,
}

impl WaitGroup {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel(1);
        Self { tx, rx }
    }

    /// Register one more worker with this group.
    pub fn completion(&self) -> Completion {
        Completion {
            signal: self.tx.clone(),
        }
    }

    /// Wait until every registered worker has signalled completion.
    pub async fn wait(self) {
        let Self { tx, mut rx } = self;
        drop(tx);
        while rx.recv().await.is_some() {}
    }
}

impl Default for WaitGroup {
    fn default() -> Self {
        Self::new()
    }
}

/// A worker's one-shot completion signal.
///
/// Consuming it with [`Completion::done`] signals the batch barrier. A
/// dropped token signals too, so a panicking worker can never wedge its batch.
#[derive(Debug)]
#[must_use = "a worker must signal completion"]
pub struct Completion {
    signal: mpsc::Sender<()>,
}

impl Completion {
    pub fn done(self) {
        drop(self.signal);
    }
}

/// Sizes of the batches a run went through, in order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchStats {
    pub batch_sizes: Vec<usize>,
}

impl BatchStats {
    pub fn batches(&self) -> usize {
        self.batch_sizes.len()
    }

    pub fn total(&self) -> usize {
        self.batch_sizes.iter().sum()
    }
}

/// Launches probe workers under a fixed concurrency cap.
pub struct Scheduler {
    max_concurrency: usize,
    progress: Option<ProgressBar>,
}

impl Scheduler {
    /// Create a scheduler admitting at most `max_concurrency` workers at a time.
    ///
    /// A cap of zero is treated as one.
    pub fn new(max_concurrency: usize) -> Self {
        Self {
            max_concurrency: max_concurrency.max(1),
            progress: None,
        }
    }

    /// Advance `progress` by each batch's size when its barrier releases.
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Drive every target through `probe`, batch by batch.
    ///
    /// Returns once the last batch's barrier has released, so all workers
    /// have published their outcomes by then.
    pub async fn run<I, P>(&self, targets: I, probe: Arc<P>) -> BatchStats
    where
        I: IntoIterator<Item = ScanTarget>,
        P: Probe,
    {
        let mut targets = targets.into_iter();
        let mut stats = BatchStats::default();

        loop {
            let group = WaitGroup::new();
            let mut launched = 0usize;

            for target in targets.by_ref().take(self.max_concurrency) {
                debug!("Scanning {}", target);
                let probe = Arc::clone(&probe);
                let done = group.completion();
                tokio::spawn(async move {
                    probe.probe(target, done).await;
                });
                launched += 1;
            }

            if launched == 0 {
                break;
            }

            let batch = stats.batches() + 1;
            debug!(batch, size = launched, "batch launched, waiting on barrier");
            group.wait().await;
            info!(batch, size = launched, "batch complete");

            stats.batch_sizes.push(launched);
            if let Some(progress) = &self.progress {
                progress.inc(launched as u64);
            }
        }

        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scanner::report::Aggregator;
    use crate::scanner::PortState;
    use crate::types::{Port, Targets};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    /// Probe that records concurrency and barrier observations.
    struct CountingProbe {
        cap: usize,
        active: AtomicUsize,
        peak: AtomicUsize,
        launched: AtomicUsize,
        completed: AtomicUsize,
        barrier_violations: Mutex<Vec<usize>>,
        report: Aggregator,
    }

    impl CountingProbe {
        fn new(cap: usize) -> Self {
            Self {
                cap,
                active: AtomicUsize::new(0),
                peak: AtomicUsize::new(0),
                launched: AtomicUsize::new(0),
                completed: AtomicUsize::new(0),
                barrier_violations: Mutex::new(Vec::new()),
                report: Aggregator::new(),
            }
        }
    }

    #[async_trait]
    impl Probe for CountingProbe {
        async fn probe(&self, target: ScanTarget, done: Completion) {
            let seq = self.launched.fetch_add(1, Ordering::SeqCst);
            let finished_before = self.completed.load(Ordering::SeqCst);
            if finished_before < (seq / self.cap) * self.cap {
                self.barrier_violations.lock().unwrap().push(seq);
            }

            let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis((seq % 4) as u64 * 5)).await;
            self.report
                .merge(&target.host, target.port, PortState::Open, None)
                .unwrap();

            self.active.fetch_sub(1, Ordering::SeqCst);
            self.completed.fetch_add(1, Ordering::SeqCst);
            done.done();
        }
    }

    fn ports(n: u16) -> Vec<Port> {
        (1..=n).map(|p| Port::new(p).unwrap()).collect()
    }

    #[tokio::test]
    async fn test_wait_group_releases_after_all_done() {
        let group = WaitGroup::new();
        let a = group.completion();
        let b = group.completion();

        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            a.done();
        });
        drop(b);

        tokio::time::timeout(Duration::from_secs(2), group.wait())
            .await
            .expect("wait group should release");
    }

    #[tokio::test]
    async fn test_empty_wait_group_releases_immediately() {
        WaitGroup::new().wait().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_two_hosts_24_ports_cap_10() {
        let hosts = vec!["alpha".to_string(), "beta".to_string()];
        let ports = ports(24);
        let probe = Arc::new(CountingProbe::new(10));

        let stats = Scheduler::new(10)
            .run(Targets::new(&hosts, &ports), Arc::clone(&probe))
            .await;

        assert_eq!(stats.batch_sizes, vec![10, 10, 10, 10, 8]);
        assert_eq!(stats.total(), 48);
        assert!(probe.peak.load(Ordering::SeqCst) <= 10);
        assert!(probe.barrier_violations.lock().unwrap().is_empty());

        let report = probe.report.snapshot().unwrap();
        assert_eq!(report.cell_count(), 48);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_cap_never_exceeded() {
        let hosts = vec!["h".to_string()];
        let ports = ports(100);
        let probe = Arc::new(CountingProbe::new(7));

        let stats = Scheduler::new(7)
            .run(Targets::new(&hosts, &ports), Arc::clone(&probe))
            .await;

        assert_eq!(stats.batches(), 15);
        assert_eq!(*stats.batch_sizes.last().unwrap(), 2);
        assert!(probe.peak.load(Ordering::SeqCst) <= 7);
        assert!(probe.barrier_violations.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_targets_no_batches() {
        let hosts: Vec<String> = Vec::new();
        let ports = ports(3);
        let probe = Arc::new(CountingProbe::new(4));

        let stats = Scheduler::new(4)
            .run(Targets::new(&hosts, &ports), probe)
            .await;

        assert_eq!(stats, BatchStats::default());
    }

    struct PanickingProbe;

    #[async_trait]
    impl Probe for PanickingProbe {
        async fn probe(&self, target: ScanTarget, done: Completion) {
            if target.port.as_u16() == 2 {
                panic!("probe blew up");
            }
            done.done();
        }
    }

    #[tokio::test]
    async fn test_panicking_worker_does_not_wedge_batch() {
        let hosts = vec!["h".to_string()];
        let ports = ports(3);

        let stats = tokio::time::timeout(
            Duration::from_secs(2),
            Scheduler::new(3).run(Targets::new(&hosts, &ports), Arc::new(PanickingProbe)),
        )
        .await
        .expect("barrier must release");

        assert_eq!(stats.batch_sizes, vec![3]);
    }

    #[test]
    fn test_zero_cap_is_one() {
        assert_eq!(Scheduler::new(0).max_concurrency(), 1);
    }
}
