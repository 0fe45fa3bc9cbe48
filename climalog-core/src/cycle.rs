//! Collection loop
//!
//! One cycle fetches every location, normalizes the samples, and hands the
//! records to the sink one at a time. Failures are counted per record and
//! never end the loop; only a [`ShutdownSignal`] does.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;

use crate::delivery::RecordSink;
use crate::fetch::Fetcher;
use crate::normalize::normalize;
use crate::types::{CanonicalRecord, CycleReport, DeliveryOutcome, Location};

/// Granularity of the inter-cycle sleep when watching for shutdown
const SHUTDOWN_TICK: Duration = Duration::from_millis(250);

/// Cooperative stop flag shared with the signal handler
#[derive(Debug, Clone, Default)]
pub struct ShutdownSignal(Arc<AtomicBool>);

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

pub struct CollectionLoop<F, S> {
    fetcher: F,
    sink: S,
    locations: Vec<Location>,
    interval: Duration,
    fetch_spacing: Duration,
    send_spacing: Duration,
    shutdown: ShutdownSignal,
}

impl<F: Fetcher, S: RecordSink> CollectionLoop<F, S> {
    pub fn new(
        fetcher: F,
        sink: S,
        locations: Vec<Location>,
        interval: Duration,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            fetcher,
            sink,
            locations,
            interval,
            fetch_spacing: Duration::ZERO,
            send_spacing: Duration::ZERO,
            shutdown,
        }
    }

    /// Pause `fetch` between upstream requests and `send` between deliveries.
    pub fn with_spacing(mut self, fetch: Duration, send: Duration) -> Self {
        self.fetch_spacing = fetch;
        self.send_spacing = send;
        self
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run a single cycle: collect, normalize, deliver.
    pub async fn run_cycle(&mut self) -> CycleReport {
        let mut report = CycleReport::default();

        let records = match self.collect(&mut report).await {
            Some(records) => records,
            None => {
                report.interrupted = true;
                return report;
            }
        };

        tracing::info!(records = records.len(), "Sending batch");

        for (i, record) in records.iter().enumerate() {
            if self.shutdown.is_triggered() {
                report.interrupted = true;
                break;
            }
            if i > 0 && !self.send_spacing.is_zero() {
                tokio::time::sleep(self.send_spacing).await;
            }

            let success = self.sink.deliver(record).await;
            if !success {
                tracing::warn!(city = %record.city, "Failed to deliver record");
            }
            report.outcomes.push(DeliveryOutcome {
                city: record.city.clone(),
                success,
            });
        }

        tracing::info!(
            delivered = report.success_count(),
            attempted = report.attempted(),
            fetch_failures = report.fetch_failures,
            "Delivered {}/{} records",
            report.success_count(),
            report.attempted()
        );
        report
    }

    /// Fetch and normalize every location. `None` when shutdown interrupted collection.
    async fn collect(&mut self, report: &mut CycleReport) -> Option<Vec<CanonicalRecord>> {
        let mut records = Vec::with_capacity(self.locations.len());

        for (i, location) in self.locations.iter().enumerate() {
            if self.shutdown.is_triggered() {
                return None;
            }
            if i > 0 && !self.fetch_spacing.is_zero() {
                tokio::time::sleep(self.fetch_spacing).await;
            }

            match self.fetcher.fetch(location).await {
                Ok(raw) => records.push(normalize(&raw)),
                Err(e) => {
                    tracing::error!(city = %location.city, error = %e, "Failed to collect data");
                    report.fetch_failures += 1;
                }
            }
        }

        Some(records)
    }

    /// Run one cycle, then release the sink.
    pub async fn run_once(&mut self) -> CycleReport {
        let report = self.run_cycle().await;
        self.sink.shutdown().await;
        report
    }

    /// Run cycles until shutdown is requested, then release the sink.
    ///
    /// A cycle that panics is logged and counted as failed; the loop still
    /// sleeps the interval and tries again.
    pub async fn run(&mut self) {
        tracing::info!(
            locations = self.locations.len(),
            interval_secs = self.interval.as_secs(),
            "Starting collection loop"
        );

        let mut failed_cycles = 0u64;
        while !self.shutdown.is_triggered() {
            match AssertUnwindSafe(self.run_cycle()).catch_unwind().await {
                Ok(report) if report.interrupted => break,
                Ok(_) => {}
                Err(panic) => {
                    failed_cycles += 1;
                    tracing::error!(
                        panic = %panic_message(panic.as_ref()),
                        failed_cycles,
                        "Collection cycle failed unexpectedly"
                    );
                }
            }

            tracing::info!(secs = self.interval.as_secs(), "Waiting for next cycle");
            self.sleep_until_next_cycle().await;
        }

        tracing::info!(failed_cycles, "Shutdown requested, stopping collection loop");
        self.sink.shutdown().await;
    }

    async fn sleep_until_next_cycle(&self) {
        let mut remaining = self.interval;
        while !remaining.is_zero() && !self.shutdown.is_triggered() {
            let step = remaining.min(SHUTDOWN_TICK);
            tokio::time::sleep(step).await;
            remaining -= step;
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, Result};
    use crate::types::RawSample;
    use async_trait::async_trait;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;

    struct FakeFetcher {
        failing: Vec<&'static str>,
    }

    #[async_trait]
    impl Fetcher for FakeFetcher {
        async fn fetch(&self, location: &Location) -> Result<RawSample> {
            if self.failing.contains(&location.city.as_str()) {
                return Err(Error::Fetch("upstream down".to_string()));
            }
            Ok(RawSample {
                timestamp: Some("2025-01-24T10:00:00.000000Z".to_string()),
                temperature: Some(json!(21.0)),
                humidity: Some(json!("n/a")),
                city: location.city.clone(),
            })
        }
    }

    /// Panics on its first call, then behaves.
    #[derive(Default)]
    struct PanicOnceFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for PanicOnceFetcher {
        async fn fetch(&self, location: &Location) -> Result<RawSample> {
            if self.calls.fetch_add(1, Ordering::SeqCst) == 0 {
                panic!("weather source exploded");
            }
            Ok(RawSample {
                city: location.city.clone(),
                ..Default::default()
            })
        }
    }

    #[derive(Default)]
    struct FakeSink {
        delivered: Vec<CanonicalRecord>,
        fail_city: Option<String>,
        stop_after: Option<(usize, ShutdownSignal)>,
        shutdowns: usize,
    }

    #[async_trait]
    impl RecordSink for FakeSink {
        async fn deliver(&mut self, record: &CanonicalRecord) -> bool {
            self.delivered.push(record.clone());
            if let Some((n, signal)) = &self.stop_after {
                if self.delivered.len() >= *n {
                    signal.trigger();
                }
            }
            self.fail_city.as_deref() != Some(record.city.as_str())
        }

        async fn shutdown(&mut self) {
            self.shutdowns += 1;
        }
    }

    fn locations(n: usize) -> Vec<Location> {
        (0..n)
            .map(|i| Location::new(format!("City {}", i), -10.0, -50.0))
            .collect()
    }

    fn collection(
        fetcher: FakeFetcher,
        sink: FakeSink,
        n: usize,
        shutdown: ShutdownSignal,
    ) -> CollectionLoop<FakeFetcher, FakeSink> {
        CollectionLoop::new(fetcher, sink, locations(n), Duration::from_secs(60), shutdown)
    }

    #[tokio::test]
    async fn test_failed_record_does_not_stop_batch() {
        crate::logging::init_test();
        let sink = FakeSink {
            fail_city: Some("City 3".to_string()),
            ..Default::default()
        };
        let mut cycle = collection(FakeFetcher { failing: vec![] }, sink, 8, ShutdownSignal::new());

        let report = cycle.run_cycle().await;
        assert_eq!(report.attempted(), 8);
        assert_eq!(report.success_count(), 7);
        assert_eq!(report.failed_cities().collect::<Vec<_>>(), vec!["City 3"]);
        assert!(!report.interrupted);
    }

    #[tokio::test]
    async fn test_records_are_normalized_in_order() {
        let mut cycle = collection(
            FakeFetcher { failing: vec![] },
            FakeSink::default(),
            3,
            ShutdownSignal::new(),
        );

        cycle.run_cycle().await;
        let delivered = &cycle.sink().delivered;
        let cities: Vec<_> = delivered.iter().map(|r| r.city.as_str()).collect();
        assert_eq!(cities, vec!["City 0", "City 1", "City 2"]);
        assert_eq!(delivered[0].temperature, 21.0);
        assert_eq!(delivered[0].humidity, 0.0);
        assert_eq!(
            delivered[0].timestamp.as_deref(),
            Some("2025-01-24T10:00:00.000000Z")
        );
    }

    #[tokio::test]
    async fn test_fetch_failure_skips_location() {
        let mut cycle = collection(
            FakeFetcher {
                failing: vec!["City 1"],
            },
            FakeSink::default(),
            4,
            ShutdownSignal::new(),
        );

        let report = cycle.run_cycle().await;
        assert_eq!(report.fetch_failures, 1);
        assert_eq!(report.attempted(), 3);
        assert_eq!(report.success_count(), 3);
    }

    #[tokio::test]
    async fn test_shutdown_between_deliveries() {
        let shutdown = ShutdownSignal::new();
        let sink = FakeSink {
            stop_after: Some((2, shutdown.clone())),
            ..Default::default()
        };
        let mut cycle = collection(FakeFetcher { failing: vec![] }, sink, 5, shutdown);

        let report = cycle.run_cycle().await;
        assert!(report.interrupted);
        assert_eq!(report.attempted(), 2);
    }

    #[tokio::test]
    async fn test_shutdown_before_collection() {
        let shutdown = ShutdownSignal::new();
        shutdown.trigger();
        let mut cycle = collection(FakeFetcher { failing: vec![] }, FakeSink::default(), 5, shutdown);

        let report = cycle.run_cycle().await;
        assert!(report.interrupted);
        assert_eq!(report.attempted(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_repeats_until_shutdown() {
        let shutdown = ShutdownSignal::new();
        // two locations per cycle, stop during the third cycle
        let sink = FakeSink {
            stop_after: Some((5, shutdown.clone())),
            ..Default::default()
        };
        let mut cycle = collection(FakeFetcher { failing: vec![] }, sink, 2, shutdown);

        let start = tokio::time::Instant::now();
        cycle.run().await;

        assert_eq!(cycle.sink().delivered.len(), 5);
        assert_eq!(cycle.sink().shutdowns, 1);
        assert!(start.elapsed() >= Duration::from_secs(120));
        assert!(start.elapsed() < Duration::from_secs(180));
    }

    #[tokio::test(start_paused = true)]
    async fn test_send_spacing_only_between_records() {
        let mut cycle = collection(
            FakeFetcher { failing: vec![] },
            FakeSink::default(),
            3,
            ShutdownSignal::new(),
        )
        .with_spacing(Duration::ZERO, Duration::from_millis(500));

        let start = tokio::time::Instant::now();
        cycle.run_cycle().await;
        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1500));
    }

    #[tokio::test]
    async fn test_run_once_releases_sink() {
        let mut cycle = collection(
            FakeFetcher { failing: vec![] },
            FakeSink::default(),
            2,
            ShutdownSignal::new(),
        );

        let report = cycle.run_once().await;
        assert_eq!(report.success_count(), 2);
        assert_eq!(cycle.sink().shutdowns, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_cycle_does_not_end_loop() {
        let shutdown = ShutdownSignal::new();
        let sink = FakeSink {
            stop_after: Some((1, shutdown.clone())),
            ..Default::default()
        };
        let mut cycle = CollectionLoop::new(
            PanicOnceFetcher::default(),
            sink,
            locations(1),
            Duration::from_secs(60),
            shutdown,
        );

        let start = tokio::time::Instant::now();
        cycle.run().await;

        assert_eq!(cycle.sink().delivered.len(), 1);
        assert_eq!(cycle.sink().shutdowns, 1);
        // the failed cycle still waits out the interval
        assert!(start.elapsed() >= Duration::from_secs(60));
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
        let payload: Box<dyn Any + Send> = Box::new(7u8);
        assert_eq!(panic_message(payload.as_ref()), "unknown panic");
    }
}
