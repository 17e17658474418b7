//! Runs every collector on its own fixed-interval loop
//!
//! Cancellation is only observed between cycles: a running `collect_once`
//! always finishes its window before the loop checks the token.

use crate::collector::Collector;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Drive one collector until `token` is cancelled
pub async fn run_collector(collector: Arc<Collector>, token: CancellationToken) {
    let interval = collector.spec().interval();
    info!(collector = %collector.name(), interval_secs = interval.as_secs(), "Collector loop started");

    while !token.is_cancelled() {
        if let Err(e) = collector.collect_once().await {
            error!(collector = %collector.name(), error = %e, "Error collecting logs");
        }

        tokio::select! {
            _ = token.cancelled() => break,
            _ = tokio::time::sleep(interval) => {}
        }
    }

    info!(collector = %collector.name(), "Collector loop stopped");
}

/// Run all collectors concurrently; returns once every loop has exited
pub async fn run_all(collectors: Vec<Arc<Collector>>, token: CancellationToken) {
    let mut tasks = JoinSet::new();
    for collector in collectors {
        tasks.spawn(run_collector(collector, token.child_token()));
    }
    debug!(count = tasks.len(), "Started collector loops");

    while let Some(joined) = tasks.join_next().await {
        if let Err(e) = joined {
            error!(error = %e, "Collector task ended abnormally");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::config::CollectorSpec;
    use crate::source::{LogQuery, LogSource, SourceError, StaticSource};
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    fn spec(dir: &Path, name: &str, interval: u64) -> CollectorSpec {
        CollectorSpec {
            name: name.to_string(),
            predicate: "process == 'test'".to_string(),
            output_file: dir.join(format!("{name}.log")),
            position_file: dir.join(format!("{name}.pos")),
            interval,
            with_info_level: false,
        }
    }

    struct FailingSource {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl LogSource for FailingSource {
        async fn collect(&self, _query: &LogQuery) -> Result<Bytes, SourceError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Err(SourceError::Launch {
                program: "log".to_string(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no log tool"),
            })
        }
    }

    /// Takes `delay` to answer each window
    struct SlowSource {
        delay: Duration,
    }

    #[async_trait]
    impl LogSource for SlowSource {
        async fn collect(&self, _query: &LogQuery) -> Result<Bytes, SourceError> {
            tokio::time::sleep(self.delay).await;
            Ok(Bytes::from_static(b"slow "))
        }
    }

    #[tokio::test]
    async fn test_cancel_during_sleep_stops_without_new_cycle() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = spec(tmp.path(), "a", 3600);
        let collector = Arc::new(
            Collector::new(
                spec.clone(),
                Arc::new(StaticSource::new("x")),
                Arc::new(SystemClock),
            )
            .unwrap(),
        );
        let token = CancellationToken::new();

        let handle = tokio::spawn(run_all(vec![collector], token.clone()));
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("scheduler did not stop")
            .unwrap();

        // Exactly the first cycle ran
        assert_eq!(std::fs::read_to_string(&spec.output_file).unwrap(), "x");
    }

    #[tokio::test]
    async fn test_failing_collector_keeps_looping_and_does_not_block_others() {
        let tmp = tempfile::tempdir().unwrap();
        let failing = Arc::new(FailingSource {
            calls: AtomicUsize::new(0),
        });
        let bad = Arc::new(
            Collector::new(spec(tmp.path(), "bad", 1), failing.clone(), Arc::new(SystemClock))
                .unwrap(),
        );
        let good_spec = spec(tmp.path(), "good", 1);
        let good = Arc::new(
            Collector::new(
                good_spec.clone(),
                Arc::new(StaticSource::new("ok ")),
                Arc::new(SystemClock),
            )
            .unwrap(),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_all(vec![bad, good], token.clone()));
        tokio::time::sleep(Duration::from_millis(2500)).await;
        token.cancel();
        handle.await.unwrap();

        assert!(failing.calls.load(Ordering::SeqCst) >= 2);
        let out = std::fs::read_to_string(&good_spec.output_file).unwrap();
        assert!(out.matches("ok ").count() >= 2);
        assert!(!tmp.path().join("bad.pos").exists());
    }

    #[tokio::test]
    async fn test_in_flight_cycle_finishes_before_exit() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = spec(tmp.path(), "slow", 1);
        let collector = Arc::new(
            Collector::new(
                spec.clone(),
                Arc::new(SlowSource {
                    delay: Duration::from_millis(500),
                }),
                Arc::new(SystemClock),
            )
            .unwrap(),
        );

        let token = CancellationToken::new();
        let handle = tokio::spawn(run_all(vec![collector], token.clone()));
        tokio::time::sleep(Duration::from_millis(100)).await;
        token.cancel();
        handle.await.unwrap();

        assert_eq!(std::fs::read_to_string(&spec.output_file).unwrap(), "slow ");
        assert!(spec.position_file.exists());
    }

    #[tokio::test]
    async fn test_already_cancelled_runs_nothing() {
        let tmp = tempfile::tempdir().unwrap();
        let spec = spec(tmp.path(), "idle", 1);
        let collector = Arc::new(
            Collector::new(
                spec.clone(),
                Arc::new(StaticSource::new("x")),
                Arc::new(SystemClock),
            )
            .unwrap(),
        );

        let token = CancellationToken::new();
        token.cancel();
        run_all(vec![collector], token).await;

        assert_eq!(std::fs::read_to_string(&spec.output_file).unwrap(), "");
    }
}
