//! Cancellable fixed-interval runner for background jobs.
//!
//! The price engines are ticked by [`run_periodic`]: the first tick fires
//! immediately, later ticks follow the interval, and a slow tick delays the
//! next one rather than causing a burst. A failing tick is logged and the
//! loop carries on; nothing a job returns can stop the loop. Only the
//! [`ShutdownHandle`] can.

use core::fmt;
use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Shortest period accepted by [`run_periodic`].
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// A unit of background work run once per interval.
pub trait PeriodicJob: Send {
    /// Summary produced by a successful run, logged at `debug`.
    type Report: fmt::Debug + Send;

    /// Failure of a single run, logged at `error`.
    type Error: fmt::Display + Send;

    /// Name used in log lines.
    fn name(&self) -> &str;

    /// Run one tick against the wall-clock time `now`.
    fn run_once(
        &mut self,
        now: DateTime<Utc>,
    ) -> impl Future<Output = Result<Self::Report, Self::Error>> + Send;
}

/// Counters returned when a periodic loop stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerSummary {
    /// Ticks started, successful or not.
    pub ticks_run: u64,
    /// Ticks whose job returned an error.
    pub ticks_failed: u64,
}

/// Sending half of the shutdown channel.
#[derive(Debug)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Ask every loop holding a matching [`ShutdownSignal`] to stop.
    pub fn shutdown(&self) {
        self.tx.send_replace(true);
    }

    /// Another signal listening to this handle.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }
}

/// Receiving half of the shutdown channel.
///
/// Dropping the [`ShutdownHandle`] counts as a shutdown request.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Whether shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolve once shutdown is requested.
    pub async fn wait(&mut self) {
        while !*self.rx.borrow_and_update() {
            if self.rx.changed().await.is_err() {
                return;
            }
        }
    }
}

/// Create a connected shutdown handle and signal.
pub fn shutdown_channel() -> (ShutdownHandle, ShutdownSignal) {
    let (tx, rx) = watch::channel(false);
    (ShutdownHandle { tx }, ShutdownSignal { rx })
}

/// Run `job` every `period` until `shutdown` fires.
pub async fn run_periodic<J>(
    mut job: J,
    period: Duration,
    mut shutdown: ShutdownSignal,
) -> SchedulerSummary
where
    J: PeriodicJob,
{
    let period = period.max(MIN_PERIOD);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    let mut summary = SchedulerSummary::default();

    info!(
        job = job.name(),
        period_secs = period.as_secs(),
        "Periodic job started"
    );

    loop {
        tokio::select! {
            biased;
            () = shutdown.wait() => break,
            _ = ticker.tick() => {}
        }

        summary.ticks_run = summary.ticks_run.saturating_add(1);

        match job.run_once(Utc::now()).await {
            Ok(report) => {
                debug!(job = job.name(), tick = summary.ticks_run, ?report, "Tick completed");
            }
            Err(e) => {
                summary.ticks_failed = summary.ticks_failed.saturating_add(1);
                error!(
                    job = job.name(),
                    tick = summary.ticks_run,
                    error = %e,
                    "Tick failed, will retry next interval"
                );
            }
        }
    }

    info!(
        job = job.name(),
        ticks_run = summary.ticks_run,
        ticks_failed = summary.ticks_failed,
        "Periodic job stopped"
    );
    summary
}

/// Spawn [`run_periodic`] on the current Tokio runtime.
pub fn spawn_periodic<J>(
    job: J,
    period: Duration,
    shutdown: ShutdownSignal,
) -> JoinHandle<SchedulerSummary>
where
    J: PeriodicJob + 'static,
{
    tokio::spawn(run_periodic(job, period, shutdown))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU64, Ordering};

    use super::*;

    /// Counts runs and fails every run whose number is even.
    struct FlakyJob {
        runs: Arc<AtomicU64>,
    }

    #[derive(Debug)]
    struct Flake;

    impl fmt::Display for Flake {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("store unavailable")
        }
    }

    impl PeriodicJob for FlakyJob {
        type Report = u64;
        type Error = Flake;

        fn name(&self) -> &str {
            "flaky"
        }

        async fn run_once(&mut self, _now: DateTime<Utc>) -> Result<u64, Flake> {
            let run = self.runs.fetch_add(1, Ordering::SeqCst).saturating_add(1);
            if run % 2 == 0 { Err(Flake) } else { Ok(run) }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_immediately_then_every_period() {
        let runs = Arc::new(AtomicU64::new(0));
        let (handle, signal) = shutdown_channel();
        let task = spawn_periodic(
            FlakyJob {
                runs: Arc::clone(&runs),
            },
            Duration::from_secs(100),
            signal,
        );

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(249)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.shutdown();
        let summary = task.await.unwrap();
        assert_eq!(summary.ticks_run, 3);
        assert_eq!(summary.ticks_failed, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn failures_do_not_stop_the_loop() {
        let runs = Arc::new(AtomicU64::new(0));
        let (handle, signal) = shutdown_channel();
        let task = spawn_periodic(
            FlakyJob {
                runs: Arc::clone(&runs),
            },
            Duration::from_secs(10),
            signal,
        );

        tokio::time::sleep(Duration::from_secs(55)).await;
        handle.shutdown();
        let summary = task.await.unwrap();
        assert_eq!(summary.ticks_run, 6);
        assert_eq!(summary.ticks_failed, 3);
    }

    #[tokio::test]
    async fn dropping_the_handle_stops_the_loop() {
        let runs = Arc::new(AtomicU64::new(0));
        let (handle, signal) = shutdown_channel();
        drop(handle);
        let summary = run_periodic(
            FlakyJob { runs },
            Duration::from_secs(3600),
            signal,
        )
        .await;
        assert_eq!(summary.ticks_run, 0);
    }

    #[test]
    fn subscribed_signals_see_shutdown() {
        let (handle, signal) = shutdown_channel();
        let other = handle.subscribe();
        assert!(!signal.is_shutdown());
        handle.shutdown();
        assert!(signal.is_shutdown());
        assert!(other.is_shutdown());
    }
}
