//! Periodic driver for the orchestrator.
//!
//! `Idle -> Running -> Stopped`. Entering `Running` performs one pass right
//! away, then one pass per interval tick. A stop request is only observed
//! while waiting between passes, so an in-flight pass always completes.

use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crate::app::orchestrator::{Orchestrator, PassReport};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Running,
    Stopped,
}

pub struct Scheduler {
    orchestrator: Orchestrator,
    interval: Duration,
    state: SchedulerState,
    passes: usize,
}

impl Scheduler {
    pub fn new(orchestrator: Orchestrator, interval: Duration) -> Self {
        Self {
            orchestrator,
            interval,
            state: SchedulerState::Idle,
            passes: 0,
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    /// Number of completed passes.
    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Run passes until `stop` receives a message or its sender is dropped.
    pub fn run(&mut self, stop: &Receiver<()>) {
        if self.state != SchedulerState::Idle {
            tracing::warn!(state = ?self.state, "Scheduler already started; ignoring run request");
            return;
        }
        self.state = SchedulerState::Running;

        let mut next_tick = Instant::now() + self.interval;
        tracing::info!("Performing initial metrics update");
        self.pass();

        loop {
            let wait = next_tick.saturating_duration_since(Instant::now());
            match stop.recv_timeout(wait) {
                Err(RecvTimeoutError::Timeout) => {
                    next_tick = advance(next_tick, self.interval, Instant::now());
                    tracing::info!("Performing scheduled metrics update");
                    self.pass();
                }
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        self.state = SchedulerState::Stopped;
        tracing::info!(passes = self.passes, "Stopping exporter");
    }

    /// Move the scheduler onto its own thread.
    pub fn spawn(mut self) -> Result<SchedulerHandle, AppError> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let join = std::thread::Builder::new()
            .name("scheduler".to_string())
            .spawn(move || {
                self.run(&stop_rx);
                self
            })
            .map_err(|e| AppError::new(4, format!("Failed to start scheduler thread: {e}")))?;

        Ok(SchedulerHandle { stop_tx, join })
    }

    fn pass(&mut self) -> PassReport {
        let report = self.orchestrator.run_pass();
        self.passes += 1;
        tracing::info!(
            attempted = report.attempted,
            succeeded = report.succeeded,
            failed = report.failed,
            skipped = report.skipped,
            duration = report.duration.as_secs_f64(),
            "Metrics update finished"
        );
        report
    }
}

/// First tick strictly after `now`; ticks missed during a long pass are dropped.
fn advance(tick: Instant, interval: Duration, now: Instant) -> Instant {
    let mut next = tick + interval;
    while next <= now && !interval.is_zero() {
        next += interval;
    }
    next
}

pub struct SchedulerHandle {
    stop_tx: Sender<()>,
    join: JoinHandle<Scheduler>,
}

impl SchedulerHandle {
    /// Ask the scheduler to stop after the current pass. Idempotent.
    pub fn request_stop(&self) {
        let _ = self.stop_tx.send(());
    }

    /// Wait for the scheduler thread to exit.
    pub fn join(self) -> Result<Scheduler, AppError> {
        self.request_stop();
        self.join
            .join()
            .map_err(|_| AppError::new(4, "Scheduler thread panicked"))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::app::testing::ScriptedSource;
    use crate::data::RateSource;
    use crate::domain::{Maturity, Source};
    use crate::metrics::MetricsRegistry;

    fn scheduler(interval: Duration) -> (Scheduler, Arc<ScriptedSource>) {
        let web = Arc::new(ScriptedSource::new(Source::Web, &[Maturity::OneMonth], 2.0));
        let sources: Vec<Arc<dyn RateSource>> = vec![web.clone()];
        let orchestrator = Orchestrator::new(Arc::new(MetricsRegistry::new()), sources);
        (Scheduler::new(orchestrator, interval), web)
    }

    #[test]
    fn runs_once_immediately_even_if_stop_is_pending() {
        let (mut scheduler, web) = scheduler(Duration::from_secs(3600));
        assert_eq!(scheduler.state(), SchedulerState::Idle);

        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        scheduler.run(&rx);

        assert_eq!(scheduler.passes(), 1);
        assert_eq!(web.calls(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn dropped_sender_stops_the_loop() {
        let (mut scheduler, _web) = scheduler(Duration::from_secs(3600));
        let (tx, rx) = mpsc::channel::<()>();
        drop(tx);
        scheduler.run(&rx);
        assert_eq!(scheduler.passes(), 1);
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn stopped_is_terminal() {
        let (mut scheduler, web) = scheduler(Duration::from_secs(3600));
        let (tx, rx) = mpsc::channel();
        tx.send(()).unwrap();
        scheduler.run(&rx);

        tx.send(()).unwrap();
        scheduler.run(&rx);
        assert_eq!(scheduler.passes(), 1);
        assert_eq!(web.calls(), 1);
    }

    #[test]
    fn repeats_on_interval_until_stopped() {
        let (scheduler, web) = scheduler(Duration::from_millis(20));
        let handle = scheduler.spawn().unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while web.calls() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        let scheduler = handle.join().unwrap();

        assert!(scheduler.passes() >= 3, "only {} passes", scheduler.passes());
        assert_eq!(scheduler.state(), SchedulerState::Stopped);
    }

    #[test]
    fn in_flight_pass_completes_before_stopping() {
        let (scheduler, web) = scheduler(Duration::from_secs(3600));
        web.set_delay(Duration::from_millis(100));
        let handle = scheduler.spawn().unwrap();

        std::thread::sleep(Duration::from_millis(20));
        handle.request_stop();
        let scheduler = handle.join().unwrap();

        assert_eq!(scheduler.passes(), 1);
        assert_eq!(web.calls(), 1);
    }

    #[test]
    fn advance_drops_missed_ticks() {
        let start = Instant::now();
        let interval = Duration::from_secs(10);
        assert_eq!(advance(start, interval, start), start + interval);
        assert_eq!(
            advance(start, interval, start + Duration::from_secs(25)),
            start + Duration::from_secs(30)
        );
    }
}
