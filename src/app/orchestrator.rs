//! One update pass across every (maturity, source) pair.
//!
//! Each pair is fetched, timed and published independently; a failure only
//! ever touches its own success/duration cells, and the last good rate stays
//! visible. Fetches within a pass run concurrently on the rayon pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use rayon::prelude::*;

use crate::data::RateSource;
use crate::domain::{Maturity, SourceResult};
use crate::metrics::{MetricsRegistry, SourceMetrics};

/// Counts for one pass, for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PassReport {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Succeeded,
    Failed,
    Skipped,
}

pub struct Orchestrator {
    sources: Vec<Arc<dyn RateSource>>,
    registry: Arc<MetricsRegistry>,
}

impl Orchestrator {
    /// `sources` should already reflect configuration: a disabled source is
    /// simply left out.
    pub fn new(registry: Arc<MetricsRegistry>, sources: Vec<Arc<dyn RateSource>>) -> Self {
        Self { sources, registry }
    }

    /// Maturities published by at least one source, shortest first.
    pub fn maturities(&self) -> Vec<Maturity> {
        Maturity::ALL
            .into_iter()
            .filter(|m| self.sources.iter().any(|s| s.supports(*m)))
            .collect()
    }

    /// Fetch and publish every supported (maturity, source) pair once.
    pub fn run_pass(&self) -> PassReport {
        let started = Instant::now();

        let mut jobs: Vec<(Maturity, &dyn RateSource)> = Vec::new();
        let mut skipped = 0;
        for maturity in self.maturities() {
            for source in &self.sources {
                if source.supports(maturity) {
                    jobs.push((maturity, source.as_ref()));
                } else {
                    tracing::debug!(
                        maturity = %maturity,
                        source = %source.source(),
                        "Skipping fetch - maturity not supported by source"
                    );
                    skipped += 1;
                }
            }
        }

        let outcomes: Vec<Outcome> = jobs
            .par_iter()
            .map(|(maturity, source)| self.publish(fetch_timed(*maturity, *source)))
            .collect();

        let mut report = PassReport {
            skipped,
            ..PassReport::default()
        };
        for outcome in outcomes {
            match outcome {
                Outcome::Succeeded => {
                    report.attempted += 1;
                    report.succeeded += 1;
                }
                Outcome::Failed => {
                    report.attempted += 1;
                    report.failed += 1;
                }
                Outcome::Skipped => report.skipped += 1,
            }
        }
        report.duration = started.elapsed();
        report
    }

    fn publish(&self, result: SourceResult) -> Outcome {
        let names = SourceMetrics::for_source(result.source);
        let maturity = result.maturity.code();
        let labels = [("maturity", maturity)];
        let duration = result.duration.as_secs_f64();

        match result.outcome {
            Ok(obs) => {
                self.registry.publish(names.duration, &labels, duration);
                self.registry.publish(names.rate, &labels, obs.value);
                self.registry
                    .publish(names.publication_date, &labels, obs.published_at.timestamp() as f64);
                self.registry
                    .publish(names.last_update, &labels, obs.fetched_at.timestamp() as f64);
                self.registry.publish(names.success, &labels, 1.0);

                tracing::info!(
                    maturity,
                    source = %result.source,
                    rate = obs.value,
                    pub_date = %obs.published_at.format("%Y-%m-%d"),
                    duration,
                    "Updated Euribor metric"
                );
                Outcome::Succeeded
            }
            Err(e) if e.is_skip() => {
                tracing::debug!(maturity, source = %result.source, "Source declined maturity");
                Outcome::Skipped
            }
            Err(e) => {
                self.registry.publish(names.duration, &labels, duration);
                self.registry.publish(names.success, &labels, 0.0);

                tracing::error!(
                    maturity,
                    source = %result.source,
                    error = %e,
                    duration,
                    "Failed to fetch Euribor rate"
                );
                Outcome::Failed
            }
        }
    }
}

fn fetch_timed(maturity: Maturity, source: &dyn RateSource) -> SourceResult {
    let started = Instant::now();
    let outcome = source.fetch(maturity);
    SourceResult {
        maturity,
        source: source.source(),
        outcome,
        duration: started.elapsed(),
    }
}
