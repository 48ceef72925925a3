//! Scripted in-memory rate source for orchestrator and scheduler tests.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use chrono::NaiveDate;

use crate::data::RateSource;
use crate::domain::{Maturity, Observation, Source};
use crate::error::FetchError;

pub(crate) struct ScriptedSource {
    source: Source,
    supported: Vec<Maturity>,
    claims_all: bool,
    /// `None` simulates an outage for that maturity.
    rates: Mutex<HashMap<Maturity, Option<f64>>>,
    delay: Mutex<Duration>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    /// 2025-12-13T00:00:00Z
    pub const PUBLISHED_TS: i64 = 1_765_584_000;

    /// Each supported maturity quotes `base + 0.1 * position`.
    pub fn new(source: Source, supported: &[Maturity], base: f64) -> Self {
        let rates = supported
            .iter()
            .enumerate()
            .map(|(i, m)| (*m, Some(base + 0.1 * i as f64)))
            .collect();
        Self {
            source,
            supported: supported.to_vec(),
            claims_all: false,
            rates: Mutex::new(rates),
            delay: Mutex::new(Duration::ZERO),
            calls: AtomicUsize::new(0),
        }
    }

    /// Report every maturity as supported, but still refuse unknown ones in `fetch`.
    pub fn claiming_all(mut self) -> Self {
        self.claims_all = true;
        self
    }

    pub fn rate_for(&self, maturity: Maturity) -> f64 {
        self.rates
            .lock()
            .unwrap()
            .get(&maturity)
            .copied()
            .flatten()
            .unwrap_or(f64::NAN)
    }

    pub fn shift_rates(&self, delta: f64) {
        for rate in self.rates.lock().unwrap().values_mut().flatten() {
            *rate += delta;
        }
    }

    pub fn fail(&self, maturity: Maturity) {
        self.rates.lock().unwrap().insert(maturity, None);
    }

    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = delay;
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl RateSource for ScriptedSource {
    fn source(&self) -> Source {
        self.source
    }

    fn supports(&self, maturity: Maturity) -> bool {
        self.claims_all || self.supported.contains(&maturity)
    }

    fn fetch(&self, maturity: Maturity) -> Result<Observation, FetchError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            std::thread::sleep(delay);
        }

        if !self.supported.contains(&maturity) {
            return Err(FetchError::UnsupportedMaturity(maturity));
        }

        let published = NaiveDate::from_ymd_opt(2025, 12, 13).unwrap();
        match self.rates.lock().unwrap().get(&maturity).copied().flatten() {
            Some(rate) => Ok(Observation::published_on(rate, published)),
            None => Err(FetchError::Transport("simulated outage".to_string())),
        }
    }
}
