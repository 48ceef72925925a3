//! Shared domain types.
//!
//! These types are intentionally small and cheap to copy: an `Observation` is
//! produced fresh on every successful fetch and never mutated afterwards.

use std::fmt;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

use crate::error::FetchError;

/// Tenor of the quoted interbank rate.
///
/// The code string (`1W`, `3M`, ...) is the identity used in metric labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Maturity {
    OneWeek,
    OneMonth,
    ThreeMonths,
    SixMonths,
    TwelveMonths,
}

impl Maturity {
    /// All known maturities, shortest tenor first.
    pub const ALL: [Maturity; 5] = [
        Maturity::OneWeek,
        Maturity::OneMonth,
        Maturity::ThreeMonths,
        Maturity::SixMonths,
        Maturity::TwelveMonths,
    ];

    pub fn code(self) -> &'static str {
        match self {
            Maturity::OneWeek => "1W",
            Maturity::OneMonth => "1M",
            Maturity::ThreeMonths => "3M",
            Maturity::SixMonths => "6M",
            Maturity::TwelveMonths => "12M",
        }
    }
}

impl fmt::Display for Maturity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Maturity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let code = s.trim().to_ascii_uppercase();
        Maturity::ALL
            .into_iter()
            .find(|m| m.code() == code)
            .ok_or_else(|| format!("unknown maturity '{s}'"))
    }
}

/// Upstream a value was fetched from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Source {
    /// ECB statistical data API (monthly averages).
    Ecb,
    /// Public rates web page (daily fixings).
    Web,
}

impl Source {
    /// Label used in logs.
    pub fn label(self) -> &'static str {
        match self {
            Source::Ecb => "ecb",
            Source::Web => "daily-scraper",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One rate fetched from a source.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    /// Rate in percent (may be zero or negative).
    pub value: f64,
    /// Publication date as midnight UTC, or the fetch time when the
    /// upstream date could not be interpreted.
    pub published_at: DateTime<Utc>,
    pub fetched_at: DateTime<Utc>,
}

impl Observation {
    pub fn new(value: f64, published_at: DateTime<Utc>) -> Self {
        Self {
            value,
            published_at,
            fetched_at: Utc::now(),
        }
    }

    pub fn published_on(value: f64, date: NaiveDate) -> Self {
        Self::new(value, midnight_utc(date))
    }
}

/// Outcome of one (maturity, source) fetch within a single pass.
#[derive(Debug)]
pub struct SourceResult {
    pub maturity: Maturity,
    pub source: Source,
    pub outcome: Result<Observation, FetchError>,
    pub duration: Duration,
}

/// Runtime configuration, resolved once at startup.
#[derive(Debug, Clone)]
pub struct ExporterConfig {
    pub listen_address: SocketAddr,
    pub metrics_path: String,
    pub scrape_interval: Duration,
    pub log_level: String,
    pub ecb_enabled: bool,
    pub ecb_base_url: String,
    pub web_base_url: String,
    pub ecb_timeout: Duration,
    pub web_timeout: Duration,
    pub shutdown_grace: Duration,
}

pub fn midnight_utc(date: NaiveDate) -> DateTime<Utc> {
    date.and_time(chrono::NaiveTime::MIN).and_utc()
}
