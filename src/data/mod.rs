//! Upstream rate sources.
//!
//! - `ecb`: ECB statistical API (monthly series)
//! - `web`: daily rates page, parsed with `extract`
//!
//! Both implement `RateSource`, so the orchestrator treats them uniformly.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::domain::{Maturity, Observation, Source};
use crate::error::{AppError, FetchError};

pub mod ecb;
pub mod extract;
pub mod web;

pub use ecb::EcbClient;
pub use web::WebClient;

/// One upstream that can quote a rate per maturity.
pub trait RateSource: Send + Sync {
    fn source(&self) -> Source;

    /// Whether this source publishes the maturity at all.
    fn supports(&self, maturity: Maturity) -> bool;

    /// Fetch the latest observation. Blocking; bounded by the client timeout.
    fn fetch(&self, maturity: Maturity) -> Result<Observation, FetchError>;
}

const USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

pub(crate) fn build_client(timeout: Duration) -> Result<Client, AppError> {
    Client::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build()
        .map_err(|e| AppError::new(2, format!("Failed to build HTTP client: {e}")))
}
