//! Daily rates scraped from the public euribor-rates.eu pages.
//!
//! One page per maturity; each page carries a history table whose first row
//! is the latest fixing. Parsing is delegated to `data::extract`.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::blocking::Client;
use scraper::Html;

use crate::data::{RateSource, build_client};
use crate::data::extract::extract_rate;
use crate::domain::{Maturity, Observation, Source};
use crate::error::{AppError, FetchError};

pub const DEFAULT_BASE_URL: &str = "https://www.euribor-rates.eu/en/current-euribor-rates";

/// Page path (relative to the base URL) for each maturity the site publishes.
pub fn page_path(maturity: Maturity) -> &'static str {
    match maturity {
        Maturity::OneWeek => "/5/euribor-rate-1-week/",
        Maturity::OneMonth => "/1/euribor-rate-1-month/",
        Maturity::ThreeMonths => "/2/euribor-rate-3-months/",
        Maturity::SixMonths => "/3/euribor-rate-6-months/",
        Maturity::TwelveMonths => "/4/euribor-rate-12-months/",
    }
}

pub struct WebClient {
    client: Client,
    urls: BTreeMap<Maturity, String>,
}

impl WebClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let base = base_url.trim_end_matches('/');
        let urls = Maturity::ALL
            .into_iter()
            .map(|m| (m, format!("{base}{}", page_path(m))))
            .collect();

        Ok(Self {
            client: build_client(timeout)?,
            urls,
        })
    }

    pub fn url_for(&self, maturity: Maturity) -> Option<&str> {
        self.urls.get(&maturity).map(String::as_str)
    }

    fn fetch_page(&self, url: &str) -> Result<String, FetchError> {
        let resp = self.client.get(url).send()?;

        if !resp.status().is_success() {
            return Err(FetchError::Transport(format!("HTTP error: {}", resp.status())));
        }

        Ok(resp.text()?)
    }
}

impl RateSource for WebClient {
    fn source(&self) -> Source {
        Source::Web
    }

    fn supports(&self, maturity: Maturity) -> bool {
        self.urls.contains_key(&maturity)
    }

    fn fetch(&self, maturity: Maturity) -> Result<Observation, FetchError> {
        let url = self
            .url_for(maturity)
            .ok_or(FetchError::UnsupportedMaturity(maturity))?;

        tracing::debug!(maturity = %maturity, url = %url, "Fetching Euribor rate from web");

        let body = self.fetch_page(url)?;
        let doc = Html::parse_document(&body);
        let extracted = extract_rate(&doc, maturity)?;

        tracing::debug!(
            maturity = %maturity,
            rate = extracted.rate,
            date = %extracted.published_at.format("%Y-%m-%d"),
            "Scraped Euribor rate"
        );

        Ok(Observation::new(extracted.rate, extracted.published_at))
    }
}
