//! ECB Data Portal integration for the monthly Euribor series.
//!
//! The API answers in SDMX-JSON: a list of datasets, each holding series keyed
//! by a dimension-combination string, each series holding a sparse map from
//! period index to a list of values. The period labels themselves (`2025-11`)
//! live in `structure.dimensions.observation`.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::Deserialize;

use crate::data::{RateSource, build_client};
use crate::domain::{Maturity, Observation, Source, midnight_utc};
use crate::error::{AppError, FetchError};
use crate::parse::month_end;

pub const DEFAULT_BASE_URL: &str = "https://data-api.ecb.europa.eu/service/data/FM";

/// Series key of the single series returned for a fully specified query.
const SERIES_KEY: &str = "0:0:0:0:0:0:0";

/// ECB dataset code for each maturity the API publishes.
///
/// The one-week tenor has no monthly series and is skipped for this source.
pub fn ecb_code(maturity: Maturity) -> Option<&'static str> {
    match maturity {
        Maturity::OneMonth => Some("1MD_"),
        Maturity::ThreeMonths => Some("3MD_"),
        Maturity::SixMonths => Some("6MD_"),
        Maturity::TwelveMonths => Some("1YD_"),
        Maturity::OneWeek => None,
    }
}

/// Full series key, e.g. `M.U2.EUR.RT.MM.EURIBOR3MD_.HSTA`.
pub fn series_key(code: &str) -> String {
    format!("M.U2.EUR.RT.MM.EURIBOR{code}.HSTA")
}

pub struct EcbClient {
    client: Client,
    base_url: String,
}

impl EcbClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, AppError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    fn fetch_body(&self, maturity: Maturity, code: &str) -> Result<String, FetchError> {
        let url = format!("{}/{}", self.base_url, series_key(code));

        tracing::debug!(maturity = %maturity, url = %url, "Fetching Euribor rate from ECB");

        let resp = self
            .client
            .get(&url)
            .query(&[
                ("format", "jsondata"),
                ("detail", "dataonly"),
                ("lastNObservations", "1"),
            ])
            .send()?;

        if !resp.status().is_success() {
            return Err(FetchError::Transport(format!(
                "ECB API returned status {}",
                resp.status()
            )));
        }

        Ok(resp.text()?)
    }
}

impl RateSource for EcbClient {
    fn source(&self) -> Source {
        Source::Ecb
    }

    fn supports(&self, maturity: Maturity) -> bool {
        ecb_code(maturity).is_some()
    }

    fn fetch(&self, maturity: Maturity) -> Result<Observation, FetchError> {
        let code = ecb_code(maturity).ok_or(FetchError::UnsupportedMaturity(maturity))?;
        let body = self.fetch_body(maturity, code)?;
        let parsed = parse_response(&body)?;

        let published_at = publication_time(maturity, parsed.period.as_deref());

        Ok(Observation::new(parsed.rate, published_at))
    }
}

#[derive(Debug, Deserialize)]
struct EcbResponse {
    #[serde(rename = "dataSets")]
    data_sets: Option<Vec<DataSet>>,
    structure: Option<Structure>,
}

#[derive(Debug, Deserialize)]
struct DataSet {
    series: Option<HashMap<String, Series>>,
}

#[derive(Debug, Deserialize)]
struct Series {
    observations: Option<HashMap<String, Vec<Option<f64>>>>,
}

#[derive(Debug, Deserialize)]
struct Structure {
    dimensions: Option<Dimensions>,
}

#[derive(Debug, Deserialize)]
struct Dimensions {
    observation: Option<Vec<Dimension>>,
}

#[derive(Debug, Deserialize)]
struct Dimension {
    #[serde(default)]
    values: Vec<DimensionValue>,
}

#[derive(Debug, Deserialize)]
struct DimensionValue {
    id: Option<String>,
}

/// Rate and raw period label pulled out of an ECB response.
#[derive(Debug, Clone, PartialEq)]
pub struct EcbReading {
    pub rate: f64,
    /// Last period label (e.g. `2025-11`), if the structure section had one.
    pub period: Option<String>,
}

/// Decode an SDMX-JSON body into the latest rate and its period label.
pub fn parse_response(body: &str) -> Result<EcbReading, FetchError> {
    let resp: EcbResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Format(format!("failed to parse JSON: {e}")))?;

    let data_set = resp
        .data_sets
        .as_ref()
        .and_then(|sets| sets.first())
        .ok_or_else(|| FetchError::Format("no datasets in response".to_string()))?;

    let series = data_set
        .series
        .as_ref()
        .ok_or_else(|| FetchError::Format("dataset has no series map".to_string()))?
        .get(SERIES_KEY)
        .ok_or_else(|| FetchError::Format("series not found in response".to_string()))?;

    let observations = series
        .observations
        .as_ref()
        .filter(|obs| !obs.is_empty())
        .ok_or_else(|| FetchError::Format("no observations in series".to_string()))?;

    let (_, values) = latest_observation(observations)
        .ok_or_else(|| FetchError::Format("no observations in series".to_string()))?;

    let rate = values
        .first()
        .copied()
        .flatten()
        .ok_or_else(|| FetchError::Format("observation is empty".to_string()))?;

    let period = resp
        .structure
        .and_then(|s| s.dimensions)
        .and_then(|d| d.observation)
        .and_then(|dims| dims.into_iter().next())
        .and_then(|dim| dim.values.into_iter().last())
        .and_then(|v| v.id);

    Ok(EcbReading { rate, period })
}

/// Pick the observation with the lexicographically greatest key.
///
/// This relies on the period-index keys being fixed-width and monotonic, so
/// that string order matches time order. The keys are not validated.
pub fn latest_observation<V>(observations: &HashMap<String, V>) -> Option<(&str, &V)> {
    observations
        .iter()
        .max_by(|a, b| a.0.cmp(b.0))
        .map(|(k, v)| (k.as_str(), v))
}

/// Month-end publication time for a period label, or now when it is unusable.
pub fn publication_time(maturity: Maturity, period: Option<&str>) -> DateTime<Utc> {
    let Some(period) = period else {
        tracing::warn!(
            maturity = %maturity,
            "ECB response has no period labels, using current time"
        );
        return Utc::now();
    };

    match month_end(period) {
        Ok(date) => {
            tracing::debug!(maturity = %maturity, pub_date = %date, "Parsed ECB publication date");
            midnight_utc(date)
        }
        Err(e) => {
            tracing::warn!(
                maturity = %maturity,
                date_str = %period,
                error = %e,
                "Failed to parse ECB publication date, using current time"
            );
            Utc::now()
        }
    }
}
