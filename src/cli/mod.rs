//! Command-line parsing for the exporter.
//!
//! Every flag can also be supplied through the environment (and therefore a
//! `.env` file), which is how the exporter is usually configured in containers.

use std::net::SocketAddr;
use std::time::Duration;

use clap::{ArgAction, Parser};

use crate::data::{ecb, web};
use crate::domain::ExporterConfig;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "euribor-exporter",
    version,
    about = "Prometheus exporter for Euribor rates (ECB monthly API + daily web scrape)"
)]
pub struct Cli {
    /// Address to listen on for web interface and telemetry (`:9100` binds all interfaces).
    #[arg(long, env = "LISTEN_ADDRESS", default_value = ":9100", value_parser = parse_listen_address)]
    pub listen_address: SocketAddr,

    /// Path under which to expose metrics.
    #[arg(long, env = "METRICS_PATH", default_value = "/metrics", value_parser = parse_metrics_path)]
    pub metrics_path: String,

    /// Interval between scrapes (e.g. `1h`, `15m`, `90s`).
    #[arg(long, env = "SCRAPE_INTERVAL", default_value = "1h", value_parser = parse_duration)]
    pub scrape_interval: Duration,

    /// Log verbosity (trace, debug, info, warn, error). Unknown levels fall
    /// back to `info`. `RUST_LOG` takes precedence when set.
    #[arg(long, env = "LOG_LEVEL", default_value = DEFAULT_LOG_LEVEL)]
    pub log_level: String,

    /// Fetch monthly rates from the ECB API in addition to the daily scrape.
    /// Only `false`, `0`, `no` and `off` disable it.
    #[arg(
        long,
        env = "ENABLE_ECB",
        default_value_t = true,
        action = ArgAction::Set,
        value_parser = parse_enabled
    )]
    pub enable_ecb: bool,

    /// Base URL of the ECB data API (FM dataset).
    #[arg(long, env = "ECB_URL", default_value = ecb::DEFAULT_BASE_URL)]
    pub ecb_url: String,

    /// Base URL of the daily rates pages.
    #[arg(long, env = "WEB_URL", default_value = web::DEFAULT_BASE_URL)]
    pub web_url: String,

    /// Per-request timeout for the ECB API.
    #[arg(long, default_value = "10s", value_parser = parse_duration)]
    pub ecb_timeout: Duration,

    /// Per-request timeout for the daily rates pages.
    #[arg(long, default_value = "30s", value_parser = parse_duration)]
    pub web_timeout: Duration,

    /// How long in-flight HTTP requests may take to finish on shutdown.
    #[arg(long, default_value = "5s", value_parser = parse_duration)]
    pub shutdown_grace: Duration,
}

impl Cli {
    /// The `--log-level` value when it names no known level.
    pub fn rejected_log_level(&self) -> Option<&str> {
        match log_level(&self.log_level) {
            Some(_) => None,
            None => Some(&self.log_level),
        }
    }

    pub fn into_config(self) -> ExporterConfig {
        ExporterConfig {
            listen_address: self.listen_address,
            metrics_path: self.metrics_path,
            scrape_interval: self.scrape_interval,
            log_level: log_level(&self.log_level)
                .unwrap_or(DEFAULT_LOG_LEVEL)
                .to_string(),
            ecb_enabled: self.enable_ecb,
            ecb_base_url: self.ecb_url,
            web_base_url: self.web_url,
            ecb_timeout: self.ecb_timeout,
            web_timeout: self.web_timeout,
            shutdown_grace: self.shutdown_grace,
        }
    }
}

pub const DEFAULT_LOG_LEVEL: &str = "info";

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Canonical spelling of a log level, case-insensitive.
pub fn log_level(s: &str) -> Option<&'static str> {
    let s = s.trim();
    LOG_LEVELS.into_iter().find(|level| level.eq_ignore_ascii_case(s))
}

/// Anything but an explicit "off" value enables the source.
pub fn parse_enabled(s: &str) -> Result<bool, String> {
    let disabled = ["false", "0", "no", "off"]
        .into_iter()
        .any(|v| v.eq_ignore_ascii_case(s.trim()));
    Ok(!disabled)
}

/// Accept `host:port`, or `:port` for all interfaces.
pub fn parse_listen_address(s: &str) -> Result<SocketAddr, String> {
    let s = s.trim();
    let full = if s.starts_with(':') {
        format!("0.0.0.0{s}")
    } else {
        s.to_string()
    };
    full.parse()
        .map_err(|e| format!("invalid listen address '{s}': {e}"))
}

pub fn parse_metrics_path(s: &str) -> Result<String, String> {
    let s = s.trim();
    let path = if s.starts_with('/') {
        s.to_string()
    } else {
        format!("/{s}")
    };
    match path.as_str() {
        "/" | "/health" => Err(format!("metrics path '{path}' collides with a built-in route")),
        _ => Ok(path),
    }
}

/// Parse `1h30m`, `15m`, `90s`, `250ms`, or bare seconds. Zero is rejected.
pub fn parse_duration(s: &str) -> Result<Duration, String> {
    let s = s.trim();
    if s.is_empty() {
        return Err("empty duration".to_string());
    }

    let total = if s.chars().all(|c| c.is_ascii_digit()) {
        let secs: u64 = s.parse().map_err(|e| format!("invalid duration '{s}': {e}"))?;
        Duration::from_secs(secs)
    } else {
        let mut total = Duration::ZERO;
        let mut rest = s;
        while !rest.is_empty() {
            let digits = rest.find(|c: char| !c.is_ascii_digit()).unwrap_or(rest.len());
            if digits == 0 {
                return Err(format!("invalid duration '{s}': expected a number"));
            }
            let value: u64 = rest[..digits]
                .parse()
                .map_err(|e| format!("invalid duration '{s}': {e}"))?;
            rest = &rest[digits..];

            let unit_len = rest.find(|c: char| c.is_ascii_digit()).unwrap_or(rest.len());
            let part = match &rest[..unit_len] {
                "h" => Duration::from_secs(value.saturating_mul(3600)),
                "m" => Duration::from_secs(value.saturating_mul(60)),
                "s" => Duration::from_secs(value),
                "ms" => Duration::from_millis(value),
                unit => return Err(format!("invalid duration '{s}': unknown unit '{unit}'")),
            };
            total += part;
            rest = &rest[unit_len..];
        }
        total
    };

    if total.is_zero() {
        return Err("duration must be greater than zero".to_string());
    }
    Ok(total)
}

/// Render a duration the way `parse_duration` reads it (`1h30m`, `45s`).
pub fn format_duration(d: Duration) -> String {
    let secs = d.as_secs();
    if secs == 0 {
        return format!("{}ms", d.as_millis());
    }
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    let mut out = String::new();
    if h > 0 {
        out.push_str(&format!("{h}h"));
    }
    if m > 0 {
        out.push_str(&format!("{m}m"));
    }
    if s > 0 || out.is_empty() {
        out.push_str(&format!("{s}s"));
    }
    out
}
