//! In-process publication sink and its Prometheus text exposition.
//!
//! The registry is an owned, thread-safe map of gauge families. Writers
//! overwrite one cell at a time; there are no cross-cell transactions.

use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::domain::Source;

pub const INFO: &str = "euribor_exporter_info";

/// Sorted `(name, value)` label pairs.
pub type Labels = Vec<(String, String)>;

/// Gauge names published for one source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceMetrics {
    pub rate: &'static str,
    pub publication_date: &'static str,
    pub last_update: &'static str,
    pub success: &'static str,
    pub duration: &'static str,
}

impl SourceMetrics {
    pub fn for_source(source: Source) -> Self {
        match source {
            Source::Ecb => Self {
                rate: "euribor_rate_percent",
                publication_date: "euribor_last_publication_date",
                last_update: "euribor_last_update_timestamp",
                success: "euribor_scrape_success",
                duration: "euribor_scrape_duration_seconds",
            },
            Source::Web => Self {
                rate: "euribor_daily_rate_percent",
                publication_date: "euribor_daily_publication_date_timestamp",
                last_update: "euribor_daily_last_update_timestamp",
                success: "euribor_daily_scrape_success",
                duration: "euribor_daily_scrape_duration_seconds",
            },
        }
    }
}

const HELP: &[(&str, &str)] = &[
    ("euribor_rate_percent", "Current Euribor rate in percent (ECB monthly data)"),
    ("euribor_last_publication_date", "ECB publication date of the monthly Euribor rate (Unix timestamp)"),
    ("euribor_last_update_timestamp", "Timestamp of last successful ECB fetch"),
    ("euribor_scrape_success", "Whether the last ECB scrape was successful (1 = success, 0 = failure)"),
    ("euribor_scrape_duration_seconds", "Duration of Euribor data scrape"),
    ("euribor_daily_rate_percent", "Daily Euribor rate in percent (scraped from euribor-rates.eu)"),
    ("euribor_daily_publication_date_timestamp", "ECB publication date of the daily Euribor rate (Unix timestamp)"),
    ("euribor_daily_last_update_timestamp", "Timestamp of last successful daily scrape"),
    ("euribor_daily_scrape_success", "Whether the last daily scrape was successful (1 = success, 0 = failure)"),
    ("euribor_daily_scrape_duration_seconds", "Duration of daily Euribor scrape in seconds"),
    (INFO, "Information about the Euribor exporter"),
];

#[derive(Debug, Default)]
struct Family {
    help: String,
    samples: BTreeMap<Labels, f64>,
}

#[derive(Debug, Default)]
pub struct MetricsRegistry {
    families: RwLock<BTreeMap<String, Family>>,
}

impl MetricsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with help text for every gauge the exporter publishes.
    pub fn with_exporter_metrics() -> Self {
        let registry = Self::new();
        for (name, help) in HELP {
            registry.describe(name, help);
        }
        registry
    }

    pub fn describe(&self, name: &str, help: &str) {
        let mut families = self.write();
        families.entry(name.to_string()).or_default().help = help.to_string();
    }

    /// Set a gauge cell, replacing any previous value.
    pub fn publish(&self, name: &str, labels: &[(&str, &str)], value: f64) {
        let key = normalize_labels(labels);
        let mut families = self.write();
        families
            .entry(name.to_string())
            .or_default()
            .samples
            .insert(key, value);
    }

    pub fn get(&self, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
        let key = normalize_labels(labels);
        self.read()
            .get(name)
            .and_then(|f| f.samples.get(&key))
            .copied()
    }

    /// Render all families with at least one sample in text format 0.0.4.
    pub fn render(&self) -> String {
        let families = self.read();
        let mut out = String::new();

        for (name, family) in families.iter().filter(|(_, f)| !f.samples.is_empty()) {
            if !family.help.is_empty() {
                let _ = writeln!(out, "# HELP {name} {}", escape_help(&family.help));
            }
            let _ = writeln!(out, "# TYPE {name} gauge");

            for (labels, value) in &family.samples {
                out.push_str(name);
                if !labels.is_empty() {
                    out.push('{');
                    for (idx, (k, v)) in labels.iter().enumerate() {
                        if idx > 0 {
                            out.push(',');
                        }
                        let _ = write!(out, "{k}=\"{}\"", escape_label_value(v));
                    }
                    out.push('}');
                }
                let _ = writeln!(out, " {}", format_value(*value));
            }
        }

        out
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Family>> {
        self.families.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Family>> {
        self.families.write().unwrap_or_else(|e| e.into_inner())
    }
}

fn normalize_labels(labels: &[(&str, &str)]) -> Labels {
    let mut out: Labels = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();
    out.sort();
    out
}

fn escape_label_value(v: &str) -> String {
    v.replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('\n', "\\n")
}

fn escape_help(v: &str) -> String {
    v.replace('\\', "\\\\").replace('\n', "\\n")
}

fn format_value(v: f64) -> String {
    if v.is_nan() {
        "NaN".to_string()
    } else if v == f64::INFINITY {
        "+Inf".to_string()
    } else if v == f64::NEG_INFINITY {
        "-Inf".to_string()
    } else {
        v.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_overwrites_in_place() {
        let registry = MetricsRegistry::new();
        registry.publish("euribor_rate_percent", &[("maturity", "3M")], 2.0);
        registry.publish("euribor_rate_percent", &[("maturity", "3M")], 2.1);
        registry.publish("euribor_rate_percent", &[("maturity", "6M")], 2.2);

        assert_eq!(registry.get("euribor_rate_percent", &[("maturity", "3M")]), Some(2.1));
        assert_eq!(registry.get("euribor_rate_percent", &[("maturity", "6M")]), Some(2.2));
        assert_eq!(registry.get("euribor_rate_percent", &[("maturity", "1M")]), None);
    }

    #[test]
    fn label_order_does_not_matter() {
        let registry = MetricsRegistry::new();
        registry.publish(INFO, &[("version", "1.0"), ("source", "x")], 1.0);
        assert_eq!(registry.get(INFO, &[("source", "x"), ("version", "1.0")]), Some(1.0));
    }

    #[test]
    fn render_text_format() {
        let registry = MetricsRegistry::with_exporter_metrics();
        registry.publish("euribor_daily_rate_percent", &[("maturity", "1W")], -0.123);
        registry.publish("euribor_daily_scrape_success", &[("maturity", "1W")], 0.0);
        registry.publish(INFO, &[("source", "a \"quoted\"\nvalue")], 1.0);

        let text = registry.render();
        assert!(text.contains(
            "# HELP euribor_daily_rate_percent Daily Euribor rate in percent (scraped from euribor-rates.eu)\n"
        ));
        assert!(text.contains("# TYPE euribor_daily_rate_percent gauge\n"));
        assert!(text.contains("euribor_daily_rate_percent{maturity=\"1W\"} -0.123\n"));
        assert!(text.contains("euribor_daily_scrape_success{maturity=\"1W\"} 0\n"));
        assert!(text.contains("euribor_exporter_info{source=\"a \\\"quoted\\\"\\nvalue\"} 1\n"));
        // Described families without samples are not rendered.
        assert!(!text.contains("euribor_rate_percent"));
    }

    #[test]
    fn special_values_use_exposition_spelling() {
        assert_eq!(format_value(f64::NAN), "NaN");
        assert_eq!(format_value(f64::INFINITY), "+Inf");
        assert_eq!(format_value(f64::NEG_INFINITY), "-Inf");
        assert_eq!(format_value(1_764_460_800.0), "1764460800");
    }

    #[test]
    fn concurrent_writers_each_keep_their_cell() {
        use std::sync::Arc;

        let registry = Arc::new(MetricsRegistry::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    let label = format!("m{i}");
                    for n in 0..100 {
                        registry.publish("g", &[("maturity", &label)], n as f64);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        for i in 0..8 {
            assert_eq!(registry.get("g", &[("maturity", &format!("m{i}"))]), Some(99.0));
        }
    }
}
