//! Locate the most recent (date, rate) pair in a rates page.
//!
//! The page layout is not under our control, so extraction walks an ordered
//! list of table strategies and takes the first one that yields a row with at
//! least two cells:
//!
//! 1. the history table (`table.table_historiek`), first body row
//! 2. the first row of the first generic table whose first row has two cells
//!
//! The first cell is the publication date and the second the rate. A rate that
//! cannot be parsed fails the extraction; a date that cannot be parsed is
//! replaced with the current time.

use chrono::{DateTime, Utc};
use scraper::{ElementRef, Html, Selector};

use crate::domain::{midnight_utc, Maturity};
use crate::error::FetchError;
use crate::parse::{parse_date, parse_rate};

/// CSS class of the history table on the rates page.
pub const HISTORY_TABLE_CLASS: &str = "table_historiek";

/// Raw cell text picked out of the document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateCells {
    pub date: String,
    pub rate: String,
    pub strategy: TableStrategy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableStrategy {
    HistoryTable,
    FirstTable,
}

impl TableStrategy {
    /// Strategies in the order they are tried.
    pub const ORDER: [TableStrategy; 2] = [TableStrategy::HistoryTable, TableStrategy::FirstTable];

    fn find(self, doc: &Html, sel: &Selectors) -> Option<RateCells> {
        let row = match self {
            TableStrategy::HistoryTable => doc.select(&sel.history_rows).next(),
            TableStrategy::FirstTable => doc
                .select(&sel.tables)
                .filter_map(|table| table.select(&sel.rows).next())
                .find(|row| sel.data_cells(row).len() >= 2),
        }?;

        let mut cells = sel.data_cells(&row).into_iter();
        let (date, rate) = (cells.next()?, cells.next()?);
        Some(RateCells {
            date,
            rate,
            strategy: self,
        })
    }
}

/// Selectors used by the table strategies, parsed once per document.
struct Selectors {
    history_rows: Selector,
    tables: Selector,
    rows: Selector,
    cells: Selector,
}

impl Selectors {
    fn new() -> Result<Self, FetchError> {
        Ok(Self {
            history_rows: selector(&format!("table.{HISTORY_TABLE_CLASS} tbody tr"))?,
            tables: selector("table")?,
            rows: selector("tr")?,
            cells: selector("td")?,
        })
    }

    fn data_cells(&self, row: &ElementRef<'_>) -> Vec<String> {
        row.select(&self.cells)
            .map(|cell| cell.text().collect::<String>().trim().to_string())
            .collect()
    }
}

/// Extracted rate and publication time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extracted {
    pub rate: f64,
    pub published_at: DateTime<Utc>,
    /// False when the date cell could not be parsed and `published_at` is "now".
    pub date_parsed: bool,
}

/// Find the raw (date, rate) cells using the first strategy that matches.
pub fn find_rate_cells(doc: &Html) -> Result<RateCells, FetchError> {
    let sel = Selectors::new()?;
    TableStrategy::ORDER
        .into_iter()
        .find_map(|strategy| strategy.find(doc, &sel))
        .ok_or_else(|| FetchError::extraction("could not find rate data in HTML"))
}

/// Extract the latest rate and its publication time from a parsed page.
pub fn extract_rate(doc: &Html, maturity: Maturity) -> Result<Extracted, FetchError> {
    let cells = find_rate_cells(doc)?;

    tracing::debug!(
        maturity = %maturity,
        strategy = ?cells.strategy,
        date_str = %cells.date,
        rate_str = %cells.rate,
        "Located rate cells"
    );

    let rate = parse_rate(&cells.rate).map_err(|e| FetchError::Extraction {
        message: format!("failed to parse rate '{}'", cells.rate),
        source: Some(e),
    })?;

    let (published_at, date_parsed) = match parse_date(&cells.date) {
        Ok(date) => (midnight_utc(date), true),
        Err(e) => {
            tracing::warn!(
                maturity = %maturity,
                date_str = %cells.date,
                error = %e,
                "Failed to parse publication date, using current time"
            );
            (Utc::now(), false)
        }
    };

    Ok(Extracted {
        rate,
        published_at,
        date_parsed,
    })
}

fn selector(css: &str) -> Result<Selector, FetchError> {
    Selector::parse(css).map_err(|e| FetchError::extraction(format!("invalid selector '{css}': {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HISTORY_PAGE: &str = r#"
        <html><body>
          <table class="summary"><tr><td>ignored</td><td>9.999 %</td></tr></table>
          <table class="table_historiek">
            <thead><tr><th>Date</th><th>Rate</th></tr></thead>
            <tbody>
              <tr><td>12/13/2025</td><td>2.524 %</td></tr>
              <tr><td>12/12/2025</td><td>2.511 %</td></tr>
            </tbody>
          </table>
        </body></html>
    "#;

    #[test]
    fn history_table_wins_over_earlier_tables() {
        let doc = Html::parse_document(HISTORY_PAGE);
        let cells = find_rate_cells(&doc).unwrap();
        assert_eq!(cells.strategy, TableStrategy::HistoryTable);
        assert_eq!(cells.date, "12/13/2025");
        assert_eq!(cells.rate, "2.524 %");

        let out = extract_rate(&doc, Maturity::ThreeMonths).unwrap();
        assert_eq!(out.rate, 2.524);
        assert!(out.date_parsed);
        assert_eq!(out.published_at.date_naive().to_string(), "2025-12-13");
    }

    #[test]
    fn falls_back_to_first_generic_table() {
        let doc = Html::parse_document(
            r#"<table><tr><td> 13.12.2025 </td><td>2,031%</td><td>extra</td></tr></table>"#,
        );
        let cells = find_rate_cells(&doc).unwrap();
        assert_eq!(cells.strategy, TableStrategy::FirstTable);

        let out = extract_rate(&doc, Maturity::OneMonth).unwrap();
        assert_eq!(out.rate, 2.031);
        assert_eq!(out.published_at.date_naive().to_string(), "2025-12-13");
    }

    #[test]
    fn fallback_skips_tables_without_two_cells() {
        let doc = Html::parse_document(
            r#"<table><tr><th>Date</th><th>Rate</th></tr></table>
               <table><tr><td>2025-12-13</td><td>-0.123 %</td></tr></table>"#,
        );
        let out = extract_rate(&doc, Maturity::OneWeek).unwrap();
        assert_eq!(out.rate, -0.123);
    }

    #[test]
    fn short_history_row_defers_to_generic_table() {
        let doc = Html::parse_document(
            r#"<table><tr><td>12/12/2025</td><td>2.511 %</td></tr></table>
               <table class="table_historiek"><tbody><tr><td>pending</td></tr></tbody></table>"#,
        );
        let cells = find_rate_cells(&doc).unwrap();
        assert_eq!(cells.strategy, TableStrategy::FirstTable);
        assert_eq!(cells.rate, "2.511 %");
    }

    #[test]
    fn no_qualifying_table_is_an_extraction_error() {
        let doc = Html::parse_document(
            r#"<p>maintenance</p><table><tr><td>only one cell</td></tr></table>"#,
        );
        let err = extract_rate(&doc, Maturity::SixMonths).unwrap_err();
        assert!(matches!(err, FetchError::Extraction { source: None, .. }));
        assert!(err.to_string().contains("could not find rate data"));
    }

    #[test]
    fn unparseable_rate_is_fatal() {
        let doc = Html::parse_document(
            r#"<table class="table_historiek"><tbody><tr><td>12/13/2025</td><td>n/a</td></tr></tbody></table>"#,
        );
        let err = extract_rate(&doc, Maturity::ThreeMonths).unwrap_err();
        assert!(matches!(err, FetchError::Extraction { source: Some(_), .. }));
    }

    #[test]
    fn unparseable_date_falls_back_to_now() {
        let doc = Html::parse_document(
            r#"<table class="table_historiek"><tbody><tr><td>yesterday</td><td>2.524 %</td></tr></tbody></table>"#,
        );
        let before = Utc::now();
        let out = extract_rate(&doc, Maturity::TwelveMonths).unwrap();

        assert_eq!(out.rate, 2.524);
        assert!(!out.date_parsed);
        let drift = (out.published_at - before).num_seconds().abs();
        assert!(drift <= 5, "fallback date drifted {drift}s from now");
    }
}
