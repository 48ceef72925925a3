//! Locale-tolerant parsing of rate and date tokens.
//!
//! Rates arrive as free text such as `"2.524 %"`, `"2,524%"` or `"-0.123 %"`.
//! Dates arrive in whichever regional layout the upstream page currently uses,
//! so `parse_date` walks a fixed, ordered list of layouts and returns the first
//! match. Reordering `DATE_LAYOUTS` changes which interpretation wins for
//! ambiguous input such as `03/04/2025`.

use chrono::NaiveDate;

use crate::error::ParseError;

/// Date layouts in priority order (chrono `strftime` syntax).
///
/// US slash order is tried before EU slash order, so `03/04/2025` reads as
/// March 4th.
pub const DATE_LAYOUTS: &[(&str, &str)] = &[
    ("%m/%d/%Y", "MM/DD/YYYY (US)"),
    ("%d/%m/%Y", "DD/MM/YYYY (EU)"),
    ("%Y-%m-%d", "YYYY-MM-DD (ISO)"),
    ("%d-%m-%Y", "DD-MM-YYYY"),
    ("%m-%d-%Y", "MM-DD-YYYY"),
    ("%-d.%-m.%Y", "D.M.YYYY (short dotted)"),
    ("%d.%m.%Y", "DD.MM.YYYY (dotted EU)"),
    ("%b %d, %Y", "Mon D, YYYY"),
    ("%d %b %Y", "D Mon YYYY"),
    ("%B %d, %Y", "Month D, YYYY"),
    ("%d %B %Y", "D Month YYYY"),
];

/// Parse a percent rate such as `"2.524 %"` or `"2,524%"`.
pub fn parse_rate(text: &str) -> Result<f64, ParseError> {
    let trimmed = text.trim().replace('%', "");
    let normalized = trimmed.trim().replace(',', ".");

    let mut cleaned = String::with_capacity(normalized.len());
    for ch in normalized.chars() {
        let keep = ch.is_ascii_digit() || ch == '.' || (ch == '-' && cleaned.is_empty());
        if keep {
            cleaned.push(ch);
        }
    }

    if cleaned.is_empty() || cleaned == "-" {
        return Err(ParseError::EmptyRate {
            input: text.to_string(),
        });
    }

    cleaned
        .parse::<f64>()
        .map_err(|source| ParseError::InvalidRate {
            input: text.to_string(),
            cleaned: cleaned.clone(),
            source,
        })
}

/// Parse a publication date using the first matching entry of `DATE_LAYOUTS`.
pub fn parse_date(text: &str) -> Result<NaiveDate, ParseError> {
    let s = text.trim();

    let mut last_err = None;
    for (layout, _) in DATE_LAYOUTS {
        match NaiveDate::parse_from_str(s, layout) {
            Ok(date) => return Ok(date),
            Err(e) => last_err = Some(e),
        }
    }

    Err(ParseError::InvalidDate {
        input: text.to_string(),
        source: last_err,
    })
}

/// Last calendar day of the month named by a `YYYY-MM` period label.
pub fn month_end(period: &str) -> Result<NaiveDate, ParseError> {
    let first = NaiveDate::parse_from_str(&format!("{}-01", period.trim()), "%Y-%m-%d").map_err(
        |source| ParseError::InvalidDate {
            input: period.to_string(),
            source: Some(source),
        },
    )?;

    let next_month = first
        .checked_add_months(chrono::Months::new(1))
        .unwrap_or(NaiveDate::MAX);
    Ok(next_month.pred_opt().unwrap_or(first))
}
