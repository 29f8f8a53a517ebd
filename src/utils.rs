use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use log::debug;
use rust_decimal::{Decimal, RoundingStrategy};

use crate::config::DateFormat;
use crate::error::Result;

const DAY_FIRST_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];
const MONTH_FIRST_FORMATS: [&str; 4] = ["%m/%d/%Y", "%m-%d-%Y", "%m.%d.%Y", "%Y-%m-%d"];

/// Parse a date string under the configured convention.
///
/// Tries the conventional formats in order and falls back to ISO; returns
/// `None` on failure rather than an error, since unparseable dates are a
/// quality-gate concern, not a parsing-stage one.
pub fn parse_flexible_date(value: &str, date_format: DateFormat) -> Option<NaiveDate> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    let formats = match date_format {
        DateFormat::DayFirst => &DAY_FIRST_FORMATS,
        DateFormat::MonthFirst => &MONTH_FIRST_FORMATS,
    };

    formats
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(trimmed, format).ok())
}

/// Round a monetary value to `decimals` places using midpoint-nearest-even.
///
/// Every monetary rounding in the crate goes through here so equality
/// comparisons on rounded amounts stay exact.
pub fn round_money(value: Decimal, decimals: u32) -> Decimal {
    value.round_dp_with_strategy(decimals, RoundingStrategy::MidpointNearestEven)
}

/// Create directories if they do not exist.
pub fn ensure_directories(paths: &[&Path]) -> Result<()> {
    for path in paths {
        fs::create_dir_all(path)?;
        debug!("Ensured directory exists: {}", path.display());
    }
    Ok(())
}
