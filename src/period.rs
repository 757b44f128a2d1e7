//! Time coverage of the full dataset, derived from its (year, quarter) columns.
//!
//! The start is the first instant of the earliest quarter seen in the earliest
//! year; the end is the last second of the latest quarter seen in the latest
//! year. Missing quarters in between are not detected.

use camino::Utf8Path;
use chrono::{NaiveDate, NaiveDateTime};

use crate::columnar::ColumnarReader;
use crate::domain::TimePeriod;
use crate::error::CcviError;

pub fn extract_period(
    reader: &dyn ColumnarReader,
    path: &Utf8Path,
    year_column: &str,
    quarter_column: &str,
) -> Result<TimePeriod, CcviError> {
    let mut columns = reader.read_columns(path, &[year_column, quarter_column])?;
    let years = take_column(&mut columns, path, year_column)?;
    let quarters = take_column(&mut columns, path, quarter_column)?;
    period_from_rows(path.as_str(), &years, &quarters)
}

fn take_column(
    columns: &mut std::collections::BTreeMap<String, Vec<i64>>,
    path: &Utf8Path,
    name: &str,
) -> Result<Vec<i64>, CcviError> {
    let values = columns.remove(name).ok_or_else(|| CcviError::MalformedData {
        path: path.to_string(),
        message: format!("column {name} is missing"),
    })?;
    if values.is_empty() {
        return Err(CcviError::MalformedData {
            path: path.to_string(),
            message: format!("column {name} is empty"),
        });
    }
    Ok(values)
}

/// `years[i]` and `quarters[i]` describe row `i`.
pub fn period_from_rows(
    source: &str,
    years: &[i64],
    quarters: &[i64],
) -> Result<TimePeriod, CcviError> {
    if years.len() != quarters.len() {
        return Err(CcviError::MalformedData {
            path: source.to_string(),
            message: format!(
                "year and quarter columns differ in length ({} vs {})",
                years.len(),
                quarters.len()
            ),
        });
    }
    if let Some(value) = quarters.iter().copied().find(|q| !(1..=4).contains(q)) {
        return Err(CcviError::AmbiguousQuarter {
            path: source.to_string(),
            value,
        });
    }

    let (year_min, year_max) = match (years.iter().min(), years.iter().max()) {
        (Some(min), Some(max)) => (*min, *max),
        _ => {
            return Err(CcviError::MalformedData {
                path: source.to_string(),
                message: "no rows".to_string(),
            });
        }
    };
    let rows = || years.iter().copied().zip(quarters.iter().copied());
    let quarter_min = rows()
        .filter(|(year, _)| *year == year_min)
        .map(|(_, quarter)| quarter)
        .min();
    let quarter_max = rows()
        .filter(|(year, _)| *year == year_max)
        .map(|(_, quarter)| quarter)
        .max();
    let (Some(quarter_min), Some(quarter_max)) = (quarter_min, quarter_max) else {
        return Err(CcviError::MalformedData {
            path: source.to_string(),
            message: "no rows".to_string(),
        });
    };

    let start = quarter_start(calendar_year(source, year_min)?, quarter_min as u32)
        .ok_or_else(|| out_of_range(source, year_min))?;
    let end = quarter_end(calendar_year(source, year_max)?, quarter_max as u32)
        .ok_or_else(|| out_of_range(source, year_max))?;
    TimePeriod::new(start, end).ok_or_else(|| CcviError::MalformedData {
        path: source.to_string(),
        message: format!("period start {start} is after end {end}"),
    })
}

/// Midnight on the first day of quarter `quarter` (1..=4).
pub fn quarter_start(year: i32, quarter: u32) -> Option<NaiveDateTime> {
    if !(1..=4).contains(&quarter) {
        return None;
    }
    NaiveDate::from_ymd_opt(year, 3 * (quarter - 1) + 1, 1)?.and_hms_opt(0, 0, 0)
}

/// 23:59:59 on the last day of quarter `quarter` (1..=4).
pub fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDateTime> {
    if !(1..=4).contains(&quarter) {
        return None;
    }
    let last_day = if quarter == 4 {
        NaiveDate::from_ymd_opt(year, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(year, 3 * quarter + 1, 1)?.pred_opt()?
    };
    last_day.and_hms_opt(23, 59, 59)
}

fn calendar_year(source: &str, year: i64) -> Result<i32, CcviError> {
    i32::try_from(year).map_err(|_| out_of_range(source, year))
}

fn out_of_range(source: &str, year: i64) -> CcviError {
    CcviError::MalformedData {
        path: source.to_string(),
        message: format!("year {year} is outside the calendar range"),
    }
}
