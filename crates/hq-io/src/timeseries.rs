//! Snapshot CSV tables: first column is the timestamp, the header names
//! the remaining columns (loads or generators).

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use csv::ReaderBuilder;
use hq_core::TimeSeriesTable;

use crate::DataLoadError;

const TIMESTAMP_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Parse a snapshot timestamp; bare dates read as midnight.
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    TIMESTAMP_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(value, "%Y-%m-%d")
                .ok()
                .map(|d| d.and_time(NaiveTime::MIN))
        })
}

/// Parse a `YYYY-MM-DD` bound. End bounds cover the whole day.
pub fn parse_date_bound(value: &str, end_of_day: bool) -> Result<NaiveDateTime, DataLoadError> {
    let date = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| DataLoadError::InvalidDate(value.to_string()))?;
    let time = if end_of_day {
        NaiveTime::from_hms_opt(23, 59, 59).unwrap_or(NaiveTime::MIN)
    } else {
        NaiveTime::MIN
    };
    Ok(date.and_time(time))
}

pub fn read_timeseries_csv(path: &Path) -> Result<TimeSeriesTable, DataLoadError> {
    if !path.exists() {
        return Err(DataLoadError::MissingFile(path.to_path_buf()));
    }
    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| DataLoadError::csv(path, e))?;

    let headers = rdr.headers().map_err(|e| DataLoadError::csv(path, e))?.clone();
    if headers.len() < 2 {
        return Err(DataLoadError::schema(
            path,
            "expected a timestamp column followed by at least one value column",
        ));
    }
    let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut table = TimeSeriesTable::new(columns);

    for result in rdr.records() {
        let record = result.map_err(|e| DataLoadError::csv(path, e))?;
        let raw_ts = record.get(0).unwrap_or_default();
        let timestamp =
            parse_timestamp(raw_ts).ok_or_else(|| DataLoadError::InvalidTimestamp {
                path: path.to_path_buf(),
                value: raw_ts.to_string(),
            })?;
        let mut row = Vec::with_capacity(record.len().saturating_sub(1));
        for (col, cell) in record.iter().skip(1).enumerate() {
            let value = if cell.is_empty() {
                f64::NAN
            } else {
                cell.parse::<f64>().map_err(|_| {
                    DataLoadError::schema(
                        path,
                        format!(
                            "non-numeric value '{}' in column '{}' at {}",
                            cell, table.columns[col], raw_ts
                        ),
                    )
                })?
            };
            row.push(value);
        }
        table.push_row(timestamp, row)?;
    }
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn parses_common_timestamp_shapes() {
        assert!(parse_timestamp("2024-01-01 00:00:00").is_some());
        assert!(parse_timestamp("2024-01-01T13:00:00").is_some());
        assert!(parse_timestamp("2024-01-01 13:00").is_some());
        assert_eq!(
            parse_timestamp("2024-01-02"),
            NaiveDate::from_ymd_opt(2024, 1, 2).map(|d| d.and_time(NaiveTime::MIN))
        );
        assert!(parse_timestamp("01/02/2024").is_none());
    }

    #[test]
    fn end_bound_covers_the_day() {
        let end = parse_date_bound("2024-01-31", true).unwrap();
        assert_eq!(end.to_string(), "2024-01-31 23:59:59");
        assert!(parse_date_bound("2024-31-01", false).is_err());
    }

    #[test]
    fn reads_table_with_missing_cells() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "snapshot,Montreal,Quebec").unwrap();
        writeln!(file, "2024-01-01 00:00:00,100.5,50").unwrap();
        writeln!(file, "2024-01-01 01:00:00,,55").unwrap();

        let table = read_timeseries_csv(file.path()).unwrap();
        assert_eq!(table.columns, vec!["Montreal", "Quebec"]);
        assert_eq!(table.len(), 2);
        assert!(table.value(1, "Montreal").unwrap().is_nan());
        assert_eq!(table.row_sum(1), 55.0);
    }

    #[test]
    fn bad_timestamp_is_reported() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "snapshot,Montreal").unwrap();
        writeln!(file, "yesterday,1").unwrap();
        let err = read_timeseries_csv(file.path()).unwrap_err();
        assert!(matches!(err, DataLoadError::InvalidTimestamp { .. }));
    }
}
