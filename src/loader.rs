use std::fs::File;
use std::path::Path;

use anyhow::{anyhow, Context, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime, TimeZone};
use chrono_tz::Tz;
use csv::StringRecord;
use thiserror::Error;
use tracing::{debug, warn};

use crate::data::Bar;

/// Nominal sampling interval of the bar feed.
pub const NOMINAL_INTERVAL_MINUTES: i64 = 15;

#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("input file contains no valid rows")]
    Empty,

    #[error("unable to infer timestamp from record: {0:?}")]
    Timestamp(StringRecord),

    #[error("failed to parse numeric field '{field}' from value '{value}'")]
    ParseNumber { field: &'static str, value: String },

    #[error("numeric field '{field}' is not finite: '{value}'")]
    NonFinite { field: &'static str, value: String },

    #[error("bar high {high} is below low {low}")]
    InvertedRange { high: f64, low: f64 },
}

/// Load OHLC bars from a CSV file, interpreting naive timestamps in `tz`.
///
/// Rows are either `datetime,open,high,low,close[,...]` or
/// `date,time,open,high,low,close[,...]`; trailing columns such as volume are
/// ignored and header rows are skipped.
pub fn load_bars_from_csv<P: AsRef<Path>>(path: P, tz: Tz) -> Result<Vec<Bar>> {
    let path_ref = path.as_ref();
    let file = File::open(path_ref).with_context(|| format!("failed to open {:?}", path_ref))?;
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(file);

    let mut bars = Vec::new();
    for record in reader.records() {
        let record = record?;
        if record.iter().all(|field| field.trim().is_empty()) {
            continue;
        }
        match parse_record(&record, tz) {
            Ok(Some(bar)) => bars.push(bar),
            Ok(None) => continue,
            Err(err) => return Err(err),
        }
    }

    if bars.is_empty() {
        return Err(LoaderError::Empty.into());
    }

    bars.sort_by_key(|bar| bar.timestamp);
    debug!(rows = bars.len(), path = ?path_ref, "loaded bars");
    Ok(bars)
}

fn parse_record(record: &StringRecord, tz: Tz) -> Result<Option<Bar>> {
    // Skip header rows by checking the first field.
    if let Some(first) = record.get(0) {
        let first = first.trim();
        if first.eq_ignore_ascii_case("date")
            || first.eq_ignore_ascii_case("datetime")
            || first.eq_ignore_ascii_case("timestamp")
        {
            return Ok(None);
        }
    }

    let fields: Vec<String> = record
        .iter()
        .map(|f| f.trim().to_string())
        .filter(|f| !f.is_empty())
        .collect();
    if fields.len() < 5 {
        return Ok(None);
    }

    let (datetime, offset) = match parse_datetime_string(fields[0].as_str())? {
        Some(dt) => (dt, 1),
        None if fields.len() >= 6 => (parse_datetime_pair(&fields[0], &fields[1])?, 2),
        None => return Err(anyhow!(LoaderError::Timestamp(record.clone()))),
    };

    let timestamp = match tz.from_local_datetime(&datetime) {
        chrono::LocalResult::Single(dt) => dt,
        chrono::LocalResult::Ambiguous(dt, _) => dt,
        chrono::LocalResult::None => tz.from_utc_datetime(&datetime),
    };

    let open = parse_number(fields.get(offset).map(String::as_str), "open")?;
    let high = parse_number(fields.get(offset + 1).map(String::as_str), "high")?;
    let low = parse_number(fields.get(offset + 2).map(String::as_str), "low")?;
    let close = parse_number(fields.get(offset + 3).map(String::as_str), "close")?;
    if high < low {
        return Err(LoaderError::InvertedRange { high, low }.into());
    }

    Ok(Some(Bar {
        timestamp,
        open,
        high,
        low,
        close,
    }))
}

fn parse_number(value: Option<&str>, field: &'static str) -> Result<f64> {
    let value = value.ok_or_else(|| LoaderError::ParseNumber {
        field,
        value: String::from("<missing>"),
    })?;
    let parsed = value
        .replace(',', "")
        .parse::<f64>()
        .map_err(|_| LoaderError::ParseNumber {
            field,
            value: value.to_string(),
        })?;
    if !parsed.is_finite() {
        return Err(LoaderError::NonFinite {
            field,
            value: value.to_string(),
        }
        .into());
    }
    Ok(parsed)
}

fn parse_datetime_pair(date_str: &str, time_str: &str) -> Result<NaiveDateTime> {
    let date = parse_date(date_str)?;
    let time = parse_time(time_str)?;
    Ok(NaiveDateTime::new(date, time))
}

fn parse_datetime_string(value: &str) -> Result<Option<NaiveDateTime>> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S",
        "%Y/%m/%d %H:%M:%S",
        "%m/%d/%Y %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
    ];

    for pattern in &patterns {
        if let Ok(datetime) = NaiveDateTime::parse_from_str(trimmed, pattern) {
            return Ok(Some(datetime));
        }
    }

    Ok(None)
}

fn parse_date(value: &str) -> Result<NaiveDate> {
    let patterns = [
        "%Y-%m-%d",
        "%Y-%-m-%-d",
        "%Y-%-m-%d",
        "%Y-%m-%-d",
        "%Y/%m/%d",
        "%Y/%-m/%-d",
        "%Y/%-m/%d",
        "%Y/%m/%-d",
        "%m/%d/%Y",
        "%m/%-d/%Y",
        "%-m/%d/%Y",
        "%-m/%-d/%Y",
    ];
    for pattern in &patterns {
        if let Ok(date) = NaiveDate::parse_from_str(value, pattern) {
            return Ok(date);
        }
    }
    Err(LoaderError::Timestamp(StringRecord::from(vec![value.to_string()])).into())
}

fn parse_time(value: &str) -> Result<NaiveTime> {
    let patterns = ["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];
    for pattern in &patterns {
        if let Ok(time) = NaiveTime::parse_from_str(value, pattern) {
            return Ok(time);
        }
    }
    Err(LoaderError::Timestamp(StringRecord::from(vec![value.to_string()])).into())
}

/// Check ordering and length; gaps beyond the nominal interval are logged, not resampled.
pub fn validate_series(bars: &[Bar], min_len: usize) -> Result<()> {
    if bars.len() < min_len {
        return Err(anyhow!(
            "not enough bars for analysis (need at least {min_len}, got {})",
            bars.len()
        ));
    }

    for pair in bars.windows(2) {
        if pair[1].timestamp <= pair[0].timestamp {
            return Err(anyhow!("timestamps must be strictly increasing"));
        }
    }

    let gaps = count_gaps(bars, Duration::minutes(NOMINAL_INTERVAL_MINUTES));
    if gaps > 0 {
        warn!(gaps, "series has gaps wider than the nominal interval");
    }

    Ok(())
}

pub fn count_gaps(bars: &[Bar], interval: Duration) -> usize {
    bars.windows(2)
        .filter(|pair| pair[1].timestamp - pair[0].timestamp > interval)
        .count()
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use chrono_tz::{America::New_York, UTC};

    use super::*;
    use crate::data::fixtures::bars_from;

    fn write_csv(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn parses_single_and_split_timestamp_rows() {
        let file = write_csv(
            "Datetime,Open,High,Low,Close,Volume\n\
             2025-10-01 09:15:00,1.0,1.5,0.5,1.2,100\n\
             2025-10-01,09:00,1.1,1.6,0.9,1.0\n",
        );
        let bars = load_bars_from_csv(file.path(), UTC).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].timestamp.format("%H:%M").to_string(), "09:00");
        assert_eq!(bars[0].close, 1.0);
        assert_eq!(bars[1].high, 1.5);
    }

    #[test]
    fn applies_requested_timezone() {
        let file = write_csv("2025-10-01 09:30:00,1,2,0.5,1.5\n");
        let bars = load_bars_from_csv(file.path(), New_York).unwrap();
        assert_eq!(bars[0].timestamp.timezone(), New_York);
        assert_eq!(bars[0].timestamp.naive_utc().format("%H:%M").to_string(), "13:30");
    }

    #[test]
    fn rejects_bad_numbers_and_inverted_bars() {
        let bad = write_csv("2025-10-01 09:30:00,1,abc,0.5,1.5\n");
        assert!(load_bars_from_csv(bad.path(), UTC).is_err());
        let inverted = write_csv("2025-10-01 09:30:00,1,0.5,2,1.5\n");
        assert!(load_bars_from_csv(inverted.path(), UTC).is_err());
    }

    #[test]
    fn rejects_non_finite_prices() {
        for row in [
            "2025-10-01 09:30:00,1,2,0.5,NaN\n",
            "2025-10-01 09:30:00,1,inf,0.5,1.5\n",
            "2025-10-01 09:30:00,1,2,-infinity,1.5\n",
        ] {
            let file = write_csv(row);
            let err = load_bars_from_csv(file.path(), UTC).unwrap_err();
            assert!(matches!(
                err.downcast_ref::<LoaderError>(),
                Some(LoaderError::NonFinite { .. })
            ));
        }
    }

    #[test]
    fn empty_file_is_an_error() {
        let file = write_csv("Date,Open,High,Low,Close\n");
        assert!(load_bars_from_csv(file.path(), UTC).is_err());
    }

    #[test]
    fn validation_checks_length_and_order() {
        let bars = bars_from(&[(2.0, 1.0, 1.5); 5]);
        assert!(validate_series(&bars, 5).is_ok());
        assert!(validate_series(&bars, 6).is_err());

        let mut reversed = bars.clone();
        reversed.reverse();
        assert!(validate_series(&reversed, 2).is_err());
    }

    #[test]
    fn counts_gaps_wider_than_interval() {
        let mut bars = bars_from(&[(2.0, 1.0, 1.5); 4]);
        bars[3].timestamp = bars[3].timestamp + Duration::hours(2);
        assert_eq!(count_gaps(&bars, Duration::minutes(15)), 1);
    }
}
