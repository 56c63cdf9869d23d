use crate::data::bar::Bar;
use anyhow::{Context, Result};
use chrono::{DateTime, NaiveDate, Utc};
use csv::ReaderBuilder;
use serde::Deserialize;
use std::io::Read;
use std::path::Path;
use tracing::{info, warn};

//yahoo-style exports carry price/ticker/date header lines before the data
pub const PREAMBLE_LINES: usize = 3;

//columns in file order: date, close, high, low, open, volume
#[derive(Debug, Deserialize)]
struct CsvRecord {
    date: String,
    close: f64,
    high: f64,
    low: f64,
    open: f64,
    volume: f64,
}

//loads bars from a csv file
pub fn load_csv<P: AsRef<Path>>(path: P) -> Result<Vec<Bar>> {
    let path = path.as_ref();
    let file = std::fs::File::open(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let bars = parse_csv(file).with_context(|| format!("Failed to parse CSV file: {:?}", path))?;
    info!("Loaded {} bars from {:?}", bars.len(), path);

    Ok(bars)
}

//parses bars from any reader, skipping the fixed preamble
pub fn parse_csv<R: Read>(source: R) -> Result<Vec<Bar>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(source);

    let mut bars = Vec::new();
    let mut suspicious = 0usize;

    for (index, result) in reader.records().enumerate().skip(PREAMBLE_LINES) {
        let line = index + 1;
        let raw = result.context(format!("Failed to read CSV line {}", line))?;

        //tolerate trailing blank lines
        if raw.iter().all(|field| field.is_empty()) {
            continue;
        }

        let record: CsvRecord = raw
            .deserialize(None)
            .context(format!("Failed to parse CSV record at line {}", line))?;

        let timestamp = parse_date(&record.date).context(format!(
            "Failed to parse date '{}' at line {}",
            record.date, line
        ))?;

        //keep the row even if ohlc is inconsistent, but report it
        let bar = match Bar::new(
            timestamp,
            record.open,
            record.high,
            record.low,
            record.close,
            record.volume,
        ) {
            Ok(bar) => bar,
            Err(err) => {
                suspicious += 1;
                tracing::debug!("line {}: {}", line, err);
                Bar::new_unchecked(
                    timestamp,
                    record.open,
                    record.high,
                    record.low,
                    record.close,
                    record.volume,
                )
            }
        };

        bars.push(bar);
    }

    if suspicious > 0 {
        warn!("{} bars have inconsistent OHLC values", suspicious);
    }

    //sort by timestamp to ensure chronological order
    bars.sort_by(|a, b| a.timestamp.cmp(&b.timestamp));

    Ok(bars)
}

//accepts plain dates (2024-01-02) and rfc3339 timestamps
fn parse_date(raw: &str) -> Result<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .context("midnight is always a valid time")?;
        return Ok(midnight.and_utc());
    }

    let parsed = DateTime::parse_from_rfc3339(raw)?;
    Ok(parsed.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SAMPLE: &str = "\
Price,Close,High,Low,Open,Volume
Ticker,GC=F,GC=F,GC=F,GC=F,GC=F
Date,,,,,
2024-01-03,2034.2,2047.0,2031.5,2045.0,253
2024-01-02,2064.4,2074.5,2058.7,2064.3,18
2024-01-04,2042.3,2050.1,2039.0,2040.6,175
";

    #[test]
    fn skips_preamble_and_maps_columns() {
        let bars = parse_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);

        //sorted ascending
        assert_eq!(bars[0].date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        assert_eq!(bars[2].date(), NaiveDate::from_ymd_opt(2024, 1, 4).unwrap());

        let first = &bars[0];
        assert_eq!(first.close, 2064.4);
        assert_eq!(first.high, 2074.5);
        assert_eq!(first.low, 2058.7);
        assert_eq!(first.open, 2064.3);
        assert_eq!(first.volume, 18.0);
    }

    #[test]
    fn malformed_price_is_an_error() {
        let data = SAMPLE.replace("2042.3", "abc");
        let err = parse_csv(data.as_bytes()).unwrap_err();
        assert!(format!("{:#}", err).contains("line 6"));
    }

    #[test]
    fn malformed_date_is_an_error() {
        let data = SAMPLE.replace("2024-01-04", "04/01/2024");
        assert!(parse_csv(data.as_bytes()).is_err());
    }

    #[test]
    fn accepts_rfc3339_dates() {
        let data = SAMPLE.replace("2024-01-04", "2024-01-04T00:00:00Z");
        let bars = parse_csv(data.as_bytes()).unwrap();
        assert_eq!(bars.len(), 3);
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let bars = load_csv(file.path()).unwrap();
        assert_eq!(bars.len(), 3);
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_csv("/definitely/not/here.csv").is_err());
    }
}
