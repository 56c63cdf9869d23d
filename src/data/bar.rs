use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum BarError {
    #[error("Invalid OHLC values: high ({high}) < low ({low})")]
    InvalidHighLow { high: f64, low: f64 },
    #[error("Invalid OHLC values: close ({close}) outside high-low range [{low}, {high}]")]
    InvalidClose { close: f64, high: f64, low: f64 },
    #[error("Invalid OHLC values: open ({open}) outside high-low range [{low}, {high}]")]
    InvalidOpen { open: f64, high: f64, low: f64 },
    #[error("Negative volume: {0}")]
    NegativeVolume(f64),
    #[error("Non-finite price in bar at {0}")]
    NonFinite(DateTime<Utc>),
}

//one daily ohlcv observation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bar {
    pub timestamp: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

impl Bar {
    //creates a new Bar with validation
    pub fn new(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Result<Self, BarError> {
        if ![open, high, low, close].iter().all(|v| v.is_finite()) {
            return Err(BarError::NonFinite(timestamp));
        }

        //validate high >= low
        if high < low {
            return Err(BarError::InvalidHighLow { high, low });
        }

        //validate close within [low, high]
        if close < low || close > high {
            return Err(BarError::InvalidClose { close, high, low });
        }

        //validate open within [low, high]
        if open < low || open > high {
            return Err(BarError::InvalidOpen { open, high, low });
        }

        //validate non-negative volume
        if volume < 0.0 {
            return Err(BarError::NegativeVolume(volume));
        }

        Ok(Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        })
    }

    //creates a Bar without validation
    pub fn new_unchecked(
        timestamp: DateTime<Utc>,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
    ) -> Self {
        Bar {
            timestamp,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    //returns the range (high - low)
    pub fn range(&self) -> f64 {
        self.high - self.low
    }

    //true range against the previous close, falls back to the plain range
    pub fn true_range(&self, prev_close: Option<f64>) -> f64 {
        match prev_close {
            Some(pc) => self
                .range()
                .max((self.high - pc).abs())
                .max((self.low - pc).abs()),
            None => self.range(),
        }
    }

    //calendar date of the bar
    pub fn date(&self) -> chrono::NaiveDate {
        self.timestamp.date_naive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap()
    }

    #[test]
    fn rejects_inverted_range() {
        let err = Bar::new(ts(), 100.0, 95.0, 105.0, 100.0, 10.0).unwrap_err();
        assert_eq!(
            err,
            BarError::InvalidHighLow {
                high: 95.0,
                low: 105.0
            }
        );
    }

    #[test]
    fn rejects_close_outside_range() {
        assert!(matches!(
            Bar::new(ts(), 100.0, 105.0, 95.0, 110.0, 10.0),
            Err(BarError::InvalidClose { .. })
        ));
    }

    #[test]
    fn rejects_nan_price() {
        assert!(matches!(
            Bar::new(ts(), f64::NAN, 105.0, 95.0, 100.0, 10.0),
            Err(BarError::NonFinite(_))
        ));
    }

    #[test]
    fn true_range_uses_gap_from_previous_close() {
        let bar = Bar::new_unchecked(ts(), 110.0, 115.0, 108.0, 112.0, 0.0);
        assert_eq!(bar.true_range(None), 7.0);
        assert_eq!(bar.true_range(Some(100.0)), 15.0);
        assert_eq!(bar.true_range(Some(120.0)), 12.0);
    }
}
