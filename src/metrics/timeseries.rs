use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};

//a point in the equity curve
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EquityPoint {
    pub timestamp: DateTime<Utc>,
    pub equity: f64,
    pub drawdown: f64,
    pub returns: f64,
}

impl EquityPoint {
    pub fn new(timestamp: DateTime<Utc>, equity: f64, drawdown: f64, returns: f64) -> Self {
        EquityPoint {
            timestamp,
            equity,
            drawdown,
            returns,
        }
    }
}

//calculates the equity curve with drawdowns
pub fn calculate_equity_curve(
    timestamps: &[DateTime<Utc>],
    equity_values: &[f64],
    initial_balance: f64,
) -> Vec<EquityPoint> {
    let mut curve = Vec::with_capacity(timestamps.len());
    let mut peak = initial_balance;
    let mut prev_equity = initial_balance;

    for (&timestamp, &equity) in timestamps.iter().zip(equity_values.iter()) {
        //update peak
        if equity > peak {
            peak = equity;
        }

        //calculate drawdown
        let drawdown = if peak > 0.0 {
            (peak - equity) / peak
        } else {
            0.0
        };

        //first point is measured against the starting balance
        let returns = if prev_equity != 0.0 {
            (equity - prev_equity) / prev_equity
        } else {
            0.0
        };

        curve.push(EquityPoint::new(timestamp, equity, drawdown, returns));
        prev_equity = equity;
    }

    curve
}

//calculates maximum drawdown from equity curve
pub fn max_drawdown(equity_curve: &[EquityPoint]) -> f64 {
    equity_curve
        .iter()
        .map(|point| point.drawdown)
        .fold(0.0, f64::max)
}

//calculates returns from equity values
pub fn calculate_returns(equity_values: &[f64]) -> Vec<f64> {
    equity_values
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) / pair[0])
        .collect()
}

//one return per calendar year, each measured from the previous year's
//closing equity (the first year from the initial balance)
pub fn yearly_returns(equity_curve: &[EquityPoint], initial_balance: f64) -> Vec<(i32, f64)> {
    let mut returns = Vec::new();
    let mut base = initial_balance;

    let mut iter = equity_curve.iter().peekable();
    while let Some(point) = iter.next() {
        let year = point.timestamp.year();
        let year_ends = iter
            .peek()
            .map_or(true, |next| next.timestamp.year() != year);

        if year_ends {
            returns.push((year, (point.equity - base) / base));
            base = point.equity;
        }
    }

    returns
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn ts(year: i32, month: u32, day: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(year, month, day, 0, 0, 0).unwrap()
    }

    #[test]
    fn tracks_drawdown_from_peak() {
        let times = [ts(2024, 1, 2), ts(2024, 1, 3), ts(2024, 1, 4)];
        let curve = calculate_equity_curve(&times, &[110.0, 99.0, 120.0], 100.0);

        assert!((curve[0].returns - 0.1).abs() < 1e-12);
        assert!((curve[1].drawdown - 0.1).abs() < 1e-12);
        assert_eq!(curve[2].drawdown, 0.0);
        assert!((max_drawdown(&curve) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn splits_returns_by_calendar_year() {
        let times = [
            ts(2022, 6, 1),
            ts(2022, 12, 30),
            ts(2023, 3, 1),
            ts(2023, 12, 29),
            ts(2024, 1, 2),
        ];
        let curve = calculate_equity_curve(&times, &[105.0, 110.0, 90.0, 99.0, 99.0], 100.0);
        let yearly = yearly_returns(&curve, 100.0);

        assert_eq!(yearly.len(), 3);
        assert_eq!(yearly[0].0, 2022);
        assert!((yearly[0].1 - 0.10).abs() < 1e-12);
        assert!((yearly[1].1 - (-0.10)).abs() < 1e-12);
        assert_eq!(yearly[2].1, 0.0);
    }

    #[test]
    fn returns_need_two_points() {
        assert!(calculate_returns(&[100.0]).is_empty());
        assert_eq!(calculate_returns(&[100.0, 110.0]), vec![0.1]);
    }
}
