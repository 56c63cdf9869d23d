use crate::data::Bar;

//average true range with wilder smoothing (alpha = 1/period)
//the first bar has no previous close so it yields no true range;
//the smoother seeds on the mean of the first `period` true ranges,
//so the first value appears on bar `period + 1`
#[derive(Debug, Clone)]
pub struct Atr {
    period: usize,
    prev_close: Option<f64>,
    seed: Vec<f64>,
    current: Option<f64>,
}

impl Atr {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "ATR period must be >= 1");
        Atr {
            period,
            prev_close: None,
            seed: Vec::with_capacity(period),
            current: None,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    //feeds the next bar and returns the current atr
    pub fn update(&mut self, bar: &Bar) -> Option<f64> {
        let prev_close = self.prev_close.replace(bar.close);
        if prev_close.is_none() {
            return None;
        }

        let tr = bar.true_range(prev_close);
        let period = self.period as f64;

        self.current = match self.current {
            Some(prev) => Some((prev * (period - 1.0) + tr) / period),
            None => {
                self.seed.push(tr);
                if self.seed.len() == self.period {
                    Some(self.seed.iter().sum::<f64>() / period)
                } else {
                    None
                }
            }
        };

        self.current
    }

    pub fn value(&self) -> Option<f64> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    const EPS: f64 = 1e-9;

    fn make_bars(data: &[(f64, f64, f64, f64)]) -> Vec<Bar> {
        let base = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        data.iter()
            .enumerate()
            .map(|(i, &(open, high, low, close))| {
                Bar::new_unchecked(base + Duration::days(i as i64), open, high, low, close, 1000.0)
            })
            .collect()
    }

    #[test]
    fn seeds_then_smooths() {
        let bars = make_bars(&[
            (100.0, 105.0, 95.0, 102.0),  // no previous close
            (102.0, 108.0, 100.0, 106.0), // TR = 8
            (106.0, 107.0, 98.0, 99.0),   // TR = 9
            (99.0, 103.0, 97.0, 101.0),   // TR = 6
            (101.0, 106.0, 100.0, 105.0), // TR = 6
        ]);
        let mut atr = Atr::new(3);
        let values: Vec<_> = bars.iter().map(|b| atr.update(b)).collect();

        assert!(values[..3].iter().all(Option::is_none));
        assert!((values[3].unwrap() - 23.0 / 3.0).abs() < EPS);
        assert!((values[4].unwrap() - 64.0 / 9.0).abs() < EPS);
    }

    #[test]
    fn warm_up_is_period_plus_one_bars() {
        let bars = make_bars(&[(10.0, 11.0, 9.0, 10.0); 20]);
        let mut atr = Atr::new(14);
        let first_defined = bars
            .iter()
            .position(|b| atr.update(b).is_some())
            .unwrap();
        assert_eq!(first_defined, 14);
        assert!((atr.value().unwrap() - 2.0).abs() < EPS);
    }
}
