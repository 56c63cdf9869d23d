use std::collections::VecDeque;

//rolling simple moving average over closes
//no value until `period` closes have been pushed
#[derive(Debug, Clone)]
pub struct Sma {
    period: usize,
    window: VecDeque<f64>,
    sum: f64,
}

impl Sma {
    pub fn new(period: usize) -> Self {
        assert!(period >= 1, "SMA period must be >= 1");
        Sma {
            period,
            window: VecDeque::with_capacity(period),
            sum: 0.0,
        }
    }

    pub fn period(&self) -> usize {
        self.period
    }

    //feeds the next close and returns the current average
    pub fn update(&mut self, close: f64) -> Option<f64> {
        if self.window.len() == self.period {
            if let Some(leaving) = self.window.pop_front() {
                self.sum -= leaving;
            }
        }
        self.window.push_back(close);
        self.sum += close;

        self.value()
    }

    pub fn value(&self) -> Option<f64> {
        if self.window.len() < self.period {
            return None;
        }
        Some(self.sum / self.period as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_until_window_fills() {
        let mut sma = Sma::new(3);
        assert_eq!(sma.update(1.0), None);
        assert_eq!(sma.update(2.0), None);
        assert_eq!(sma.update(3.0), Some(2.0));
    }

    #[test]
    fn rolls_forward() {
        let mut sma = Sma::new(2);
        sma.update(10.0);
        assert_eq!(sma.update(20.0), Some(15.0));
        assert_eq!(sma.update(40.0), Some(30.0));
        assert_eq!(sma.update(0.0), Some(20.0));
    }

    #[test]
    fn period_one_tracks_close() {
        let mut sma = Sma::new(1);
        assert_eq!(sma.update(7.5), Some(7.5));
        assert_eq!(sma.update(8.5), Some(8.5));
    }
}
