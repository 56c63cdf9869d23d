use crate::engine::BacktestConfig;
use crate::instrument::FuturesContract;
use crate::portfolio::FeeSchedule;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ParamsError {
    #[error("{name} length must be at least 1")]
    ZeroLength { name: &'static str },
    #[error("fast length ({fast}) must be shorter than slow length ({slow})")]
    FastNotFaster { fast: usize, slow: usize },
    #[error("ATR multiple must be positive, got {0}")]
    NonPositiveMultiple(f64),
    #[error("position size must be at least 1")]
    ZeroSize,
    #[error("invalid range '{0}', expected start:end or start:end:step")]
    InvalidRange(String),
}

//atr trailing stop settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrailingStopParams {
    pub atr_period: usize,
    pub atr_multiple: f64,
}

impl Default for TrailingStopParams {
    fn default() -> Self {
        TrailingStopParams {
            atr_period: 14,
            atr_multiple: 2.0,
        }
    }
}

//dual moving average strategy parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StrategyParams {
    pub fast_length: usize,
    pub slow_length: usize,
    //fixed order size in contracts
    pub size: u32,
    #[serde(default)]
    pub trailing_stop: Option<TrailingStopParams>,
}

impl Default for StrategyParams {
    fn default() -> Self {
        StrategyParams {
            fast_length: 25,
            slow_length: 200,
            size: 10,
            trailing_stop: Some(TrailingStopParams::default()),
        }
    }
}

impl StrategyParams {
    //plain crossover without a stop
    pub fn crossover(fast_length: usize, slow_length: usize) -> Self {
        StrategyParams {
            fast_length,
            slow_length,
            size: 10,
            trailing_stop: None,
        }
    }

    pub fn with_lengths(&self, fast_length: usize, slow_length: usize) -> Self {
        StrategyParams {
            fast_length,
            slow_length,
            ..self.clone()
        }
    }

    //bars needed before the rule may act
    pub fn warm_up(&self) -> usize {
        self.fast_length.max(self.slow_length)
    }

    //bars until the stop atr is defined
    pub fn stop_warm_up(&self) -> Option<usize> {
        self.trailing_stop.map(|stop| stop.atr_period + 1)
    }

    //true when the rule can act before the stop atr exists
    pub fn stop_lags_warm_up(&self) -> bool {
        self.stop_warm_up().map_or(false, |bars| bars > self.warm_up())
    }

    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.fast_length == 0 {
            return Err(ParamsError::ZeroLength { name: "fast" });
        }
        if self.slow_length == 0 {
            return Err(ParamsError::ZeroLength { name: "slow" });
        }
        if self.fast_length >= self.slow_length {
            return Err(ParamsError::FastNotFaster {
                fast: self.fast_length,
                slow: self.slow_length,
            });
        }
        if self.size == 0 {
            return Err(ParamsError::ZeroSize);
        }
        if let Some(stop) = &self.trailing_stop {
            if stop.atr_period == 0 {
                return Err(ParamsError::ZeroLength { name: "ATR" });
            }
            if !(stop.atr_multiple > 0.0) {
                return Err(ParamsError::NonPositiveMultiple(stop.atr_multiple));
            }
        }
        Ok(())
    }
}

//half-open stepped range of lengths, written start:end[:step]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthRange {
    pub start: usize,
    pub end: usize,
    pub step: usize,
}

impl LengthRange {
    pub fn new(start: usize, end: usize, step: usize) -> Self {
        LengthRange { start, end, step }
    }

    pub fn values(&self) -> Vec<usize> {
        (self.start..self.end).step_by(self.step.max(1)).collect()
    }
}

impl FromStr for LengthRange {
    type Err = ParamsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParamsError::InvalidRange(s.to_string());
        let parts: Vec<usize> = s
            .split(':')
            .map(|p| p.trim().parse::<usize>().map_err(|_| invalid()))
            .collect::<Result<_, _>>()?;

        let range = match parts.as_slice() {
            [start, end] => LengthRange::new(*start, *end, 1),
            [start, end, step] => LengthRange::new(*start, *end, *step),
            _ => return Err(invalid()),
        };

        if range.step == 0 || range.start >= range.end {
            return Err(invalid());
        }
        Ok(range)
    }
}

//contract configuration (simpler than full futurescontract)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContractConfig {
    pub symbol: String,
    pub tick_size: f64,
    pub tick_value: f64,
    pub initial_margin: Option<f64>,
}

impl ContractConfig {
    //converts to a FuturesContract
    pub fn to_futures_contract(&self) -> FuturesContract {
        FuturesContract::new(
            self.symbol.clone(),
            self.tick_size,
            self.tick_value,
            self.initial_margin,
        )
    }
}

impl Default for ContractConfig {
    fn default() -> Self {
        let unit = FuturesContract::default();
        ContractConfig {
            symbol: unit.symbol,
            tick_size: unit.tick_size,
            tick_value: unit.tick_value,
            initial_margin: unit.initial_margin,
        }
    }
}

//complete backtest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestConfiguration {
    pub data_path: PathBuf,
    pub contract: ContractConfig,

    //account settings
    pub initial_balance: f64,
    pub fees: FeeSchedule,

    pub strategy: StrategyParams,

    //optional output paths
    pub output_equity_csv: Option<PathBuf>,
    pub output_trades_csv: Option<PathBuf>,
}

impl Default for BacktestConfiguration {
    fn default() -> Self {
        BacktestConfiguration {
            data_path: PathBuf::from("GC=F_historical_data.csv"),
            contract: ContractConfig::default(),
            initial_balance: 100_000.0,
            fees: FeeSchedule::default(),
            strategy: StrategyParams::default(),
            output_equity_csv: None,
            output_trades_csv: None,
        }
    }
}

impl BacktestConfiguration {
    //load configuration from a JSON file
    pub fn from_json_file(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let config: BacktestConfiguration = serde_json::from_str(&contents)?;
        config.strategy.validate()?;
        Ok(config)
    }

    //save configuration to a JSON file, refusing invalid params
    pub fn to_json_file(&self, path: &Path) -> anyhow::Result<()> {
        self.strategy.validate()?;
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn engine_config(&self) -> BacktestConfig {
        BacktestConfig {
            initial_balance: self.initial_balance,
            fees: self.fees,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(StrategyParams::default().validate().is_ok());
        assert_eq!(StrategyParams::default().warm_up(), 200);
        assert!(StrategyParams::crossover(20, 60).validate().is_ok());
    }

    #[test]
    fn rejects_bad_params() {
        assert_eq!(
            StrategyParams::crossover(0, 60).validate(),
            Err(ParamsError::ZeroLength { name: "fast" })
        );
        assert_eq!(
            StrategyParams::crossover(60, 60).validate(),
            Err(ParamsError::FastNotFaster { fast: 60, slow: 60 })
        );

        let mut params = StrategyParams::default();
        params.trailing_stop = Some(TrailingStopParams {
            atr_period: 14,
            atr_multiple: 0.0,
        });
        assert_eq!(params.validate(), Err(ParamsError::NonPositiveMultiple(0.0)));
    }

    #[test]
    fn parses_half_open_ranges() {
        let fast: LengthRange = "10:31:5".parse().unwrap();
        assert_eq!(fast.values(), vec![10, 15, 20, 25, 30]);

        let slow: LengthRange = "50:200:10".parse().unwrap();
        assert_eq!(slow.values().first(), Some(&50));
        assert_eq!(slow.values().last(), Some(&190));

        assert_eq!("3:6".parse::<LengthRange>().unwrap().values(), vec![3, 4, 5]);
        assert!("10:5".parse::<LengthRange>().is_err());
        assert!("10:20:0".parse::<LengthRange>().is_err());
        assert!("a:b".parse::<LengthRange>().is_err());
    }

    #[test]
    fn json_round_trip_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BacktestConfiguration::default();
        config.strategy = StrategyParams::crossover(20, 60);
        config.to_json_file(&path).unwrap();

        let loaded = BacktestConfiguration::from_json_file(&path).unwrap();
        assert_eq!(loaded.strategy, config.strategy);
        assert_eq!(loaded.fees, config.fees);
    }

    #[test]
    fn invalid_params_in_file_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BacktestConfiguration::default();
        config.strategy = StrategyParams::crossover(60, 20);
        std::fs::write(&path, serde_json::to_string(&config).unwrap()).unwrap();

        assert!(BacktestConfiguration::from_json_file(&path).is_err());
    }

    #[test]
    fn invalid_params_are_not_saved() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = BacktestConfiguration::default();
        config.strategy = StrategyParams::crossover(60, 20);
        assert!(config.to_json_file(&path).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn stop_warm_up_against_slow_length() {
        assert_eq!(StrategyParams::crossover(2, 4).stop_warm_up(), None);
        assert!(!StrategyParams::crossover(2, 4).stop_lags_warm_up());

        //atr 14 is defined by bar 15, well before slow 200
        assert_eq!(StrategyParams::default().stop_warm_up(), Some(15));
        assert!(!StrategyParams::default().stop_lags_warm_up());

        let mut params = StrategyParams::crossover(5, 10);
        params.trailing_stop = Some(TrailingStopParams::default());
        assert!(params.stop_lags_warm_up());
    }
}
