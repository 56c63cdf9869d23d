//dual moving average crossover backtester for daily futures data

pub mod config;
pub mod data;
pub mod engine;
pub mod indicators;
pub mod instrument;
pub mod metrics;
pub mod portfolio;
pub mod strategy;

//prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{
        BacktestConfiguration, ContractConfig, LengthRange, ParamsError, StrategyParams,
        TrailingStopParams,
    };
    pub use crate::data::{load_csv, parse_csv, Bar, BarError};
    pub use crate::engine::{
        BacktestConfig, BacktestEngine, BacktestResult, ExecutionEngine, Fill, LengthPair,
        Optimization, Order, OrderEvent, OrderSide, OrderStatus, ParamGrid, ParamSweep,
        SweepResults,
    };
    pub use crate::indicators::{Atr, Sma};
    pub use crate::instrument::FuturesContract;
    pub use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
    pub use crate::portfolio::{Account, ClosedTrade, FeeSchedule, Position};
    pub use crate::strategy::{
        dual_ma::DualMovingAverage,
        rule::{CrossoverRule, MaPair, RuleInput, Signal},
        Strategy, StrategyContext,
    };
}
