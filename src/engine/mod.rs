pub mod backtest;
pub mod execution;
pub mod optimize;

pub use backtest::{BacktestConfig, BacktestEngine, BacktestResult};
pub use execution::{ExecutionEngine, Fill, Order, OrderEvent, OrderSide, OrderStatus};
pub use optimize::{LengthPair, Optimization, ParamGrid, ParamSweep, SweepResults};
