pub mod summary;
pub mod timeseries;

pub use summary::SummaryMetrics;
pub use timeseries::{calculate_equity_curve, yearly_returns, EquityPoint};
