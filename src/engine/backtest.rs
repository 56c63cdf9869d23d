use crate::data::Bar;
use crate::engine::execution::{ExecutionEngine, Fill, OrderEvent, OrderSide, OrderStatus};
use crate::instrument::FuturesContract;
use crate::metrics::{calculate_equity_curve, EquityPoint, SummaryMetrics};
use crate::portfolio::{Account, ClosedTrade, FeeSchedule};
use crate::strategy::{Strategy, StrategyContext};
use chrono::{DateTime, Utc};
use tracing::debug;

//result of a backtest
#[derive(Debug, Clone)]
pub struct BacktestResult {
    pub strategy_name: String,
    pub summary: SummaryMetrics,
    pub equity_curve: Vec<EquityPoint>,
    pub fills: Vec<Fill>,
    pub closed_trades: Vec<ClosedTrade>,
    //orders submitted on the last bar that never reached a fill
    pub unfilled_orders: usize,
}

//configuration for a backtest
#[derive(Debug, Clone, Copy)]
pub struct BacktestConfig {
    pub initial_balance: f64,
    pub fees: FeeSchedule,
}

impl Default for BacktestConfig {
    fn default() -> Self {
        BacktestConfig {
            initial_balance: 100_000.0,
            fees: FeeSchedule::default(),
        }
    }
}

//bar-by-bar simulation of one strategy over one contract
pub struct BacktestEngine<'a> {
    config: BacktestConfig,
    bars: &'a [Bar],
    contract: FuturesContract,
    account: Account,
    execution: ExecutionEngine,
    equity_history: Vec<(DateTime<Utc>, f64)>,
}

impl<'a> BacktestEngine<'a> {
    pub fn new(config: BacktestConfig, bars: &'a [Bar], contract: FuturesContract) -> Self {
        BacktestEngine {
            config,
            bars,
            contract,
            account: Account::new(config.initial_balance, config.fees),
            execution: ExecutionEngine::new(),
            equity_history: Vec::with_capacity(bars.len()),
        }
    }

    //runs the backtest with the given strategy
    //per bar: settle orders at the open, notify, mark at the close, then decide
    pub fn run(mut self, strategy: &mut dyn Strategy) -> BacktestResult {
        strategy.on_start();
        let bars = self.bars;

        for (index, bar) in bars.iter().enumerate() {
            //orders from the previous bar fill at this bar's open
            for mut fill in self.execution.process_orders(bar) {
                let opens = fill.side == OrderSide::Buy;
                if opens && !self.account.can_afford(&fill, &self.contract) {
                    debug!(
                        "order {} rejected: buying power {:.2}",
                        fill.order_id,
                        self.account.buying_power()
                    );
                    strategy.on_order(&OrderEvent::rejected(&fill, OrderStatus::Margin));
                    continue;
                }

                let closed = self.account.process_fill(&mut fill, &self.contract);
                strategy.on_order(&OrderEvent::completed(fill));
                if let Some(trade) = closed {
                    strategy.on_trade(&trade);
                }
            }

            self.account.update_equity(bar.close, &self.contract);
            self.equity_history.push((bar.timestamp, self.account.equity));

            let mut context = StrategyContext::new(
                bar.timestamp,
                index + 1,
                &mut self.execution,
                &self.account,
            );
            strategy.on_bar(&mut context, bar);
        }

        if let Some(last) = bars.last() {
            let mut context = StrategyContext::new(
                last.timestamp,
                bars.len(),
                &mut self.execution,
                &self.account,
            );
            strategy.on_end(&mut context);
        }

        let unfilled_orders = self.execution.pending_order_count();
        if unfilled_orders > 0 {
            debug!("{} orders left unfilled at end of data", unfilled_orders);
        }

        self.build_result(strategy.name().to_string(), unfilled_orders)
    }

    fn build_result(self, strategy_name: String, unfilled_orders: usize) -> BacktestResult {
        let timestamps: Vec<_> = self.equity_history.iter().map(|(t, _)| *t).collect();
        let equity_values: Vec<_> = self.equity_history.iter().map(|(_, e)| *e).collect();

        let equity_curve =
            calculate_equity_curve(&timestamps, &equity_values, self.config.initial_balance);

        let summary = SummaryMetrics::from_backtest(
            &equity_curve,
            &self.account.closed_trades,
            self.config.initial_balance,
        );

        BacktestResult {
            strategy_name,
            summary,
            equity_curve,
            fills: self.account.trade_log,
            closed_trades: self.account.closed_trades,
            unfilled_orders,
        }
    }
}
