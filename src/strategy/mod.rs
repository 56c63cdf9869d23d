pub mod dual_ma;
pub mod rule;

use crate::data::Bar;
use crate::engine::execution::{ExecutionEngine, OrderEvent, OrderSide};
use crate::portfolio::{Account, ClosedTrade, Position};
use chrono::{DateTime, Utc};

//strategy interface driven by the backtest engine
pub trait Strategy: Send {
    //called once before the first bar
    fn on_start(&mut self);

    //called on each bar after pending orders for that bar were settled
    fn on_bar(&mut self, context: &mut StrategyContext<'_>, bar: &Bar);

    //called once per settled or rejected order
    fn on_order(&mut self, _event: &OrderEvent) {}

    //called when a fill returns the position to flat
    fn on_trade(&mut self, _trade: &ClosedTrade) {}

    //called after the last bar
    fn on_end(&mut self, context: &mut StrategyContext<'_>);

    //returns the strategy name
    fn name(&self) -> &str;
}

//view of the account plus order entry, valid for one callback
pub struct StrategyContext<'a> {
    //timestamp of the bar being processed
    pub current_time: DateTime<Utc>,

    //bars seen so far, including the current one
    bar_count: usize,

    execution: &'a mut ExecutionEngine,
    account: &'a Account,
}

impl<'a> StrategyContext<'a> {
    pub fn new(
        current_time: DateTime<Utc>,
        bar_count: usize,
        execution: &'a mut ExecutionEngine,
        account: &'a Account,
    ) -> Self {
        StrategyContext {
            current_time,
            bar_count,
            execution,
            account,
        }
    }

    //submits a market order, filled at the next bar's open
    pub fn market_order(&mut self, qty: u32, side: OrderSide) -> u64 {
        self.execution.market_order(self.current_time, qty, side)
    }

    pub fn buy(&mut self, qty: u32) -> u64 {
        self.market_order(qty, OrderSide::Buy)
    }

    //sells out the whole long position, none if already flat
    pub fn close(&mut self) -> Option<u64> {
        let qty = self.account.position.net_qty;
        if qty <= 0 {
            return None;
        }
        Some(self.market_order(qty.unsigned_abs(), OrderSide::Sell))
    }

    pub fn position(&self) -> &Position {
        &self.account.position
    }

    //returns the current cash balance
    pub fn cash(&self) -> f64 {
        self.account.cash
    }

    //returns the current equity
    pub fn equity(&self) -> f64 {
        self.account.equity
    }

    //returns the number of bars seen
    pub fn bar_count(&self) -> usize {
        self.bar_count
    }
}
