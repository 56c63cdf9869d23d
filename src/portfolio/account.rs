use crate::engine::execution::{Fill, OrderSide};
use crate::instrument::FuturesContract;
use crate::portfolio::position::Position;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//how fills are charged
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeeSchedule {
    //fraction of traded notional (0.0001 = one basis point)
    pub commission_rate: f64,

    //flat commission per contract per side
    pub commission_per_contract: f64,

    //slippage per contract per side
    pub slippage_per_contract: f64,
}

impl FeeSchedule {
    pub fn fees_for(&self, fill: &Fill, contract: &FuturesContract) -> f64 {
        let contracts = fill.qty.abs() as f64;
        self.commission_rate * contract.notional_value(fill.fill_price, fill.qty)
            + (self.commission_per_contract + self.slippage_per_contract) * contracts
    }
}

impl Default for FeeSchedule {
    fn default() -> Self {
        FeeSchedule {
            commission_rate: 0.0001,
            commission_per_contract: 0.0,
            slippage_per_contract: 0.0,
        }
    }
}

//a completed round trip, reported once the position returns to flat
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClosedTrade {
    pub opened_at: DateTime<Utc>,
    pub closed_at: DateTime<Utc>,
    pub qty: i32,
    pub entry_price: f64,
    pub exit_price: f64,
    //price pnl only
    pub pnl: f64,
    //pnl after entry and exit fees
    pub pnl_net: f64,
}

//represents a trading account with a single contract position and cash
#[derive(Debug, Clone)]
pub struct Account {
    //initial account balance
    pub initial_balance: f64,

    //current cash (includes realized pnl, subtracts fees)
    pub cash: f64,

    //current total equity (cash + unrealized pnl)
    pub equity: f64,

    //capital tied up by the open position
    pub margin_used: f64,

    pub position: Position,

    //every fill, in order
    pub trade_log: Vec<Fill>,

    pub closed_trades: Vec<ClosedTrade>,

    pub fees: FeeSchedule,
}

impl Account {
    //creates a new account with initial balance
    pub fn new(initial_balance: f64, fees: FeeSchedule) -> Self {
        Account {
            initial_balance,
            cash: initial_balance,
            equity: initial_balance,
            margin_used: 0.0,
            position: Position::new(),
            trade_log: Vec::new(),
            closed_trades: Vec::new(),
            fees,
        }
    }

    //true if the fill can be taken with the current buying power
    //fills that only reduce the position are always accepted
    pub fn can_afford(&self, fill: &Fill, contract: &FuturesContract) -> bool {
        let reduces = self.position.net_qty != 0
            && self.position.net_qty.signum() != fill.qty.signum()
            && fill.qty.abs() <= self.position.net_qty.abs();
        if reduces {
            return true;
        }

        let required = contract.initial_margin_requirement(fill.fill_price, fill.qty)
            + self.fees.fees_for(fill, contract);
        self.buying_power() >= required
    }

    //processes a fill and updates the account
    //returns the round trip if this fill flattened the position
    //sets the fill's fees before logging it
    pub fn process_fill(
        &mut self,
        fill: &mut Fill,
        contract: &FuturesContract,
    ) -> Option<ClosedTrade> {
        fill.fees = self.fees.fees_for(fill, contract);
        self.cash -= fill.fees;

        let before = self.position.clone();
        let realized_pnl =
            self.position
                .update_with_fill(fill.qty, fill.fill_price, fill.timestamp, contract);
        self.cash += realized_pnl;

        let closed = if !before.is_flat() && self.position.is_flat() {
            Some(ClosedTrade {
                opened_at: before.opened_at.unwrap_or(fill.timestamp),
                closed_at: fill.timestamp,
                qty: before.net_qty,
                entry_price: before.avg_entry_price,
                exit_price: fill.fill_price,
                pnl: realized_pnl,
                pnl_net: realized_pnl - before.open_fees - fill.fees,
            })
        } else {
            None
        };

        if self.position.is_flat() {
            self.position.open_fees = 0.0;
        } else if fill.side == OrderSide::Buy && self.position.is_long() {
            self.position.open_fees += fill.fees;
        }

        self.margin_used = if self.position.is_flat() {
            0.0
        } else {
            let position = &self.position;
            contract.initial_margin_requirement(position.avg_entry_price, position.net_qty)
        };

        self.trade_log.push(fill.clone());
        if let Some(trade) = &closed {
            self.closed_trades.push(trade.clone());
        }

        closed
    }

    //marks the open position at `price`
    pub fn update_equity(&mut self, price: f64, contract: &FuturesContract) {
        self.equity = self.cash + self.position.unrealized_pnl(price, contract);
    }

    //returns available buying power (cash - margin_used)
    pub fn buying_power(&self) -> f64 {
        self.cash - self.margin_used
    }

    //returns the total return as a fraction
    pub fn total_return(&self) -> f64 {
        (self.equity - self.initial_balance) / self.initial_balance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::execution::Order;
    use chrono::TimeZone;

    fn fill(id: u64, qty: u32, side: OrderSide, price: f64, day: u32) -> Fill {
        let ts = Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap();
        Fill::from_order(id, &Order::market(id, ts, qty, side), ts, price)
    }

    #[test]
    fn round_trip_books_gross_and_net_pnl() {
        let contract = FuturesContract::unit("GC=F");
        let mut account = Account::new(100_000.0, FeeSchedule::default());

        assert!(account
            .process_fill(&mut fill(1, 10, OrderSide::Buy, 2000.0, 2), &contract)
            .is_none());
        //0.0001 * 20_000
        assert!((account.cash - 99_998.0).abs() < 1e-6);
        assert!((account.margin_used - 20_000.0).abs() < 1e-6);

        account.update_equity(2010.0, &contract);
        assert!((account.equity - 100_098.0).abs() < 1e-6);

        let trade = account
            .process_fill(&mut fill(2, 10, OrderSide::Sell, 2050.0, 5), &contract)
            .unwrap();
        assert!((trade.pnl - 500.0).abs() < 1e-6);
        //entry 2.0 + exit 2.05
        assert!((trade.pnl_net - (500.0 - 2.0 - 2.05)).abs() < 1e-6);
        assert_eq!(trade.qty, 10);
        assert_eq!(account.closed_trades.len(), 1);
        assert_eq!(account.trade_log.len(), 2);
        assert_eq!(account.margin_used, 0.0);

        account.update_equity(2050.0, &contract);
        assert!((account.total_return() - (500.0 - 4.05) / 100_000.0).abs() < 1e-12);
    }

    #[test]
    fn rejects_entry_beyond_buying_power() {
        let contract = FuturesContract::unit("GC=F");
        let account = Account::new(10_000.0, FeeSchedule::default());

        assert!(!account.can_afford(&fill(1, 10, OrderSide::Buy, 2000.0, 2), &contract));
        assert!(account.can_afford(&fill(1, 4, OrderSide::Buy, 2000.0, 2), &contract));
    }

    #[test]
    fn closing_is_always_affordable() {
        let contract = FuturesContract::unit("GC=F");
        let mut account = Account::new(100_000.0, FeeSchedule::default());
        account.process_fill(&mut fill(1, 40, OrderSide::Buy, 2000.0, 2), &contract);
        account.cash = 0.0;

        assert!(account.can_afford(&fill(2, 40, OrderSide::Sell, 1500.0, 3), &contract));
    }
}
