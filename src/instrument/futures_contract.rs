use serde::{Deserialize, Serialize};

//represents a futures contract specification
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FuturesContract {
    //contract symbol (eg gc)
    pub symbol: String,

    //minimum price fluctuation
    pub tick_size: f64,

    //dollar value of one tick
    pub tick_value: f64,

    //dollar value of one full point move
    pub point_value: f64,

    //initial margin per contract, none means the full notional is required
    pub initial_margin: Option<f64>,
}

impl FuturesContract {
    pub fn new(
        symbol: String,
        tick_size: f64,
        tick_value: f64,
        initial_margin: Option<f64>,
    ) -> Self {
        FuturesContract {
            symbol,
            tick_size,
            tick_value,
            point_value: tick_value / tick_size,
            initial_margin,
        }
    }

    //converts a price difference to ticks
    pub fn price_to_ticks(&self, price_diff: f64) -> f64 {
        price_diff / self.tick_size
    }

    //calculates pnl from a price move
    //price_diff - exit_price - entry_price for a long
    //quantity - number of contracts
    pub fn pnl_from_price_move(&self, price_diff: f64, quantity: i32) -> f64 {
        self.price_to_ticks(price_diff) * self.tick_value * quantity as f64
    }

    //calculates the notional value of a position
    pub fn notional_value(&self, price: f64, quantity: i32) -> f64 {
        price * self.point_value * quantity.abs() as f64
    }

    //capital that must be available to open `quantity` contracts at `price`
    pub fn initial_margin_requirement(&self, price: f64, quantity: i32) -> f64 {
        match self.initial_margin {
            Some(margin) => margin * quantity.abs() as f64,
            None => self.notional_value(price, quantity),
        }
    }

    //comex gold (gc): 0.10 tick worth $10, 100 oz per contract
    pub fn gc() -> Self {
        FuturesContract::new("GC".to_string(), 0.1, 10.0, Some(11_000.0))
    }

    //one price point per unit, fully paid, which mirrors cash-account accounting
    pub fn unit(symbol: &str) -> Self {
        FuturesContract::new(symbol.to_string(), 0.01, 0.01, None)
    }
}

impl Default for FuturesContract {
    fn default() -> Self {
        FuturesContract::unit("GC=F")
    }
}
