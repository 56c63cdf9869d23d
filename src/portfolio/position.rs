use crate::instrument::FuturesContract;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//net position in the traded contract
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Position {
    //net quantity (positive for long, 0 for flat)
    pub net_qty: i32,

    //average entry price
    pub avg_entry_price: f64,

    //when the current position was opened
    pub opened_at: Option<DateTime<Utc>>,

    //fees paid on the fills that built the current position
    pub open_fees: f64,

    //realized pnl from closed trades
    pub realized_pnl: f64,
}

impl Position {
    //creates a new flat position
    pub fn new() -> Self {
        Position::default()
    }

    //calculates unrealized pnl at a given price
    pub fn unrealized_pnl(&self, current_price: f64, contract: &FuturesContract) -> f64 {
        if self.net_qty == 0 {
            return 0.0;
        }

        let price_diff = current_price - self.avg_entry_price;
        contract.pnl_from_price_move(price_diff, self.net_qty)
    }

    //returns true if the position is flat (no open position)
    pub fn is_flat(&self) -> bool {
        self.net_qty == 0
    }

    //returns true if the position is long
    pub fn is_long(&self) -> bool {
        self.net_qty > 0
    }

    //updates position with a new fill
    //returns the realized pnl from this fill (if it closes/reduces position)
    pub fn update_with_fill(
        &mut self,
        fill_qty: i32,
        fill_price: f64,
        timestamp: DateTime<Utc>,
        contract: &FuturesContract,
    ) -> f64 {
        //flat: just establish the new position
        if self.net_qty == 0 {
            self.net_qty = fill_qty;
            self.avg_entry_price = fill_price;
            self.opened_at = Some(timestamp);
            return 0.0;
        }

        let same_direction = self.net_qty.signum() == fill_qty.signum();

        if same_direction {
            //adding to position - update average entry price
            let total_qty = self.net_qty + fill_qty;
            let total_cost =
                self.avg_entry_price * self.net_qty as f64 + fill_price * fill_qty as f64;
            self.avg_entry_price = total_cost / total_qty as f64;
            self.net_qty = total_qty;
            return 0.0;
        }

        //reducing or reversing
        let close_qty = fill_qty.abs().min(self.net_qty.abs());
        let price_diff = if self.net_qty > 0 {
            fill_price - self.avg_entry_price
        } else {
            self.avg_entry_price - fill_price
        };

        let realized = contract.pnl_from_price_move(price_diff, close_qty);
        self.realized_pnl += realized;
        self.net_qty += fill_qty;

        if self.net_qty == 0 {
            self.avg_entry_price = 0.0;
            self.opened_at = None;
        } else if self.net_qty.signum() == fill_qty.signum() {
            //reversed through zero
            self.avg_entry_price = fill_price;
            self.opened_at = Some(timestamp);
        }

        realized
    }
}
