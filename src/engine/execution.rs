use crate::data::Bar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

//order side (buy or sell)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    //converts to quantity sign (Buy = +1, Sell = -1)
    pub fn to_qty_sign(&self) -> i32 {
        match self {
            OrderSide::Buy => 1,
            OrderSide::Sell => -1,
        }
    }
}

//market order, filled at the open of the bar after submission
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub submitted_at: DateTime<Utc>,
    pub qty: u32,
    pub side: OrderSide,
}

impl Order {
    pub fn market(id: u64, submitted_at: DateTime<Utc>, qty: u32, side: OrderSide) -> Self {
        Order {
            id,
            submitted_at,
            qty,
            side,
        }
    }

    //returns the signed quantity (positive for buy, negative for sell)
    pub fn signed_qty(&self) -> i32 {
        (self.qty as i32) * self.side.to_qty_sign()
    }
}

//represents a filled order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fill {
    pub id: u64,
    pub order_id: u64,
    pub timestamp: DateTime<Utc>,
    pub qty: i32, //signed: positive for buy, negative for sell
    pub side: OrderSide,
    pub fill_price: f64,
    pub fees: f64, //commission + slippage, set by the account
}

impl Fill {
    pub fn from_order(
        fill_id: u64,
        order: &Order,
        timestamp: DateTime<Utc>,
        fill_price: f64,
    ) -> Self {
        Fill {
            id: fill_id,
            order_id: order.id,
            timestamp,
            qty: order.signed_qty(),
            side: order.side,
            fill_price,
            fees: 0.0,
        }
    }
}

//final state of an order as reported back to the strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    Completed,
    //not enough capital to open the position
    Margin,
}

#[derive(Debug, Clone)]
pub struct OrderEvent {
    pub order_id: u64,
    pub side: OrderSide,
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub fill: Option<Fill>,
}

impl OrderEvent {
    pub fn completed(fill: Fill) -> Self {
        OrderEvent {
            order_id: fill.order_id,
            side: fill.side,
            status: OrderStatus::Completed,
            timestamp: fill.timestamp,
            fill: Some(fill),
        }
    }

    pub fn rejected(fill: &Fill, status: OrderStatus) -> Self {
        OrderEvent {
            order_id: fill.order_id,
            side: fill.side,
            status,
            timestamp: fill.timestamp,
            fill: None,
        }
    }
}

//simulates order execution
pub struct ExecutionEngine {
    next_order_id: u64,
    next_fill_id: u64,
    pending_orders: Vec<Order>,
}

impl ExecutionEngine {
    pub fn new() -> Self {
        ExecutionEngine {
            next_order_id: 1,
            next_fill_id: 1,
            pending_orders: Vec::new(),
        }
    }

    //creates and queues a market order, returns its id
    pub fn market_order(&mut self, timestamp: DateTime<Utc>, qty: u32, side: OrderSide) -> u64 {
        let order = Order::market(self.next_order_id, timestamp, qty, side);
        self.next_order_id += 1;
        let id = order.id;
        self.pending_orders.push(order);
        id
    }

    //fills every pending market order at the bar's open
    pub fn process_orders(&mut self, bar: &Bar) -> Vec<Fill> {
        let mut fills = Vec::with_capacity(self.pending_orders.len());

        for order in self.pending_orders.drain(..) {
            fills.push(Fill::from_order(
                self.next_fill_id,
                &order,
                bar.timestamp,
                bar.open,
            ));
            self.next_fill_id += 1;
        }

        fills
    }

    //returns the number of pending orders
    pub fn pending_order_count(&self) -> usize {
        self.pending_orders.len()
    }
}

impl Default for ExecutionEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn market_orders_fill_at_next_open() {
        let mut exec = ExecutionEngine::new();
        let t0 = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap();

        let buy = exec.market_order(t0, 10, OrderSide::Buy);
        let sell = exec.market_order(t0, 10, OrderSide::Sell);
        assert_eq!((buy, sell), (1, 2));
        assert_eq!(exec.pending_order_count(), 2);

        let bar = Bar::new_unchecked(t1, 101.0, 103.0, 99.0, 102.0, 0.0);
        let fills = exec.process_orders(&bar);

        assert_eq!(exec.pending_order_count(), 0);
        assert_eq!(fills.len(), 2);
        assert_eq!(fills[0].qty, 10);
        assert_eq!(fills[1].qty, -10);
        assert!(fills.iter().all(|f| f.fill_price == 101.0 && f.timestamp == t1));
    }
}
