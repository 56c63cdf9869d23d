pub mod account;
pub mod position;

pub use account::{Account, ClosedTrade, FeeSchedule};
pub use position::Position;
