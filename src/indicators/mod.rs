pub mod atr;
pub mod sma;

pub use atr::Atr;
pub use sma::Sma;
