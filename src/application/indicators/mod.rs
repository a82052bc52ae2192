//! Streaming technical indicators kept per (pair, interval).

pub mod macd;
pub mod reference;
pub mod rsi;

pub use macd::TickMacd;
pub use rsi::WilderRsi;
