//! Exchange source adapters.

mod binance;

pub use binance::BinanceAdapter;
