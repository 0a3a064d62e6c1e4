pub mod core;
pub mod mock;
pub mod yahoo;

pub use mock::MockMarketDataSource;
pub use yahoo::YahooMarketDataSource;
