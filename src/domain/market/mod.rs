// Market data domain
pub mod bar;
pub mod price_table;
pub mod timeframe;

pub use bar::{Bar, PriceSeries, Ticker};
pub use price_table::{PriceField, PriceTable};
pub use timeframe::{HistoryPeriod, Interval};
