//! Built-in scan universe.

use std::collections::BTreeMap;

/// Default tickers with their report names, in report tie-break order
pub const DEFAULT_UNIVERSE: &[(&str, &str)] = &[
    ("MSFT", "Microsoft"),
    ("AAPL", "Apple"),
    ("TSLA", "Tesla"),
    ("AMZN", "Amazon"),
    ("GOOGL", "Google"),
    ("NVDA", "NVIDIA"),
    ("META", "Meta"),
    ("NFLX", "Netflix"),
    ("INTC", "Intel"),
    ("AMD", "AMD"),
    ("KO", "Coca-Cola"),
    ("JPM", "JPMorgan"),
    ("V", "Visa"),
    ("JNJ", "Johnson & Johnson"),
    ("UNH", "UnitedHealth"),
    ("PG", "Procter & Gamble"),
    ("WMT", "Walmart"),
    ("XOM", "Exxon Mobil"),
    ("CAT", "Caterpillar"),
    ("DIS", "Disney"),
    ("SPY", "S&P 500 ETF (SPY)"),
];

pub fn default_tickers() -> Vec<String> {
    DEFAULT_UNIVERSE.iter().map(|(t, _)| t.to_string()).collect()
}

pub fn default_display_names() -> BTreeMap<String, String> {
    DEFAULT_UNIVERSE
        .iter()
        .map(|(t, name)| (t.to_string(), name.to_string()))
        .collect()
}

/// Parses a comma separated ticker list, upper-casing and dropping blanks
pub fn parse_ticker_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect()
}
