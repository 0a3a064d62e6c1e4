use anyhow::{Result, anyhow};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Bar interval requested from the data source
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Interval {
    OneHour,
    #[default]
    OneDay,
    OneWeek,
    OneMonth,
}

impl Interval {
    /// Converts to Yahoo chart API interval string
    pub fn to_yahoo_string(&self) -> &'static str {
        match self {
            Interval::OneHour => "1h",
            Interval::OneDay => "1d",
            Interval::OneWeek => "1wk",
            Interval::OneMonth => "1mo",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_yahoo_string())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "1h" | "60m" => Ok(Interval::OneHour),
            "1d" => Ok(Interval::OneDay),
            "1wk" | "1w" => Ok(Interval::OneWeek),
            "1mo" => Ok(Interval::OneMonth),
            _ => Err(anyhow!(
                "Invalid interval: {}. Must be '1h', '1d', '1wk' or '1mo'",
                s
            )),
        }
    }
}

/// How far back the history request reaches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HistoryPeriod {
    Days(u32),
    Months(u32),
    Years(u32),
    Max,
}

impl Default for HistoryPeriod {
    fn default() -> Self {
        HistoryPeriod::Years(3)
    }
}

impl fmt::Display for HistoryPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HistoryPeriod::Days(n) => write!(f, "{}d", n),
            HistoryPeriod::Months(n) => write!(f, "{}mo", n),
            HistoryPeriod::Years(n) => write!(f, "{}y", n),
            HistoryPeriod::Max => write!(f, "max"),
        }
    }
}

impl FromStr for HistoryPeriod {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim().to_lowercase();
        if s == "max" {
            return Ok(HistoryPeriod::Max);
        }

        let split = s
            .find(|c: char| !c.is_ascii_digit())
            .ok_or_else(|| anyhow!("Invalid period: {}. Missing unit (d, mo, y)", s))?;
        let (count, unit) = s.split_at(split);
        let count: u32 = count
            .parse()
            .map_err(|_| anyhow!("Invalid period: {}. Expected e.g. '3y', '6mo', '30d'", s))?;
        if count == 0 {
            return Err(anyhow!("Invalid period: {}. Count must be positive", s));
        }

        match unit {
            "d" => Ok(HistoryPeriod::Days(count)),
            "mo" => Ok(HistoryPeriod::Months(count)),
            "y" => Ok(HistoryPeriod::Years(count)),
            _ => Err(anyhow!("Invalid period unit in {}. Must be d, mo or y", s)),
        }
    }
}

impl TryFrom<String> for Interval {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Interval> for String {
    fn from(value: Interval) -> Self {
        value.to_string()
    }
}

impl TryFrom<String> for HistoryPeriod {
    type Error = anyhow::Error;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<HistoryPeriod> for String {
    fn from(value: HistoryPeriod) -> Self {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_parsing() {
        assert_eq!(Interval::from_str("1d").unwrap(), Interval::OneDay);
        assert_eq!(Interval::from_str("1WK").unwrap(), Interval::OneWeek);
        assert!(Interval::from_str("5m").is_err());
    }

    #[test]
    fn test_period_parsing_and_display() {
        assert_eq!(HistoryPeriod::from_str("3y").unwrap(), HistoryPeriod::Years(3));
        assert_eq!(HistoryPeriod::from_str("6mo").unwrap(), HistoryPeriod::Months(6));
        assert_eq!(HistoryPeriod::from_str("max").unwrap(), HistoryPeriod::Max);
        assert_eq!(HistoryPeriod::Days(30).to_string(), "30d");

        assert!(HistoryPeriod::from_str("3").is_err());
        assert!(HistoryPeriod::from_str("0y").is_err());
        assert!(HistoryPeriod::from_str("2w").is_err());
    }
}
