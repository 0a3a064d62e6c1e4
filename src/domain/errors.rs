use thiserror::Error;

/// Errors related to market data acquisition
#[derive(Debug, Error)]
pub enum MarketDataError {
    #[error("Request failed: {reason}")]
    RequestFailed { reason: String },

    #[error("Unexpected status {status} for {symbol}")]
    BadStatus { symbol: String, status: u16 },

    #[error("Invalid market data for {symbol}: {reason}")]
    InvalidData { symbol: String, reason: String },

    #[error("No history returned for any of {requested} symbols")]
    EmptyHistory { requested: usize },
}

/// Reasons a single ticker is dropped from a scan.
///
/// None of these abort the scan; the orchestrator records them as exclusions.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ScoreError {
    #[error("Insufficient history: {available} bars, need {required}")]
    InsufficientHistory { available: usize, required: usize },

    #[error("Scaling failed: {reason}")]
    Scaling { reason: String },

    #[error("Training failed: {reason}")]
    Training { reason: String },

    #[error("Prediction failed: {reason}")]
    Prediction { reason: String },

    #[error("Scoring task panicked: {message}")]
    Panicked { message: String },

    #[error("Scoring deadline of {deadline_ms}ms elapsed")]
    TimedOut { deadline_ms: u64 },

    #[error("Worker dropped the task before reporting a result")]
    WorkerGone,
}

/// Errors that abort a whole scan
#[derive(Debug, Error)]
pub enum ScanError {
    #[error("Scan universe is empty")]
    EmptyUniverse,

    #[error("Price history unavailable: {0}")]
    HistoryUnavailable(#[source] MarketDataError),

    #[error("Failed to build worker pool with {workers} threads: {reason}")]
    WorkerPool { workers: usize, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_error_formatting() {
        let err = ScoreError::InsufficientHistory {
            available: 42,
            required: 80,
        };

        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("80"));
    }

    #[test]
    fn test_scan_error_wraps_source() {
        let err = ScanError::HistoryUnavailable(MarketDataError::EmptyHistory { requested: 21 });

        assert!(err.to_string().contains("21 symbols"));
        assert!(std::error::Error::source(&err).is_some());
    }
}
