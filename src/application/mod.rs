// Universe-wide technical indicators
pub mod indicator_engine;

// Per-ticker sequence models
pub mod ml;

// Forecast + indicators -> verdict
pub mod scoring;

// Scan orchestration
pub mod scan;
