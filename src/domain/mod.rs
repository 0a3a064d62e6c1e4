// Market data domain
pub mod market;

// Scan results and scoring policy
pub mod scan;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
