//! Scan pipeline: I/O fan-out, indicator barrier, bounded CPU fan-out, ranking.

pub mod orchestrator;
pub mod worker_pool;

pub use orchestrator::ScanOrchestrator;
pub use worker_pool::{CpuPool, TaskHandle};
