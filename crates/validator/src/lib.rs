//! Station validation pipeline: latency telemetry, metric tables and SOH
//! readings in, one pass/fail report out.

pub mod cli;
pub mod orchestrator;
pub mod report;
pub mod settings;
pub mod soh;
pub mod util;
