//! Vendor cloud schema
//!
//! This module defines the payloads returned by the monitoring device's cloud
//! and the adapter that turns them into the engine's typed event streams.

mod report;
mod adapter;

pub use report::*;
pub use adapter::*;
