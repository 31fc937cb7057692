//! ADL Trend - activity-of-daily-living analysis for in-home passive sensors
//!
//! The engine turns the event streams of an in-home monitoring device (sleep
//! sessions, room visits, respiration, hourly gait, alerts) into a daily
//! behavioral record and a monthly trend status through a deterministic
//! pipeline: vendor adaptation → day/night segmentation → interval merging →
//! window aggregation → trend classification → report encoding.
//!
//! ## Modules
//!
//! - **Daily pipeline**: pair consecutive daily reports, segment each 2-day
//!   batch into day and night, aggregate every stream into a `DailyMetricsRecord`
//! - **Monthly evaluation**: classify a month of records into per-metric,
//!   per-domain and overall status codes

pub mod aggregator;
pub mod classifier;
pub mod config;
pub mod encoder;
pub mod error;
pub mod merge;
pub mod pipeline;
pub mod schema;
pub mod segmentation;
pub mod store;
pub mod types;

pub use classifier::TrendClassifier;
pub use config::AnalysisConfig;
pub use encoder::ReportEncoder;
pub use error::{ComputeError, ValidationError};
pub use pipeline::{
    daily_metrics, monthly_status, reports_to_daily_records, run_daily, run_monthly,
    DailyProcessor,
};
pub use segmentation::segment_day_night;
pub use store::{JsonFileStore, ReportSink, ReportSource};

// Schema exports
pub use schema::{DailyReport, ReportAdapter};

/// Engine version embedded in all report envelopes
pub const ENGINE_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for report envelopes
pub const PRODUCER_NAME: &str = "adl-trend";
