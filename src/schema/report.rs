//! Vendor cloud payload definitions
//!
//! Mirrors the JSON the monitoring device's cloud returns:
//! - extended daily reports (sleep, locations, respiration, hourly gait)
//! - the emergency/alert list (falls, visitor arrivals and departures)
//!
//! Timestamps stay as strings here; the adapter owns timestamp parsing.

use crate::types::ActivityLevel;
use serde::{Deserialize, Serialize};

/// One extended daily report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyReport {
    #[serde(rename = "timeStamp")]
    pub time_stamp: String,
    #[serde(default)]
    pub data: ReportData,
}

/// Sensor sections of a daily report; missing sections are empty
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReportData {
    pub sleep_monitoring: Vec<RawSleepSession>,
    pub locations: RawLocations,
    pub respirations: Vec<RawRespiration>,
    /// Hourly buckets, index 0 = midnight of the report date
    pub gait_analysis: Vec<RawGaitHour>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSleepSession {
    pub session_start_time: String,
    pub session_stop_time: String,
    #[serde(default)]
    pub session_restless: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawLocations {
    #[serde(default)]
    pub objects: Vec<RawLocation>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLocation {
    pub location_start_time: String,
    pub location_stop_time: String,
    pub location_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawRespiration {
    pub respiration_time: String,
    #[serde(default)]
    pub respiration_rate: Option<f64>,
    #[serde(default)]
    pub heart_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawGaitHour {
    #[serde(default)]
    pub number_of_walking_sessions: u32,
    #[serde(default)]
    pub total_walk_distance: f64,
    /// Minutes
    #[serde(default)]
    pub total_walk_duration: f64,
    pub activity_level: ActivityLevel,
}

/// Entry of the emergency list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub data: RawAlert,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawAlert {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
    /// `YYYY-MM-DD`
    pub date: String,
    /// `HH:MM[:SS]`
    pub time: String,
}
