//! Adapter for converting vendor payloads into typed event streams
//!
//! Daily reports become [`DailyBatch`]es, the emergency list becomes
//! [`AlertEvent`]s, and visitor arrival/departure alerts are paired into
//! [`VisitorInterval`]s.

use crate::error::{ComputeError, ValidationError};
use crate::schema::report::*;
use crate::types::{
    AlertEvent, DailyBatch, GaitHour, LocationVisit, RespirationSample, SleepSession,
    VisitorInterval,
};
use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime};
use serde::Serialize;
use tracing::debug;

/// Alert type marking a visitor arrival
pub const VISITORS_IN: &str = "VisitorsIn";

/// Alert type marking a visitor departure
pub const VISITORS_OUT: &str = "VisitorsOut";

/// Naive layouts accepted after RFC 3339
const NAIVE_FORMATS: [&str; 6] = [
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M",
];

/// Adapter for the monitoring device's cloud payloads
pub struct ReportAdapter;

impl ReportAdapter {
    /// Parse a JSON string containing an array of daily reports
    pub fn parse_array(json: &str) -> Result<Vec<DailyReport>, ComputeError> {
        let reports: Vec<DailyReport> = serde_json::from_str(json)?;
        Ok(reports)
    }

    /// Parse NDJSON (newline-delimited JSON) containing daily reports
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<DailyReport>, ComputeError> {
        let mut reports = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match serde_json::from_str::<DailyReport>(trimmed) {
                Ok(report) => reports.push(report),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(reports)
    }

    /// Parse the emergency list into alerts sorted by time
    pub fn parse_alerts(json: &str) -> Result<Vec<AlertEvent>, ComputeError> {
        let records: Vec<AlertRecord> = serde_json::from_str(json)?;
        Self::to_alerts(&records)
    }

    pub fn to_alerts(records: &[AlertRecord]) -> Result<Vec<AlertEvent>, ComputeError> {
        let mut alerts = records
            .iter()
            .map(|r| {
                let alert = &r.data;
                Ok(AlertEvent {
                    time: parse_timestamp(&format!("{} {}", alert.date, alert.time))?,
                    kind: alert.kind.clone(),
                    location: alert.location.clone(),
                    description: alert.description.clone(),
                })
            })
            .collect::<Result<Vec<_>, ComputeError>>()?;
        alerts.sort_by_key(|a| a.time);
        Ok(alerts)
    }

    /// Convert one daily report into a typed batch
    pub fn to_batch(report: &DailyReport) -> Result<DailyBatch, ComputeError> {
        let date = report_date(&report.time_stamp)?;
        let data = &report.data;

        let sleep = data
            .sleep_monitoring
            .iter()
            .map(|s| {
                Ok(SleepSession {
                    start: parse_timestamp(&s.session_start_time)?,
                    stop: parse_timestamp(&s.session_stop_time)?,
                    restless: s.session_restless,
                })
            })
            .collect::<Result<Vec<_>, ComputeError>>()?;

        let locations = data
            .locations
            .objects
            .iter()
            .map(|l| {
                Ok(LocationVisit {
                    start: parse_timestamp(&l.location_start_time)?,
                    stop: parse_timestamp(&l.location_stop_time)?,
                    location: l.location_name.clone(),
                })
            })
            .collect::<Result<Vec<_>, ComputeError>>()?;

        let respiration = data
            .respirations
            .iter()
            .map(|r| {
                Ok(RespirationSample {
                    time: parse_timestamp(&r.respiration_time)?,
                    respiration: r.respiration_rate,
                    heart_rate: r.heart_rate,
                })
            })
            .collect::<Result<Vec<_>, ComputeError>>()?;

        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| ComputeError::DateParseError(report.time_stamp.clone()))?;
        let gait = data
            .gait_analysis
            .iter()
            .enumerate()
            .map(|(hour, g)| GaitHour {
                time: midnight + Duration::hours(hour as i64),
                sessions: g.number_of_walking_sessions,
                distance: g.total_walk_distance,
                duration_minutes: g.total_walk_duration,
                activity: g.activity_level,
            })
            .collect();

        let batch = DailyBatch {
            date,
            sleep,
            locations,
            respiration,
            gait,
        };
        debug!(
            date = %batch.date,
            sleep = batch.sleep.len(),
            locations = batch.locations.len(),
            respiration = batch.respiration.len(),
            gait = batch.gait.len(),
            "adapted daily report"
        );
        Ok(batch)
    }

    /// Convert daily reports into batches sorted by date
    pub fn to_batches(reports: &[DailyReport]) -> Result<Vec<DailyBatch>, ComputeError> {
        let mut batches = reports
            .iter()
            .map(Self::to_batch)
            .collect::<Result<Vec<_>, _>>()?;
        batches.sort_by_key(|b| b.date);
        Ok(batches)
    }

    /// Pair each `VisitorsIn` alert with an immediately following `VisitorsOut`
    ///
    /// Only visitor alerts are considered; unmatched arrivals or departures
    /// are dropped.
    pub fn visitors_from_alerts(alerts: &[AlertEvent]) -> Vec<VisitorInterval> {
        let mut visitor_alerts: Vec<&AlertEvent> = alerts
            .iter()
            .filter(|a| a.kind == VISITORS_IN || a.kind == VISITORS_OUT)
            .collect();
        visitor_alerts.sort_by_key(|a| a.time);

        visitor_alerts
            .windows(2)
            .filter(|pair| pair[0].kind == VISITORS_IN && pair[1].kind == VISITORS_OUT)
            .map(|pair| VisitorInterval {
                start: pair[0].time,
                stop: pair[1].time,
            })
            .collect()
    }

    /// Validate a batch of reports
    pub fn validate_reports(reports: &[DailyReport]) -> Vec<ValidationResult> {
        reports
            .iter()
            .enumerate()
            .map(|(idx, report)| ValidationResult {
                index: idx,
                time_stamp: report.time_stamp.clone(),
                error: validate_report(report).err().map(|e| e.to_string()),
            })
            .filter(|r| r.error.is_some())
            .collect()
    }
}

/// Result of report validation
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationResult {
    pub index: usize,
    pub time_stamp: String,
    pub error: Option<String>,
}

fn validate_report(report: &DailyReport) -> Result<(), ComputeError> {
    let batch = ReportAdapter::to_batch(report)?;
    let inverted = batch
        .sleep
        .iter()
        .map(|s| (s.start, s.stop))
        .chain(batch.locations.iter().map(|l| (l.start, l.stop)))
        .find(|(start, stop)| start > stop);
    if let Some((start, stop)) = inverted {
        return Err(ValidationError::InvertedInterval {
            start: start.to_string(),
            stop: stop.to_string(),
        }
        .into());
    }
    Ok(())
}

/// Parse a vendor timestamp into local wall time
///
/// RFC 3339 values are converted to UTC; naive values are taken as-is.
pub fn parse_timestamp(value: &str) -> Result<NaiveDateTime, ComputeError> {
    let value = value.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.naive_utc());
    }
    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| ComputeError::DateParseError(value.to_string()))
}

/// Calendar date of a report, falling back to its `YYYY-MM-DD` prefix
pub fn report_date(time_stamp: &str) -> Result<NaiveDate, ComputeError> {
    if let Ok(ts) = parse_timestamp(time_stamp) {
        return Ok(ts.date());
    }
    time_stamp
        .get(..10)
        .and_then(|prefix| NaiveDate::parse_from_str(prefix, "%Y-%m-%d").ok())
        .ok_or_else(|| ComputeError::DateParseError(time_stamp.to_string()))
}
