//! Report store contract
//!
//! The engine reads vendor reports and alerts from a [`ReportSource`] and writes
//! encoded results to a [`ReportSink`]. Implementations fail loudly and never
//! retry. [`JsonFileStore`] keeps everything as JSON files, one directory per
//! device:
//!
//! ```text
//! <root>/<device_id>/reports.json   array of daily reports (input)
//! <root>/<device_id>/alerts.json    emergency list (input, optional)
//! <root>/<device_id>/daily.ndjson   one daily envelope per line (output)
//! <root>/<device_id>/monthly.json   latest monthly envelope (output)
//! ```

use crate::error::ComputeError;
use crate::schema::{report_date, DailyReport, ReportAdapter};
use crate::types::{AlertEvent, DailyMetricsRecord, MonthlyStatusReport, ReportEnvelope};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::debug;

pub const REPORTS_FILE: &str = "reports.json";
pub const ALERTS_FILE: &str = "alerts.json";
pub const DAILY_FILE: &str = "daily.ndjson";
pub const MONTHLY_FILE: &str = "monthly.json";

/// Where vendor data and previously computed records are read from
pub trait ReportSource {
    /// Daily reports dated within `[from, to]`
    fn fetch_daily_reports(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, ComputeError>;

    /// Alerts raised within `[from, to]`, sorted by time
    fn fetch_alerts(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AlertEvent>, ComputeError>;

    /// Daily records dated within `[from, to]`, one per date, sorted by date
    fn fetch_daily_records(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetricsRecord>, ComputeError>;
}

/// Where encoded results are written
pub trait ReportSink {
    fn write_daily(
        &mut self,
        envelope: &ReportEnvelope<DailyMetricsRecord>,
    ) -> Result<(), ComputeError>;

    fn write_monthly(
        &mut self,
        envelope: &ReportEnvelope<MonthlyStatusReport>,
    ) -> Result<(), ComputeError>;
}

/// File-backed store rooted at a directory
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn device_dir(&self, device_id: &str) -> PathBuf {
        self.root.join(device_id)
    }

    fn file(&self, device_id: &str, name: &str) -> PathBuf {
        self.device_dir(device_id).join(name)
    }

    fn ensure_device_dir(&self, device_id: &str) -> Result<PathBuf, ComputeError> {
        let dir = self.device_dir(device_id);
        fs::create_dir_all(&dir).map_err(|e| store_error(&dir, e))?;
        Ok(dir)
    }
}

fn store_error(path: &Path, err: std::io::Error) -> ComputeError {
    ComputeError::Store(format!("{}: {}", path.display(), err))
}

fn read_optional(path: &Path) -> Result<Option<String>, ComputeError> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(content)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(store_error(path, e)),
    }
}

fn in_range(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    date >= from && date <= to
}

impl ReportSource for JsonFileStore {
    fn fetch_daily_reports(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyReport>, ComputeError> {
        let path = self.file(device_id, REPORTS_FILE);
        let content = read_optional(&path)?.ok_or_else(|| {
            ComputeError::Store(format!("{}: no reports for device", path.display()))
        })?;
        let reports = ReportAdapter::parse_array(&content)?;

        let mut selected = Vec::new();
        for report in reports {
            if in_range(report_date(&report.time_stamp)?, from, to) {
                selected.push(report);
            }
        }
        debug!(device_id, count = selected.len(), "fetched daily reports");
        Ok(selected)
    }

    fn fetch_alerts(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<AlertEvent>, ComputeError> {
        let path = self.file(device_id, ALERTS_FILE);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };
        let alerts: Vec<AlertEvent> = ReportAdapter::parse_alerts(&content)?
            .into_iter()
            .filter(|a| in_range(a.time.date(), from, to))
            .collect();
        debug!(device_id, count = alerts.len(), "fetched alerts");
        Ok(alerts)
    }

    fn fetch_daily_records(
        &self,
        device_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<DailyMetricsRecord>, ComputeError> {
        let path = self.file(device_id, DAILY_FILE);
        let Some(content) = read_optional(&path)? else {
            return Ok(Vec::new());
        };

        // Later lines supersede earlier ones for the same date
        let mut by_date = BTreeMap::new();
        for (line_num, line) in content.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let envelope: ReportEnvelope<DailyMetricsRecord> = serde_json::from_str(trimmed)
                .map_err(|e| {
                    ComputeError::ParseError(format!(
                        "{} line {}: {}",
                        path.display(),
                        line_num + 1,
                        e
                    ))
                })?;
            if in_range(envelope.data.date, from, to) {
                by_date.insert(envelope.data.date, envelope.data);
            }
        }
        Ok(by_date.into_values().collect())
    }
}

impl ReportSink for JsonFileStore {
    fn write_daily(
        &mut self,
        envelope: &ReportEnvelope<DailyMetricsRecord>,
    ) -> Result<(), ComputeError> {
        let path = self.ensure_device_dir(&envelope.device_id)?.join(DAILY_FILE);
        let line = serde_json::to_string(envelope)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(|e| store_error(&path, e))?;
        writeln!(file, "{line}").map_err(|e| store_error(&path, e))?;
        debug!(device_id = %envelope.device_id, date = %envelope.data.date, "wrote daily record");
        Ok(())
    }

    fn write_monthly(
        &mut self,
        envelope: &ReportEnvelope<MonthlyStatusReport>,
    ) -> Result<(), ComputeError> {
        let path = self.ensure_device_dir(&envelope.device_id)?.join(MONTHLY_FILE);
        let json = serde_json::to_string_pretty(envelope)?;
        fs::write(&path, json).map_err(|e| store_error(&path, e))?;
        debug!(device_id = %envelope.device_id, "wrote monthly report");
        Ok(())
    }
}
