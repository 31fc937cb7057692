//! Pipeline orchestration
//!
//! This module provides the public API of the engine. It orchestrates the full
//! path from vendor reports to daily records and from daily records to the
//! monthly status report.

use crate::aggregator;
use crate::classifier::TrendClassifier;
use crate::config::AnalysisConfig;
use crate::encoder::ReportEncoder;
use crate::error::ComputeError;
use crate::merge::merge_intervals;
use crate::schema::ReportAdapter;
use crate::segmentation::segment_day_night;
use crate::store::{ReportSink, ReportSource};
use crate::types::{
    AlertEvent, DailyBatch, DailyMetricsRecord, DayNightWindow, GaitHour, MonthlyStatusReport,
    Period, SleepSession, VisitorInterval,
};
use chrono::{Duration, NaiveDate};
use tracing::{debug, info, warn};

/// Convert vendor daily reports and the emergency list into daily records.
///
/// # Arguments
/// * `reports_json` - JSON array of extended daily reports
/// * `alerts_json` - JSON emergency list (`[]` if there are none)
/// * `config` - analysis configuration
///
/// # Returns
/// One record per report that has a previous day
///
/// # Example
/// ```ignore
/// let records = reports_to_daily_records(&reports, &alerts, &AnalysisConfig::default())?;
/// ```
pub fn reports_to_daily_records(
    reports_json: &str,
    alerts_json: &str,
    config: &AnalysisConfig,
) -> Result<Vec<DailyMetricsRecord>, ComputeError> {
    // Stage 1: Parse vendor payloads into typed streams
    let reports = ReportAdapter::parse_array(reports_json)?;
    let batches = ReportAdapter::to_batches(&reports)?;
    let alerts = ReportAdapter::parse_alerts(alerts_json)?;

    // Stages 2-4 run per consecutive pair of days
    let mut processor = DailyProcessor::with_config(config.clone())?;
    processor.process_all(&batches, &alerts)
}

/// Evaluate a month of daily records.
///
/// Fails with [`ComputeError::Config`] on unusable trend thresholds.
pub fn monthly_status(
    records: &[DailyMetricsRecord],
    config: &AnalysisConfig,
) -> Result<MonthlyStatusReport, ComputeError> {
    Ok(TrendClassifier::new(config.trend.clone())?.evaluate(records))
}

/// Compute the record for `current`, using `previous` to see the start of the night.
///
/// Pipeline stages:
/// 1. Assemble the 2-day batch
/// 2. Segment the batch into day and night windows
/// 3. Merge fragmented location visits
/// 4. Aggregate every stream over its window
///
/// A batch without sleep sessions cannot be segmented; its record keeps the
/// fall counts and leaves every window-derived field `None`.
pub fn daily_metrics(
    previous: Option<&DailyBatch>,
    current: &DailyBatch,
    alerts: &[AlertEvent],
    visitors: &[VisitorInterval],
    config: &AnalysisConfig,
) -> Result<DailyMetricsRecord, ComputeError> {
    // Stage 1: Assemble the 2-day batch
    let batch = combine_batches(previous, current);

    // Stage 2: Segment into day and night
    let window = match segment_day_night(&batch.sleep, &config.segmentation) {
        Ok(window) => window,
        Err(ComputeError::InsufficientEvents(reason)) => {
            warn!(date = %current.date, %reason, "no day/night windows, recording falls only");
            return Ok(unsegmented_record(current.date, alerts));
        }
        Err(e) => return Err(e),
    };

    // Stage 3: Merge fragmented location visits
    let locations = merge_intervals(&batch.locations, &config.merge);

    // Stage 4: Aggregate
    let night = window.span(Period::Night);
    let day = window.span(Period::Day);
    let gait = align_gait(&current.gait, current.date, &window);
    let out_of_bed = aggregator::out_of_bed(&batch.sleep, &locations, &night);
    let falls = aggregator::fall_counts(alerts, current.date);

    debug!(
        date = %current.date,
        night_sleep_hours = aggregator::coverage_hours(&batch.sleep, &night),
        day_visit_hours = aggregator::coverage_hours(&locations, &day),
        merged_locations = locations.len(),
        "aggregating daily metrics"
    );

    Ok(DailyMetricsRecord {
        date: current.date,
        sleep_duration: aggregator::sleep_duration(&batch.sleep, &night),
        restlessness: aggregator::restlessness(&batch.sleep, &night),
        go_to_sleep_time: Some(night.start),
        wake_up_time: Some(night.end),
        number_of_out_of_bed_during_night: out_of_bed.as_ref().map(|o| o.count),
        duration_of_out_of_bed: out_of_bed.as_ref().map(|o| o.duration_hours),
        sleep_duration_during_day: aggregator::sleep_duration(&batch.sleep, &day),
        restlessness_during_day: aggregator::restlessness(&batch.sleep, &day),
        location_distribution_of_out_of_bed_during_night: out_of_bed.map(|o| o.locations),
        average_nightly_rr: aggregator::average_respiration(&batch.respiration, &night),
        average_nightly_hr: aggregator::average_heart_rate(&batch.respiration, &night),
        location_distribution_during_day: aggregator::location_distribution(&locations, &day, true),
        sedentary_duration_during_day: aggregator::sedentary_count(&gait, &day),
        alone_time: Some(aggregator::alone_time(visitors, &day)),
        number_of_acute_falls: falls.acute_falls,
        number_of_moderate_falls: falls.moderate_falls,
        number_of_lying_on_floor: falls.lying_on_floor,
        number_of_fall_from_bed: falls.fall_from_bed,
        gait_statistics_during_day: aggregator::gait_statistics(&gait, &day),
    })
}

/// Record of a day without day/night windows
fn unsegmented_record(date: NaiveDate, alerts: &[AlertEvent]) -> DailyMetricsRecord {
    let falls = aggregator::fall_counts(alerts, date);
    DailyMetricsRecord {
        date,
        sleep_duration: None,
        restlessness: None,
        go_to_sleep_time: None,
        wake_up_time: None,
        number_of_out_of_bed_during_night: None,
        duration_of_out_of_bed: None,
        sleep_duration_during_day: None,
        restlessness_during_day: None,
        location_distribution_of_out_of_bed_during_night: None,
        average_nightly_rr: None,
        average_nightly_hr: None,
        location_distribution_during_day: None,
        sedentary_duration_during_day: None,
        alone_time: None,
        number_of_acute_falls: falls.acute_falls,
        number_of_moderate_falls: falls.moderate_falls,
        number_of_lying_on_floor: falls.lying_on_floor,
        number_of_fall_from_bed: falls.fall_from_bed,
        gait_statistics_during_day: None,
    }
}

/// Streams of the previous and current day, with sleep limited to those two dates
fn combine_batches(previous: Option<&DailyBatch>, current: &DailyBatch) -> DailyBatch {
    let first_date = current.date.pred_opt().unwrap_or(current.date);
    let mut batch = DailyBatch {
        date: current.date,
        ..DailyBatch::default()
    };
    for source in previous.into_iter().chain(std::iter::once(current)) {
        batch.sleep.extend(source.sleep.iter().cloned());
        batch.locations.extend(source.locations.iter().cloned());
        batch.respiration.extend(source.respiration.iter().cloned());
    }

    let before = batch.sleep.len();
    batch.sleep.retain(|s: &SleepSession| {
        s.start.date() >= first_date && s.stop.date() <= current.date
    });
    if batch.sleep.len() < before {
        debug!(
            dropped = before - batch.sleep.len(),
            "sleep sessions outside the 2-day batch"
        );
    }
    batch.sleep.sort_by_key(|s| s.start);
    batch.locations.sort_by_key(|l| l.start);
    batch.respiration.sort_by_key(|r| r.time);
    batch
}

/// Place the hourly gait slots on the calendar date the day window starts on
fn align_gait(gait: &[GaitHour], report_date: NaiveDate, window: &DayNightWindow) -> Vec<GaitHour> {
    let shift = window.day.start.date() - report_date;
    if shift == Duration::zero() {
        return gait.to_vec();
    }
    gait.iter()
        .map(|g| GaitHour {
            time: g.time + shift,
            ..g.clone()
        })
        .collect()
}

/// Stateful processor pairing each day with the day before it.
///
/// Use this when daily reports arrive one at a time.
pub struct DailyProcessor {
    config: AnalysisConfig,
    previous: Option<DailyBatch>,
}

impl Default for DailyProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl DailyProcessor {
    /// Create a new processor with default settings
    pub fn new() -> Self {
        Self {
            config: AnalysisConfig::default(),
            previous: None,
        }
    }

    /// Create a processor with a specific configuration
    ///
    /// Fails with [`ComputeError::Config`] if any tunable is unusable.
    pub fn with_config(config: AnalysisConfig) -> Result<Self, ComputeError> {
        config.validate()?;
        Ok(Self {
            config,
            previous: None,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Feed the next day's batch
    ///
    /// The first batch only primes the processor; every later batch yields a
    /// record, with `None` window metrics when its sleep cannot be segmented.
    pub fn process(
        &mut self,
        batch: DailyBatch,
        alerts: &[AlertEvent],
        visitors: &[VisitorInterval],
    ) -> Result<Option<DailyMetricsRecord>, ComputeError> {
        let Some(previous) = self.previous.take() else {
            debug!(date = %batch.date, "first batch primes the processor");
            self.previous = Some(batch);
            return Ok(None);
        };

        let result = daily_metrics(Some(&previous), &batch, alerts, visitors, &self.config);
        self.previous = Some(batch);
        result.map(Some)
    }

    /// Process a run of daily batches sorted by date
    pub fn process_all(
        &mut self,
        batches: &[DailyBatch],
        alerts: &[AlertEvent],
    ) -> Result<Vec<DailyMetricsRecord>, ComputeError> {
        let visitors = ReportAdapter::visitors_from_alerts(alerts);
        let mut records = Vec::new();
        for batch in batches {
            if let Some(record) = self.process(batch.clone(), alerts, &visitors)? {
                records.push(record);
            }
        }
        Ok(records)
    }
}

/// Compute, encode and store daily records for `[from, to]`
///
/// Reads one extra day before `from` so the first night is complete.
pub fn run_daily(
    source: &dyn ReportSource,
    sink: &mut dyn ReportSink,
    encoder: &ReportEncoder,
    device_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    config: &AnalysisConfig,
) -> Result<Vec<DailyMetricsRecord>, ComputeError> {
    let fetch_from = from.pred_opt().unwrap_or(from);
    let fetch_to = to.succ_opt().unwrap_or(to);
    let reports = source.fetch_daily_reports(device_id, fetch_from, to)?;
    let alerts = source.fetch_alerts(device_id, fetch_from, fetch_to)?;
    let batches = ReportAdapter::to_batches(&reports)?;

    let mut processor = DailyProcessor::with_config(config.clone())?;
    let records: Vec<DailyMetricsRecord> = processor
        .process_all(&batches, &alerts)?
        .into_iter()
        .filter(|r| r.date >= from && r.date <= to)
        .collect();

    for record in &records {
        sink.write_daily(&encoder.encode_daily(device_id, record))?;
    }
    info!(device_id, days = records.len(), "daily analysis complete");
    Ok(records)
}

/// Evaluate and store the monthly report over records in `[from, to]`
pub fn run_monthly(
    source: &dyn ReportSource,
    sink: &mut dyn ReportSink,
    encoder: &ReportEncoder,
    device_id: &str,
    from: NaiveDate,
    to: NaiveDate,
    config: &AnalysisConfig,
) -> Result<MonthlyStatusReport, ComputeError> {
    let records = source.fetch_daily_records(device_id, from, to)?;
    let report = monthly_status(&records, config)?;
    sink.write_monthly(&encoder.encode_monthly(device_id, &report))?;
    info!(
        device_id,
        days = report.days_evaluated,
        status = %report.total_status,
        "monthly analysis complete"
    );
    Ok(report)
}
