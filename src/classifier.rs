//! Monthly trend classification
//!
//! Turns roughly a month of daily records into ordinal status codes:
//! - continuous metrics compare the most recent days against the mean and
//!   standard deviation of the preceding history
//! - fall counters sum the most recent days against a fixed threshold
//! - sub-metric statuses roll up into domain statuses and one overall status

use crate::config::{ConfigError, TrendConfig};
use crate::types::{
    ActivityLevelStatus, AloneTimeStatus, DailyMetricsRecord, FallRiskStatus, FallType,
    GaitStatistics, MonthlyStatusReport, SleepQualityStatus, StatusCode,
};
use chrono::{NaiveDateTime, Timelike};
use std::collections::BTreeMap;
use tracing::debug;

/// Classifier over a fixed set of trend thresholds
#[derive(Debug, Clone, Default)]
pub struct TrendClassifier {
    config: TrendConfig,
}

impl TrendClassifier {
    pub fn new(config: TrendConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &TrendConfig {
        &self.config
    }

    /// Status of a continuous metric; `values` are the non-missing daily values
    /// in date order, the last one being today
    pub fn classify_continuous(&self, values: &[f64]) -> StatusCode {
        let Some((_, whole_std)) = mean_and_std(values) else {
            return StatusCode::Gray;
        };
        if whole_std == 0.0 {
            return StatusCode::Green;
        }

        let history = &values[..values.len() - 1];
        let Some((mean, std)) = mean_and_std(history) else {
            return StatusCode::Gray;
        };
        let cfg = &self.config;
        let latest = values[values.len() - 1];

        let red_high = mean + cfg.std_upper * std;
        let yellow_high = mean + cfg.std_lower * std;
        let red_low = mean - cfg.std_upper * std;
        let yellow_low = mean - cfg.std_lower * std;

        if tail_all(values, cfg.red_run, |v| v > red_high) {
            StatusCode::RedUp
        } else if tail_all(values, cfg.yellow_run, |v| v > yellow_high) || latest > red_high {
            StatusCode::YellowUp
        } else if tail_all(values, cfg.red_run, |v| v < red_low) {
            StatusCode::RedDown
        } else if tail_all(values, cfg.yellow_run, |v| v < yellow_low) || latest < red_low {
            StatusCode::YellowDown
        } else {
            StatusCode::Green
        }
    }

    /// Status of an event counter; `counts` are the daily counts in date order
    pub fn classify_count(&self, counts: &[u32]) -> StatusCode {
        if counts.is_empty() {
            return StatusCode::Gray;
        }
        let window = counts.len().saturating_sub(self.config.count_window_days);
        let recent: u32 = counts[window..].iter().sum();
        if recent == 0 {
            StatusCode::Green
        } else if recent < self.config.count_threshold {
            StatusCode::Yellow
        } else {
            StatusCode::Red
        }
    }

    /// Evaluate a month of daily records
    ///
    /// Records may arrive in any order; they are evaluated by date.
    pub fn evaluate(&self, records: &[DailyMetricsRecord]) -> MonthlyStatusReport {
        let mut sorted: Vec<&DailyMetricsRecord> = records.iter().collect();
        sorted.sort_by_key(|r| r.date);

        let continuous = |metric: &dyn Fn(&DailyMetricsRecord) -> Option<f64>| {
            let values: Vec<f64> = sorted.iter().filter_map(|r| metric(r)).collect();
            self.classify_continuous(&values)
        };
        let gait = |metric: fn(&GaitStatistics) -> Option<f64>| {
            continuous(&|r| r.gait_statistics_during_day.as_ref().and_then(metric))
        };
        let count = |fall: FallType| {
            let counts: Vec<u32> = sorted.iter().map(|r| r.fall_count(fall)).collect();
            self.classify_count(&counts)
        };

        let mut sleep_quality = SleepQualityStatus {
            sleep_duration: continuous(&|r| r.sleep_duration),
            restlessness: continuous(&|r| r.restlessness),
            go_to_sleep_time: continuous(&|r| r.go_to_sleep_time.map(hours_since_noon)),
            wake_up_time: continuous(&|r| r.wake_up_time.map(hours_since_noon)),
            number_of_out_of_bed_during_night: continuous(&|r| {
                r.number_of_out_of_bed_during_night.map(f64::from)
            }),
            duration_of_out_of_bed: continuous(&|r| r.duration_of_out_of_bed),
            sleep_duration_during_day: continuous(&|r| r.sleep_duration_during_day),
            average_nightly_rr: continuous(&|r| r.average_nightly_rr),
            average_nightly_hr: continuous(&|r| r.average_nightly_hr),
            location_distribution_of_out_of_bed_during_night: sum_location_distributions(
                sorted
                    .iter()
                    .filter_map(|r| r.location_distribution_of_out_of_bed_during_night.as_ref()),
            ),
            status: StatusCode::Gray,
        };
        sleep_quality.status = aggregate_status(&[
            sleep_quality.sleep_duration,
            sleep_quality.restlessness,
            sleep_quality.go_to_sleep_time,
            sleep_quality.wake_up_time,
            sleep_quality.number_of_out_of_bed_during_night,
            sleep_quality.duration_of_out_of_bed,
            sleep_quality.sleep_duration_during_day,
            sleep_quality.average_nightly_rr,
            sleep_quality.average_nightly_hr,
        ]);

        let mut activity_level = ActivityLevelStatus {
            sedentary_duration_during_day: continuous(&|r| {
                r.sedentary_duration_during_day.map(f64::from)
            }),
            walking_total_distance: gait(|g| Some(g.total_distance)),
            walking_speed: gait(|g| g.avg_speed),
            walking_sessions: gait(|g| Some(g.avg_sessions)),
            walking_average_distance: gait(|g| g.avg_distance),
            location_distribution_during_day: sum_location_distributions(
                sorted
                    .iter()
                    .filter_map(|r| r.location_distribution_during_day.as_ref()),
            ),
            status: StatusCode::Gray,
        };
        activity_level.status = aggregate_status(&[
            activity_level.sedentary_duration_during_day,
            activity_level.walking_total_distance,
            activity_level.walking_speed,
            activity_level.walking_sessions,
            activity_level.walking_average_distance,
        ]);

        let alone = continuous(&|r| r.alone_time);
        let alone_time = AloneTimeStatus {
            alone_time: alone,
            status: aggregate_status(&[alone]),
        };

        let mut fall_risk = FallRiskStatus {
            number_of_acute_falls: count(FallType::AcuteFall),
            number_of_moderate_falls: count(FallType::ModerateFall),
            number_of_lying_on_floor: count(FallType::LongLyingOnFloor),
            number_of_fall_from_bed: count(FallType::FallFromBed),
            status: StatusCode::Gray,
        };
        fall_risk.status = aggregate_status(&[
            fall_risk.number_of_acute_falls,
            fall_risk.number_of_moderate_falls,
            fall_risk.number_of_lying_on_floor,
            fall_risk.number_of_fall_from_bed,
        ]);

        let total_status = aggregate_status(&[
            sleep_quality.status,
            activity_level.status,
            alone_time.status,
            fall_risk.status,
        ]);

        debug!(
            days = sorted.len(),
            sleep = %sleep_quality.status,
            activity = %activity_level.status,
            alone = %alone_time.status,
            falls = %fall_risk.status,
            total = %total_status,
            "evaluated monthly trend"
        );

        MonthlyStatusReport {
            from: sorted.first().map(|r| r.date),
            to: sorted.last().map(|r| r.date),
            days_evaluated: sorted.len(),
            sleep_quality,
            activity_level,
            alone_time,
            fall_risk,
            acute_fall: acute_fall(records),
            total_status,
        }
    }
}

/// Roll sub-statuses up: all gray stays gray, otherwise the worst non-gray wins
pub fn aggregate_status(statuses: &[StatusCode]) -> StatusCode {
    if statuses.iter().all(|s| s.is_gray()) {
        StatusCode::Gray
    } else if statuses.iter().any(|s| s.is_red()) {
        StatusCode::Red
    } else if statuses.iter().any(|s| s.is_yellow()) {
        StatusCode::Yellow
    } else {
        StatusCode::Green
    }
}

/// True if any record in the range reports an acute fall
pub fn acute_fall(records: &[DailyMetricsRecord]) -> bool {
    records
        .iter()
        .map(|r| r.number_of_acute_falls)
        .sum::<u32>()
        > 0
}

/// Hours elapsed since the preceding local noon, so nights stay continuous
pub fn hours_since_noon(time: NaiveDateTime) -> f64 {
    let hours = f64::from(time.hour())
        + f64::from(time.minute()) / 60.0
        + f64::from(time.second()) / 3600.0;
    (hours - 12.0).rem_euclid(24.0)
}

/// Element-wise sum of per-day location histograms
pub fn sum_location_distributions<'a>(
    maps: impl Iterator<Item = &'a BTreeMap<String, f64>>,
) -> BTreeMap<String, f64> {
    let mut total = BTreeMap::new();
    for map in maps {
        for (location, hours) in map {
            *total.entry(location.clone()).or_insert(0.0) += hours;
        }
    }
    total
}

/// Mean and sample standard deviation; `None` below two values
fn mean_and_std(values: &[f64]) -> Option<(f64, f64)> {
    if values.len() < 2 {
        return None;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    Some((mean, variance.sqrt()))
}

fn tail_all(values: &[f64], run: usize, predicate: impl Fn(f64) -> bool) -> bool {
    values.len() >= run && values[values.len() - run..].iter().all(|v| predicate(*v))
}
