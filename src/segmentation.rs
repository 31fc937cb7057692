//! Day/night segmentation
//!
//! Converts a 1-2 day batch of sleep sessions into a `{Day, Night}` window pair:
//! 1. Rasterize sessions onto a 2-day bitmap of sleep/awake buckets
//! 2. Walk outward from the midpoint (midnight between the two days) until an
//!    awake run long enough to end the night is found on each side
//! 3. Snap the bucket boundaries to the closest real session start/stop
//! 4. Derive the day window from the night, wrapping around local noon
//!
//! Short awake runs (bathroom breaks) up to `max_awake_run` buckets never break
//! the night cluster.

use crate::config::SegmentationConfig;
use crate::error::{ComputeError, ValidationError};
use crate::types::{DayNightWindow, SleepSession, TimeSpan};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeSet;
use tracing::{debug, warn};

/// Number of calendar days covered by one segmentation batch
pub const BATCH_DAYS: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Bucket {
    Awake,
    Sleep,
}

/// Derive the day and night windows for a batch of sleep sessions
///
/// Sessions may be unsorted. More than two calendar dates is a validation
/// condition: sessions outside the earliest two dates are dropped and
/// segmentation proceeds on the rest. Fails on an unusable config, when no
/// sessions remain or when a session stops before it starts.
pub fn segment_day_night(
    sessions: &[SleepSession],
    config: &SegmentationConfig,
) -> Result<DayNightWindow, ComputeError> {
    config.validate()?;
    if sessions.is_empty() {
        return Err(ComputeError::InsufficientEvents(
            "no sleep sessions to segment".to_string(),
        ));
    }
    if let Some(bad) = sessions.iter().find(|s| s.start > s.stop) {
        return Err(ValidationError::InvertedInterval {
            start: bad.start.to_string(),
            stop: bad.stop.to_string(),
        }
        .into());
    }

    let mut sorted = sessions.to_vec();
    sorted.sort_by_key(|s| s.start);

    let (start_date, sorted) = batch_range(sorted)?;
    let range_start = start_date
        .and_hms_opt(0, 0, 0)
        .ok_or_else(|| ComputeError::DateParseError("invalid batch start".to_string()))?;
    let bitmap = sleep_bitmap(&sorted, range_start, config);
    let (start_idx, end_idx) = night_boundaries(&bitmap, config.max_awake_run);

    let bucket = Duration::seconds(config.bucket_secs());
    let nominal_start = range_start + bucket * start_idx as i32;
    let nominal_end = range_start + bucket * end_idx as i32;

    let snapped_start = closest(sorted.iter().map(|s| s.start), nominal_start);
    let snapped_end = closest(sorted.iter().map(|s| s.stop), nominal_end);
    let night = if snapped_start <= snapped_end {
        TimeSpan::new(snapped_start, snapped_end)
    } else {
        debug!(%snapped_start, %snapped_end, "snapping inverted the night, keeping bucket times");
        TimeSpan::new(nominal_start, nominal_end)
    };

    let (start_shift, end_shift) = day_delta(&sorted);
    let day = TimeSpan::new(night.end, night.start).shifted(start_shift, end_shift);

    debug!(
        night_start = %night.start,
        night_end = %night.end,
        day_start = %day.start,
        day_end = %day.end,
        "segmented day/night windows"
    );
    Ok(DayNightWindow { day, night })
}

/// First date of the 2-day bitmap range and the sessions lying within it
fn batch_range(
    mut sorted: Vec<SleepSession>,
) -> Result<(NaiveDate, Vec<SleepSession>), ComputeError> {
    let dates: BTreeSet<NaiveDate> = sorted
        .iter()
        .flat_map(|s| [s.start.date(), s.stop.date()])
        .collect();
    let kept: Vec<NaiveDate> = dates.iter().take(BATCH_DAYS).copied().collect();
    let (first, second) = match kept.as_slice() {
        [first, second] => (*first, Some(*second)),
        [first] => (*first, None),
        _ => {
            return Err(ComputeError::InsufficientEvents(
                "no sleep sessions to segment".to_string(),
            ))
        }
    };

    if dates.len() > BATCH_DAYS {
        let err = ValidationError::TooManyDates {
            found: dates.len(),
            max: BATCH_DAYS,
        };
        let last = second.unwrap_or(first);
        sorted.retain(|s| s.start.date() >= first && s.stop.date() <= last);
        warn!(error = %err, kept = sorted.len(), "truncating sleep batch to its earliest two dates");
        if sorted.is_empty() {
            return Err(ComputeError::InsufficientEvents(format!(
                "no sleep session lies within {first} and {last}"
            )));
        }
    }

    let start = match second {
        Some(_) => first,
        // One date: it holds the end of a night if sleep stops before noon
        None if !stops_after_noon(&sorted) => first.pred_opt().unwrap_or(first),
        None => first,
    };
    Ok((start, sorted))
}

/// Rasterize sessions onto `2 * 24 * buckets_per_hour` buckets
fn sleep_bitmap(
    sorted: &[SleepSession],
    range_start: NaiveDateTime,
    config: &SegmentationConfig,
) -> Vec<Bucket> {
    let len = BATCH_DAYS * 24 * config.buckets_per_hour as usize;
    let bucket_secs = config.bucket_secs();
    let last = len as i64 - 1;
    let mut bitmap = vec![Bucket::Awake; len];

    for session in sorted {
        let start_offset = (session.start - range_start).num_seconds();
        let stop_offset = (session.stop - range_start).num_seconds();
        let first = start_offset.div_euclid(bucket_secs);
        let last_marked = ceil_div(stop_offset, bucket_secs);
        if last_marked < 0 || first > last {
            continue;
        }
        let from = first.clamp(0, last) as usize;
        let to = last_marked.clamp(0, last) as usize;
        bitmap[from..=to].fill(Bucket::Sleep);
    }
    bitmap
}

fn ceil_div(value: i64, divisor: i64) -> i64 {
    let q = value.div_euclid(divisor);
    if value.rem_euclid(divisor) == 0 {
        q
    } else {
        q + 1
    }
}

/// Bucket indices of the night's start and end boundaries
///
/// The start boundary is the bucket after the latest awake run of
/// `max_awake_run + 1` buckets before the midpoint; the end boundary is the
/// first such run at or after the midpoint. Falls back to `mid - 1` / `mid + 1`.
fn night_boundaries(bitmap: &[Bucket], max_awake_run: usize) -> (usize, usize) {
    let len = bitmap.len();
    let mid = len / 2;
    let all_awake = |range: &[Bucket]| range.iter().all(|b| *b == Bucket::Awake);

    let start = (0..mid)
        .rev()
        .find(|&i| all_awake(&bitmap[i.saturating_sub(max_awake_run)..=i]))
        .map(|i| i + 1)
        .unwrap_or(mid - 1);

    let end = (mid..len)
        .find(|&j| all_awake(&bitmap[j..=(j + max_awake_run).min(len - 1)]))
        .unwrap_or(mid + 1);

    (start, end)
}

/// Candidate closest to `target`; earliest wins on ties
fn closest(candidates: impl Iterator<Item = NaiveDateTime>, target: NaiveDateTime) -> NaiveDateTime {
    candidates
        .min_by_key(|t| (*t - target).num_seconds().abs())
        .unwrap_or(target)
}

fn stops_after_noon(sorted: &[SleepSession]) -> bool {
    const NOON_SECS: u32 = 12 * 3600;
    sorted
        .last()
        .is_some_and(|s| s.stop.num_seconds_from_midnight() > NOON_SECS)
}

/// Day offsets applied to `(night.end, night.start)`
fn day_delta(sorted: &[SleepSession]) -> (i64, i64) {
    if stops_after_noon(sorted) {
        (0, 1)
    } else {
        (-1, 0)
    }
}
