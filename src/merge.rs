//! Interval merging
//!
//! Sensors fragment a single stay into several back-to-back intervals. This
//! module compacts consecutive intervals separated by less than a configured
//! gap into one, provided their attributes are compatible:
//! - categorical attributes (location label) must be equal
//! - numeric attributes (restlessness) always merge and are averaged

use crate::config::MergeConfig;
use crate::types::{LocationVisit, SleepSession, Timed};
use chrono::Duration;
use tracing::debug;

/// Interval type the merger knows how to compact
pub trait Mergeable: Timed + Clone {
    /// Whether `next` may join a group whose last member is `self`
    fn compatible(&self, next: &Self) -> bool;

    /// Collapse a non-empty run of members into one interval
    fn merge_group(group: &[Self]) -> Self;
}

impl Mergeable for LocationVisit {
    fn compatible(&self, next: &Self) -> bool {
        self.location == next.location
    }

    fn merge_group(group: &[Self]) -> Self {
        let first = &group[0];
        let last = &group[group.len() - 1];
        LocationVisit {
            start: first.start,
            stop: last.stop,
            location: last.location.clone(),
        }
    }
}

impl Mergeable for SleepSession {
    fn compatible(&self, _next: &Self) -> bool {
        true
    }

    fn merge_group(group: &[Self]) -> Self {
        let first = &group[0];
        let last = &group[group.len() - 1];
        let restless = group.iter().map(|s| s.restless).sum::<f64>() / group.len() as f64;
        SleepSession {
            start: first.start,
            stop: last.stop,
            restless,
        }
    }
}

/// Merge consecutive compatible intervals
///
/// Input is sorted by start (stable) before merging. An interval joins the
/// running group when it starts less than `max_gap_secs` after the stop of the
/// group's last member.
pub fn merge_intervals<T: Mergeable>(intervals: &[T], config: &MergeConfig) -> Vec<T> {
    let mut sorted = intervals.to_vec();
    sorted.sort_by_key(|i| i.start());

    let max_gap = Duration::seconds(config.max_gap_secs);
    let mut merged = Vec::with_capacity(sorted.len());
    let mut group: Vec<T> = Vec::new();

    for interval in sorted {
        let joins = match group.last() {
            Some(last) => interval.start() - last.stop() < max_gap && last.compatible(&interval),
            None => true,
        };
        if !joins {
            merged.push(T::merge_group(&group));
            group.clear();
        }
        group.push(interval);
    }
    if !group.is_empty() {
        merged.push(T::merge_group(&group));
    }

    debug!(
        input = intervals.len(),
        output = merged.len(),
        "merged consecutive intervals"
    );
    merged
}
