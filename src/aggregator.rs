//! Window metric aggregation
//!
//! Filters each event stream to a day or night span and reduces it to the
//! statistics carried by the daily record. Every reducer returns `None` when
//! the filtered stream is empty, except the counters and alone time where
//! absence is a legitimate zero.

use crate::types::{
    hours_between, ActivityLevel, AlertEvent, FallCounts, FallType, GaitHour, GaitStatistics,
    LocationVisit, OutOfBedSummary, RespirationSample, Sampled, SleepSession, TimeSpan, Timed,
    VisitorInterval, BED_LOCATION,
};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Intervals lying entirely inside `span`
pub fn windowed<'a, T: Timed>(events: &'a [T], span: &TimeSpan) -> Vec<&'a T> {
    events
        .iter()
        .filter(|e| span.contains_interval(e.start(), e.stop()))
        .collect()
}

/// Point samples observed inside `span` (inclusive)
pub fn windowed_samples<'a, T: Sampled>(samples: &'a [T], span: &TimeSpan) -> Vec<&'a T> {
    samples.iter().filter(|s| span.contains(s.time())).collect()
}

/// Total sleep in the span (hours)
pub fn sleep_duration(sessions: &[SleepSession], span: &TimeSpan) -> Option<f64> {
    let inside = windowed(sessions, span);
    if inside.is_empty() {
        return None;
    }
    Some(inside.iter().map(|s| s.duration_hours()).sum())
}

/// Duration-weighted mean restlessness in the span
pub fn restlessness(sessions: &[SleepSession], span: &TimeSpan) -> Option<f64> {
    let inside = windowed(sessions, span);
    if inside.is_empty() {
        return None;
    }
    let total: f64 = inside.iter().map(|s| s.duration_hours()).sum();
    if total > 0.0 {
        Some(inside.iter().map(|s| s.restless * s.duration_hours()).sum::<f64>() / total)
    } else {
        // zero-length sessions only
        mean(inside.iter().map(|s| s.restless))
    }
}

/// Non-bed visits that fall entirely inside the awake gaps between sleep sessions
///
/// `None` when no session lies in the span; with sessions but no matching
/// visits the summary has a zero count.
pub fn out_of_bed(
    sessions: &[SleepSession],
    visits: &[LocationVisit],
    span: &TimeSpan,
) -> Option<OutOfBedSummary> {
    let mut inside = windowed(sessions, span);
    if inside.is_empty() {
        return None;
    }
    inside.sort_by_key(|s| s.start);

    let gaps: Vec<TimeSpan> = inside
        .windows(2)
        .filter(|pair| pair[0].stop <= pair[1].start)
        .map(|pair| TimeSpan::new(pair[0].stop, pair[1].start))
        .collect();

    let mut summary = OutOfBedSummary::default();
    for visit in visits.iter().filter(|v| v.location != BED_LOCATION) {
        if gaps
            .iter()
            .any(|gap| gap.contains_interval(visit.start, visit.stop))
        {
            let hours = visit.duration_hours();
            summary.count += 1;
            summary.duration_hours += hours;
            *summary.locations.entry(visit.location.clone()).or_insert(0.0) += hours;
        }
    }
    Some(summary)
}

/// Hours spent per location inside the span
pub fn location_distribution(
    visits: &[LocationVisit],
    span: &TimeSpan,
    include_bed: bool,
) -> Option<BTreeMap<String, f64>> {
    let mut histogram = BTreeMap::new();
    for visit in windowed(visits, span) {
        if !include_bed && visit.location == BED_LOCATION {
            continue;
        }
        *histogram.entry(visit.location.clone()).or_insert(0.0) += visit.duration_hours();
    }
    if histogram.is_empty() {
        None
    } else {
        Some(histogram)
    }
}

/// Mean breathing rate of the span's readings
pub fn average_respiration(samples: &[RespirationSample], span: &TimeSpan) -> Option<f64> {
    mean(
        windowed_samples(samples, span)
            .into_iter()
            .filter_map(|s| s.respiration),
    )
}

/// Mean heart rate of the span's readings, ignoring the device's 0 sentinel
pub fn average_heart_rate(samples: &[RespirationSample], span: &TimeSpan) -> Option<f64> {
    mean(
        windowed_samples(samples, span)
            .into_iter()
            .filter_map(|s| s.heart_rate_reading()),
    )
}

/// Hours of the span without visitors
pub fn alone_time(visitors: &[VisitorInterval], span: &TimeSpan) -> f64 {
    let visited: f64 = windowed(visitors, span)
        .iter()
        .map(|v| v.duration_hours())
        .sum();
    (span.hours() - visited).max(0.0)
}

/// Fall alerts per type raised on the calendar `date`
///
/// Consecutive dates partition the alert stream: each fall lands in exactly
/// one daily record.
pub fn fall_counts(alerts: &[AlertEvent], date: NaiveDate) -> FallCounts {
    let mut counts = FallCounts::default();
    for alert in alerts.iter().filter(|a| a.time.date() == date) {
        if let Some(fall) = FallType::from_label(&alert.kind) {
            counts.increment(fall);
        }
    }
    counts
}

/// Number of low-activity gait hours inside the span
pub fn sedentary_count(gait: &[GaitHour], span: &TimeSpan) -> Option<u32> {
    let inside = windowed_samples(gait, span);
    if inside.is_empty() {
        return None;
    }
    Some(
        inside
            .iter()
            .filter(|g| g.activity == ActivityLevel::Low)
            .count() as u32,
    )
}

/// Walking statistics over the span's gait hours
pub fn gait_statistics(gait: &[GaitHour], span: &TimeSpan) -> Option<GaitStatistics> {
    let inside = windowed_samples(gait, span);
    if inside.is_empty() {
        return None;
    }

    let total_distance = inside.iter().map(|g| g.distance).sum();
    let avg_sessions = mean(inside.iter().map(|g| f64::from(g.sessions))).unwrap_or(0.0);

    let walking: Vec<&&GaitHour> = inside.iter().filter(|g| g.sessions > 0).collect();
    let avg_distance = mean(
        walking
            .iter()
            .map(|g| g.distance / f64::from(g.sessions)),
    );
    let avg_minutes = mean(
        walking
            .iter()
            .map(|g| g.duration_minutes / f64::from(g.sessions)),
    );
    let avg_speed = match (avg_distance, avg_minutes) {
        (Some(distance), Some(minutes)) if minutes > 0.0 => Some(distance / minutes),
        _ => None,
    };

    Some(GaitStatistics {
        total_distance,
        avg_speed,
        avg_sessions,
        avg_distance,
    })
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values.fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Covered hours of the span, for log output
pub(crate) fn coverage_hours<T: Timed>(events: &[T], span: &TimeSpan) -> f64 {
    windowed(events, span)
        .iter()
        .map(|e| hours_between(e.start(), e.stop()))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, NaiveDateTime};
    use pretty_assertions::assert_eq;

    fn at(day: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, day)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    fn session(start: NaiveDateTime, stop: NaiveDateTime, restless: f64) -> SleepSession {
        SleepSession {
            start,
            stop,
            restless,
        }
    }

    fn visit(start: NaiveDateTime, stop: NaiveDateTime, location: &str) -> LocationVisit {
        LocationVisit {
            start,
            stop,
            location: location.to_string(),
        }
    }

    fn gait(h: u32, sessions: u32, distance: f64, minutes: f64, activity: ActivityLevel) -> GaitHour {
        GaitHour {
            time: at(6, h, 0),
            sessions,
            distance,
            duration_minutes: minutes,
            activity,
        }
    }

    fn night() -> TimeSpan {
        TimeSpan::new(at(5, 22, 15), at(6, 7, 15))
    }

    fn day() -> TimeSpan {
        TimeSpan::new(at(6, 7, 15), at(6, 22, 15))
    }

    fn split_night() -> Vec<SleepSession> {
        vec![
            session(at(5, 22, 15), at(6, 3, 45), 1.0),
            session(at(6, 4, 0), at(6, 7, 15), 0.0),
            session(at(6, 13, 0), at(6, 14, 0), 0.5),
        ]
    }

    #[test]
    fn test_windowed_requires_full_containment() {
        let sessions = vec![
            session(at(5, 22, 15), at(6, 1, 0), 0.1),
            session(at(6, 7, 0), at(6, 8, 0), 0.1),
        ];
        assert_eq!(windowed(&sessions, &night()).len(), 1);
    }

    #[test]
    fn test_sleep_duration_and_restlessness() {
        let sessions = split_night();
        let hours = sleep_duration(&sessions, &night()).unwrap();
        assert!((hours - 8.75).abs() < 1e-9);
        // 5.5h at 1.0 and 3.25h at 0.0
        let restless = restlessness(&sessions, &night()).unwrap();
        assert!((restless - 5.5 / 8.75).abs() < 1e-9);

        assert_eq!(sleep_duration(&sessions, &day()), Some(1.0));
        assert_eq!(restlessness(&sessions, &day()), Some(0.5));
    }

    #[test]
    fn test_no_sessions_in_window_is_none() {
        let span = TimeSpan::new(at(7, 0, 0), at(7, 6, 0));
        assert_eq!(sleep_duration(&split_night(), &span), None);
        assert_eq!(restlessness(&split_night(), &span), None);
        assert_eq!(out_of_bed(&split_night(), &[], &span), None);
    }

    #[test]
    fn test_out_of_bed_counts_visits_inside_gaps() {
        let visits = vec![
            visit(at(5, 22, 15), at(6, 3, 45), "Bed"),
            visit(at(6, 3, 45), at(6, 4, 0), "Bathroom"),
            visit(at(6, 4, 0), at(6, 7, 15), "Bed"),
        ];
        let summary = out_of_bed(&split_night(), &visits, &night()).unwrap();
        assert_eq!(summary.count, 1);
        assert!((summary.duration_hours - 0.25).abs() < 1e-9);
        assert_eq!(
            summary.locations,
            BTreeMap::from([("Bathroom".to_string(), 0.25)])
        );
    }

    #[test]
    fn test_out_of_bed_ignores_partial_overlap() {
        let visits = vec![visit(at(6, 3, 30), at(6, 4, 0), "Kitchen")];
        let summary = out_of_bed(&split_night(), &visits, &night()).unwrap();
        assert_eq!(summary, OutOfBedSummary::default());
    }

    #[test]
    fn test_location_distribution_excludes_bed_unless_requested() {
        let visits = vec![
            visit(at(6, 8, 0), at(6, 9, 0), "Kitchen"),
            visit(at(6, 9, 0), at(6, 9, 30), "Kitchen"),
            visit(at(6, 13, 0), at(6, 14, 0), "Bed"),
        ];
        let without = location_distribution(&visits, &day(), false).unwrap();
        assert_eq!(without, BTreeMap::from([("Kitchen".to_string(), 1.5)]));

        let with = location_distribution(&visits, &day(), true).unwrap();
        assert_eq!(with.get("Bed"), Some(&1.0));

        let only_bed = vec![visit(at(6, 13, 0), at(6, 14, 0), "Bed")];
        assert_eq!(location_distribution(&only_bed, &day(), false), None);
    }

    #[test]
    fn test_heart_rate_zero_is_treated_as_missing() {
        let samples = vec![
            RespirationSample {
                time: at(6, 1, 0),
                respiration: Some(14.0),
                heart_rate: Some(60.0),
            },
            RespirationSample {
                time: at(6, 2, 0),
                respiration: Some(16.0),
                heart_rate: Some(0.0),
            },
            RespirationSample {
                time: at(6, 3, 0),
                respiration: None,
                heart_rate: Some(70.0),
            },
        ];
        assert_eq!(average_respiration(&samples, &night()), Some(15.0));
        assert_eq!(average_heart_rate(&samples, &night()), Some(65.0));
        assert_eq!(average_heart_rate(&samples, &day()), None);
    }

    #[test]
    fn test_alone_time_subtracts_visitors() {
        let visitors = vec![
            VisitorInterval {
                start: at(6, 10, 0),
                stop: at(6, 12, 0),
            },
            VisitorInterval {
                start: at(6, 23, 0),
                stop: at(7, 1, 0),
            },
        ];
        assert!((alone_time(&visitors, &day()) - 13.0).abs() < 1e-9);
        assert!((alone_time(&[], &day()) - 15.0).abs() < 1e-9);
    }

    #[test]
    fn test_fall_counts_default_to_zero() {
        let alert = |h: u32, kind: &str| AlertEvent {
            time: at(6, h, 0),
            kind: kind.to_string(),
            location: "Kitchen".to_string(),
            description: String::new(),
        };
        let alerts = vec![
            alert(9, "AcuteFall"),
            alert(10, "AcuteFall"),
            alert(11, "Fall from bed"),
            alert(12, "VisitorsIn"),
            AlertEvent {
                time: at(7, 0, 0),
                ..alert(0, "AcuteFall")
            },
        ];
        let today = at(6, 0, 0).date();
        let counts = fall_counts(&alerts, today);
        assert_eq!(counts.acute_falls, 2);
        assert_eq!(counts.fall_from_bed, 1);
        assert_eq!(counts.moderate_falls, 0);
        assert_eq!(fall_counts(&alerts, today.succ_opt().unwrap()).acute_falls, 1);
        assert_eq!(fall_counts(&[], today), FallCounts::default());
    }

    #[test]
    fn test_gait_statistics() {
        let hours = vec![
            gait(9, 2, 100.0, 10.0, ActivityLevel::Med),
            gait(10, 0, 0.0, 0.0, ActivityLevel::Low),
            gait(11, 1, 20.0, 4.0, ActivityLevel::Low),
        ];
        let stats = gait_statistics(&hours, &day()).unwrap();
        assert_eq!(stats.total_distance, 120.0);
        assert_eq!(stats.avg_sessions, 1.0);
        // per-session distances 50 and 20, per-session minutes 5 and 4
        assert_eq!(stats.avg_distance, Some(35.0));
        assert_eq!(stats.avg_speed, Some(35.0 / 4.5));
        assert_eq!(sedentary_count(&hours, &day()), Some(2));
    }

    #[test]
    fn test_gait_without_walking_sessions() {
        let hours = vec![gait(9, 0, 0.0, 0.0, ActivityLevel::None)];
        let stats = gait_statistics(&hours, &day()).unwrap();
        assert_eq!(stats.avg_distance, None);
        assert_eq!(stats.avg_speed, None);
        assert_eq!(gait_statistics(&[], &day()), None);
        assert_eq!(sedentary_count(&[], &day()), None);
    }
}
