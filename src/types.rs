//! Core types for the ADL trend engine
//!
//! This module defines the data structures that flow through each stage of the
//! engine: typed sensor event streams, day/night windows, daily metric records
//! and monthly status reports.

use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Location label the device reports while the resident is in bed
pub const BED_LOCATION: &str = "Bed";

/// Hours between two timestamps (negative if `stop` precedes `start`)
pub fn hours_between(start: NaiveDateTime, stop: NaiveDateTime) -> f64 {
    (stop - start).num_seconds() as f64 / 3600.0
}

/// An event that covers a time interval
pub trait Timed {
    fn start(&self) -> NaiveDateTime;
    fn stop(&self) -> NaiveDateTime;

    /// Interval length in hours
    fn duration_hours(&self) -> f64 {
        hours_between(self.start(), self.stop())
    }
}

/// An event observed at a single point in time
pub trait Sampled {
    fn time(&self) -> NaiveDateTime;
}

/// A sleep session reported by the bed sensor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SleepSession {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    /// Restlessness score reported for the session
    pub restless: f64,
}

/// A contiguous stay in one room/location
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationVisit {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
    pub location: String,
}

/// Interval during which visitors were present
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisitorInterval {
    pub start: NaiveDateTime,
    pub stop: NaiveDateTime,
}

macro_rules! impl_timed {
    ($($ty:ty),*) => {
        $(impl Timed for $ty {
            fn start(&self) -> NaiveDateTime {
                self.start
            }

            fn stop(&self) -> NaiveDateTime {
                self.stop
            }
        })*
    };
}

impl_timed!(SleepSession, LocationVisit, VisitorInterval);

/// Respiration / heart-rate reading
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RespirationSample {
    pub time: NaiveDateTime,
    /// Breaths per minute
    pub respiration: Option<f64>,
    /// Beats per minute; the device reports 0 when no reading was taken
    pub heart_rate: Option<f64>,
}

impl RespirationSample {
    /// Heart rate with the device's 0 sentinel treated as missing
    pub fn heart_rate_reading(&self) -> Option<f64> {
        self.heart_rate.filter(|hr| *hr != 0.0)
    }
}

/// Activity classification of an hourly gait bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "ActivityLevelRepr")]
pub enum ActivityLevel {
    None,
    Low,
    Med,
    High,
}

/// Wire representation: the device sends either a numeric code or a label
#[derive(Deserialize)]
#[serde(untagged)]
enum ActivityLevelRepr {
    Code(i64),
    Label(String),
}

impl TryFrom<ActivityLevelRepr> for ActivityLevel {
    type Error = String;

    fn try_from(repr: ActivityLevelRepr) -> Result<Self, Self::Error> {
        match repr {
            ActivityLevelRepr::Code(0) => Ok(ActivityLevel::None),
            ActivityLevelRepr::Code(1) => Ok(ActivityLevel::Low),
            ActivityLevelRepr::Code(2) => Ok(ActivityLevel::Med),
            ActivityLevelRepr::Code(3) => Ok(ActivityLevel::High),
            ActivityLevelRepr::Code(code) => Err(format!("unknown activity level code {code}")),
            ActivityLevelRepr::Label(label) => match label.to_ascii_lowercase().as_str() {
                "none" => Ok(ActivityLevel::None),
                "low" => Ok(ActivityLevel::Low),
                "med" | "medium" => Ok(ActivityLevel::Med),
                "high" => Ok(ActivityLevel::High),
                _ => Err(format!("unknown activity level '{label}'")),
            },
        }
    }
}

/// Hourly gait aggregate, keyed by the start of the hour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GaitHour {
    pub time: NaiveDateTime,
    /// Number of walking sessions in the hour
    pub sessions: u32,
    /// Total walked distance in the hour
    pub distance: f64,
    /// Total walking time in the hour (minutes)
    pub duration_minutes: f64,
    pub activity: ActivityLevel,
}

/// Discrete alert raised by the device (falls, visitors, ...)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertEvent {
    pub time: NaiveDateTime,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub description: String,
}

impl Sampled for RespirationSample {
    fn time(&self) -> NaiveDateTime {
        self.time
    }
}

impl Sampled for GaitHour {
    fn time(&self) -> NaiveDateTime {
        self.time
    }
}

impl Sampled for AlertEvent {
    fn time(&self) -> NaiveDateTime {
        self.time
    }
}

/// Fall alert vocabulary tracked in the daily record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum FallType {
    AcuteFall,
    ModerateFall,
    LongLyingOnFloor,
    FallFromBed,
}

impl FallType {
    pub const ALL: [FallType; 4] = [
        FallType::AcuteFall,
        FallType::ModerateFall,
        FallType::LongLyingOnFloor,
        FallType::FallFromBed,
    ];

    /// Alert `type` label used by the device
    pub fn label(&self) -> &'static str {
        match self {
            FallType::AcuteFall => "AcuteFall",
            FallType::ModerateFall => "ModerateFall",
            FallType::LongLyingOnFloor => "Long lying on the floor",
            FallType::FallFromBed => "Fall from bed",
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.label() == label)
    }
}

/// Per-type fall counts; absent types are a legitimate zero
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FallCounts {
    pub acute_falls: u32,
    pub moderate_falls: u32,
    pub lying_on_floor: u32,
    pub fall_from_bed: u32,
}

impl FallCounts {
    pub fn increment(&mut self, fall: FallType) {
        match fall {
            FallType::AcuteFall => self.acute_falls += 1,
            FallType::ModerateFall => self.moderate_falls += 1,
            FallType::LongLyingOnFloor => self.lying_on_floor += 1,
            FallType::FallFromBed => self.fall_from_bed += 1,
        }
    }
}

/// One calendar day of typed sensor streams
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DailyBatch {
    pub date: NaiveDate,
    pub sleep: Vec<SleepSession>,
    pub locations: Vec<LocationVisit>,
    pub respiration: Vec<RespirationSample>,
    pub gait: Vec<GaitHour>,
}

/// Closed time span `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSpan {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TimeSpan {
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    pub fn hours(&self) -> f64 {
        hours_between(self.start, self.end)
    }

    /// True if `[start, stop]` lies entirely inside the span
    pub fn contains_interval(&self, start: NaiveDateTime, stop: NaiveDateTime) -> bool {
        start >= self.start && stop <= self.end
    }

    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time <= self.end
    }

    pub fn shifted(&self, start_days: i64, end_days: i64) -> Self {
        Self {
            start: self.start + Duration::days(start_days),
            end: self.end + Duration::days(end_days),
        }
    }
}

/// Selector for one half of a [`DayNightWindow`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Period {
    Day,
    Night,
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Period::Day => write!(f, "Day"),
            Period::Night => write!(f, "Night"),
        }
    }
}

/// Day and night windows derived from one 2-day batch of sleep sessions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DayNightWindow {
    pub day: TimeSpan,
    pub night: TimeSpan,
}

impl DayNightWindow {
    pub fn span(&self, period: Period) -> TimeSpan {
        match period {
            Period::Day => self.day,
            Period::Night => self.night,
        }
    }
}

/// Out-of-bed activity found between sleep sessions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OutOfBedSummary {
    /// Number of non-bed visits inside awake gaps
    pub count: u32,
    /// Total time of those visits (hours)
    pub duration_hours: f64,
    /// Hours spent per location
    pub locations: BTreeMap<String, f64>,
}

/// Gait aggregates over a window, serialized as
/// `[totalDistance, avgSpeed, avgSessions, avgDistance]`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "GaitTuple", into = "GaitTuple")]
pub struct GaitStatistics {
    pub total_distance: f64,
    /// Distance per walking minute
    pub avg_speed: Option<f64>,
    pub avg_sessions: f64,
    /// Distance per walking session
    pub avg_distance: Option<f64>,
}

type GaitTuple = (f64, Option<f64>, f64, Option<f64>);

impl From<GaitTuple> for GaitStatistics {
    fn from((total_distance, avg_speed, avg_sessions, avg_distance): GaitTuple) -> Self {
        Self {
            total_distance,
            avg_speed,
            avg_sessions,
            avg_distance,
        }
    }
}

impl From<GaitStatistics> for GaitTuple {
    fn from(stats: GaitStatistics) -> Self {
        (
            stats.total_distance,
            stats.avg_speed,
            stats.avg_sessions,
            stats.avg_distance,
        )
    }
}

/// Behavioral summary of one calendar day
///
/// Every `None` means the underlying stream had no data in the window; it is
/// never collapsed to zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DailyMetricsRecord {
    pub date: NaiveDate,
    /// Night sleep (hours)
    pub sleep_duration: Option<f64>,
    /// Night restlessness (duration-weighted)
    pub restlessness: Option<f64>,
    /// Start of the night window; `None` when the day could not be segmented
    pub go_to_sleep_time: Option<NaiveDateTime>,
    pub wake_up_time: Option<NaiveDateTime>,
    pub number_of_out_of_bed_during_night: Option<u32>,
    /// Hours
    pub duration_of_out_of_bed: Option<f64>,
    /// Day sleep (hours)
    pub sleep_duration_during_day: Option<f64>,
    pub restlessness_during_day: Option<f64>,
    pub location_distribution_of_out_of_bed_during_night: Option<BTreeMap<String, f64>>,
    #[serde(rename = "averageNightlyRR")]
    pub average_nightly_rr: Option<f64>,
    #[serde(rename = "averageNightlyHR")]
    pub average_nightly_hr: Option<f64>,
    pub location_distribution_during_day: Option<BTreeMap<String, f64>>,
    /// Number of low-activity gait hours
    pub sedentary_duration_during_day: Option<u32>,
    /// Hours of the day window without visitors
    pub alone_time: Option<f64>,
    pub number_of_acute_falls: u32,
    pub number_of_moderate_falls: u32,
    pub number_of_lying_on_floor: u32,
    pub number_of_fall_from_bed: u32,
    pub gait_statistics_during_day: Option<GaitStatistics>,
}

impl DailyMetricsRecord {
    pub fn fall_count(&self, fall: FallType) -> u32 {
        match fall {
            FallType::AcuteFall => self.number_of_acute_falls,
            FallType::ModerateFall => self.number_of_moderate_falls,
            FallType::LongLyingOnFloor => self.number_of_lying_on_floor,
            FallType::FallFromBed => self.number_of_fall_from_bed,
        }
    }
}

/// Ordinal trend status; `Gray` means insufficient data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusCode {
    Gray,
    Green,
    Yellow,
    YellowUp,
    YellowDown,
    Red,
    RedUp,
    RedDown,
}

impl StatusCode {
    pub fn is_gray(self) -> bool {
        self == StatusCode::Gray
    }

    pub fn is_yellow(self) -> bool {
        matches!(
            self,
            StatusCode::Yellow | StatusCode::YellowUp | StatusCode::YellowDown
        )
    }

    pub fn is_red(self) -> bool {
        matches!(self, StatusCode::Red | StatusCode::RedUp | StatusCode::RedDown)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            StatusCode::Gray => "GRAY",
            StatusCode::Green => "GREEN",
            StatusCode::Yellow => "YELLOW",
            StatusCode::YellowUp => "YELLOW_UP",
            StatusCode::YellowDown => "YELLOW_DOWN",
            StatusCode::Red => "RED",
            StatusCode::RedUp => "RED_UP",
            StatusCode::RedDown => "RED_DOWN",
        }
    }
}

impl fmt::Display for StatusCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Sleep-quality domain of the monthly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SleepQualityStatus {
    pub sleep_duration: StatusCode,
    pub restlessness: StatusCode,
    pub go_to_sleep_time: StatusCode,
    pub wake_up_time: StatusCode,
    pub number_of_out_of_bed_during_night: StatusCode,
    pub duration_of_out_of_bed: StatusCode,
    pub sleep_duration_during_day: StatusCode,
    #[serde(rename = "averageNightlyRR")]
    pub average_nightly_rr: StatusCode,
    #[serde(rename = "averageNightlyHR")]
    pub average_nightly_hr: StatusCode,
    /// Monthly hours per out-of-bed location
    pub location_distribution_of_out_of_bed_during_night: BTreeMap<String, f64>,
    pub status: StatusCode,
}

/// Activity-level domain of the monthly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityLevelStatus {
    pub sedentary_duration_during_day: StatusCode,
    pub walking_total_distance: StatusCode,
    pub walking_speed: StatusCode,
    pub walking_sessions: StatusCode,
    pub walking_average_distance: StatusCode,
    /// Monthly hours per location during the day
    pub location_distribution_during_day: BTreeMap<String, f64>,
    pub status: StatusCode,
}

/// Alone-time domain of the monthly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AloneTimeStatus {
    pub alone_time: StatusCode,
    pub status: StatusCode,
}

/// Fall-risk domain of the monthly report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FallRiskStatus {
    pub number_of_acute_falls: StatusCode,
    pub number_of_moderate_falls: StatusCode,
    pub number_of_lying_on_floor: StatusCode,
    pub number_of_fall_from_bed: StatusCode,
    pub status: StatusCode,
}

/// Trend status over roughly a month of daily records
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyStatusReport {
    /// First record date, if any
    pub from: Option<NaiveDate>,
    /// Last record date ("today"), if any
    pub to: Option<NaiveDate>,
    pub days_evaluated: usize,
    pub sleep_quality: SleepQualityStatus,
    pub activity_level: ActivityLevelStatus,
    pub alone_time: AloneTimeStatus,
    pub fall_risk: FallRiskStatus,
    /// Any acute fall anywhere in the period
    pub acute_fall: bool,
    pub total_status: StatusCode,
}

/// Producer metadata attached to every emitted payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Envelope written to the report store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportEnvelope<T> {
    pub device_id: String,
    pub producer: ReportProducer,
    pub computed_at: String,
    pub data: T,
}
