//! Report encoding
//!
//! This module wraps daily records and monthly reports into the envelope
//! written to the report store, stamping producer metadata and the computation
//! time.

use crate::error::ComputeError;
use crate::types::{DailyMetricsRecord, MonthlyStatusReport, ReportEnvelope, ReportProducer};
use crate::{ENGINE_VERSION, PRODUCER_NAME};
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

/// Encoder for producing report envelopes
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Wrap any payload in an envelope for `device_id`
    pub fn encode<T: Clone>(&self, device_id: &str, data: &T) -> ReportEnvelope<T> {
        ReportEnvelope {
            device_id: device_id.to_string(),
            producer: ReportProducer {
                name: PRODUCER_NAME.to_string(),
                version: ENGINE_VERSION.to_string(),
                instance_id: self.instance_id.clone(),
            },
            computed_at: Utc::now().to_rfc3339(),
            data: data.clone(),
        }
    }

    pub fn encode_daily(
        &self,
        device_id: &str,
        record: &DailyMetricsRecord,
    ) -> ReportEnvelope<DailyMetricsRecord> {
        self.encode(device_id, record)
    }

    pub fn encode_monthly(
        &self,
        device_id: &str,
        report: &MonthlyStatusReport,
    ) -> ReportEnvelope<MonthlyStatusReport> {
        self.encode(device_id, report)
    }

    /// Encode a daily record to a pretty JSON string
    pub fn encode_daily_to_json(
        &self,
        device_id: &str,
        record: &DailyMetricsRecord,
    ) -> Result<String, ComputeError> {
        to_json(&self.encode_daily(device_id, record))
    }

    /// Encode a monthly report to a pretty JSON string
    pub fn encode_monthly_to_json(
        &self,
        device_id: &str,
        report: &MonthlyStatusReport,
    ) -> Result<String, ComputeError> {
        to_json(&self.encode_monthly(device_id, report))
    }
}

fn to_json<T: Serialize>(envelope: &ReportEnvelope<T>) -> Result<String, ComputeError> {
    serde_json::to_string_pretty(envelope).map_err(ComputeError::JsonError)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::TrendClassifier;
    use chrono::NaiveDate;
    use std::collections::BTreeMap;

    fn make_test_record() -> DailyMetricsRecord {
        let date = NaiveDate::from_ymd_opt(2023, 1, 6).unwrap();
        DailyMetricsRecord {
            date,
            sleep_duration: Some(8.75),
            restlessness: Some(0.6),
            go_to_sleep_time: NaiveDate::from_ymd_opt(2023, 1, 5)
                .unwrap()
                .and_hms_opt(22, 15, 0),
            wake_up_time: date.and_hms_opt(7, 15, 0),
            number_of_out_of_bed_during_night: Some(1),
            duration_of_out_of_bed: Some(0.25),
            sleep_duration_during_day: Some(1.0),
            restlessness_during_day: None,
            location_distribution_of_out_of_bed_during_night: Some(BTreeMap::from([(
                "Bathroom".to_string(),
                0.25,
            )])),
            average_nightly_rr: Some(14.5),
            average_nightly_hr: None,
            location_distribution_during_day: None,
            sedentary_duration_during_day: None,
            alone_time: Some(15.0),
            number_of_acute_falls: 0,
            number_of_moderate_falls: 0,
            number_of_lying_on_floor: 0,
            number_of_fall_from_bed: 0,
            gait_statistics_during_day: None,
        }
    }

    #[test]
    fn test_encode_daily_envelope() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let envelope = encoder.encode_daily("device-1", &make_test_record());

        assert_eq!(envelope.device_id, "device-1");
        assert_eq!(envelope.producer.name, PRODUCER_NAME);
        assert_eq!(envelope.producer.version, ENGINE_VERSION);
        assert_eq!(envelope.producer.instance_id, "test-instance");
        assert!(chrono::DateTime::parse_from_rfc3339(&envelope.computed_at).is_ok());
    }

    #[test]
    fn test_encode_daily_to_json() {
        let encoder = ReportEncoder::new();
        let json = encoder
            .encode_daily_to_json("device-1", &make_test_record())
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["deviceId"], "device-1");
        assert_eq!(value["producer"]["name"], "adl-trend");
        let data = &value["data"];
        assert_eq!(data["date"], "2023-01-06");
        assert_eq!(data["goToSleepTime"], "2023-01-05T22:15:00");
        assert_eq!(data["numberOfOutOfBedDuringNight"], 1);
        assert_eq!(data["averageNightlyRR"], 14.5);
        assert!(data["averageNightlyHR"].is_null());
        assert!(data["gaitStatisticsDuringDay"].is_null());
        assert_eq!(data["locationDistributionOfOutOfBedDuringNight"]["Bathroom"], 0.25);
    }

    #[test]
    fn test_encode_monthly_to_json() {
        let encoder = ReportEncoder::new();
        let report = TrendClassifier::default().evaluate(&[make_test_record()]);
        let json = encoder.encode_monthly_to_json("device-1", &report).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        assert_eq!(value["data"]["totalStatus"], "GREEN");
        assert_eq!(value["data"]["sleepQuality"]["sleepDuration"], "GRAY");
        assert_eq!(value["data"]["fallRisk"]["numberOfAcuteFalls"], "GREEN");
        assert_eq!(value["data"]["acuteFall"], false);
    }

    #[test]
    fn test_instance_ids_are_unique() {
        assert_ne!(ReportEncoder::new().instance_id(), ReportEncoder::new().instance_id());
    }
}
