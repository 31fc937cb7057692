//! Vendor reports in, daily records and monthly status out

use adl_trend::types::StatusCode;
use adl_trend::{
    reports_to_daily_records, run_daily, run_monthly, AnalysisConfig, JsonFileStore,
    ReportEncoder, ReportSource,
};
use chrono::NaiveDate;
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs;

const DEVICE: &str = "device-e2e";

fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, 1, day).unwrap()
}

fn ts(day: NaiveDate, time: &str) -> String {
    format!("{} {}", day.format("%Y-%m-%d"), time)
}

/// One night 22:15-07:15 with a split bathroom trip, a kitchen morning and a nap
fn report(day: u32) -> Value {
    let d = date(day);
    let prev = d.pred_opt().unwrap();
    let gait: Vec<Value> = (0..24)
        .map(|hour| match hour {
            9..=17 => json!({
                "numberOfWalkingSessions": 2,
                "totalWalkDistance": 100.0,
                "totalWalkDuration": 4.0,
                "activityLevel": "Med"
            }),
            8 | 18..=23 => json!({
                "numberOfWalkingSessions": 0,
                "totalWalkDistance": 0.0,
                "totalWalkDuration": 0.0,
                "activityLevel": 1
            }),
            _ => json!({
                "numberOfWalkingSessions": 0,
                "totalWalkDistance": 0.0,
                "totalWalkDuration": 0.0,
                "activityLevel": 0
            }),
        })
        .collect();

    json!({
        "timeStamp": format!("{}T00:00:00Z", d.format("%Y-%m-%d")),
        "data": {
            "sleepMonitoring": [
                {"sessionStartTime": ts(prev, "22:15:00"), "sessionStopTime": ts(d, "03:45:00"), "sessionRestless": 0.3},
                {"sessionStartTime": ts(d, "04:00:00"), "sessionStopTime": ts(d, "07:15:00"), "sessionRestless": 0.3},
                {"sessionStartTime": ts(d, "13:00:00"), "sessionStopTime": ts(d, "14:00:00"), "sessionRestless": 0.3}
            ],
            "locations": {
                "objects": [
                    {"locationStartTime": ts(prev, "22:15:00"), "locationStopTime": ts(d, "03:45:00"), "locationName": "Bed"},
                    {"locationStartTime": ts(d, "03:45:00"), "locationStopTime": ts(d, "03:52:00"), "locationName": "Bathroom"},
                    {"locationStartTime": ts(d, "03:52:00"), "locationStopTime": ts(d, "04:00:00"), "locationName": "Bathroom"},
                    {"locationStartTime": ts(d, "04:00:00"), "locationStopTime": ts(d, "07:15:00"), "locationName": "Bed"},
                    {"locationStartTime": ts(d, "08:00:00"), "locationStopTime": ts(d, "12:00:00"), "locationName": "Kitchen"}
                ]
            },
            "respirations": [
                {"respirationTime": ts(d, "01:00:00"), "respirationRate": 14.0, "heartRate": 60},
                {"respirationTime": ts(d, "02:00:00"), "respirationRate": 16.0, "heartRate": 0}
            ],
            "gaitAnalysis": gait
        }
    })
}

fn alert(kind: &str, day: u32, time: &str) -> Value {
    json!({"data": {
        "type": kind,
        "location": "Living room",
        "description": "",
        "date": date(day).format("%Y-%m-%d").to_string(),
        "time": time
    }})
}

fn reports(days: std::ops::RangeInclusive<u32>) -> String {
    Value::Array(days.map(report).collect()).to_string()
}

fn temp_store(name: &str) -> JsonFileStore {
    let root = std::env::temp_dir().join(format!(
        "adl-trend-e2e-{}-{}",
        name,
        uuid::Uuid::new_v4()
    ));
    let store = JsonFileStore::new(root);
    fs::create_dir_all(store.device_dir(DEVICE)).unwrap();
    store
}

fn approx(actual: Option<f64>, expected: f64) -> bool {
    actual.map_or(false, |v| (v - expected).abs() < 1e-9)
}

#[test]
fn bathroom_trip_is_the_only_out_of_bed_visit() {
    let records =
        reports_to_daily_records(&reports(5..=6), "[]", &AnalysisConfig::default()).unwrap();
    assert_eq!(records.len(), 1);

    let record = &records[0];
    assert_eq!(record.date, date(6));
    assert_eq!(record.go_to_sleep_time, date(5).and_hms_opt(22, 15, 0));
    assert_eq!(record.wake_up_time, date(6).and_hms_opt(7, 15, 0));
    assert!(approx(record.sleep_duration, 8.75));
    assert!(approx(record.restlessness, 0.3));
    assert_eq!(record.number_of_out_of_bed_during_night, Some(1));
    assert_eq!(record.duration_of_out_of_bed, Some(0.25));
    assert_eq!(
        record.location_distribution_of_out_of_bed_during_night,
        Some(BTreeMap::from([("Bathroom".to_string(), 0.25)]))
    );
    assert_eq!(
        record.location_distribution_during_day,
        Some(BTreeMap::from([("Kitchen".to_string(), 4.0)]))
    );
    assert_eq!(record.sleep_duration_during_day, Some(1.0));
    assert_eq!(record.average_nightly_rr, Some(15.0));
    assert_eq!(record.average_nightly_hr, Some(60.0));
    assert_eq!(record.sedentary_duration_during_day, Some(6));
    assert!(approx(record.alone_time, 15.0));

    let gait = record.gait_statistics_during_day.as_ref().unwrap();
    assert_eq!(gait.total_distance, 900.0);
    assert_eq!(gait.avg_distance, Some(50.0));
    assert_eq!(gait.avg_speed, Some(25.0));
}

#[test]
fn visitors_and_falls_land_on_their_day() {
    let alerts = Value::Array(vec![
        alert("VisitorsIn", 6, "15:00:00"),
        alert("VisitorsOut", 6, "17:00:00"),
        alert("AcuteFall", 6, "10:30:00"),
        alert("Fall from bed", 6, "02:00:00"),
    ])
    .to_string();

    let records =
        reports_to_daily_records(&reports(5..=7), &alerts, &AnalysisConfig::default()).unwrap();
    assert_eq!(records.len(), 2);

    let sixth = &records[0];
    assert!(approx(sixth.alone_time, 13.0));
    assert_eq!(sixth.number_of_acute_falls, 1);
    assert_eq!(sixth.number_of_fall_from_bed, 1);
    assert_eq!(sixth.number_of_moderate_falls, 0);

    let seventh = &records[1];
    assert!(approx(seventh.alone_time, 15.0));
    assert_eq!(seventh.number_of_acute_falls, 0);
}

#[test]
fn month_through_file_store_flags_acute_fall() {
    let mut store = temp_store("month");
    let dir = store.device_dir(DEVICE);
    fs::write(dir.join("reports.json"), reports(1..=30)).unwrap();
    fs::write(
        dir.join("alerts.json"),
        Value::Array(vec![alert("AcuteFall", 25, "10:00:00")]).to_string(),
    )
    .unwrap();

    let config = AnalysisConfig::default();
    let encoder = ReportEncoder::with_instance_id("e2e".to_string());
    let reader = store.clone();

    let records =
        run_daily(&reader, &mut store, &encoder, DEVICE, date(2), date(30), &config).unwrap();
    assert_eq!(records.len(), 29);
    assert_eq!(records.first().unwrap().date, date(2));
    assert_eq!(records.last().unwrap().date, date(30));

    let stored = reader.fetch_daily_records(DEVICE, date(1), date(31)).unwrap();
    assert_eq!(stored, records);

    let report =
        run_monthly(&reader, &mut store, &encoder, DEVICE, date(1), date(31), &config).unwrap();
    assert_eq!(report.days_evaluated, 29);
    assert_eq!(report.from, Some(date(2)));
    assert_eq!(report.to, Some(date(30)));
    assert!(report.acute_fall);
    assert_eq!(report.fall_risk.number_of_acute_falls, StatusCode::Yellow);
    assert_eq!(report.fall_risk.number_of_moderate_falls, StatusCode::Green);
    assert_eq!(report.fall_risk.status, StatusCode::Yellow);
    assert_eq!(report.sleep_quality.status, StatusCode::Green);
    assert_eq!(report.activity_level.status, StatusCode::Green);
    assert_eq!(report.alone_time.status, StatusCode::Green);
    assert_eq!(report.total_status, StatusCode::Yellow);
    assert_eq!(
        report.sleep_quality.location_distribution_of_out_of_bed_during_night,
        BTreeMap::from([("Bathroom".to_string(), 7.25)])
    );
    assert_eq!(
        report.activity_level.location_distribution_during_day,
        BTreeMap::from([("Kitchen".to_string(), 116.0)])
    );

    let monthly: Value =
        serde_json::from_str(&fs::read_to_string(dir.join("monthly.json")).unwrap()).unwrap();
    assert_eq!(monthly["deviceId"], DEVICE);
    assert_eq!(monthly["producer"]["instanceId"], "e2e");
    assert_eq!(monthly["data"]["totalStatus"], "YELLOW");
    assert_eq!(monthly["data"]["acuteFall"], true);

    fs::remove_dir_all(store.root()).ok();
}

#[test]
fn early_fall_still_raises_the_flag() {
    let alerts = Value::Array(vec![alert("AcuteFall", 3, "10:00:00")]).to_string();
    let config = AnalysisConfig::default();
    let records = reports_to_daily_records(&reports(1..=30), &alerts, &config).unwrap();
    let report = adl_trend::monthly_status(&records, &config).unwrap();

    // outside the 10-day count window, but still an acute fall this month
    assert_eq!(report.fall_risk.number_of_acute_falls, StatusCode::Green);
    assert!(report.acute_fall);
    assert_eq!(report.total_status, StatusCode::Green);
}

#[test]
fn fall_on_a_day_without_sleep_is_still_counted() {
    let days: Vec<Value> = (5..=8)
        .map(|day| {
            let mut r = report(day);
            if day == 6 || day == 7 {
                r["data"]["sleepMonitoring"] = json!([]);
            }
            r
        })
        .collect();
    let alerts = Value::Array(vec![alert("AcuteFall", 7, "03:00:00")]).to_string();
    let config = AnalysisConfig::default();

    let records =
        reports_to_daily_records(&Value::Array(days).to_string(), &alerts, &config).unwrap();
    let dates: Vec<NaiveDate> = records.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![date(6), date(7), date(8)]);

    let seventh = &records[1];
    assert_eq!(seventh.number_of_acute_falls, 1);
    assert_eq!(seventh.go_to_sleep_time, None);
    assert_eq!(seventh.sleep_duration, None);
    assert_eq!(seventh.alone_time, None);
    assert_eq!(seventh.location_distribution_during_day, None);

    let report = adl_trend::monthly_status(&records, &config).unwrap();
    assert!(report.acute_fall);
    assert_eq!(report.fall_risk.number_of_acute_falls, StatusCode::Yellow);
}
