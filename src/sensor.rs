use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::local_time;

/// Device id recorded when an automated submission does not name its device.
pub const UNKNOWN_DEVICE: &str = "unknown";

/// The five quantities a biorreactor probe can report. Any subset may be present.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Measurements {
    pub turbidity: Option<f64>,
    pub ph: Option<f64>,
    pub temperature: Option<f64>,
    pub dissolved_oxygen: Option<f64>,
    pub conductivity: Option<f64>,
}

impl Measurements {
    pub fn is_empty(&self) -> bool {
        self.turbidity.is_none()
            && self.ph.is_none()
            && self.temperature.is_none()
            && self.dissolved_oxygen.is_none()
            && self.conductivity.is_none()
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SensorReading {
    pub device_id: String,
    pub measurements: Measurements,
    pub timestamp: DateTime<Utc>,
    pub manual: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeedingEvent {
    pub device_id: String,
    pub event_type: String,
    pub timestamp: DateTime<Utc>,
}

/// Selection applied to a single partition. The store returns the newest
/// `limit` matches, newest first.
#[derive(Clone, Debug, PartialEq)]
pub struct ReadingFilter {
    pub device_id: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: i64,
}

#[derive(Debug, PartialEq, Serialize)]
pub struct SensorReadingView {
    #[serde(rename = "tiempo")]
    pub time: String,
    #[serde(rename = "id_dispositivo")]
    pub device_id: String,
    #[serde(rename = "temperatura")]
    pub temperature: Option<f64>,
    pub ph: Option<f64>,
    #[serde(rename = "oxigeno")]
    pub dissolved_oxygen: Option<f64>,
    #[serde(rename = "turbidez")]
    pub turbidity: Option<f64>,
    #[serde(rename = "conductividad")]
    pub conductivity: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub manual: bool,
}

impl SensorReadingView {
    pub fn render(reading: &SensorReading, zone: &Tz) -> Self {
        let m = &reading.measurements;
        SensorReadingView {
            time: local_time::format_local(reading.timestamp, zone),
            device_id: reading.device_id.clone(),
            temperature: m.temperature,
            ph: m.ph,
            dissolved_oxygen: m.dissolved_oxygen,
            turbidity: m.turbidity,
            conductivity: m.conductivity,
            manual: reading.manual,
        }
    }
}

#[derive(Debug, PartialEq, Serialize)]
pub struct FeedingEventView {
    #[serde(rename = "tiempo")]
    pub time: String,
    #[serde(rename = "id_dispositivo")]
    pub device_id: String,
    #[serde(rename = "evento")]
    pub event_type: String,
}

impl FeedingEventView {
    pub fn render(event: &FeedingEvent, zone: &Tz) -> Self {
        FeedingEventView {
            time: local_time::format_local(event.timestamp, zone),
            device_id: event.device_id.clone(),
            event_type: event.event_type.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn reading_view_keeps_absent_measurements_as_null() {
        let reading = SensorReading {
            device_id: "esp32_01".to_string(),
            measurements: Measurements {
                temperature: Some(24.5),
                ..Default::default()
            },
            timestamp: Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
            manual: false,
        };

        let view = SensorReadingView::render(&reading, &chrono_tz::America::Santiago);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["tiempo"], "2024-07-01 08:00:00");
        assert_eq!(json["id_dispositivo"], "esp32_01");
        assert_eq!(json["temperatura"], 24.5);
        assert!(json["ph"].is_null());
        assert!(json.get("manual").is_none());
    }

    #[test]
    fn manual_flag_is_rendered_only_when_set() {
        let reading = SensorReading {
            device_id: "x".to_string(),
            measurements: Measurements::default(),
            timestamp: Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap(),
            manual: true,
        };

        let json = serde_json::to_value(SensorReadingView::render(&reading, &chrono_tz::UTC)).unwrap();
        assert_eq!(json["manual"], true);
    }

    #[test]
    fn empty_measurements() {
        assert!(Measurements::default().is_empty());
        assert!(!Measurements { ph: Some(7.0), ..Default::default() }.is_empty());
    }
}
