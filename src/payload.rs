//! Request bodies as devices and operators send them.
//!
//! Keys follow the deployed wire format (`dominio`, `id_dispositivo`,
//! `temperatura`, ...); the English names are accepted as aliases.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ServiceError, ServiceResult};
use crate::sensor::Measurements;

/// Automated submission from a device bridge.
#[derive(Debug, Default, Deserialize)]
pub struct SensorPayload {
    #[serde(default, rename = "dominio", alias = "domain")]
    pub domain: Option<String>,
    #[serde(default, rename = "id_dispositivo", alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default, rename = "turbidez", alias = "turbidity")]
    pub turbidity: Option<Value>,
    #[serde(default, rename = "ph", alias = "pH")]
    pub ph: Option<Value>,
    #[serde(default, rename = "temperatura", alias = "temperature")]
    pub temperature: Option<Value>,
    #[serde(default, rename = "oxigeno", alias = "dissolvedOxygen")]
    pub dissolved_oxygen: Option<Value>,
    #[serde(default, rename = "conductividad", alias = "conductivity")]
    pub conductivity: Option<Value>,
}

impl SensorPayload {
    pub fn measurements(&self) -> ServiceResult<Measurements> {
        parse_measurements([
            &self.turbidity,
            &self.ph,
            &self.temperature,
            &self.dissolved_oxygen,
            &self.conductivity,
        ])
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct FeedingPayload {
    #[serde(default, rename = "evento", alias = "eventType")]
    pub event_type: Option<String>,
    #[serde(default, rename = "id_dispositivo", alias = "deviceId")]
    pub device_id: Option<String>,
}

/// Operator-entered correction or backfill.
#[derive(Debug, Default, Deserialize)]
pub struct ManualPayload {
    #[serde(default, rename = "dominio", alias = "domain")]
    pub domain: Option<String>,
    #[serde(default, rename = "id_dispositivo", alias = "deviceId")]
    pub device_id: Option<String>,
    #[serde(default, rename = "tiempo", alias = "timestamp")]
    pub timestamp: Option<String>,
    #[serde(default, rename = "turbidez", alias = "turbidity")]
    pub turbidity: Option<Value>,
    #[serde(default, rename = "ph", alias = "pH")]
    pub ph: Option<Value>,
    #[serde(default, rename = "temperatura", alias = "temperature")]
    pub temperature: Option<Value>,
    #[serde(default, rename = "oxigeno", alias = "dissolvedOxygen")]
    pub dissolved_oxygen: Option<Value>,
    #[serde(default, rename = "conductividad", alias = "conductivity")]
    pub conductivity: Option<Value>,
}

impl ManualPayload {
    pub fn measurements(&self) -> ServiceResult<Measurements> {
        parse_measurements([
            &self.turbidity,
            &self.ph,
            &self.temperature,
            &self.dissolved_oxygen,
            &self.conductivity,
        ])
    }
}

/// Raw values in canonical order: turbidity, ph, temperature, dissolved
/// oxygen, conductivity.
fn parse_measurements(raw: [&Option<Value>; 5]) -> ServiceResult<Measurements> {
    let [turbidity, ph, temperature, dissolved_oxygen, conductivity] = raw;
    Ok(Measurements {
        turbidity: parse_measurement("turbidez", turbidity.as_ref())?,
        ph: parse_measurement("ph", ph.as_ref())?,
        temperature: parse_measurement("temperatura", temperature.as_ref())?,
        dissolved_oxygen: parse_measurement("oxigeno", dissolved_oxygen.as_ref())?,
        conductivity: parse_measurement("conductividad", conductivity.as_ref())?,
    })
}

/// Treats blank strings like missing ones. A present value is returned
/// untouched, since domain and device ids are matched exactly.
pub fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.trim().is_empty())
}

/// Numbers pass through, numeric strings are parsed, and `null` or an empty
/// string means the measurement was not taken.
pub fn parse_measurement(field: &'static str, value: Option<&Value>) -> ServiceResult<Option<f64>> {
    let invalid = |value: &Value| ServiceError::InvalidMeasurement {
        field,
        value: value.to_string(),
    };

    let Some(raw) = value else {
        return Ok(None);
    };

    match raw {
        Value::Null => Ok(None),
        Value::Number(number) => number.as_f64().map(Some).ok_or_else(|| invalid(raw)),
        Value::String(text) if text.trim().is_empty() => Ok(None),
        Value::String(text) => text
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|parsed| parsed.is_finite())
            .map(Some)
            .ok_or_else(|| invalid(raw)),
        other => Err(invalid(other)),
    }
}

/// RFC 3339 instant, normalized to UTC.
pub fn parse_timestamp(text: &str) -> ServiceResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(text.trim())
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|_| ServiceError::InvalidTimestamp(text.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn numbers_and_numeric_strings_are_measurements() {
        assert_eq!(parse_measurement("ph", Some(&json!(7.2))).unwrap(), Some(7.2));
        assert_eq!(parse_measurement("ph", Some(&json!(7))).unwrap(), Some(7.0));
        assert_eq!(parse_measurement("ph", Some(&json!(" 7.0 "))).unwrap(), Some(7.0));
    }

    #[test]
    fn empty_values_are_absent() {
        assert_eq!(parse_measurement("ph", None).unwrap(), None);
        assert_eq!(parse_measurement("ph", Some(&Value::Null)).unwrap(), None);
        assert_eq!(parse_measurement("ph", Some(&json!(""))).unwrap(), None);
        assert_eq!(parse_measurement("ph", Some(&json!("   "))).unwrap(), None);
    }

    #[test]
    fn garbage_is_rejected_with_the_field_name() {
        let err = parse_measurement("temperatura", Some(&json!("caliente"))).unwrap_err();
        assert!(matches!(err, ServiceError::InvalidMeasurement { field: "temperatura", .. }));
        assert!(parse_measurement("ph", Some(&json!(true))).is_err());
        assert!(parse_measurement("ph", Some(&json!([7.0]))).is_err());
        assert!(parse_measurement("ph", Some(&json!("NaN"))).is_err());
    }

    #[test]
    fn spanish_and_english_keys_are_accepted() {
        let spanish: SensorPayload = serde_json::from_value(json!({
            "dominio": "dominio_ucn",
            "id_dispositivo": "esp32_01",
            "temperatura": 24.5,
            "oxigeno": "6.1"
        }))
        .unwrap();
        let english: SensorPayload = serde_json::from_value(json!({
            "domain": "dominio_ucn",
            "deviceId": "esp32_01",
            "temperature": 24.5,
            "dissolvedOxygen": "6.1"
        }))
        .unwrap();

        for payload in [spanish, english] {
            assert_eq!(payload.domain.as_deref(), Some("dominio_ucn"));
            assert_eq!(payload.device_id.as_deref(), Some("esp32_01"));
            let measurements = payload.measurements().unwrap();
            assert_eq!(measurements.temperature, Some(24.5));
            assert_eq!(measurements.dissolved_oxygen, Some(6.1));
            assert_eq!(measurements.ph, None);
        }
    }

    #[test]
    fn unknown_keys_are_ignored() {
        let payload: FeedingPayload = serde_json::from_value(json!({
            "evento": "comida",
            "cantidad": 3
        }))
        .unwrap();
        assert_eq!(payload.event_type.as_deref(), Some("comida"));
        assert!(payload.device_id.is_none());
    }

    #[test]
    fn blank_strings_count_as_missing() {
        assert_eq!(non_blank(&Some(" d1 ".to_string())), Some(" d1 "));
        assert_eq!(non_blank(&Some("  ".to_string())), None);
        assert_eq!(non_blank(&None), None);
    }

    #[test]
    fn timestamps_are_normalized_to_utc() {
        let parsed = parse_timestamp("2024-07-01T08:00:00-04:00").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap());
        assert!(matches!(parse_timestamp("ayer"), Err(ServiceError::InvalidTimestamp(_))));
    }
}
