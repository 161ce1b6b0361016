use chrono::{DateTime, Utc};
use log::{debug, info};

use crate::database::Database;
use crate::error::{ServiceError, ServiceResult};
use crate::payload::{non_blank, parse_timestamp, FeedingPayload, ManualPayload, SensorPayload};
use crate::sensor::{FeedingEvent, SensorReading, UNKNOWN_DEVICE};

/// Discriminators accepted for a feeding event. `comida` is what deployed
/// devices send.
pub const FEEDING_EVENT_TYPES: [&str; 2] = ["comida", "feeding"];

#[derive(Debug, Clone, PartialEq)]
pub struct Accepted {
    pub partition: Option<String>,
    pub device_id: String,
    pub timestamp: DateTime<Utc>,
}

pub fn ingest_sensor_reading<D: Database>(db: &D, payload: SensorPayload) -> ServiceResult<Accepted> {
    let domain = non_blank(&payload.domain).ok_or(ServiceError::MissingDomain)?;
    let measurements = payload.measurements()?;
    let device_id = non_blank(&payload.device_id).unwrap_or(UNKNOWN_DEVICE);

    let reading = SensorReading {
        device_id: device_id.to_string(),
        measurements,
        timestamp: Utc::now(),
        manual: false,
    };
    db.add_reading(domain, &reading)?;

    debug!("Stored reading from {} in {}", reading.device_id, domain);
    Ok(Accepted {
        partition: Some(domain.to_string()),
        device_id: reading.device_id,
        timestamp: reading.timestamp,
    })
}

pub fn ingest_feeding_event<D: Database>(db: &D, payload: FeedingPayload) -> ServiceResult<Accepted> {
    let event_type = match payload.event_type.as_deref() {
        Some(kind) if FEEDING_EVENT_TYPES.contains(&kind) => kind,
        other => return Err(ServiceError::InvalidEvent(other.map(str::to_string))),
    };

    let event = FeedingEvent {
        device_id: non_blank(&payload.device_id).unwrap_or(UNKNOWN_DEVICE).to_string(),
        event_type: event_type.to_string(),
        timestamp: Utc::now(),
    };
    db.add_feeding_event(&event)?;

    info!("Feeding event registered by {}", event.device_id);
    Ok(Accepted {
        partition: None,
        device_id: event.device_id,
        timestamp: event.timestamp,
    })
}

/// Operator entries always name both the domain and the device; unlike the
/// automated path there is no fallback device id.
pub fn ingest_manual_reading<D: Database>(db: &D, payload: ManualPayload) -> ServiceResult<Accepted> {
    let domain = non_blank(&payload.domain);
    let device_id = non_blank(&payload.device_id);
    let (domain, device_id) = match (domain, device_id) {
        (Some(domain), Some(device_id)) => (domain, device_id),
        (domain, device_id) => {
            let mut missing = Vec::new();
            if domain.is_none() {
                missing.push("dominio");
            }
            if device_id.is_none() {
                missing.push("id_dispositivo");
            }
            return Err(ServiceError::MissingRequiredFields(missing));
        }
    };

    let measurements = payload.measurements()?;
    if measurements.is_empty() {
        debug!("Manual entry for {} in {} carries no measurements", device_id, domain);
    }
    let timestamp = match non_blank(&payload.timestamp) {
        Some(text) => parse_timestamp(text)?,
        None => Utc::now(),
    };

    let reading = SensorReading {
        device_id: device_id.to_string(),
        measurements,
        timestamp,
        manual: true,
    };
    db.add_reading(domain, &reading)?;

    info!("Manual reading for {} stored in {}", device_id, domain);
    Ok(Accepted {
        partition: Some(domain.to_string()),
        device_id: reading.device_id,
        timestamp: reading.timestamp,
    })
}
