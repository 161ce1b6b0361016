use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use log::{debug, warn};

use crate::database::{Database, DatabaseError};
use crate::error::{ServiceError, ServiceResult};
use crate::sensor::{FeedingEventView, ReadingFilter, SensorReadingView};

pub const DEFAULT_LIMIT: i64 = 200;

#[derive(Debug, Clone, PartialEq)]
pub struct ReadingsQuery {
    pub domain: String,
    pub device_id: Option<String>,
    pub limit: i64,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl ReadingsQuery {
    pub fn new(domain: impl Into<String>) -> Self {
        ReadingsQuery {
            domain: domain.into(),
            device_id: None,
            limit: DEFAULT_LIMIT,
            from: None,
            to: None,
        }
    }
}

fn check_limit(limit: i64) -> ServiceResult<()> {
    if limit <= 0 {
        return Err(ServiceError::InvalidLimit(limit));
    }
    Ok(())
}

/// Latest readings of one domain, oldest first, rendered for display.
pub fn query_readings<D: Database>(db: &D, query: ReadingsQuery, zone: &Tz) -> ServiceResult<Vec<SensorReadingView>> {
    check_limit(query.limit)?;
    if let (Some(from), Some(to)) = (query.from, query.to) {
        if from > to {
            return Err(ServiceError::InvalidTimeWindow);
        }
    }

    let handle = db.route_for_read(&query.domain).map_err(|err| match err {
        DatabaseError::NotFound => ServiceError::DomainNotFound(query.domain.clone()),
        other => ServiceError::Infrastructure(other),
    })?;

    let filter = ReadingFilter {
        device_id: query.device_id,
        from: query.from,
        to: query.to,
        limit: query.limit,
    };
    let mut readings = db.get_readings(&handle, &filter)?;
    readings.reverse();

    debug!("Returning {} readings from {}", readings.len(), query.domain);
    Ok(readings
        .iter()
        .map(|reading| SensorReadingView::render(reading, zone))
        .collect())
}

pub fn query_feeding_events<D: Database>(db: &D, limit: i64, zone: &Tz) -> ServiceResult<Vec<FeedingEventView>> {
    check_limit(limit)?;

    let mut events = db.get_feeding_events(limit)?;
    events.reverse();

    Ok(events
        .iter()
        .map(|event| FeedingEventView::render(event, zone))
        .collect())
}

/// Partition names that denote domains, sorted.
pub fn list_domains<D: Database>(db: &D, prefix: &str) -> ServiceResult<Vec<String>> {
    let mut domains: Vec<String> = db
        .get_partitions()?
        .into_iter()
        .filter(|name| name.starts_with(prefix))
        .collect();
    domains.sort();
    Ok(domains)
}

/// Reset utility: drops every reading of `partition`.
pub fn clear_all_readings<D: Database>(db: &D, partition: &str) -> ServiceResult<usize> {
    let deleted = db.clear_partition(partition)?;
    warn!("Cleared {} readings from {}", deleted, partition);
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingestion;
    use crate::sensor::{FeedingEvent, Measurements, SensorReading};
    use crate::sqlite_database::SqliteDatabase;
    use chrono::{Duration, TimeZone};
    use chrono_tz::America::Santiago;
    use serde_json::json;

    fn seed(db: &SqliteDatabase, domain: &str, device_id: &str, at: DateTime<Utc>, temperature: f64) {
        let reading = SensorReading {
            device_id: device_id.to_string(),
            measurements: Measurements {
                temperature: Some(temperature),
                ..Default::default()
            },
            timestamp: at,
            manual: false,
        };
        db.add_reading(domain, &reading).unwrap();
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn non_positive_limit_is_rejected_before_routing() {
        let db = SqliteDatabase::in_memory().unwrap();
        seed(&db, "dominio_ucn", "a", start(), 1.0);

        for limit in [0, -1, i64::MIN] {
            for domain in ["dominio_ucn", "dominio_missing"] {
                let query = ReadingsQuery { limit, ..ReadingsQuery::new(domain) };
                assert!(matches!(
                    query_readings(&db, query, &Santiago),
                    Err(ServiceError::InvalidLimit(l)) if l == limit
                ));
            }
        }
    }

    #[test]
    fn unknown_domain_is_not_found_and_stays_unknown() {
        let db = SqliteDatabase::in_memory().unwrap();

        for _ in 0..2 {
            assert!(matches!(
                query_readings(&db, ReadingsQuery::new("dominio_missing"), &Santiago),
                Err(ServiceError::DomainNotFound(name)) if name == "dominio_missing"
            ));
        }
        assert!(db.get_partitions().unwrap().is_empty());
    }

    #[test]
    fn existing_but_emptied_domain_returns_empty_list() {
        let db = SqliteDatabase::in_memory().unwrap();
        seed(&db, "datos", "a", start(), 1.0);
        clear_all_readings(&db, "datos").unwrap();

        assert!(query_readings(&db, ReadingsQuery::new("datos"), &Santiago).unwrap().is_empty());
    }

    #[test]
    fn results_are_the_newest_window_in_ascending_order() {
        let db = SqliteDatabase::in_memory().unwrap();
        for i in 0..10 {
            seed(&db, "dominio_ucn", "a", start() + Duration::minutes(i), i as f64);
        }

        let query = ReadingsQuery { limit: 4, ..ReadingsQuery::new("dominio_ucn") };
        let views = query_readings(&db, query, &Santiago).unwrap();

        let temperatures: Vec<_> = views.iter().map(|v| v.temperature.unwrap()).collect();
        assert_eq!(temperatures, vec![6.0, 7.0, 8.0, 9.0]);
        assert!(views.windows(2).all(|pair| pair[0].time <= pair[1].time));
        assert_eq!(views[0].time, "2024-07-01 08:06:00");
    }

    #[test]
    fn repeated_queries_are_identical() {
        let db = SqliteDatabase::in_memory().unwrap();
        for i in 0..5 {
            seed(&db, "dominio_ucn", "a", start() + Duration::seconds(i), i as f64);
        }

        let first = query_readings(&db, ReadingsQuery::new("dominio_ucn"), &Santiago).unwrap();
        let second = query_readings(&db, ReadingsQuery::new("dominio_ucn"), &Santiago).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn device_filter_is_exact() {
        let db = SqliteDatabase::in_memory().unwrap();
        seed(&db, "dominio_ucn", "esp32_01", start(), 1.0);
        seed(&db, "dominio_ucn", "esp32_010", start(), 2.0);
        seed(&db, "dominio_ucn", "ESP32_01", start(), 3.0);

        let query = ReadingsQuery {
            device_id: Some("esp32_01".to_string()),
            ..ReadingsQuery::new("dominio_ucn")
        };
        let views = query_readings(&db, query, &Santiago).unwrap();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].temperature, Some(1.0));

        let all = query_readings(&db, ReadingsQuery::new("dominio_ucn"), &Santiago).unwrap();
        assert_eq!(all.len(), 3);
    }

    #[test]
    fn time_window_is_inclusive_and_validated() {
        let db = SqliteDatabase::in_memory().unwrap();
        for i in 0..5 {
            seed(&db, "dominio_ucn", "a", start() + Duration::hours(i), i as f64);
        }

        let query = ReadingsQuery {
            from: Some(start() + Duration::hours(1)),
            to: Some(start() + Duration::hours(3)),
            ..ReadingsQuery::new("dominio_ucn")
        };
        let temperatures: Vec<_> = query_readings(&db, query, &Santiago)
            .unwrap()
            .iter()
            .map(|v| v.temperature.unwrap())
            .collect();
        assert_eq!(temperatures, vec![1.0, 2.0, 3.0]);

        let backwards = ReadingsQuery {
            from: Some(start() + Duration::hours(3)),
            to: Some(start()),
            ..ReadingsQuery::new("dominio_ucn")
        };
        assert!(matches!(query_readings(&db, backwards, &Santiago), Err(ServiceError::InvalidTimeWindow)));
    }

    #[test]
    fn ingested_reading_round_trips() {
        let db = SqliteDatabase::in_memory().unwrap();
        let before = Utc::now();
        let payload = serde_json::from_value(json!({
            "dominio": "dominio_ucn",
            "id_dispositivo": "esp32_01",
            "temperatura": 24.5,
            "ph": 7.2,
            "oxigeno": 6.0,
            "turbidez": 10.0,
            "conductividad": 450.0
        }))
        .unwrap();
        ingestion::ingest_sensor_reading(&db, payload).unwrap();
        let after = Utc::now();

        let query = ReadingsQuery {
            device_id: Some("esp32_01".to_string()),
            limit: 10,
            ..ReadingsQuery::new("dominio_ucn")
        };
        let views = query_readings(&db, query, &chrono_tz::UTC).unwrap();

        assert_eq!(views.len(), 1);
        let view = &views[0];
        assert_eq!(view.temperature, Some(24.5));
        assert_eq!(view.ph, Some(7.2));
        assert_eq!(view.dissolved_oxygen, Some(6.0));
        assert_eq!(view.turbidity, Some(10.0));
        assert_eq!(view.conductivity, Some(450.0));
        let lower = before.format(crate::local_time::DISPLAY_FORMAT).to_string();
        let upper = after.format(crate::local_time::DISPLAY_FORMAT).to_string();
        assert!(lower <= view.time && view.time <= upper);
    }

    #[test]
    fn feeding_events_are_ascending_and_limited() {
        let db = SqliteDatabase::in_memory().unwrap();
        assert!(query_feeding_events(&db, DEFAULT_LIMIT, &Santiago).unwrap().is_empty());

        for i in 0..3 {
            db.add_feeding_event(&FeedingEvent {
                device_id: "esp32_01".to_string(),
                event_type: "comida".to_string(),
                timestamp: start() + Duration::days(i),
            })
            .unwrap();
        }

        let views = query_feeding_events(&db, 2, &Santiago).unwrap();
        let times: Vec<_> = views.iter().map(|v| v.time.as_str()).collect();
        assert_eq!(times, vec!["2024-07-02 08:00:00", "2024-07-03 08:00:00"]);
        assert!(matches!(query_feeding_events(&db, 0, &Santiago), Err(ServiceError::InvalidLimit(0))));
    }

    #[test]
    fn domains_are_filtered_by_prefix() {
        let db = SqliteDatabase::in_memory().unwrap();
        seed(&db, "dominio_ucn", "a", start(), 1.0);
        seed(&db, "datos", "a", start(), 1.0);
        seed(&db, "dominio_antofagasta", "a", start(), 1.0);

        assert_eq!(
            list_domains(&db, "dominio_").unwrap(),
            vec!["dominio_antofagasta".to_string(), "dominio_ucn".to_string()]
        );
        assert_eq!(list_domains(&db, "").unwrap().len(), 3);
    }

    #[test]
    fn clear_only_empties_the_default_partition() {
        let db = SqliteDatabase::in_memory().unwrap();
        seed(&db, "datos", "a", start(), 1.0);
        seed(&db, "datos", "b", start(), 2.0);
        seed(&db, "dominio_ucn", "a", start(), 3.0);

        assert_eq!(clear_all_readings(&db, "datos").unwrap(), 2);
        assert_eq!(query_readings(&db, ReadingsQuery::new("dominio_ucn"), &Santiago).unwrap().len(), 1);
    }
}
