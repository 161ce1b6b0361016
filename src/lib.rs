//! Sensor ingestion and query server for biorreactor monitoring.
//!
//! Readings are stored per domain partition, feeding events in a partition of
//! their own. Everything is kept in UTC and converted to the display zone only
//! when rendered.

use actix_web::{web, Scope};

pub mod api;
pub mod config;
pub mod database;
pub mod error;
pub mod ingestion;
pub mod local_time;
pub mod payload;
pub mod query;
pub mod schema;
pub mod sensor;
pub mod sqlite_database;

use database::Database;

/// Registers the HTTP surface. The store must be registered as
/// `web::Data<D>` and the settings as `web::Data<config::AppSettings>`.
pub fn routes<D: Database + 'static>(cfg: &mut web::ServiceConfig) {
    let api_scope: Scope = web::scope("/api")
        .service(web::resource("/sensores")
            .route(web::post().to(api::ingest_sensor_reading::<D>))
        )
        .service(web::resource("/datos")
            .route(web::get().to(api::readings::<D>))
        )
        .service(web::resource("/registro_comida")
            .route(web::post().to(api::ingest_feeding_event::<D>))
            .route(web::get().to(api::feeding_events::<D>))
        )
        .service(web::resource("/registro_manual")
            .route(web::post().to(api::ingest_manual_reading::<D>))
        )
        .service(web::resource("/dominios")
            .route(web::get().to(api::domains::<D>))
        )
        .service(web::resource("/clear")
            .route(web::post().to(api::clear::<D>))
        )
        .default_service(web::route().to(api::not_found));

    cfg.app_data(web::JsonConfig::default().error_handler(api::json_error_handler))
        .app_data(web::QueryConfig::default().error_handler(api::query_error_handler))
        .service(web::resource("/").route(web::get().to(api::index)))
        .service(api::status)
        .service(api_scope);
}
