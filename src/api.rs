use actix_web::{error, get, web, HttpRequest, HttpResponse, Responder};
use log::{error, warn};
use serde::{Deserialize, Serialize};

use crate::{
    config::AppSettings,
    database::{Database, DatabaseError},
    error::ServiceError,
    ingestion,
    payload::{self, non_blank, FeedingPayload, ManualPayload, SensorPayload},
    query::{self, ReadingsQuery, DEFAULT_LIMIT},
};

#[derive(Serialize)]
struct ErrorResponse<'a> {
    error: String,
    kind: &'a str,
}

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct ClearResponse {
    message: String,
    deleted: usize,
}

fn map_service_error_to_http(err: ServiceError) -> HttpResponse {
    let kind = err.kind();
    match &err {
        ServiceError::Infrastructure(DatabaseError::Busy) => {
            error!("Storage busy");
            HttpResponse::ServiceUnavailable().json(ErrorResponse { error: "Database connection failed".to_string(), kind })
        }
        ServiceError::Infrastructure(db_err) => {
            error!("Storage failure: {}", db_err);
            HttpResponse::InternalServerError().json(ErrorResponse { error: "Internal storage error".to_string(), kind })
        }
        ServiceError::DomainNotFound(_) => {
            HttpResponse::NotFound().json(ErrorResponse { error: err.to_string(), kind })
        }
        _ => {
            warn!("Rejected request: {}", err);
            HttpResponse::BadRequest().json(ErrorResponse { error: err.to_string(), kind })
        }
    }
}

fn map_service_call_to_http_response<R: Serialize>(result: Result<R, ServiceError>) -> HttpResponse {
    match result {
        Ok(result) => HttpResponse::Ok().json(result),
        Err(err) => map_service_error_to_http(err)
    }
}

pub fn json_error_handler(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = map_service_error_to_http(ServiceError::InvalidRequest(err.to_string()));
    error::InternalError::from_response(err, response).into()
}

pub fn query_error_handler(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    let response = map_service_error_to_http(ServiceError::InvalidRequest(err.to_string()));
    error::InternalError::from_response(err, response).into()
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok().json(MessageResponse { message: "API del biorreactor funcionando".to_string() })
}

#[get("/status")]
pub async fn status() -> impl Responder {
    HttpResponse::Ok().body("Server is up and running!")
}

pub async fn not_found() -> HttpResponse {
    HttpResponse::NotFound().json(ErrorResponse { error: "Recurso no encontrado".to_string(), kind: "not_found" })
}

//#[post("/api/sensores")]
pub async fn ingest_sensor_reading<D: Database>(payload: web::Json<SensorPayload>, db: web::Data<D>) -> HttpResponse {
    match ingestion::ingest_sensor_reading(db.get_ref(), payload.into_inner()) {
        Ok(accepted) => HttpResponse::Created().json(MessageResponse {
            message: format!("Datos guardados en dominio {}", accepted.partition.unwrap_or_default()),
        }),
        Err(err) => map_service_error_to_http(err)
    }
}

#[derive(Debug, Deserialize)]
pub struct ReadingsParams {
    #[serde(default, alias = "domain")]
    dominio: Option<String>,
    #[serde(default, alias = "deviceId")]
    id_dispositivo: Option<String>,
    #[serde(default)]
    limit: Option<i64>,
    #[serde(default, alias = "from")]
    desde: Option<String>,
    #[serde(default, alias = "to")]
    hasta: Option<String>,
}

impl ReadingsParams {
    fn into_query(self) -> Result<ReadingsQuery, ServiceError> {
        let limit = self.limit.unwrap_or(DEFAULT_LIMIT);
        if limit <= 0 {
            return Err(ServiceError::InvalidLimit(limit));
        }
        let domain = non_blank(&self.dominio).ok_or(ServiceError::MissingDomain)?;
        let from = non_blank(&self.desde).map(payload::parse_timestamp).transpose()?;
        let to = non_blank(&self.hasta).map(payload::parse_timestamp).transpose()?;

        Ok(ReadingsQuery {
            domain: domain.to_string(),
            device_id: non_blank(&self.id_dispositivo).map(str::to_string),
            limit,
            from,
            to,
        })
    }
}

//#[get("/api/datos")]
pub async fn readings<D: Database>(
    params: web::Query<ReadingsParams>,
    db: web::Data<D>,
    settings: web::Data<AppSettings>)
-> HttpResponse {
    let result = params
        .into_inner()
        .into_query()
        .and_then(|query| query::query_readings(db.get_ref(), query, &settings.time_zone));
    map_service_call_to_http_response(result)
}

//#[post("/api/registro_comida")]
pub async fn ingest_feeding_event<D: Database>(payload: web::Json<FeedingPayload>, db: web::Data<D>) -> HttpResponse {
    match ingestion::ingest_feeding_event(db.get_ref(), payload.into_inner()) {
        Ok(_) => HttpResponse::Created().json(MessageResponse {
            message: "Registro de comida guardado correctamente".to_string(),
        }),
        Err(err) => map_service_error_to_http(err)
    }
}

#[derive(Debug, Deserialize)]
pub struct LimitParams {
    #[serde(default)]
    limit: Option<i64>,
}

//#[get("/api/registro_comida")]
pub async fn feeding_events<D: Database>(
    params: web::Query<LimitParams>,
    db: web::Data<D>,
    settings: web::Data<AppSettings>)
-> HttpResponse {
    let limit = params.limit.unwrap_or(DEFAULT_LIMIT);
    map_service_call_to_http_response(query::query_feeding_events(db.get_ref(), limit, &settings.time_zone))
}

//#[post("/api/registro_manual")]
pub async fn ingest_manual_reading<D: Database>(payload: web::Json<ManualPayload>, db: web::Data<D>) -> HttpResponse {
    match ingestion::ingest_manual_reading(db.get_ref(), payload.into_inner()) {
        Ok(accepted) => HttpResponse::Created().json(MessageResponse {
            message: format!("Registro manual guardado en dominio {}", accepted.partition.unwrap_or_default()),
        }),
        Err(err) => map_service_error_to_http(err)
    }
}

//#[get("/api/dominios")]
pub async fn domains<D: Database>(db: web::Data<D>, settings: web::Data<AppSettings>) -> HttpResponse {
    map_service_call_to_http_response(query::list_domains(db.get_ref(), &settings.domain_prefix))
}

//#[post("/api/clear")]
pub async fn clear<D: Database>(db: web::Data<D>, settings: web::Data<AppSettings>) -> HttpResponse {
    match query::clear_all_readings(db.get_ref(), &settings.default_partition) {
        Ok(deleted) => HttpResponse::Ok().json(ClearResponse {
            message: format!("{} documentos eliminados de {}", deleted, settings.default_partition),
            deleted,
        }),
        Err(err) => map_service_error_to_http(err)
    }
}
