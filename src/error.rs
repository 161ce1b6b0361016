use thiserror::Error;

use crate::database::DatabaseError;

pub type ServiceResult<T> = Result<T, ServiceError>;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Falta campo dominio")]
    MissingDomain,

    #[error("{}", invalid_event_message(.0))]
    InvalidEvent(Option<String>),

    #[error("Faltan campos requeridos: {}", .0.join(", "))]
    MissingRequiredFields(Vec<&'static str>),

    #[error("Valor inválido para {field}: {value}")]
    InvalidMeasurement { field: &'static str, value: String },

    #[error("Marca de tiempo inválida: {0}")]
    InvalidTimestamp(String),

    #[error("Rango de tiempo inválido: el inicio es posterior al fin")]
    InvalidTimeWindow,

    #[error("El límite debe ser mayor que cero (recibido {0})")]
    InvalidLimit(i64),

    #[error("Solicitud inválida: {0}")]
    InvalidRequest(String),

    #[error("Dominio no encontrado: {0}")]
    DomainNotFound(String),

    #[error("storage failure: {0}")]
    Infrastructure(#[from] DatabaseError),
}

fn invalid_event_message(event: &Option<String>) -> String {
    match event {
        Some(event) => format!("Evento incorrecto: {}", event),
        None => "JSON inválido: falta el campo evento".to_string(),
    }
}

impl ServiceError {
    /// Stable machine-readable identifier reported next to the message.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::MissingDomain => "missing_domain",
            ServiceError::InvalidEvent(_) => "invalid_event",
            ServiceError::MissingRequiredFields(_) => "missing_required_fields",
            ServiceError::InvalidMeasurement { .. } => "invalid_measurement",
            ServiceError::InvalidTimestamp(_) => "invalid_timestamp",
            ServiceError::InvalidTimeWindow => "invalid_time_window",
            ServiceError::InvalidLimit(_) => "invalid_limit",
            ServiceError::InvalidRequest(_) => "invalid_request",
            ServiceError::DomainNotFound(_) => "domain_not_found",
            ServiceError::Infrastructure(DatabaseError::Busy) => "storage_busy",
            ServiceError::Infrastructure(_) => "storage_error",
        }
    }
}
