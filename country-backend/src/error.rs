use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use country_common::ErrorBody;
use serde_json::json;

use crate::module::country::store::StoreError;
use crate::module::country::validation::FieldErrors;
use crate::module::sources::SourceError;

/// Errors surfaced by the country operations
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("External data source unavailable: {0}")]
    SourceUnavailable(#[from] SourceError),

    #[error("Validation failed: {0}")]
    Validation(FieldErrors),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Storage failure: {0}")]
    Storage(#[from] StoreError),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::SourceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn body(&self) -> ErrorBody {
        match self {
            ServiceError::SourceUnavailable(e) => {
                ErrorBody::new("External data source unavailable").with_details(json!(e.to_string()))
            }
            ServiceError::Validation(errors) => {
                ErrorBody::new("Validation failed").with_details(json!(errors))
            }
            ServiceError::NotFound(what) => ErrorBody::new(format!("{} not found", what)),
            ServiceError::Storage(e) => {
                ErrorBody::new("Internal server error").with_details(json!(e.to_string()))
            }
        }
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
        (status, Json(self.body())).into_response()
    }
}
