use actix_web::{HttpResponse, ResponseError};
use common::AppError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum HttpApiError {
    #[error("{0}")]
    App(#[from] AppError),
    #[error("db error")]
    Db(#[from] db::DbError),
    #[error("auth error")]
    Auth,
}

impl From<validator::ValidationErrors> for HttpApiError {
    fn from(e: validator::ValidationErrors) -> Self {
        HttpApiError::App(AppError::BadRequest(e.to_string()))
    }
}

fn envelope(message: &str) -> serde_json::Value {
    serde_json::json!({ "success": false, "message": message })
}

impl ResponseError for HttpApiError {
    fn error_response(&self) -> HttpResponse {
        match self {
            Self::App(AppError::NotFound) => HttpResponse::NotFound().json(envelope("not found")),
            Self::App(AppError::Conflict) => HttpResponse::Conflict().json(envelope("conflict")),
            Self::App(AppError::Unauthorized) | Self::Auth => {
                HttpResponse::Unauthorized().json(envelope("unauthorized"))
            }
            Self::App(AppError::Forbidden) => HttpResponse::Forbidden().json(envelope("forbidden")),
            Self::App(AppError::BadRequest(msg)) => HttpResponse::BadRequest().json(
                serde_json::json!({ "success": false, "message": msg, "error": "validation" }),
            ),
            Self::Db(e) => {
                // Internal error text stays out of the response body.
                tracing::error!(error = %e, "database failure");
                HttpResponse::InternalServerError().json(envelope("internal server error"))
            }
            Self::App(AppError::Internal) => {
                HttpResponse::InternalServerError().json(envelope("internal server error"))
            }
        }
    }
}

pub fn bad_request(msg: impl Into<String>) -> HttpApiError {
    HttpApiError::App(AppError::BadRequest(msg.into()))
}

pub fn not_found() -> HttpApiError {
    HttpApiError::App(AppError::NotFound)
}

pub fn conflict() -> HttpApiError {
    HttpApiError::App(AppError::Conflict)
}

pub fn unauthorized() -> HttpApiError {
    HttpApiError::App(AppError::Unauthorized)
}

pub fn forbidden() -> HttpApiError {
    HttpApiError::App(AppError::Forbidden)
}
