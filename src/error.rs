use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use thiserror::Error;

/// Errors raised while serving a request.
///
/// Clients only ever see the status code. The detail goes to the log.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ResponseError for AppError {
    fn error_response(&self) -> HttpResponse {
        match self {
            AppError::Database(ref e) => {
                tracing::error!("Database error: {:?}", e);
            }
            AppError::Serialization(ref e) => {
                tracing::error!("Serialization error: {:?}", e);
            }
        }

        HttpResponse::build(self.status_code()).finish()
    }

    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Serialization(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;
