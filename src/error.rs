use actix_web::{http::StatusCode, HttpResponse, ResponseError};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("shop not found")]
    ShopNotFound,
    #[error("appointment not found")]
    NotFound,
    #[error("appointment belongs to another customer")]
    NotOwner,
    #[error("barber is not registered at this shop")]
    NotAuthorized,
    #[error("barber role required")]
    NotBarberRole,
    #[error("appointment is {actual}, expected {expected}")]
    InvalidState {
        expected: &'static str,
        actual: String,
    },
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl QueueError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueueError::InvalidInput(_) => "invalid_input",
            QueueError::ShopNotFound => "shop_not_found",
            QueueError::NotFound => "not_found",
            QueueError::NotOwner => "not_owner",
            QueueError::NotAuthorized => "not_authorized",
            QueueError::NotBarberRole => "not_barber_role",
            QueueError::InvalidState { .. } => "invalid_state",
            QueueError::Db(_) => "storage",
        }
    }
}

impl ResponseError for QueueError {
    fn status_code(&self) -> StatusCode {
        match self {
            QueueError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            QueueError::ShopNotFound | QueueError::NotFound => StatusCode::NOT_FOUND,
            QueueError::NotOwner | QueueError::NotAuthorized | QueueError::NotBarberRole => {
                StatusCode::FORBIDDEN
            }
            QueueError::InvalidState { .. } => StatusCode::CONFLICT,
            QueueError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let message = match self {
            QueueError::Db(err) => {
                log::error!("storage error: {err}");
                "internal storage error".to_string()
            }
            other => other.to_string(),
        };
        HttpResponse::build(self.status_code()).json(json!({
            "error": self.kind(),
            "message": message,
        }))
    }
}
