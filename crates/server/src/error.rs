//! Structured errors for the gateway.
//!
//! Every error renders as `{"error": CODE, "message": ...}` with a status
//! chosen from the error kind.

use actix_web::http::{StatusCode, header};
use actix_web::{HttpResponse, ResponseError};

use shellcache_core::Error;

#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Malformed request to the gateway itself (bad path, bad JSON body).
    #[error("INVALID_INPUT: {0}")]
    InvalidInput(String),

    /// Control request without the required credentials.
    #[error("UNAUTHORIZED: {0}")]
    Unauthorized(String),

    /// Error raised by the cache engine.
    #[error(transparent)]
    Engine(#[from] Error),
}

impl GatewayError {
    fn code(&self) -> &'static str {
        match self {
            GatewayError::InvalidInput(_) => "INVALID_INPUT",
            GatewayError::Unauthorized(_) => "UNAUTHORIZED",
            GatewayError::Engine(e) => e.code(),
        }
    }
}

impl ResponseError for GatewayError {
    fn status_code(&self) -> StatusCode {
        match self {
            GatewayError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            GatewayError::Engine(e) => match e {
                Error::InvalidInput(_) | Error::InvalidUrl(_) => StatusCode::BAD_REQUEST,
                Error::NotFound(_) => StatusCode::NOT_FOUND,
                Error::Lifecycle { .. } => StatusCode::CONFLICT,
                Error::Network(_) | Error::FetchTooLarge(_) => StatusCode::BAD_GATEWAY,
                Error::Database(_) | Error::MigrationFailed(_) | Error::CorruptEntry(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
        }
    }

    fn error_response(&self) -> HttpResponse {
        let mut response = HttpResponse::build(self.status_code());
        if let GatewayError::Unauthorized(_) = self {
            response.insert_header((header::WWW_AUTHENTICATE, "Bearer"));
        }
        response.json(serde_json::json!({
            "error": self.code(),
            "message": self.to_string(),
        }))
    }
}
