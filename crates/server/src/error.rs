use actix_web::http::StatusCode;
use actix_web::{HttpResponse, ResponseError};
use precis_common::PrecisError;
use std::fmt;
use tracing::{error, warn};

use crate::types::ErrorResponse;

/// HTTP boundary wrapper for [`PrecisError`]
#[derive(Debug)]
pub struct ApiError(pub PrecisError);

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<PrecisError> for ApiError {
    fn from(err: PrecisError) -> Self {
        Self(err)
    }
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed - Status: {}, Error: {}", status.as_u16(), self.0);
        } else {
            warn!("Request rejected - Status: {}, Error: {}", status.as_u16(), self.0);
        }
        HttpResponse::build(status).json(ErrorResponse::from(&self.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PrecisError::invalid_input("x"), 400),
            (PrecisError::quota_exceeded("x"), 402),
            (PrecisError::upstream("x"), 502),
            (PrecisError::config("x"), 500),
            (PrecisError::internal("x"), 500),
        ];
        for (err, status) in cases {
            assert_eq!(ApiError(err).status_code().as_u16(), status);
        }
    }

    #[test]
    fn test_quota_body_carries_hint() {
        let body = ErrorResponse::from(&PrecisError::quota_exceeded("insufficient_quota"));
        let details = body.details.unwrap();
        assert_eq!(details.kind, "UpstreamQuotaExceeded");
        assert!(details.hint.unwrap().contains("billing"));
    }
}
