use axum::{
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use cinema_booking::{FlowError, PaymentError, SeatError};
use cinema_core::identity::codes;
use cinema_core::{BackendError, StorageError};
use cinema_shared::FieldError;
use serde_json::json;

#[derive(Debug)]
pub enum AppError {
    AuthenticationError(String),
    AuthorizationError(String),
    ValidationError(String),
    InvalidFields(Vec<FieldError>),
    NotFoundError(String),
    ConflictError(String),
    /// Identity provider rejection, already localized.
    ProviderError { code: String, message: String },
    /// Backend unreachable or misbehaving; shown as a dismissible banner.
    UpstreamError(String),
    ServiceUnavailable(String),
    Redirect(String),
    InternalServerError(String),
    Anyhow(anyhow::Error),
}

fn provider_status(code: &str) -> StatusCode {
    match code {
        codes::WRONG_PASSWORD | codes::INVALID_CREDENTIAL | codes::USER_NOT_FOUND | codes::TOKEN_EXPIRED => {
            StatusCode::UNAUTHORIZED
        }
        codes::USER_DISABLED => StatusCode::FORBIDDEN,
        codes::EMAIL_IN_USE => StatusCode::CONFLICT,
        codes::TOO_MANY_REQUESTS => StatusCode::TOO_MANY_REQUESTS,
        codes::NETWORK_FAILED | codes::INTERNAL => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::Redirect(location) => {
                return (
                    StatusCode::SEE_OTHER,
                    [(header::LOCATION, location.clone())],
                    Json(json!({ "redirect": location })),
                )
                    .into_response();
            }
            AppError::AuthenticationError(msg) => (StatusCode::UNAUTHORIZED, json!({ "error": msg })),
            AppError::AuthorizationError(msg) => (StatusCode::FORBIDDEN, json!({ "error": msg })),
            AppError::ValidationError(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg })),
            AppError::InvalidFields(fields) => (
                StatusCode::BAD_REQUEST,
                json!({ "error": "Validation failed", "fields": fields }),
            ),
            AppError::NotFoundError(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg })),
            AppError::ConflictError(msg) => (StatusCode::CONFLICT, json!({ "error": msg })),
            AppError::ProviderError { code, message } => {
                (provider_status(&code), json!({ "error": message, "code": code }))
            }
            AppError::UpstreamError(msg) => {
                tracing::warn!("Upstream failure: {}", msg);
                (
                    StatusCode::BAD_GATEWAY,
                    json!({ "error": "The cinema service is not available right now", "dismissible": true }),
                )
            }
            AppError::ServiceUnavailable(msg) => (StatusCode::SERVICE_UNAVAILABLE, json!({ "error": msg })),
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
            AppError::Anyhow(err) => {
                tracing::error!("Internal Server Error: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal Server Error" }))
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        Self::Anyhow(err)
    }
}

impl From<BackendError> for AppError {
    fn from(err: BackendError) -> Self {
        match err {
            BackendError::NotFound(what) => AppError::NotFoundError(what),
            BackendError::Unauthorized => AppError::AuthenticationError("Session expired".into()),
            BackendError::Status { status: 400, message } => AppError::ValidationError(message),
            BackendError::Status { status: 409, message } => AppError::ConflictError(message),
            other => AppError::UpstreamError(other.to_string()),
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<SeatError> for AppError {
    fn from(err: SeatError) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

impl From<FlowError> for AppError {
    fn from(err: FlowError) -> Self {
        match err {
            FlowError::Detour(location) => AppError::Redirect(location),
            FlowError::PaymentInProgress(_) => AppError::ConflictError(err.to_string()),
            FlowError::Seat(seat) => seat.into(),
            FlowError::Storage(storage) => storage.into(),
            FlowError::UnknownShowtime { .. } | FlowError::SeatsIncomplete { .. } | FlowError::EmptyTicketChange => {
                AppError::ValidationError(err.to_string())
            }
        }
    }
}

impl From<PaymentError> for AppError {
    fn from(err: PaymentError) -> Self {
        match err {
            PaymentError::AlreadyProcessing | PaymentError::AlreadyComplete(_) => AppError::ConflictError(err.to_string()),
            PaymentError::Declined | PaymentError::Gateway(_) => AppError::UpstreamError(err.to_string()),
            PaymentError::Flow(flow) => flow.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_is_see_other_with_location() {
        let response = AppError::Redirect("/login?redirect=/staff".into()).into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[header::LOCATION], "/login?redirect=/staff");
    }

    #[test]
    fn test_error_status_mapping() {
        let cases = [
            (AppError::from(BackendError::NotFound("movie 9".into())), StatusCode::NOT_FOUND),
            (AppError::from(BackendError::RequestFailed("timeout".into())), StatusCode::BAD_GATEWAY),
            (AppError::from(PaymentError::AlreadyProcessing), StatusCode::CONFLICT),
            (AppError::from(FlowError::SeatsIncomplete { selected: 1, required: 2 }), StatusCode::BAD_REQUEST),
            (
                AppError::ProviderError { code: codes::EMAIL_IN_USE.into(), message: "x".into() },
                StatusCode::CONFLICT,
            ),
            (AppError::ServiceUnavailable("open".into()), StatusCode::SERVICE_UNAVAILABLE),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }
}
