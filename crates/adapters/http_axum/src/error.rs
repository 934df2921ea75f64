//! HTTP error response mapping.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use gateway_domain::error::{GatewayError, NotFoundError, ScenarioError, ValidationError};

/// JSON error body returned by API endpoints.
#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Maps [`GatewayError`] to an HTTP response with appropriate status code,
/// per the error taxonomy: validation and unknown-role/missing-device
/// scenario errors are client mistakes (400), not-found lookups and unknown
/// scenarios are 404, an inactive-scenario conflict is 409, and storage/bus
/// failures are logged and reported as opaque 500s.
pub struct ApiError(GatewayError);

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        Self(err)
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        Self(err.into())
    }
}

impl From<NotFoundError> for ApiError {
    fn from(err: NotFoundError) -> Self {
        Self(err.into())
    }
}

impl From<ScenarioError> for ApiError {
    fn from(err: ScenarioError) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            GatewayError::Validation(err) => (StatusCode::BAD_REQUEST, err.to_string()),
            GatewayError::NotFound(err) => (StatusCode::NOT_FOUND, err.to_string()),
            GatewayError::Scenario(err) => scenario_status(err),
            GatewayError::Storage(err) => {
                tracing::error!(error = %err, "storage error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
            GatewayError::Bus(err) => {
                tracing::error!(error = %err, "bus error");
                (StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_string())
            }
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

fn scenario_status(err: &ScenarioError) -> (StatusCode, String) {
    let status = match err {
        ScenarioError::InvalidRole(_) | ScenarioError::MissingDevice(_) => StatusCode::BAD_REQUEST,
        ScenarioError::NoActiveScenario | ScenarioError::UnknownScenario(_) => StatusCode::NOT_FOUND,
        ScenarioError::AlreadyActive(_) | ScenarioError::NotActive { .. } => StatusCode::CONFLICT,
    };
    (status, err.to_string())
}
