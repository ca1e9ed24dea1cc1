use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use cadre_core::CadreError;

/// A [`CadreError`] rendered as a JSON error response.
#[derive(Debug)]
pub struct ApiError(pub CadreError);

impl ApiError {
    /// 404 for a missing task or agent.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self(CadreError::NotFound(what.into()))
    }

    /// 400 for invalid input.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self(CadreError::Config(message.into()))
    }

    /// HTTP status for the wrapped error.
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            CadreError::NotFound(_) => StatusCode::NOT_FOUND,
            CadreError::Config(_) | CadreError::Json(_) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CadreError> for ApiError {
    fn from(e: CadreError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = serde_json::json!({ "error": self.0.to_string() });
        (status, Json(body)).into_response()
    }
}
