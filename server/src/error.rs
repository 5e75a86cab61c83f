use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use mailroute::MailrouteError;
use serde_json::{json, Map, Value};
use tracing::{error, warn};

/// Handler error, rendered as `{"success": false, "error": "..."}`.
#[derive(Debug)]
pub struct ApiError(pub MailrouteError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }

    /// Renders the error body with extra top-level fields merged in.
    pub fn into_response_with(self, extra: Map<String, Value>) -> Response {
        let status = self.status();
        let message = self.0.to_string();

        if status.is_server_error() {
            error!(error = ?self.0, "{}", message);
        } else {
            warn!(status = status.as_u16(), "{}", message);
        }

        let mut body = Map::new();
        body.insert("success".into(), Value::Bool(false));
        body.insert("error".into(), Value::String(message));
        body.extend(extra);

        (status, Json(Value::Object(body))).into_response()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        self.into_response_with(Map::new())
    }
}

impl From<MailrouteError> for ApiError {
    fn from(err: MailrouteError) -> Self {
        ApiError(err)
    }
}

/// Unparseable request bodies are validation failures.
pub fn rejected(rejection: JsonRejection) -> ApiError {
    ApiError(MailrouteError::Validation(format!(
        "Invalid request body: {}",
        rejection.body_text()
    )))
}

/// `zones: []` for error bodies of the zones endpoint.
pub fn empty_zones() -> Map<String, Value> {
    match json!({ "zones": [] }) {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
