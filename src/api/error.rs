//! Error responses
//!
//! Every failure leaves the service as `{"error": "..."}` with the status the
//! error maps to.

use axum::body::Bytes;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use crate::error::TutorError;

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl IntoResponse for TutorError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let message = match &self {
            Self::Database(_) | Self::Pool(_) | Self::Io(_) | Self::Serialization(_) => {
                error!(kind = self.kind(), error = %self, "Request failed");
                "Internal server error".to_string()
            },
            _ if status.is_server_error() => {
                error!(kind = self.kind(), error = %self, "Request failed");
                self.to_string()
            },
            _ => {
                warn!(kind = self.kind(), status = status.as_u16(), error = %self, "Request rejected");
                self.to_string()
            },
        };

        (status, Json(ErrorBody { error: message })).into_response()
    }
}

/// Parse a request body as JSON whatever its `Content-Type`.
///
/// Any body that fails to deserialize, an empty one included, is reported the same way.
pub(crate) fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, TutorError> {
    serde_json::from_slice(body).map_err(|err| {
        warn!(error = %err, "Rejected request body");
        TutorError::InvalidInput("Invalid JSON".to_string())
    })
}
