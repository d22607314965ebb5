use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, warn};

use crate::pipeline::{PipelineError, QueryResponse};
use crate::web::state::AppState;

pub const SERVICE_MESSAGE: &str = "Marketing Analysis AI Agent API";

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    pub query: String,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct HealthStatus {
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub database: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// A fault rendered as `{"detail": "..."}` with its status code.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    detail: String,
}

impl ApiError {
    pub fn status_for(err: &PipelineError) -> StatusCode {
        match err {
            PipelineError::Rejected(_) | PipelineError::Execution(_) | PipelineError::UnsafeSql(_) => {
                StatusCode::BAD_REQUEST
            }
            PipelineError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            PipelineError::Generation(_)
            | PipelineError::Connection(_)
            | PipelineError::Unexpected(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<PipelineError> for ApiError {
    fn from(err: PipelineError) -> Self {
        Self {
            status: Self::status_for(&err),
            detail: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            detail: rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(json!({ "detail": self.detail }))).into_response()
    }
}

pub async fn root() -> impl IntoResponse {
    Json(json!({ "message": SERVICE_MESSAGE }))
}

/// Opens and closes one connection. Always HTTP 200; the body tells the story.
pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthStatus> {
    let outcome = match state.connections.open().await {
        Ok(conn) => conn.close().await,
        Err(e) => Err(e),
    };

    match outcome {
        Ok(()) => Json(HealthStatus {
            status: "healthy",
            database: Some("connected"),
            error: None,
        }),
        Err(e) => {
            warn!("Health check failed: {}", e);
            Json(HealthStatus {
                status: "unhealthy",
                database: None,
                error: Some(e.to_string()),
            })
        }
    }
}

pub async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<QueryResponse>, ApiError> {
    let Json(request) = payload?;
    let start_time = Instant::now();
    info!("Received question: {}", request.query);

    match state.pipeline.answer(&request.query).await {
        Ok(response) => {
            info!(
                "Answered in {} ms (error: {})",
                start_time.elapsed().as_millis(),
                response.error().unwrap_or("none")
            );
            Ok(Json(response))
        }
        Err(err) => {
            let api_error = ApiError::from(err);
            if api_error.status.is_server_error() {
                error!("Query failed: {}", api_error.detail);
            } else {
                info!("Query refused: {}", api_error.detail);
            }
            Err(api_error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn faults_map_to_status_codes() {
        let cases = [
            (PipelineError::Rejected("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::Execution("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::UnsafeSql("x".into()), StatusCode::BAD_REQUEST),
            (PipelineError::ServiceUnavailable("x".into()), StatusCode::SERVICE_UNAVAILABLE),
            (PipelineError::Generation("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
            (PipelineError::Connection("x".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::status_for(&err), status, "{err:?}");
        }
    }

    #[test]
    fn api_error_keeps_the_fault_message() {
        let err = ApiError::from(PipelineError::Execution("column \"region\" does not exist".into()));

        assert_eq!(err.detail, "SQL execution error: column \"region\" does not exist");
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
    }

    #[test]
    fn unhealthy_status_omits_database_field() {
        let body = serde_json::to_value(HealthStatus {
            status: "unhealthy",
            database: None,
            error: Some("connection refused".to_string()),
        })
        .unwrap();

        assert_eq!(body, json!({"status": "unhealthy", "error": "connection refused"}));
    }
}
