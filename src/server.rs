use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::NarrativeError;
use crate::metrics::raw::RawClimateRecord;
use crate::output::tagged::render_tagged;
use crate::pipeline::NarrativeEngine;
use crate::report::{Analysis, NarrativeReport};
use crate::severity::ThresholdTable;

#[derive(Clone)]
struct ApiState {
    config: Arc<Config>,
    engine: Arc<NarrativeEngine>,
}

#[derive(Debug, Serialize)]
struct ApiResponse<T: Serialize> {
    ok: bool,
    data: T,
}

#[derive(Debug, Serialize)]
struct ApiErrorBody {
    ok: bool,
    error: String,
    kind: &'static str,
}

#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "bad_request",
            message: message.into(),
        }
    }
}

impl From<NarrativeError> for ApiError {
    fn from(err: NarrativeError) -> Self {
        // Input problems are the caller's; anything else is a composer defect.
        let status = if err.is_input_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            warn!(kind = self.kind, "request failed: {}", self.message);
        }
        let body = Json(ApiErrorBody {
            ok: false,
            error: self.message,
            kind: self.kind,
        });
        (self.status, body).into_response()
    }
}

type ApiResult<T> = std::result::Result<Json<ApiResponse<T>>, ApiError>;

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

#[derive(Debug, Serialize)]
struct ReportResponse {
    report: NarrativeReport,
    /// The tagged plain-text rendering of `report`.
    document: String,
}

pub fn build_router(config: Config) -> Router {
    let state = ApiState {
        engine: Arc::new(NarrativeEngine::from_config(&config)),
        config: Arc::new(config),
    };
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health))
        .route("/v1/thresholds", get(show_thresholds))
        .route("/v1/config", get(show_config))
        .route("/v1/report", post(report))
        .route("/v1/analysis", post(analysis))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run_server(config: Config, bind: SocketAddr) -> Result<()> {
    let app = build_router(config);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    info!("REST API listening on http://{bind}");
    axum::serve(listener, app).await?;
    Ok(())
}

async fn health() -> Json<ApiResponse<HealthResponse>> {
    ok(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn show_thresholds(State(state): State<ApiState>) -> Json<ApiResponse<ThresholdTable>> {
    ok(state.engine.thresholds().clone())
}

async fn show_config(State(state): State<ApiState>) -> Json<ApiResponse<Config>> {
    ok(state.config.as_ref().clone())
}

async fn report(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<RawClimateRecord>, JsonRejection>,
) -> ApiResult<ReportResponse> {
    let Json(record) = payload?;
    let report = state.engine.generate(&record)?;
    let document = render_tagged(&report);
    Ok(ok(ReportResponse { report, document }))
}

async fn analysis(
    State(state): State<ApiState>,
    payload: std::result::Result<Json<RawClimateRecord>, JsonRejection>,
) -> ApiResult<Analysis> {
    let Json(record) = payload?;
    let (_, analysis) = state.engine.analyze(&record)?;
    Ok(ok(analysis))
}

fn ok<T: Serialize>(data: T) -> Json<ApiResponse<T>> {
    Json(ApiResponse { ok: true, data })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_errors_are_unprocessable() {
        let err: NarrativeError =
            crate::error::DataValidationError::missing(None, "metadata.model_agreement").into();
        let api = ApiError::from(err);
        assert_eq!(api.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(api.kind, "data_validation");
    }

    #[test]
    fn composer_defects_are_server_errors() {
        let api = ApiError::from(NarrativeError::IncompleteOutput {
            section: "report".to_string(),
            rule: "expected 11 sections, found 10".to_string(),
        });
        assert_eq!(api.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(api.kind, "incomplete_output");
    }
}
