//! HTTP surface of the decision service

use crate::error::RequestError;
use crate::metrics::{MetricsSnapshot, ServiceMetrics};
use crate::service::DecisionService;
use crate::types::{DecideRequest, Decision, HealthResponse, ScoreRequest};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::{debug, info, warn};

/// Header carrying the shared secret
pub const API_KEY_HEADER: &str = "x-api-key";

/// State handed to every handler
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DecisionService>,
    pub metrics: Arc<ServiceMetrics>,
    api_key: Arc<str>,
    bucket: Arc<str>,
    prefix: Arc<str>,
}

impl AppState {
    pub fn new(
        service: Arc<DecisionService>,
        metrics: Arc<ServiceMetrics>,
        api_key: &str,
        bucket: &str,
        prefix: &str,
    ) -> Self {
        Self {
            service,
            metrics,
            api_key: Arc::from(api_key),
            bucket: Arc::from(bucket),
            prefix: Arc::from(prefix),
        }
    }

    fn authorize(&self, headers: &HeaderMap) -> Result<(), RequestError> {
        let supplied = headers
            .get(API_KEY_HEADER)
            .and_then(|v| v.to_str().ok());
        if supplied == Some(&*self.api_key) {
            Ok(())
        } else {
            Err(RequestError::Unauthorized)
        }
    }
}

/// Request error rendered as `{"detail": ...}` with a matching status code
pub struct ApiError(RequestError);

impl From<RequestError> for ApiError {
    fn from(err: RequestError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match self.0 {
            RequestError::Unauthorized => StatusCode::FORBIDDEN,
            RequestError::InvalidBody(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RequestError::FeatureCountMismatch { .. }
            | RequestError::NonFiniteFeature { .. }
            | RequestError::InvalidProbability(_) => StatusCode::BAD_REQUEST,
            RequestError::Inference(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "detail": self.0.to_string() }))).into_response()
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/score", post(score))
        .route("/decide", post(decide))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Serve until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "Decision service listening");
    }
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        bucket: state.bucket.to_string(),
        prefix: state.prefix.to_string(),
        threshold: state.service.threshold().value(),
        expected_features: state.service.expected_features(),
    })
}

async fn score(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<ScoreRequest>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let start = Instant::now();
    let result = state
        .authorize(&headers)
        .and_then(|()| body(payload))
        .and_then(|request| state.service.score(&request.features));
    finish(&state, start, result)
}

async fn decide(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Json<DecideRequest>, JsonRejection>,
) -> Result<Json<Decision>, ApiError> {
    let start = Instant::now();
    let result = state
        .authorize(&headers)
        .and_then(|()| body(payload))
        .and_then(|request| state.service.decide(request.probability));
    finish(&state, start, result)
}

async fn metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.metrics.snapshot())
}

/// Unwrap the JSON body, turning axum's plain-text rejection into a request error.
fn body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, RequestError> {
    payload
        .map(|Json(request)| request)
        .map_err(|rejection| RequestError::InvalidBody(rejection.body_text()))
}

fn finish(
    state: &AppState,
    start: Instant,
    result: Result<Decision, RequestError>,
) -> Result<Json<Decision>, ApiError> {
    match result {
        Ok(decision) => {
            let latency = start.elapsed();
            state
                .metrics
                .record_decision(latency, decision.probability, decision.flagged());
            debug!(
                probability = decision.probability,
                is_fraud = decision.is_fraud,
                latency_us = latency.as_micros() as u64,
                "Decision made"
            );
            Ok(Json(decision))
        }
        Err(err) => {
            state.metrics.record_rejection(err.kind());
            if err.is_client_error() {
                debug!(kind = err.kind(), error = %err, "Request rejected");
            } else {
                warn!(kind = err.kind(), error = %err, "Request failed");
            }
            Err(err.into())
        }
    }
}
