//! HTTP serving shell for a resolved model.
//!
//! A thin routing layer over the already-resolved pipeline: the server
//! never resolves components itself, it only forwards to the model (and
//! its retriever, when one was resolved).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/health` | Health check (returns version) |
//! | `POST` | `/model/predict` | Run one prediction |
//! | `POST` | `/retriever/retrieve` | Fetch context snippets |
//!
//! # Error Contract
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "prompt must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `retriever_disabled` (400),
//! `model_error` (502).
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::models::{ContextSnippet, Prediction};
use crate::traits::GenerativeModel;

/// Shared state for all route handlers.
#[derive(Clone)]
struct AppState {
    model: Arc<dyn GenerativeModel>,
}

/// Start the HTTP server for a resolved model.
///
/// Binds to `bind` and serves until the process is terminated. This is
/// the terminal action of `genai-stack start`.
pub async fn run_server(bind: &str, model: Arc<dyn GenerativeModel>) -> anyhow::Result<()> {
    let state = AppState { model };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/health", get(handle_health))
        .route("/model/predict", post(handle_predict))
        .route("/retriever/retrieve", post(handle_retrieve))
        .layer(cors)
        .with_state(state);

    println!("Model server listening on http://{}", bind);

    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: String,
    message: String,
}

#[derive(Debug)]
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// 400 for calls against a retriever that degraded to none at resolution.
fn retriever_disabled() -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "retriever_disabled".to_string(),
        message: "no retriever resolved for this pipeline".to_string(),
    }
}

fn model_error(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_GATEWAY,
        code: "model_error".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    model: String,
    version: String,
}

async fn handle_health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        model: state.model.name().to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /model/predict ============

#[derive(Deserialize)]
struct PredictRequest {
    prompt: String,
}

async fn handle_predict(
    State(state): State<AppState>,
    Json(req): Json<PredictRequest>,
) -> Result<Json<Prediction>, AppError> {
    if req.prompt.trim().is_empty() {
        return Err(bad_request("prompt must not be empty"));
    }

    let prediction = state
        .model
        .predict(&req.prompt)
        .await
        .map_err(|e| model_error(e.to_string()))?;

    Ok(Json(prediction))
}

// ============ POST /retriever/retrieve ============

#[derive(Deserialize)]
struct RetrieveRequest {
    query: String,
}

#[derive(Serialize)]
struct RetrieveResponse {
    snippets: Vec<ContextSnippet>,
}

async fn handle_retrieve(
    State(state): State<AppState>,
    Json(req): Json<RetrieveRequest>,
) -> Result<Json<RetrieveResponse>, AppError> {
    if req.query.trim().is_empty() {
        return Err(bad_request("query must not be empty"));
    }

    let retriever = state.model.retriever().ok_or_else(retriever_disabled)?;

    let snippets = retriever
        .retrieve(&req.query)
        .await
        .map_err(|e| model_error(e.to_string()))?;

    Ok(Json(RetrieveResponse { snippets }))
}
