//! HTTP surface of the adapter.
//!
//! - `GET  /gerbil`: initial state of the endpoint generator
//! - `POST /gerbil`: endpoint URL for the posted `componentlist` values
//! - `POST /gerbil-execute/*components`: one GERBIL QA benchmark request
//! - `GET  /health`: liveness check
//!
//! Every response allows any origin, so browser-based harness front-ends can
//! call the adapter directly.

use axum::body::Bytes;
use axum::extract::rejection::FormRejection;
use axum::extract::{Path, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Form, Json, Router, serve as axum_serve};
use color_eyre::eyre::{Result, eyre};
use qanary_gerbil_core::{GerbilAdapter, NO_SELECTION};
use qanary_gerbil_shared::{BenchmarkResponse, GerbilError};
use serde::{Deserialize, Serialize};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::{error, info, warn};

/// Form field names accepted for the component selection.
const COMPONENT_FIELDS: [&str; 2] = ["componentlist", "componentlist[]"];

// ---------------------------------------------------------------------------
// Router
// ---------------------------------------------------------------------------

/// Build the adapter's router.
pub(crate) fn router(adapter: GerbilAdapter) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/gerbil", get(generator).post(generate))
        .route("/gerbil-execute/*components", post(execute))
        .with_state(adapter)
        .layer(SetResponseHeaderLayer::overriding(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
}

/// Bind `addr` and serve until Ctrl-C.
pub(crate) async fn serve(adapter: GerbilAdapter, addr: &str) -> Result<()> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| eyre!("cannot bind {addr}: {e}"))?;
    info!(addr = %listener.local_addr()?, "GERBIL adapter listening");

    axum_serve(listener, router(adapter))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("GERBIL adapter stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

/// `GET /health`
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[derive(Debug, Serialize)]
struct GeneratedUrl {
    url: String,
}

/// `GET /gerbil`: nothing selected yet.
async fn generator() -> Json<GeneratedUrl> {
    Json(GeneratedUrl {
        url: NO_SELECTION.to_string(),
    })
}

/// `POST /gerbil`: the form repeats `componentlist` once per component,
/// which is why the body is decoded by hand.
async fn generate(
    State(adapter): State<GerbilAdapter>,
    body: Bytes,
) -> Result<Json<GeneratedUrl>, ApiError> {
    let components: Vec<String> = url::form_urlencoded::parse(&body)
        .filter(|(key, _)| COMPONENT_FIELDS.contains(&key.as_ref()))
        .map(|(_, value)| value.into_owned())
        .collect();

    info!(?components, "generating endpoint");
    let endpoint = adapter.generate_endpoint(&components)?;

    Ok(Json(GeneratedUrl {
        url: endpoint.to_string(),
    }))
}

/// Form GERBIL QA posts to the execution endpoint.
#[derive(Debug, Deserialize)]
struct ExecuteForm {
    #[serde(alias = "query")]
    question: String,
    #[serde(alias = "lang")]
    language: String,
}

/// `POST /gerbil-execute/*components`
async fn execute(
    State(adapter): State<GerbilAdapter>,
    Path(components): Path<String>,
    form: std::result::Result<Form<ExecuteForm>, FormRejection>,
) -> Result<Json<BenchmarkResponse>, ApiError> {
    let Form(form) = form.map_err(|e| ApiError::BadRequest(e.body_text()))?;
    let components = components.trim_end_matches('/');

    info!(question = %form.question, language = %form.language, components, "benchmark request");

    let response = adapter
        .execute_benchmark(&form.question, &form.language, components)
        .await?;
    Ok(Json(response))
}

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Structured error response body.
#[derive(Debug, Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Debug, Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

/// Request failure with HTTP status mapping.
#[derive(Debug, thiserror::Error)]
enum ApiError {
    /// The request could not be decoded.
    #[error("invalid request: {0}")]
    BadRequest(String),
    /// The adapter rejected or failed the request.
    #[error(transparent)]
    Adapter(#[from] GerbilError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            ApiError::BadRequest(detail) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", detail.clone()),
            ApiError::Adapter(err) if err.is_client_error() => {
                (status_for(err), err.code(), err.to_string())
            }
            ApiError::Adapter(err) => {
                // Upstream details name internal hosts; they stay in the log.
                error!(error = %err, code = err.code(), "benchmark request failed");
                (status_for(err), err.code(), public_message(err).to_string())
            }
        };

        let body = ErrorBody {
            error: ErrorDetail { code, message },
        };
        (status, Json(body)).into_response()
    }
}

fn status_for(err: &GerbilError) -> StatusCode {
    match err {
        GerbilError::Validation { .. } | GerbilError::MalformedEndpoint { .. } => {
            StatusCode::BAD_REQUEST
        }
        GerbilError::PipelineUnreachable {
            timed_out: true, ..
        } => StatusCode::GATEWAY_TIMEOUT,
        GerbilError::PipelineUnreachable { .. }
        | GerbilError::InvalidPipelineResponse(_)
        | GerbilError::MissingQuestionText(_)
        | GerbilError::MalformedAnswerPayload(_)
        | GerbilError::ResultStore(_) => StatusCode::BAD_GATEWAY,
        GerbilError::Config { .. } | GerbilError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn public_message(err: &GerbilError) -> &'static str {
    match err {
        GerbilError::PipelineUnreachable {
            timed_out: true, ..
        } => "the pipeline did not finish in time",
        GerbilError::PipelineUnreachable { .. } => "the pipeline could not be reached",
        GerbilError::InvalidPipelineResponse(_) => "the pipeline returned an unusable response",
        GerbilError::MissingQuestionText(_) => "the pipeline run stored no question text",
        GerbilError::MalformedAnswerPayload(_) => "the pipeline answer is not a JSON object",
        GerbilError::ResultStore(_) => "the pipeline results could not be read",
        GerbilError::Validation { .. }
        | GerbilError::MalformedEndpoint { .. }
        | GerbilError::Config { .. }
        | GerbilError::Io { .. } => "an internal error occurred",
    }
}
