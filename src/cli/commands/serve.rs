//! HTTP API server.
//!
//! Provides REST endpoints for upload, document data, questions and summaries.

use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::{FailurePolicy, ServerSettings, Settings};
use crate::error::{DocqueryError, ErrorKind, ErrorReport};
use crate::orchestrator::{DocumentData, Orchestrator, QueryResponse, SummaryResponse};
use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, Multipart, Path, State},
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tracing::info;

/// Shared application state.
struct AppState {
    orchestrator: Orchestrator,
    policy: FailurePolicy,
}

/// Run the HTTP API server.
pub async fn run_serve(host: Option<String>, port: Option<u16>, settings: Settings) -> anyhow::Result<()> {
    let credentials = match preflight::check(Operation::Serve) {
        Ok(c) => c,
        Err(e) => {
            Output::error(&format!("{}", e));
            return Err(e.into());
        }
    };

    let server = settings.server.clone();
    let host = host.unwrap_or_else(|| server.host.clone());
    let port = port.unwrap_or(server.port);

    let orchestrator = Orchestrator::new(settings, &credentials)?;
    let app = router(orchestrator, &server)?;

    let addr = format!("{}:{}", host, port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    Output::header("docquery API Server");
    println!();
    Output::success(&format!("Listening on http://{}", addr));
    println!();
    println!("Endpoints:");
    Output::kv("Health", "GET  /health");
    Output::kv("Upload", "POST /upload");
    Output::kv("Document", "GET  /document/{document_id}");
    Output::kv("Query", "POST /query");
    Output::kv("Summarize", "POST /summarize");
    println!();
    Output::kv("Failure policy", &format!("{:?}", server.failure_policy).to_lowercase());
    Output::kv("CORS origins", &server.allowed_origins.join(", "));
    println!();
    Output::info("Press Ctrl+C to stop the server.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}

/// Build the application router.
fn router(orchestrator: Orchestrator, server: &ServerSettings) -> anyhow::Result<Router> {
    let origins = server
        .allowed_origins
        .iter()
        .map(|o| HeaderValue::from_str(o))
        .collect::<Result<Vec<_>, _>>()
        .map_err(|e| anyhow::anyhow!("Invalid CORS origin: {}", e))?;

    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods(Any)
        .allow_headers(Any);

    let state = Arc::new(AppState {
        orchestrator,
        policy: server.failure_policy,
    });

    Ok(Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/document/{document_id}", get(document))
        .route("/query", post(query))
        .route("/summarize", post(summarize))
        .layer(DefaultBodyLimit::max(server.max_upload_bytes))
        .layer(cors)
        .with_state(state))
}

// === Request Types ===

#[derive(Deserialize)]
struct QueryRequest {
    document_id: String,
    question: String,
}

#[derive(Deserialize)]
struct SummarizeRequest {
    document_id: String,
    /// Accepted for compatibility, not used.
    #[serde(default)]
    #[allow(dead_code)]
    question: Option<String>,
}

// === Error mapping ===

/// Status code used when failures propagate.
fn status_for(kind: ErrorKind) -> StatusCode {
    match kind {
        ErrorKind::Validation => StatusCode::BAD_REQUEST,
        ErrorKind::NotFound => StatusCode::NOT_FOUND,
        ErrorKind::Embedding | ErrorKind::Generation => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn error_response(err: &DocqueryError) -> Response {
    (
        status_for(err.kind()),
        Json(serde_json::json!({ "error": ErrorReport::from(err) })),
    )
        .into_response()
}

fn bad_request(message: String) -> Response {
    error_response(&DocqueryError::InvalidInput(message))
}

/// Malformed JSON bodies are validation failures like any other.
fn invalid_body(rejection: JsonRejection) -> DocqueryError {
    DocqueryError::InvalidInput(rejection.body_text())
}

// === Handlers ===

async fn health() -> impl IntoResponse {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn upload(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => return bad_request("multipart body has no \"file\" field".to_string()),
            Err(e) => return bad_request(format!("invalid multipart body: {}", e)),
        };
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(e) => return bad_request(format!("failed to read upload: {}", e)),
        };

        // Upload failures always propagate.
        return match state.orchestrator.upload(&filename, &data).await {
            Ok(receipt) => Json(receipt).into_response(),
            Err(e) => error_response(&e),
        };
    }
}

async fn document(State(state): State<Arc<AppState>>, Path(document_id): Path<String>) -> Response {
    match state.orchestrator.document_data(&document_id).await {
        Ok(data) => Json(data).into_response(),
        Err(e) => match state.policy {
            FailurePolicy::Degraded => Json(DocumentData::degraded(&e)).into_response(),
            FailurePolicy::Propagate => error_response(&e),
        },
    }
}

async fn query(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(req)) => state.orchestrator.query(&req.document_id, &req.question).await,
        Err(rejection) => Err(invalid_body(rejection)),
    };
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => match state.policy {
            FailurePolicy::Degraded => Json(QueryResponse::degraded(&e)).into_response(),
            FailurePolicy::Propagate => error_response(&e),
        },
    }
}

async fn summarize(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<SummarizeRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(req)) => state.orchestrator.summarize(&req.document_id).await,
        Err(rejection) => Err(invalid_body(rejection)),
    };
    match result {
        Ok(response) => Json(response).into_response(),
        Err(e) => match state.policy {
            FailurePolicy::Degraded => Json(SummaryResponse::degraded(&e)).into_response(),
            FailurePolicy::Propagate => error_response(&e),
        },
    }
}
