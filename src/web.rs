use crate::app::{App, AppError, SensorList, SimilarityMatch};
use axum::{
    extract::{Path, State},
    response::IntoResponse,
    routing::get,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::signal;
use tower_http::cors::CorsLayer;

async fn start_app(app: Arc<App>, listen_addr: String) {
    async fn shutdown_signal() {
        let ctrl_c = async {
            signal::ctrl_c()
                .await
                .expect("failed to install Ctrl+C handler");
        };

        let terminate = async {
            signal::unix::signal(signal::unix::SignalKind::terminate())
                .expect("failed to install signal handler")
                .recv()
                .await;
        };

        tokio::select! {
            _ = ctrl_c => {},
            _ = terminate => {},
        }
    }

    let router = router(app);

    let listener = tokio::net::TcpListener::bind(&listen_addr)
        .await
        .unwrap_or_else(|err| panic!("failed to bind {listen_addr}: {err}"));
    log::info!("listening on {listen_addr}");
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .unwrap();
}

pub fn start_daemon(app: Arc<App>, listen_addr: String) {
    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .unwrap()
        .block_on(async { start_app(app, listen_addr).await });
}

/// Build the service router. The UI is served from another origin during
/// development, hence the permissive CORS layer.
pub fn router(app: Arc<App>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .route("/reload-model", post(reload_model))
        .route("/create-text-sensor/:name_id", post(create_sensor))
        .route("/bulk-create-sensors", post(bulk_create_sensors))
        .route(
            "/text-sensor/:name_id",
            post(check_similarity).delete(delete_sensor),
        )
        .route("/text-sensors", get(list_sensors))
        .layer(CorsLayer::permissive())
        .layer(
            tower_http::trace::TraceLayer::new_for_http()
                .make_span_with(
                    tower_http::trace::DefaultMakeSpan::new().level(tracing::Level::INFO),
                )
                .on_response(
                    tower_http::trace::DefaultOnResponse::new().level(tracing::Level::INFO),
                ),
        )
        .with_state(app)
}

// Wraps `AppError` so axum can turn it into a response.
#[derive(Debug)]
struct HttpError(AppError);

// Maps the error taxonomy onto status codes; the envelope is always
// {"error": <kind>, "message": <human-readable>}.
impl IntoResponse for HttpError {
    fn into_response(self) -> axum::response::Response {
        let (status, kind) = match &self.0 {
            AppError::Validation(_) => (axum::http::StatusCode::BAD_REQUEST, "validation_error"),
            AppError::NotFound { .. } => (axum::http::StatusCode::NOT_FOUND, "not_found"),
            AppError::Corrupted { .. } => {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "corrupted_state")
            }
            AppError::ModelUnavailable { .. } => {
                (axum::http::StatusCode::SERVICE_UNAVAILABLE, "model_unavailable")
            }
            AppError::ParagraphEmbedding { .. }
            | AppError::QueryEmbedding { .. }
            | AppError::Similarity(_) => {
                (axum::http::StatusCode::INTERNAL_SERVER_ERROR, "embedding_failure")
            }
        };

        if status.is_server_error() {
            log::error!("{:?}", self.0);
        }

        (
            status,
            Json(json!({"error": kind, "message": self.0.to_string()})),
        )
            .into_response()
    }
}

impl<E> From<E> for HttpError
where
    E: Into<AppError>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

async fn root() -> Json<serde_json::Value> {
    Json(json!({"message": "Semantic text sensor service is running"}))
}

async fn health(State(app): State<Arc<App>>) -> Json<serde_json::Value> {
    let model = app.model_status();
    let status = if model.loaded { "healthy" } else { "degraded" };

    let mut body = json!({
        "status": status,
        "service": "sensord",
        "model": model.model,
        "model_status": if model.loaded { "loaded" } else { "failed" },
    });
    if let Some(error) = model.error {
        body["model_error"] = json!(error);
    }

    Json(body)
}

async fn reload_model(
    State(app): State<Arc<App>>,
) -> Result<Json<serde_json::Value>, HttpError> {
    tokio::task::block_in_place(move || {
        let status = app.reload_model()?;
        Ok(Json(json!({
            "message": "Model reloaded successfully",
            "model": status.model,
        })))
    })
}

#[derive(Debug, Clone, Deserialize)]
struct CreateSensorRequest {
    text: String,
}

#[derive(Debug, Clone, Serialize)]
struct CreateSensorResponse {
    message: String,
    paragraphs_count: usize,
}

async fn create_sensor(
    State(app): State<Arc<App>>,
    Path(name_id): Path<String>,
    Json(payload): Json<CreateSensorRequest>,
) -> Result<Json<CreateSensorResponse>, HttpError> {
    tokio::task::block_in_place(move || {
        let paragraphs_count = app.create_sensor(&name_id, &payload.text)?;
        Ok(Json(CreateSensorResponse {
            message: "Text sensor created".to_string(),
            paragraphs_count,
        }))
    })
}

#[derive(Debug, Clone, Deserialize)]
struct BulkCreateRequest {
    /// nameId -> text. A BTreeMap keeps processing order reproducible.
    sensors: BTreeMap<String, String>,
}

async fn bulk_create_sensors(
    State(app): State<Arc<App>>,
    Json(payload): Json<BulkCreateRequest>,
) -> Result<impl IntoResponse, HttpError> {
    tokio::task::block_in_place(move || {
        let outcome = app.bulk_create_sensors(&payload.sensors)?;
        Ok(Json(outcome))
    })
}

#[derive(Debug, Clone, Deserialize)]
struct SimilarityRequest {
    text: String,
}

async fn check_similarity(
    State(app): State<Arc<App>>,
    Path(name_id): Path<String>,
    Json(payload): Json<SimilarityRequest>,
) -> Result<Json<SimilarityMatch>, HttpError> {
    tokio::task::block_in_place(move || {
        let result = app.check_similarity(&name_id, &payload.text)?;
        Ok(Json(result))
    })
}

async fn list_sensors(State(app): State<Arc<App>>) -> Json<SensorList> {
    Json(app.list_sensors())
}

async fn delete_sensor(
    State(app): State<Arc<App>>,
    Path(name_id): Path<String>,
) -> Result<Json<serde_json::Value>, HttpError> {
    let removed = app.delete_sensor(&name_id)?;
    let message = if removed {
        format!("Text sensor '{}' deleted successfully", name_id.trim())
    } else {
        format!("Text sensor '{}' was not present", name_id.trim())
    };
    Ok(Json(json!({"message": message, "removed": removed})))
}
