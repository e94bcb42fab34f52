use crate::config::ApiConfig;
use crate::error::ImageError;
use crate::pipeline::{ImageService, ImageSubmission, LookupKey};
use anyhow::{Context, Result};
use axum::{
    body::{Body, Bytes},
    extract::{FromRequest, Request, State},
    http::{header, HeaderName, Method, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info};

const UPLOAD_RESULT: &str = "Registro de imagen creado correctamente :D";

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub images: Arc<ImageService>,
}

/// Response envelope used by the upload and lookup endpoints
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub status: u16,
    pub message: &'static str,
    pub data: T,
}

impl<T> Envelope<T> {
    fn success(status: StatusCode, data: T) -> Self {
        Self {
            status: status.as_u16(),
            message: "success",
            data,
        }
    }
}

/// Upload response payload
#[derive(Debug, Serialize)]
pub struct UploadData {
    pub resultado: &'static str,
    pub id: u64,
    #[serde(rename = "imageURL")]
    pub image_url: String,
}

/// One lookup result
#[derive(Debug, Serialize)]
pub struct ImageEntry {
    pub imagen: String,
}

#[derive(Debug, Serialize)]
struct ErrorData {
    data: String,
}

/// Any request failure; always rendered as a 400 envelope carrying the cause
#[derive(Debug)]
pub struct ApiError(String);

impl From<ImageError> for ApiError {
    fn from(e: ImageError) -> Self {
        Self(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::BAD_REQUEST;
        let body = Envelope {
            status: status.as_u16(),
            message: "error",
            data: ErrorData { data: self.0 },
        };
        (status, Json(body)).into_response()
    }
}

/// JSON body extractor that reports malformed bodies through [`ApiError`].
/// The content type is not checked.
pub struct AppJson<T>(pub T);

#[axum::async_trait]
impl<S, T> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let body = Bytes::from_request(req, state)
            .await
            .map_err(|e| ApiError(e.body_text()))?;

        serde_json::from_slice(&body)
            .map(AppJson)
            .map_err(|e| ApiError(e.to_string()))
    }
}

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::POST,
            Method::HEAD,
            Method::PATCH,
            Method::OPTIONS,
            Method::GET,
            Method::PUT,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::CONTENT_LENGTH,
            header::ACCEPT_ENCODING,
            HeaderName::from_static("x-csrf-token"),
            header::AUTHORIZATION,
            header::ACCEPT,
            header::ORIGIN,
            header::CACHE_CONTROL,
            HeaderName::from_static("x-requested-with"),
        ]);

    Router::new()
        .route("/", get(greeting))
        .route("/upload", post(upload_image))
        .route("/getImage", post(get_images))
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(middleware::from_fn(options_no_content))
        .with_state(state)
}

/// Every OPTIONS request ends as an empty 204, keeping the CORS headers
async fn options_no_content(req: Request, next: Next) -> Response {
    if req.method() != Method::OPTIONS {
        return next.run(req).await;
    }

    let (mut parts, _) = next.run(req).await.into_parts();
    parts.status = StatusCode::NO_CONTENT;
    parts.headers.remove(header::CONTENT_LENGTH);
    parts.headers.remove(header::CONTENT_TYPE);
    Response::from_parts(parts, Body::empty())
}

async fn greeting() -> impl IntoResponse {
    Json(serde_json::json!({ "USAC": "Software Avanzado - Upload Images" }))
}

async fn upload_image(
    State(state): State<AppState>,
    AppJson(submission): AppJson<ImageSubmission>,
) -> Result<(StatusCode, Json<Envelope<UploadData>>), ApiError> {
    let outcome = state.images.upload(&submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(Envelope::success(
            StatusCode::CREATED,
            UploadData {
                resultado: UPLOAD_RESULT,
                id: outcome.record_id,
                image_url: outcome.image_url,
            },
        )),
    ))
}

async fn get_images(
    State(state): State<AppState>,
    AppJson(key): AppJson<LookupKey>,
) -> Result<Json<Envelope<Vec<ImageEntry>>>, ApiError> {
    let urls = state.images.lookup(key).await?;

    Ok(Json(Envelope::success(
        StatusCode::OK,
        urls.into_iter().map(|imagen| ImageEntry { imagen }).collect(),
    )))
}

/// Health check endpoint
async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "image-service"
    }))
}

/// Readiness check endpoint
async fn readiness_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.images.ready().await {
        Ok(()) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "status": "ready",
                "database": "connected"
            })),
        ),
        Err(e) => {
            error!(error = %e, "Readiness check failed");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({
                    "status": "not_ready",
                    "database": "disconnected",
                    "error": format!("{e:#}")
                })),
            )
        }
    }
}

/// Serve the API until `shutdown` resolves, then let in-flight requests finish.
/// Bind failures are returned to the caller.
pub async fn start_api_server<F>(state: AppState, config: &ApiConfig, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let router = create_router(state);
    let addr = format!("{}:{}", config.host, config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!(address = %addr, "Image API listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await
        .context("API server error")?;

    info!("Image API drained");

    Ok(())
}
