use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

mod caption;
mod config;
mod models;
mod seo;
#[cfg(test)]
mod testutil;

use caption::{CaptionClient, CaptionError};
use config::Config;
use models::{DeriveRequest, DerivedText, ErrorResponse, GenerateResponse, UploadedImage};

const IMAGE_FIELD: &str = "image";
const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

#[derive(Clone)]
struct AppState {
    captions: CaptionClient,
}

#[tokio::main]
async fn main() {
    let dotenv = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    match dotenv {
        Ok(path) => tracing::debug!("loaded {}", path.display()),
        Err(e) => tracing::debug!("no .env file loaded: {}", e),
    }

    let config = match Config::from_env() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("invalid configuration: {}", e);
            std::process::exit(1);
        }
    };
    if config.api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; every generate request will fail");
    }

    let captions = match CaptionClient::new(&config) {
        Ok(client) => client,
        Err(e) => {
            tracing::error!("failed to build HTTP client: {}", e);
            std::process::exit(1);
        }
    };

    let app = app(AppState { captions }, config.max_upload_bytes);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await.unwrap();
    tracing::info!("listening on {}", listener.local_addr().unwrap());
    axum::serve(listener, app).await.unwrap();
}

fn app(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/generate", post(generate_endpoint))
        .route("/derive", post(derive_endpoint))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .with_state(state)
}

async fn index() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

async fn health() -> impl IntoResponse {
    Json(json!({"status": "ok"}))
}

async fn derive_endpoint(Json(req): Json<DeriveRequest>) -> Json<DerivedText> {
    Json(seo::derive_all(&req.text))
}

// ── Upload handler ───────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
enum GenerateError {
    #[error("{0}")]
    Parse(String),
    #[error("{0}")]
    MissingInput(String),
    #[error(transparent)]
    Upstream(#[from] CaptionError),
}

impl GenerateError {
    fn kind(&self) -> &'static str {
        match self {
            GenerateError::Parse(_) => "parse",
            GenerateError::MissingInput(_) => "missing_input",
            GenerateError::Upstream(_) => "upstream",
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            GenerateError::MissingInput(_) => StatusCode::BAD_REQUEST,
            GenerateError::Parse(_) | GenerateError::Upstream(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GenerateError {
    fn into_response(self) -> Response {
        let status = self.status();
        tracing::warn!(kind = self.kind(), status = status.as_u16(), "generate failed: {}", self);
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

async fn generate_endpoint(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<GenerateResponse>, GenerateError> {
    let multipart = multipart.map_err(|e| GenerateError::Parse(e.body_text()))?;
    let image = read_image(multipart).await?;

    let text = state
        .captions
        .describe(&image.bytes, &image.content_type)
        .await?;

    tracing::info!(
        status = 200,
        caption_chars = text.chars().count(),
        "generate completed"
    );
    Ok(Json(GenerateResponse { text }))
}

/// First file part under the `image` field, read fully into memory.
async fn read_image(mut multipart: Multipart) -> Result<UploadedImage, GenerateError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GenerateError::Parse(e.body_text()))?
    {
        if field.name() != Some(IMAGE_FIELD) || field.file_name().is_none() {
            continue;
        }

        let content_type = field
            .content_type()
            .unwrap_or(DEFAULT_CONTENT_TYPE)
            .to_string();
        let bytes = field
            .bytes()
            .await
            .map_err(|e| GenerateError::Parse(e.body_text()))?;

        if bytes.is_empty() {
            return Err(GenerateError::MissingInput(format!(
                "\"{}\" file is empty",
                IMAGE_FIELD
            )));
        }
        return Ok(UploadedImage {
            bytes,
            content_type,
        });
    }

    Err(GenerateError::MissingInput(format!(
        "missing \"{}\" file field",
        IMAGE_FIELD
    )))
}
