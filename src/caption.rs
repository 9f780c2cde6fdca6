use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;

use crate::config::Config;

// ── Constants ────────────────────────────────────────────────────────────────

const USER_AGENT: &str = "image-describer-api/1.0";
const ERROR_BODY_MAX_CHARS: usize = 200;
const CAPTION_POINTER: &str = "/candidates/0/content/parts/0/text";

pub const PROMPT: &str = "Describe this image in detail.";
pub const API_KEY_HEADER: &str = "x-goog-api-key";

// ── Error type ───────────────────────────────────────────────────────────────

#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("GEMINI_API_KEY is not set")]
    MissingApiKey,
    #[error("image is empty")]
    EmptyImage,
    #[error("{0}")]
    Request(String),
    #[error("Upstream returned {status}: {body}")]
    Upstream { status: StatusCode, body: String },
    #[error("Upstream returned invalid JSON: {0}")]
    InvalidResponse(String),
}

// ── Wire types ───────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part<'a> {
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData<'a>,
    },
    Text {
        text: &'a str,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

impl<'a> GenerateContentRequest<'a> {
    fn new(mime_type: &'a str, data: String) -> Self {
        GenerateContentRequest {
            contents: vec![Content {
                parts: vec![
                    Part::InlineData {
                        inline_data: InlineData { mime_type, data },
                    },
                    Part::Text { text: PROMPT },
                ],
            }],
        }
    }
}

// ── Client ───────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct CaptionClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl CaptionClient {
    pub fn new(config: &Config) -> Result<Self, CaptionError> {
        let http = reqwest::ClientBuilder::new()
            .connect_timeout(std::time::Duration::from_secs(5))
            .timeout(config.upstream_timeout)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| CaptionError::Request(e.to_string()))?;

        Ok(CaptionClient {
            http,
            endpoint: config.generate_content_url(),
            api_key: config.api_key.clone(),
        })
    }

    /// Sends one image to the vision API and returns the first candidate's
    /// text, or an empty string when the response carries none.
    pub async fn describe(&self, image: &[u8], mime_type: &str) -> Result<String, CaptionError> {
        let api_key = self.api_key.as_deref().ok_or(CaptionError::MissingApiKey)?;
        if image.is_empty() {
            return Err(CaptionError::EmptyImage);
        }

        let request = GenerateContentRequest::new(mime_type, STANDARD.encode(image));

        tracing::debug!(
            endpoint = %self.endpoint,
            mime_type,
            image_bytes = image.len(),
            "sending caption request"
        );

        let response = self
            .http
            .post(&self.endpoint)
            .header(API_KEY_HEADER, api_key)
            .json(&request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let body = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            return Err(CaptionError::Upstream {
                status,
                body: body.chars().take(ERROR_BODY_MAX_CHARS).collect(),
            });
        }

        let caption = extract_caption(&body)?;
        tracing::info!(caption_chars = caption.chars().count(), "caption received");
        Ok(caption)
    }
}

fn request_error(e: reqwest::Error) -> CaptionError {
    if e.is_timeout() {
        CaptionError::Request(format!("TimeoutError: {}", e))
    } else if e.is_connect() {
        CaptionError::Request(format!("ConnectError: {}", e))
    } else {
        CaptionError::Request(format!("RequestError: {}", e))
    }
}

/// `candidates[0].content.parts[0].text`, defaulting to "" at any missing level.
/// Nothing outside that path is inspected.
fn extract_caption(body: &str) -> Result<String, CaptionError> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| CaptionError::InvalidResponse(e.to_string()))?;

    Ok(value
        .pointer(CAPTION_POINTER)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
