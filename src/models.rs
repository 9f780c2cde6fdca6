use axum::body::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[derive(Debug, Deserialize)]
pub struct DeriveRequest {
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DerivedText {
    pub short_keywords: String,
    pub long_keywords: String,
    pub meta_title: String,
}

/// One uploaded file, alive for a single request.
#[derive(Debug)]
pub struct UploadedImage {
    pub bytes: Bytes,
    pub content_type: String,
}
