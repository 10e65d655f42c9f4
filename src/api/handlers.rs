//! API request handlers

use super::{responses::*, ApiState};
use crate::domain::model::{OcrOptions, Upload};
use crate::utils::error::OcrError;
use axum::{
    extract::{
        multipart::{MultipartError, MultipartRejection},
        rejection::QueryRejection,
        Multipart, Query, State,
    },
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Deserializer};

const UPLOAD_FIELD: &str = "file";

/// Query parameters for `POST /ocr`
#[derive(Debug, Deserialize)]
pub struct OcrQuery {
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true", deserialize_with = "flexible_bool")]
    pub deskew: bool,
    #[serde(default, deserialize_with = "flexible_bool")]
    pub remove_background: bool,
}

fn default_language() -> String {
    "eng".to_string()
}

fn default_true() -> bool {
    true
}

/// Accepts true/false, 1/0, yes/no, on/off.
fn flexible_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    match raw.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(serde::de::Error::custom(format!(
            "'{}' is not a valid boolean",
            other
        ))),
    }
}

impl From<OcrQuery> for OcrOptions {
    fn from(query: OcrQuery) -> Self {
        OcrOptions {
            language: query.language,
            deskew: query.deskew,
            remove_background: query.remove_background,
            force_ocr: true,
        }
    }
}

pub async fn root() -> Json<RootResponse> {
    Json(RootResponse {
        message: "OCRmyPDF API is running".to_string(),
        status: "healthy".to_string(),
    })
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

/// Process a scanned PDF and return a searchable PDF
pub async fn ocr(
    State(state): State<ApiState>,
    query: Result<Query<OcrQuery>, QueryRejection>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Response, ApiError> {
    const OPERATION: &str = "OCR processing failed";

    let Query(query) = query
        .map_err(|e| ApiError::new(StatusCode::UNPROCESSABLE_ENTITY, e.body_text()))?;
    let upload = read_upload(multipart)
        .await
        .map_err(|e| ApiError::from_processing(OPERATION, e))?;

    let pdf = state
        .processor
        .make_searchable(upload, query.into())
        .await
        .map_err(|e| ApiError::from_processing(OPERATION, e))?;

    let disposition = HeaderValue::from_str(&content_disposition(&pdf.filename)).map_err(|e| {
        ApiError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("{}: invalid filename header: {}", OPERATION, e),
        )
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("application/pdf")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        pdf.content,
    )
        .into_response())
}

/// Extract text from a scanned PDF
pub async fn extract_text(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ExtractTextResponse>, ApiError> {
    const OPERATION: &str = "Text extraction failed";

    let upload = read_upload(multipart)
        .await
        .map_err(|e| ApiError::from_processing(OPERATION, e))?;

    let extraction = state
        .processor
        .extract_text(upload)
        .await
        .map_err(|e| ApiError::from_processing(OPERATION, e))?;

    Ok(Json(ExtractTextResponse {
        text: extraction.text,
        pages: extraction.pages,
    }))
}

/// 讀取 multipart 中的 `file` 欄位，其他欄位忽略
async fn read_upload(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Upload, OcrError> {
    let missing = || OcrError::MissingUpload {
        field: UPLOAD_FIELD.to_string(),
    };
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!("Multipart rejected: {}", e.body_text());
        missing()
    })?;

    loop {
        let field = multipart.next_field().await.map_err(upload_error)?;

        let Some(field) = field else {
            return Err(missing());
        };

        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let content = field.bytes().await.map_err(upload_error)?;

        return Ok(Upload {
            filename,
            content: content.to_vec(),
        });
    }
}

/// 超過 body 上限回 413，其餘解析錯誤回 422
fn upload_error(err: MultipartError) -> OcrError {
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        OcrError::UploadTooLarge {
            reason: err.body_text(),
        }
    } else {
        OcrError::MalformedUpload {
            reason: err.body_text(),
        }
    }
}

/// `attachment; filename="..."`，非 ASCII 檔名改用 RFC 5987 `filename*`
pub fn content_disposition(filename: &str) -> String {
    let cleaned: String = filename
        .chars()
        .filter(|c| !c.is_control())
        .map(|c| if c == '"' || c == '\\' { '_' } else { c })
        .collect();

    if cleaned.is_ascii() {
        format!("attachment; filename=\"{}\"", cleaned)
    } else {
        let mut encoded = String::new();
        for byte in cleaned.bytes() {
            if byte.is_ascii_alphanumeric() || b"!#$&+-.^_`|~".contains(&byte) {
                encoded.push(byte as char);
            } else {
                encoded.push_str(&format!("%{:02X}", byte));
            }
        }
        format!("attachment; filename*=utf-8''{}", encoded)
    }
}
