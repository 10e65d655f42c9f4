use crate::utils::error::{OcrError, Result};
use regex::Regex;
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: "URL cannot be empty".to_string(),
        });
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(OcrError::InvalidConfigValueError {
                field: field_name.to_string(),
                value: url_str.to_string(),
                reason: format!("Unsupported URL scheme: {}", scheme),
            }),
        },
        Err(e) => Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: url_str.to_string(),
            reason: format!("Invalid URL format: {}", e),
        }),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be at least {}", min_value),
        });
    }
    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: format!("Value must be between {} and {}", min, max),
        });
    }
    Ok(())
}

pub fn validate_port(field_name: &str, port: u16) -> Result<()> {
    validate_range(field_name, port, 1, u16::MAX)
}

/// 上傳檔名必須以 `.pdf` 結尾（大小寫敏感）
pub fn validate_pdf_filename(filename: &str) -> Result<()> {
    if filename.ends_with(".pdf") {
        Ok(())
    } else {
        Err(OcrError::UnsupportedFileType {
            filename: filename.to_string(),
        })
    }
}

/// Tesseract 語言代碼，例如 `eng` 或 `eng+deu+chi_tra`
pub fn validate_language(language: &str) -> Result<()> {
    let re = Regex::new(r"^[A-Za-z0-9_]+(\+[A-Za-z0-9_]+)*$").map_err(|e| OcrError::ConfigError {
        message: format!("language pattern: {}", e),
    })?;

    if re.is_match(language) {
        Ok(())
    } else {
        Err(OcrError::InvalidParameter {
            field: "language".to_string(),
            reason: format!(
                "'{}' is not a Tesseract language list (expected e.g. eng or eng+deu)",
                language
            ),
        })
    }
}

/// Docker 容器名稱規則：`[a-zA-Z0-9][a-zA-Z0-9_.-]+`
pub fn validate_container_name(field_name: &str, name: &str) -> Result<()> {
    let re = Regex::new(r"^[a-zA-Z0-9][a-zA-Z0-9_.-]+$").map_err(|e| OcrError::ConfigError {
        message: format!("container name pattern: {}", e),
    })?;

    if re.is_match(name) {
        Ok(())
    } else {
        Err(OcrError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: name.to_string(),
            reason: "Must match [a-zA-Z0-9][a-zA-Z0-9_.-]+".to_string(),
        })
    }
}
