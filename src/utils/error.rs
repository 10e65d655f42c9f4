use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Missing required configuration: {field}")]
    MissingConfigError { field: String },

    #[error("Invalid value '{value}' for {field}: {reason}")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Only PDF files are allowed")]
    UnsupportedFileType { filename: String },

    #[error("Missing upload field: {field}")]
    MissingUpload { field: String },

    #[error("Upload exceeds the size limit: {reason}")]
    UploadTooLarge { reason: String },

    #[error("Malformed multipart body: {reason}")]
    MalformedUpload { reason: String },

    #[error("Invalid request parameter {field}: {reason}")]
    InvalidParameter { field: String, reason: String },

    #[error("Required tool '{program}' is not installed or not on PATH")]
    ToolNotFound { program: String },

    #[error("{program} exited with code {code:?}: {stderr}")]
    ToolFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("{program} timed out after {seconds}s")]
    ToolTimeout { program: String, seconds: u64 },

    #[error("Stage '{stage}' failed: {details}")]
    StageError { stage: String, details: String },

    #[error("Health check failed for {url}: {reason}")]
    HealthCheckFailed { url: String, reason: String },

    #[error("Service unavailable: {reason}")]
    ServiceUnavailable { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Input,
    Tool,
    Network,
    Deployment,
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl OcrError {
    pub fn category(&self) -> ErrorCategory {
        match self {
            OcrError::ConfigError { .. }
            | OcrError::MissingConfigError { .. }
            | OcrError::InvalidConfigValueError { .. } => ErrorCategory::Configuration,
            OcrError::UnsupportedFileType { .. }
            | OcrError::MissingUpload { .. }
            | OcrError::UploadTooLarge { .. }
            | OcrError::MalformedUpload { .. }
            | OcrError::InvalidParameter { .. } => ErrorCategory::Input,
            OcrError::ToolNotFound { .. }
            | OcrError::ToolFailed { .. }
            | OcrError::ToolTimeout { .. } => ErrorCategory::Tool,
            OcrError::HttpError(_) => ErrorCategory::Network,
            OcrError::StageError { .. } | OcrError::HealthCheckFailed { .. } => {
                ErrorCategory::Deployment
            }
            OcrError::IoError(_) | OcrError::ServiceUnavailable { .. } => ErrorCategory::System,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            OcrError::UnsupportedFileType { .. }
            | OcrError::MissingUpload { .. }
            | OcrError::UploadTooLarge { .. }
            | OcrError::MalformedUpload { .. }
            | OcrError::InvalidParameter { .. } => ErrorSeverity::Low,
            // 可重試：網路或逾時
            OcrError::HttpError(_)
            | OcrError::ToolTimeout { .. }
            | OcrError::HealthCheckFailed { .. } => ErrorSeverity::Medium,
            OcrError::ToolFailed { .. }
            | OcrError::StageError { .. }
            | OcrError::ConfigError { .. }
            | OcrError::MissingConfigError { .. }
            | OcrError::InvalidConfigValueError { .. } => ErrorSeverity::High,
            OcrError::ToolNotFound { .. }
            | OcrError::IoError(_)
            | OcrError::ServiceUnavailable { .. } => ErrorSeverity::Critical,
        }
    }

    /// 給操作人員的修復建議
    pub fn recovery_suggestion(&self) -> String {
        match self {
            OcrError::ToolNotFound { program } => format!(
                "Install '{}' (ocrmypdf, tesseract-ocr, ghostscript, qpdf, poppler-utils, unpaper) or pass its path explicitly",
                program
            ),
            OcrError::ToolFailed { program, .. } => {
                format!("Inspect the {} output above; the input document may be corrupt or encrypted", program)
            }
            OcrError::ToolTimeout { .. } => {
                "Increase --tool-timeout-secs or split the document into smaller files".to_string()
            }
            OcrError::UnsupportedFileType { .. } => "Upload a file with a .pdf extension".to_string(),
            OcrError::MissingUpload { field } => {
                format!("Send the document as multipart/form-data in the '{}' field", field)
            }
            OcrError::UploadTooLarge { .. } => {
                "Split the document or raise --max-upload-mb on the server".to_string()
            }
            OcrError::MalformedUpload { .. } => {
                "Send a well-formed multipart/form-data request body".to_string()
            }
            OcrError::InvalidParameter { field, .. } => format!("Check the '{}' query parameter", field),
            OcrError::ConfigError { .. }
            | OcrError::MissingConfigError { .. }
            | OcrError::InvalidConfigValueError { .. } => {
                "Check the configuration file and environment variables".to_string()
            }
            OcrError::HealthCheckFailed { .. } => {
                "Check the container logs and make sure the service listens on the configured port".to_string()
            }
            OcrError::StageError { stage, .. } => {
                format!("Fix the '{}' stage and re-run the deployment", stage)
            }
            OcrError::HttpError(_) => "Check network connectivity and retry".to_string(),
            OcrError::IoError(_) => "Check file permissions and available disk space".to_string(),
            OcrError::ServiceUnavailable { .. } => "Restart the service".to_string(),
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self.category() {
            ErrorCategory::Configuration => format!("Configuration problem: {}", self),
            ErrorCategory::Input => format!("Invalid request: {}", self),
            ErrorCategory::Tool => format!("OCR toolchain error: {}", self),
            ErrorCategory::Network => format!("Network error: {}", self),
            ErrorCategory::Deployment => format!("Deployment failed: {}", self),
            ErrorCategory::System => format!("System error: {}", self),
        }
    }

    /// 客戶端輸入錯誤（對應 4xx）
    pub fn is_client_error(&self) -> bool {
        self.category() == ErrorCategory::Input
    }

    /// 命令列工具依嚴重程度決定的結束碼
    pub fn exit_code(&self) -> i32 {
        match self.severity() {
            ErrorSeverity::Low => 0,
            ErrorSeverity::Medium => 2,
            ErrorSeverity::High => 1,
            ErrorSeverity::Critical => 3,
        }
    }
}

pub type Result<T> = std::result::Result<T, OcrError>;
