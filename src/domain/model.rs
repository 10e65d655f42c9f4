use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

/// 上傳的檔案（multipart 的 `file` 欄位）
#[derive(Debug, Clone)]
pub struct Upload {
    pub filename: String,
    pub content: Vec<u8>,
}

/// ocrmypdf 的處理選項
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OcrOptions {
    pub language: String,
    pub deskew: bool,
    pub remove_background: bool,
    pub force_ocr: bool,
}

impl Default for OcrOptions {
    fn default() -> Self {
        Self {
            language: "eng".to_string(),
            deskew: true,
            remove_background: false,
            force_ocr: true,
        }
    }
}

impl OcrOptions {
    /// Options used when OCR only serves to build a text layer for extraction.
    pub fn text_layer_only() -> Self {
        Self {
            language: "eng".to_string(),
            deskew: false,
            remove_background: false,
            force_ocr: true,
        }
    }
}

/// OCR 後可搜尋的 PDF
#[derive(Debug, Clone)]
pub struct SearchablePdf {
    pub filename: String,
    pub content: Vec<u8>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextExtraction {
    pub text: String,
    pub pages: usize,
}

/// 單一請求使用的暫存檔名（相對於工作目錄）
#[derive(Debug, Clone)]
pub struct JobFiles {
    pub id: String,
    pub input: String,
    pub output: String,
}

impl JobFiles {
    pub fn new(id: String) -> Self {
        Self {
            input: format!("{}_input.pdf", id),
            output: format!("{}_output.pdf", id),
            id,
        }
    }
}

// ---- 部署 ----

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub repository: Option<String>,
    pub branch: String,
    pub directory: PathBuf,
    pub dockerfile: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSpec {
    pub image: String,
    pub context: PathBuf,
    pub dockerfile: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSpec {
    pub image: String,
    pub container_name: String,
    pub host_port: u16,
    pub container_port: u16,
    pub restart_policy: Option<String>,
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployStage {
    Checkout,
    Build,
    StopPrevious,
    Deploy,
    HealthCheck,
    Cleanup,
}

impl DeployStage {
    pub fn name(&self) -> &'static str {
        match self {
            DeployStage::Checkout => "checkout",
            DeployStage::Build => "build",
            DeployStage::StopPrevious => "stop-previous",
            DeployStage::Deploy => "deploy",
            DeployStage::HealthCheck => "health-check",
            DeployStage::Cleanup => "cleanup",
        }
    }

    /// 失敗時只記錄警告、不中斷流程的階段（`|| true`）
    pub fn is_best_effort(&self) -> bool {
        matches!(self, DeployStage::StopPrevious | DeployStage::Cleanup)
    }
}

impl std::fmt::Display for DeployStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    Succeeded,
    Skipped,
    /// Failed, but the failure was suppressed.
    Ignored,
    Failed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: DeployStage,
    pub status: StageStatus,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeployReport {
    pub stages: Vec<StageResult>,
}

impl DeployReport {
    pub fn failed_stage(&self) -> Option<DeployStage> {
        self.stages
            .iter()
            .find(|s| s.status == StageStatus::Failed)
            .map(|s| s.stage)
    }

    pub fn is_success(&self) -> bool {
        self.failed_stage().is_none()
    }

    pub fn status_of(&self, stage: DeployStage) -> Option<StageStatus> {
        self.stages.iter().find(|s| s.stage == stage).map(|s| s.status)
    }

    pub fn total_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }
}
