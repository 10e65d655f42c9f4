pub mod deploy_config;

use crate::utils::error::Result;
use crate::utils::validation::{self, Validate};
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub use deploy_config::DeployConfig;

#[derive(Debug, Clone, Serialize, Deserialize, Parser)]
#[command(name = "ocr-pdf-service")]
#[command(about = "HTTP API that turns scanned PDFs into searchable PDFs")]
pub struct ServerConfig {
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, env = "APP_PORT", default_value = "8001")]
    pub port: u16,

    /// Directory for per-request temporary files
    #[arg(long, env = "OCR_WORK_DIR", default_value = "/tmp/ocr_files")]
    pub work_dir: String,

    #[arg(long, env = "OCRMYPDF_BIN", default_value = "ocrmypdf")]
    pub ocrmypdf_bin: String,

    #[arg(long, env = "PDFTOTEXT_BIN", default_value = "pdftotext")]
    pub pdftotext_bin: String,

    /// Upper bound for a single ocrmypdf/pdftotext run
    #[arg(long, default_value = "600")]
    pub tool_timeout_secs: u64,

    #[arg(long, default_value = "100")]
    pub max_upload_mb: usize,

    /// OCR jobs allowed to run at the same time; extra requests wait
    #[arg(long, default_value = "2")]
    pub max_concurrent_jobs: usize,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, env = "JSON_LOGS", help = "Emit JSON logs")]
    pub json_logs: bool,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn tool_timeout(&self) -> Duration {
        Duration::from_secs(self.tool_timeout_secs)
    }

    pub fn max_upload_bytes(&self) -> usize {
        self.max_upload_mb.saturating_mul(1024 * 1024)
    }
}

impl Validate for ServerConfig {
    fn validate(&self) -> Result<()> {
        validation::validate_non_empty_string("host", &self.host)?;
        validation::validate_port("port", self.port)?;
        validation::validate_path("work_dir", &self.work_dir)?;
        validation::validate_non_empty_string("ocrmypdf_bin", &self.ocrmypdf_bin)?;
        validation::validate_non_empty_string("pdftotext_bin", &self.pdftotext_bin)?;
        validation::validate_range("tool_timeout_secs", self.tool_timeout_secs, 1, 24 * 60 * 60)?;
        validation::validate_positive_number("max_upload_mb", self.max_upload_mb, 1)?;
        validation::validate_positive_number("max_concurrent_jobs", self.max_concurrent_jobs, 1)?;
        Ok(())
    }
}
