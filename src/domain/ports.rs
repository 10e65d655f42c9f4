use crate::domain::model::{
    BuildSpec, OcrOptions, RunSpec, SearchablePdf, SourceSpec, TextExtraction, Upload,
};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::path::{Path, PathBuf};

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
    fn remove_file(&self, path: &str) -> impl std::future::Future<Output = Result<()>> + Send;
    /// 外部工具需要的實體路徑
    fn local_path(&self, path: &str) -> PathBuf;
}

#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Writes a PDF with a text layer to `output`.
    async fn ocr(&self, input: &Path, output: &Path, options: &OcrOptions) -> Result<()>;
}

#[async_trait]
pub trait TextExtractor: Send + Sync {
    /// Text of each page, in page order.
    async fn extract_pages(&self, pdf: &Path) -> Result<Vec<String>>;
}

/// HTTP 層依賴的文件處理介面
#[async_trait]
pub trait DocumentProcessor: Send + Sync {
    async fn make_searchable(&self, upload: Upload, options: OcrOptions) -> Result<SearchablePdf>;
    async fn extract_text(&self, upload: Upload) -> Result<TextExtraction>;
}

#[async_trait]
pub trait ContainerRuntime: Send + Sync {
    async fn build_image(&self, spec: &BuildSpec) -> Result<()>;
    async fn stop_container(&self, name: &str) -> Result<()>;
    async fn remove_container(&self, name: &str) -> Result<()>;
    /// Returns the new container id.
    async fn run_container(&self, spec: &RunSpec) -> Result<String>;
    async fn container_logs(&self, name: &str) -> Result<String>;
    async fn prune_images(&self) -> Result<()>;
}

#[async_trait]
pub trait SourceCheckout: Send + Sync {
    /// Returns the checked out revision.
    async fn checkout(&self, source: &SourceSpec) -> Result<String>;
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<()>;
}
