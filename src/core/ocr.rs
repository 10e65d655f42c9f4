use crate::domain::model::{JobFiles, OcrOptions, SearchablePdf, TextExtraction, Upload};
use crate::domain::ports::{DocumentProcessor, OcrEngine, Storage, TextExtractor};
use crate::utils::error::{OcrError, Result};
use crate::utils::validation::{validate_language, validate_pdf_filename};
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;

/// 請求被取消（future 被 drop）時仍刪除暫存檔
struct TempFilesGuard {
    paths: Vec<PathBuf>,
    armed: bool,
}

impl TempFilesGuard {
    fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for TempFilesGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed abandoned temporary file {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    "⚠️ Failed to remove temporary file {}: {}",
                    path.display(),
                    e
                ),
            }
        }
    }
}

/// 上傳 → 暫存 → ocrmypdf → 讀回結果 → 清除暫存
pub struct OcrService<E: OcrEngine, X: TextExtractor, S: Storage> {
    engine: E,
    extractor: X,
    storage: S,
    permits: Arc<Semaphore>,
}

impl<E: OcrEngine, X: TextExtractor, S: Storage> OcrService<E, X, S> {
    pub fn new(engine: E, extractor: X, storage: S, max_concurrent_jobs: usize) -> Self {
        Self {
            engine,
            extractor,
            storage,
            permits: Arc::new(Semaphore::new(max_concurrent_jobs.max(1))),
        }
    }

    fn allocate_job(&self) -> (JobFiles, TempFilesGuard) {
        let job = JobFiles::new(uuid::Uuid::new_v4().to_string());
        let guard = TempFilesGuard::new(vec![
            self.storage.local_path(&job.input),
            self.storage.local_path(&job.output),
        ]);
        (job, guard)
    }

    /// 不論成功與否都要刪除兩個暫存檔；失敗的留給 guard 再試一次
    async fn cleanup(&self, job: &JobFiles, mut guard: TempFilesGuard) {
        let mut removed_all = true;
        for name in [&job.input, &job.output] {
            if let Err(e) = self.storage.remove_file(name).await {
                tracing::warn!("⚠️ Failed to remove temporary file {}: {}", name, e);
                removed_all = false;
            }
        }
        if removed_all {
            guard.disarm();
        }
    }

    async fn run_ocr(&self, job: &JobFiles, content: &[u8], options: &OcrOptions) -> Result<()> {
        self.storage.write_file(&job.input, content).await?;

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| OcrError::ServiceUnavailable {
                reason: format!("OCR job queue closed: {}", e),
            })?;

        self.engine
            .ocr(
                &self.storage.local_path(&job.input),
                &self.storage.local_path(&job.output),
                options,
            )
            .await
    }

    async fn searchable_inner(&self, job: &JobFiles, upload: &Upload, options: &OcrOptions) -> Result<Vec<u8>> {
        self.run_ocr(job, &upload.content, options).await?;
        self.storage.read_file(&job.output).await
    }

    async fn extract_inner(&self, job: &JobFiles, upload: &Upload) -> Result<TextExtraction> {
        self.run_ocr(job, &upload.content, &OcrOptions::text_layer_only())
            .await?;
        let pages = self
            .extractor
            .extract_pages(&self.storage.local_path(&job.output))
            .await?;

        Ok(TextExtraction {
            pages: pages.len(),
            text: pages.concat(),
        })
    }
}

#[async_trait]
impl<E, X, S> DocumentProcessor for OcrService<E, X, S>
where
    E: OcrEngine,
    X: TextExtractor,
    S: Storage,
{
    async fn make_searchable(&self, upload: Upload, options: OcrOptions) -> Result<SearchablePdf> {
        validate_pdf_filename(&upload.filename)?;
        validate_language(&options.language)?;

        let (job, guard) = self.allocate_job();
        let started = Instant::now();
        tracing::info!(
            "📥 OCR job {} for '{}' ({} bytes)",
            job.id,
            upload.filename,
            upload.content.len()
        );

        let result = self.searchable_inner(&job, &upload, &options).await;
        self.cleanup(&job, guard).await;

        match result {
            Ok(content) => {
                tracing::info!(
                    "✅ OCR job {} finished in {:?} ({} bytes)",
                    job.id,
                    started.elapsed(),
                    content.len()
                );
                Ok(SearchablePdf {
                    filename: format!("searchable_{}", upload.filename),
                    content,
                })
            }
            Err(e) => {
                tracing::error!("❌ OCR job {} failed: {}", job.id, e);
                Err(e)
            }
        }
    }

    async fn extract_text(&self, upload: Upload) -> Result<TextExtraction> {
        validate_pdf_filename(&upload.filename)?;

        let (job, guard) = self.allocate_job();
        let started = Instant::now();
        tracing::info!("📥 Text extraction job {} for '{}'", job.id, upload.filename);

        let result = self.extract_inner(&job, &upload).await;
        self.cleanup(&job, guard).await;

        match &result {
            Ok(extraction) => tracing::info!(
                "✅ Text extraction job {} finished in {:?} ({} pages)",
                job.id,
                started.elapsed(),
                extraction.pages
            ),
            Err(e) => tracing::error!("❌ Text extraction job {} failed: {}", job.id, e),
        }
        result
    }
}
