use crate::adapters::process::run_tool;
use crate::domain::model::OcrOptions;
use crate::domain::ports::OcrEngine;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// 透過 `ocrmypdf` 命令列加上文字層
#[derive(Debug, Clone)]
pub struct OcrmypdfCli {
    program: String,
    timeout: Duration,
}

impl OcrmypdfCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn build_args(&self, input: &Path, output: &Path, options: &OcrOptions) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["-l".into(), options.language.clone().into()];
        if options.deskew {
            args.push("--deskew".into());
        }
        if options.remove_background {
            args.push("--remove-background".into());
        }
        if options.force_ocr {
            args.push("--force-ocr".into());
        }
        args.push(input.as_os_str().to_os_string());
        args.push(output.as_os_str().to_os_string());
        args
    }
}

#[async_trait]
impl OcrEngine for OcrmypdfCli {
    async fn ocr(&self, input: &Path, output: &Path, options: &OcrOptions) -> Result<()> {
        tracing::info!(
            "🔍 Running OCR (language={}, deskew={}, remove_background={})",
            options.language,
            options.deskew,
            options.remove_background
        );
        run_tool(&self.program, self.build_args(input, output, options), self.timeout).await?;
        Ok(())
    }
}
