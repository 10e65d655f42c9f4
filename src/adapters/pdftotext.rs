use crate::adapters::process::run_tool;
use crate::domain::ports::TextExtractor;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

/// poppler 的 `pdftotext`，輸出到 stdout，頁與頁之間以換頁字元分隔
#[derive(Debug, Clone)]
pub struct PdftotextCli {
    program: String,
    timeout: Duration,
}

impl PdftotextCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    fn build_args(pdf: &Path) -> Vec<OsString> {
        vec![
            "-enc".into(),
            "UTF-8".into(),
            pdf.as_os_str().to_os_string(),
            "-".into(),
        ]
    }
}

/// Splits `pdftotext` output into pages. Every page is terminated by `\f`.
pub fn split_pages(output: &str) -> Vec<String> {
    if output.is_empty() {
        return Vec::new();
    }
    let mut pages: Vec<String> = output.split('\u{c}').map(str::to_string).collect();
    // 最後一頁之後的 \f 會留下空字串
    if pages.len() > 1 && pages.last().is_some_and(|p| p.trim().is_empty()) {
        pages.pop();
    }
    pages
}

#[async_trait]
impl TextExtractor for PdftotextCli {
    async fn extract_pages(&self, pdf: &Path) -> Result<Vec<String>> {
        let output = run_tool(&self.program, Self::build_args(pdf), self.timeout).await?;
        let pages = split_pages(&output.stdout);
        tracing::debug!("📄 Extracted text from {} pages", pages.len());
        Ok(pages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_pages() {
        let pages = split_pages("first page\n\u{c}second page\n\u{c}");
        assert_eq!(pages, vec!["first page\n", "second page\n"]);
    }

    #[test]
    fn test_blank_pages_are_counted() {
        let pages = split_pages("\u{c}\u{c}text\u{c}");
        assert_eq!(pages.len(), 3);
        assert_eq!(pages[2], "text");
    }

    #[test]
    fn test_empty_output() {
        assert!(split_pages("").is_empty());
        assert_eq!(split_pages("\u{c}").len(), 1);
    }

    #[test]
    fn test_output_without_trailing_form_feed() {
        assert_eq!(split_pages("only page"), vec!["only page"]);
    }

    #[test]
    fn test_args_write_to_stdout() {
        let args = PdftotextCli::build_args(Path::new("out.pdf"));
        assert_eq!(args.last().unwrap(), "-");
    }
}
