use crate::adapters::process::run_tool;
use crate::domain::model::SourceSpec;
use crate::domain::ports::SourceCheckout;
use crate::utils::error::{OcrError, Result};
use async_trait::async_trait;
use std::ffi::OsString;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct GitCli {
    program: String,
    timeout: Duration,
}

impl GitCli {
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    pub fn clone_args(repository: &str, branch: &str, directory: &Path) -> Vec<OsString> {
        vec![
            "clone".into(),
            "--branch".into(),
            branch.into(),
            "--depth".into(),
            "1".into(),
            repository.into(),
            directory.as_os_str().to_os_string(),
        ]
    }

    pub fn update_args(directory: &Path, branch: &str) -> Vec<Vec<OsString>> {
        let in_dir = |rest: &[&str]| -> Vec<OsString> {
            let mut args: Vec<OsString> = vec!["-C".into(), directory.as_os_str().to_os_string()];
            args.extend(rest.iter().map(OsString::from));
            args
        };
        vec![
            in_dir(&["fetch", "origin", branch]),
            in_dir(&["checkout", branch]),
            in_dir(&["pull", "--ff-only", "origin", branch]),
        ]
    }

    async fn head_revision(&self, directory: &Path) -> Result<String> {
        let args: Vec<OsString> = vec![
            "-C".into(),
            directory.as_os_str().to_os_string(),
            "rev-parse".into(),
            "HEAD".into(),
        ];
        let output = run_tool(&self.program, args, self.timeout).await?;
        Ok(output.stdout.trim().to_string())
    }
}

#[async_trait]
impl SourceCheckout for GitCli {
    async fn checkout(&self, source: &SourceSpec) -> Result<String> {
        match &source.repository {
            Some(repository) => {
                if source.directory.join(".git").exists() {
                    tracing::info!("📥 Updating {} ({})", source.directory.display(), source.branch);
                    for args in Self::update_args(&source.directory, &source.branch) {
                        run_tool(&self.program, args, self.timeout).await?;
                    }
                } else {
                    tracing::info!("📥 Cloning {} ({})", repository, source.branch);
                    run_tool(
                        &self.program,
                        Self::clone_args(repository, &source.branch, &source.directory),
                        self.timeout,
                    )
                    .await?;
                }
                self.head_revision(&source.directory).await
            }
            None => {
                if !source.dockerfile.exists() {
                    return Err(OcrError::StageError {
                        stage: "checkout".to_string(),
                        details: format!(
                            "no repository configured and {} does not exist",
                            source.dockerfile.display()
                        ),
                    });
                }
                tracing::info!("📂 Using local workspace {}", source.directory.display());
                // 本機目錄不一定是 git repo
                match self.head_revision(&source.directory).await {
                    Ok(revision) => Ok(revision),
                    Err(_) => Ok("local-workspace".to_string()),
                }
            }
        }
    }
}
