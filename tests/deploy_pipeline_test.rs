use anyhow::Result;
use async_trait::async_trait;
use httpmock::prelude::*;
use ocr_pdf_service::adapters::{GitCli, HttpHealthProbe};
use ocr_pdf_service::core::deploy::get_execution_summary;
use ocr_pdf_service::domain::model::{BuildSpec, DeployStage, RunSpec, StageStatus};
use ocr_pdf_service::domain::ports::ContainerRuntime;
use ocr_pdf_service::{DeployConfig, DeployPipeline, OcrError};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

/// 不呼叫 docker，只記錄命令
#[derive(Clone, Default)]
struct RecordingRuntime {
    calls: Arc<Mutex<Vec<String>>>,
    no_previous_container: bool,
}

impl RecordingRuntime {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn missing_container() -> OcrError {
        OcrError::ToolFailed {
            program: "docker".to_string(),
            code: Some(1),
            stderr: "Error response from daemon: No such container: ocr-pdf-service".to_string(),
        }
    }
}

#[async_trait]
impl ContainerRuntime for RecordingRuntime {
    async fn build_image(&self, spec: &BuildSpec) -> ocr_pdf_service::Result<()> {
        self.push(format!("build {} {}", spec.image, spec.dockerfile.display()));
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> ocr_pdf_service::Result<()> {
        self.push(format!("stop {}", name));
        if self.no_previous_container {
            return Err(Self::missing_container());
        }
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> ocr_pdf_service::Result<()> {
        self.push(format!("rm {}", name));
        if self.no_previous_container {
            return Err(Self::missing_container());
        }
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> ocr_pdf_service::Result<String> {
        self.push(format!(
            "run {} {}:{}",
            spec.container_name, spec.host_port, spec.container_port
        ));
        Ok("f1e2d3c4b5a69788".to_string())
    }

    async fn container_logs(&self, name: &str) -> ocr_pdf_service::Result<String> {
        self.push(format!("logs {}", name));
        Ok("Traceback: tesseract not found".to_string())
    }

    async fn prune_images(&self) -> ocr_pdf_service::Result<()> {
        self.push("prune".to_string());
        Ok(())
    }
}

/// 含 Dockerfile 的本地工作目錄，health check 指向 mock server
fn workspace_config(workspace: &TempDir, port: u16) -> Result<DeployConfig> {
    std::fs::write(workspace.path().join("Dockerfile"), "FROM scratch\n")?;
    let content = format!(
        r#"
[deploy]
image = "ocr-pdf-service:it"
container_name = "ocr-pdf-service"
app_port = {}
build_context = "{}"

[health_check]
host = "127.0.0.1"
initial_delay_secs = 0
timeout_secs = 2
"#,
        port,
        workspace.path().display().to_string().replace('\\', "/")
    );
    Ok(DeployConfig::from_toml_str(&content)?)
}

#[tokio::test]
async fn test_first_deploy_with_healthy_service() -> Result<()> {
    let server = MockServer::start_async().await;
    let health = server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(200).json_body(serde_json::json!({"status": "ok"}));
        })
        .await;

    let workspace = TempDir::new()?;
    let config = workspace_config(&workspace, server.port())?;
    let runtime = RecordingRuntime {
        no_previous_container: true,
        ..Default::default()
    };

    let pipeline = DeployPipeline::new(
        runtime.clone(),
        GitCli::new("git", Duration::from_secs(30)),
        HttpHealthProbe::new(Duration::from_secs(2))?,
        config,
    );
    let outcome = pipeline.run().await;

    assert!(outcome.result.is_ok(), "{:?}", outcome.result);
    health.assert_async().await;

    let report = &outcome.report;
    assert!(report.is_success());
    assert_eq!(report.status_of(DeployStage::Checkout), Some(StageStatus::Succeeded));
    // 第一次部署時沒有舊容器，stop/rm 失敗被忽略
    assert_eq!(report.status_of(DeployStage::StopPrevious), Some(StageStatus::Ignored));
    assert_eq!(report.status_of(DeployStage::HealthCheck), Some(StageStatus::Succeeded));
    assert_eq!(report.status_of(DeployStage::Cleanup), Some(StageStatus::Succeeded));

    let calls = runtime.calls();
    assert_eq!(calls.first().map(|c| c.starts_with("build ocr-pdf-service:it")), Some(true));
    assert!(calls.contains(&format!("run ocr-pdf-service {}:8001", server.port())));
    assert!(!calls.iter().any(|c| c.starts_with("logs")));
    assert_eq!(calls.last().map(String::as_str), Some("prune"));

    let summary = get_execution_summary(report);
    assert_eq!(summary["success"], serde_json::json!(true));
    assert_eq!(summary["total_stages"], serde_json::json!(6));

    Ok(())
}

#[tokio::test]
async fn test_unhealthy_service_dumps_logs_and_still_cleans_up() -> Result<()> {
    let server = MockServer::start_async().await;
    let health = server
        .mock_async(|when, then| {
            when.method(GET).path("/health");
            then.status(500).body("Internal Server Error");
        })
        .await;

    let workspace = TempDir::new()?;
    let config = workspace_config(&workspace, server.port())?;
    let runtime = RecordingRuntime::default();

    let pipeline = DeployPipeline::new(
        runtime.clone(),
        GitCli::new("git", Duration::from_secs(30)),
        HttpHealthProbe::new(Duration::from_secs(2))?,
        config,
    )
    .with_skip_checkout(true);
    let outcome = pipeline.run().await;

    // 單次探測，不重試
    health.assert_hits_async(1).await;

    let err = outcome.result.expect_err("health check should fail");
    assert!(matches!(err, OcrError::StageError { ref stage, .. } if stage == "health-check"));
    assert!(err.to_string().contains("Traceback: tesseract not found"));

    let report = &outcome.report;
    assert_eq!(report.failed_stage(), Some(DeployStage::HealthCheck));
    assert_eq!(report.status_of(DeployStage::Checkout), Some(StageStatus::Skipped));
    assert_eq!(report.status_of(DeployStage::Cleanup), Some(StageStatus::Succeeded));

    let calls = runtime.calls();
    assert!(calls.contains(&"logs ocr-pdf-service".to_string()));
    assert_eq!(calls.last().map(String::as_str), Some("prune"));

    Ok(())
}

#[tokio::test]
async fn test_missing_dockerfile_aborts_before_build() -> Result<()> {
    let workspace = TempDir::new()?;
    let mut config = workspace_config(&workspace, 8001)?;
    config.deploy.dockerfile = Some(
        workspace
            .path()
            .join("Missing.Dockerfile")
            .display()
            .to_string(),
    );
    let runtime = RecordingRuntime::default();

    let pipeline = DeployPipeline::new(
        runtime.clone(),
        GitCli::new("git", Duration::from_secs(30)),
        HttpHealthProbe::new(Duration::from_secs(1))?,
        config,
    );
    let outcome = pipeline.run().await;

    assert!(outcome.result.is_err());
    assert_eq!(outcome.report.failed_stage(), Some(DeployStage::Checkout));
    assert_eq!(runtime.calls(), vec!["prune".to_string()]);

    Ok(())
}
