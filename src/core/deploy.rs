use crate::adapters::docker::DockerCli;
use crate::adapters::git::GitCli;
use crate::adapters::process::render_args;
use crate::config::DeployConfig;
use crate::domain::model::{DeployReport, DeployStage, StageResult, StageStatus};
use crate::domain::ports::{ContainerRuntime, HealthProbe, SourceCheckout};
use crate::utils::error::{OcrError, Result};
use chrono::Utc;
use std::collections::HashMap;
use std::future::Future;
use std::time::Instant;

/// 部署結果：報告一定存在，失敗時另附錯誤
#[derive(Debug)]
pub struct DeployOutcome {
    pub report: DeployReport,
    pub result: Result<()>,
}

/// checkout → build → stop previous → deploy → health check → cleanup，依序執行
pub struct DeployPipeline<R: ContainerRuntime, G: SourceCheckout, H: HealthProbe> {
    runtime: R,
    source: G,
    probe: H,
    config: DeployConfig,
    skip_checkout: bool,
}

impl<R: ContainerRuntime, G: SourceCheckout, H: HealthProbe> DeployPipeline<R, G, H> {
    pub fn new(runtime: R, source: G, probe: H, config: DeployConfig) -> Self {
        Self {
            runtime,
            source,
            probe,
            config,
            skip_checkout: false,
        }
    }

    pub fn with_skip_checkout(mut self, skip: bool) -> Self {
        self.skip_checkout = skip;
        self
    }

    pub async fn run(&self) -> DeployOutcome {
        let mut report = DeployReport::default();
        tracing::info!(
            "🚀 Deploying {} as '{}' on port {}",
            self.config.deploy.image,
            self.config.deploy.container_name,
            self.config.deploy.app_port
        );

        let result = self.run_main_stages(&mut report).await;

        // cleanup 不論成敗都執行
        let _ = self
            .execute_stage(&mut report, DeployStage::Cleanup, || self.cleanup())
            .await;

        match &result {
            Ok(()) => tracing::info!(
                "✅ Deployment finished in {:?}",
                report.total_duration()
            ),
            Err(e) => tracing::error!("❌ Deployment aborted: {}", e),
        }

        DeployOutcome { report, result }
    }

    async fn run_main_stages(&self, report: &mut DeployReport) -> Result<()> {
        if self.skip_checkout {
            Self::record(
                report,
                DeployStage::Checkout,
                StageStatus::Skipped,
                Utc::now(),
                Instant::now(),
                "skipped by flag".to_string(),
            );
        } else {
            self.execute_stage(report, DeployStage::Checkout, || self.checkout())
                .await?;
        }
        self.execute_stage(report, DeployStage::Build, || self.build())
            .await?;
        self.execute_stage(report, DeployStage::StopPrevious, || self.stop_previous())
            .await?;
        self.execute_stage(report, DeployStage::Deploy, || self.deploy())
            .await?;
        self.execute_stage(report, DeployStage::HealthCheck, || self.health_check())
            .await?;
        Ok(())
    }

    /// 執行單一階段並記錄結果；best-effort 階段的錯誤只記錄不傳遞
    async fn execute_stage<F, Fut>(
        &self,
        report: &mut DeployReport,
        stage: DeployStage,
        action: F,
    ) -> Result<()>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<String>>>,
    {
        tracing::info!("▶️ Stage {}", stage);
        let started_at = Utc::now();
        let started = Instant::now();

        match action().await {
            Ok(Some(message)) => {
                tracing::info!("✅ Stage {} done: {}", stage, message);
                Self::record(report, stage, StageStatus::Succeeded, started_at, started, message);
                Ok(())
            }
            Ok(None) => {
                tracing::info!("⏭️ Stage {} skipped", stage);
                Self::record(report, stage, StageStatus::Skipped, started_at, started, String::new());
                Ok(())
            }
            Err(e) if stage.is_best_effort() => {
                tracing::warn!("⚠️ Stage {} failed (ignored): {}", stage, e);
                Self::record(report, stage, StageStatus::Ignored, started_at, started, e.to_string());
                Ok(())
            }
            Err(e) => {
                tracing::error!("❌ Stage {} failed: {}", stage, e);
                Self::record(report, stage, StageStatus::Failed, started_at, started, e.to_string());
                Err(e)
            }
        }
    }

    fn record(
        report: &mut DeployReport,
        stage: DeployStage,
        status: StageStatus,
        started_at: chrono::DateTime<Utc>,
        started: Instant,
        message: String,
    ) {
        report.stages.push(StageResult {
            stage,
            status,
            started_at,
            duration: started.elapsed(),
            message,
        });
    }

    async fn checkout(&self) -> Result<Option<String>> {
        let revision = self.source.checkout(&self.config.source_spec()).await?;
        Ok(Some(format!("revision {}", revision)))
    }

    async fn build(&self) -> Result<Option<String>> {
        let spec = self.config.build_spec();
        self.runtime.build_image(&spec).await?;
        Ok(Some(format!("built {}", spec.image)))
    }

    /// `docker stop || true` 與 `docker rm || true`
    async fn stop_previous(&self) -> Result<Option<String>> {
        let name = &self.config.deploy.container_name;
        let mut failures = Vec::new();

        if let Err(e) = self.runtime.stop_container(name).await {
            failures.push(format!("stop: {}", e));
        }
        if let Err(e) = self.runtime.remove_container(name).await {
            failures.push(format!("rm: {}", e));
        }

        if failures.is_empty() {
            Ok(Some(format!("removed previous container '{}'", name)))
        } else {
            Err(OcrError::StageError {
                stage: DeployStage::StopPrevious.to_string(),
                details: failures.join("; "),
            })
        }
    }

    async fn deploy(&self) -> Result<Option<String>> {
        let spec = self.config.run_spec();
        let id = self.runtime.run_container(&spec).await?;
        let short_id: String = id.chars().take(12).collect();
        Ok(Some(format!(
            "started '{}' ({}) on {}:{}",
            spec.container_name, short_id, spec.host_port, spec.container_port
        )))
    }

    /// 固定等待後探測一次；失敗時輸出容器日誌並中止
    async fn health_check(&self) -> Result<Option<String>> {
        let delay = self.config.health_initial_delay();
        let url = self.config.health_url();
        tracing::info!("⏳ Waiting {:?} before probing {}", delay, url);
        tokio::time::sleep(delay).await;

        match self.probe.probe(&url).await {
            Ok(()) => Ok(Some(format!("{} is healthy", url))),
            Err(probe_error) => {
                let name = &self.config.deploy.container_name;
                let logs = match self.runtime.container_logs(name).await {
                    Ok(logs) => logs,
                    Err(e) => format!("<unable to fetch logs: {}>", e),
                };
                tracing::error!("📜 Logs of '{}':\n{}", name, logs);

                Err(OcrError::StageError {
                    stage: DeployStage::HealthCheck.to_string(),
                    details: format!("{}\n--- container logs ---\n{}", probe_error, logs),
                })
            }
        }
    }

    async fn cleanup(&self) -> Result<Option<String>> {
        if !self.config.prune_images() {
            return Ok(None);
        }
        self.runtime.prune_images().await?;
        Ok(Some("pruned dangling images".to_string()))
    }
}

/// Dry run 用：列出每個階段會執行的命令
pub fn planned_commands(config: &DeployConfig, skip_checkout: bool) -> Vec<(DeployStage, String)> {
    let docker = config.docker_program();
    let mut plan = Vec::new();

    if !skip_checkout {
        let source = config.source_spec();
        match &source.repository {
            Some(_) if source.directory.join(".git").exists() => {
                for args in GitCli::update_args(&source.directory, &source.branch) {
                    plan.push((DeployStage::Checkout, format!("git {}", render_args(&args))));
                }
            }
            Some(repository) => {
                let args = GitCli::clone_args(repository, &source.branch, &source.directory);
                plan.push((DeployStage::Checkout, format!("git {}", render_args(&args))));
            }
            None => plan.push((
                DeployStage::Checkout,
                format!("use local workspace ({})", source.dockerfile.display()),
            )),
        }
    }

    let command = |args: Vec<std::ffi::OsString>| format!("{} {}", docker, render_args(&args));
    let name = &config.deploy.container_name;

    plan.push((DeployStage::Build, command(DockerCli::build_args(&config.build_spec()))));
    plan.push((DeployStage::StopPrevious, format!("{} || true", command(DockerCli::stop_args(name)))));
    plan.push((DeployStage::StopPrevious, format!("{} || true", command(DockerCli::remove_args(name)))));
    plan.push((DeployStage::Deploy, command(DockerCli::run_args(&config.run_spec()))));
    plan.push((
        DeployStage::HealthCheck,
        format!(
            "sleep {}; GET {} || ({}; exit 1)",
            config.health_initial_delay().as_secs(),
            config.health_url(),
            command(DockerCli::logs_args(name))
        ),
    ));
    if config.prune_images() {
        plan.push((DeployStage::Cleanup, format!("{} || true", command(DockerCli::prune_args()))));
    }

    plan
}

/// 獲取執行摘要
pub fn get_execution_summary(report: &DeployReport) -> HashMap<String, serde_json::Value> {
    let mut summary = HashMap::new();

    summary.insert(
        "total_stages".to_string(),
        serde_json::Value::Number(report.stages.len().into()),
    );
    summary.insert(
        "total_duration_ms".to_string(),
        serde_json::Value::Number((report.total_duration().as_millis() as u64).into()),
    );
    summary.insert(
        "failed_stage".to_string(),
        report
            .failed_stage()
            .map(|s| serde_json::Value::String(s.to_string()))
            .unwrap_or(serde_json::Value::Null),
    );
    summary.insert("success".to_string(), serde_json::Value::Bool(report.is_success()));

    let stages: Vec<serde_json::Value> = report
        .stages
        .iter()
        .map(|s| serde_json::json!({ "stage": s.stage.to_string(), "status": s.status }))
        .collect();
    summary.insert("stages".to_string(), serde_json::Value::Array(stages));

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::{BuildSpec, RunSpec, SourceSpec};
    use async_trait::async_trait;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct MockRuntime {
        calls: Arc<Mutex<Vec<String>>>,
        fail_build: bool,
        fail_stop: bool,
    }

    impl MockRuntime {
        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        fn push(&self, call: &str) {
            self.calls.lock().unwrap().push(call.to_string());
        }
    }

    fn tool_failure(program: &str) -> OcrError {
        OcrError::ToolFailed {
            program: program.to_string(),
            code: Some(1),
            stderr: "Error: No such container: ocr-pdf-service".to_string(),
        }
    }

    #[async_trait]
    impl ContainerRuntime for MockRuntime {
        async fn build_image(&self, spec: &BuildSpec) -> Result<()> {
            self.push(&format!("build {}", spec.image));
            if self.fail_build {
                return Err(tool_failure("docker"));
            }
            Ok(())
        }

        async fn stop_container(&self, name: &str) -> Result<()> {
            self.push(&format!("stop {}", name));
            if self.fail_stop {
                return Err(tool_failure("docker"));
            }
            Ok(())
        }

        async fn remove_container(&self, name: &str) -> Result<()> {
            self.push(&format!("rm {}", name));
            if self.fail_stop {
                return Err(tool_failure("docker"));
            }
            Ok(())
        }

        async fn run_container(&self, spec: &RunSpec) -> Result<String> {
            self.push(&format!("run {}", spec.container_name));
            Ok("0123456789abcdef0123".to_string())
        }

        async fn container_logs(&self, name: &str) -> Result<String> {
            self.push(&format!("logs {}", name));
            Ok("Error: ocrmypdf not found".to_string())
        }

        async fn prune_images(&self) -> Result<()> {
            self.push("prune");
            Ok(())
        }
    }

    struct StaticCheckout;

    #[async_trait]
    impl SourceCheckout for StaticCheckout {
        async fn checkout(&self, _source: &SourceSpec) -> Result<String> {
            Ok("abc123".to_string())
        }
    }

    struct StaticProbe {
        healthy: bool,
    }

    #[async_trait]
    impl HealthProbe for StaticProbe {
        async fn probe(&self, url: &str) -> Result<()> {
            if self.healthy {
                Ok(())
            } else {
                Err(OcrError::HealthCheckFailed {
                    url: url.to_string(),
                    reason: "connection refused".to_string(),
                })
            }
        }
    }

    fn config() -> DeployConfig {
        DeployConfig::from_toml_str(
            r#"
[deploy]
image = "ocr-pdf-service:test"
container_name = "ocr-pdf-service"
app_port = 8001

[health_check]
initial_delay_secs = 0
"#,
        )
        .unwrap()
    }

    fn pipeline(runtime: MockRuntime, healthy: bool) -> DeployPipeline<MockRuntime, StaticCheckout, StaticProbe> {
        DeployPipeline::new(runtime, StaticCheckout, StaticProbe { healthy }, config())
    }

    #[tokio::test]
    async fn test_successful_deployment_runs_stages_in_order() {
        let runtime = MockRuntime::default();
        let outcome = pipeline(runtime.clone(), true).run().await;

        assert!(outcome.result.is_ok());
        assert!(outcome.report.is_success());
        assert_eq!(
            runtime.calls(),
            vec![
                "build ocr-pdf-service:test",
                "stop ocr-pdf-service",
                "rm ocr-pdf-service",
                "run ocr-pdf-service",
                "prune"
            ]
        );
        let stages: Vec<DeployStage> = outcome.report.stages.iter().map(|s| s.stage).collect();
        assert_eq!(
            stages,
            vec![
                DeployStage::Checkout,
                DeployStage::Build,
                DeployStage::StopPrevious,
                DeployStage::Deploy,
                DeployStage::HealthCheck,
                DeployStage::Cleanup
            ]
        );
    }

    #[tokio::test]
    async fn test_stop_failures_are_suppressed() {
        let runtime = MockRuntime {
            fail_stop: true,
            ..MockRuntime::default()
        };
        let outcome = pipeline(runtime.clone(), true).run().await;

        assert!(outcome.result.is_ok());
        assert_eq!(
            outcome.report.status_of(DeployStage::StopPrevious),
            Some(StageStatus::Ignored)
        );
        // stop 失敗後仍嘗試 rm
        assert!(runtime.calls().contains(&"rm ocr-pdf-service".to_string()));
        assert!(runtime.calls().contains(&"run ocr-pdf-service".to_string()));
    }

    #[tokio::test]
    async fn test_build_failure_aborts_but_cleans_up() {
        let runtime = MockRuntime {
            fail_build: true,
            ..MockRuntime::default()
        };
        let outcome = pipeline(runtime.clone(), true).run().await;

        assert!(outcome.result.is_err());
        assert_eq!(outcome.report.failed_stage(), Some(DeployStage::Build));
        assert_eq!(runtime.calls(), vec!["build ocr-pdf-service:test", "prune"]);
    }

    #[tokio::test]
    async fn test_health_failure_dumps_logs() {
        let runtime = MockRuntime::default();
        let outcome = pipeline(runtime.clone(), false).run().await;

        match &outcome.result {
            Err(OcrError::StageError { stage, details }) => {
                assert_eq!(stage, "health-check");
                assert!(details.contains("connection refused"));
                assert!(details.contains("ocrmypdf not found"));
            }
            other => panic!("unexpected result: {:?}", other),
        }
        let calls = runtime.calls();
        assert_eq!(calls.iter().filter(|c| c.starts_with("logs")).count(), 1);
        assert_eq!(calls.last().map(String::as_str), Some("prune"));
        assert_eq!(
            outcome.report.status_of(DeployStage::Cleanup),
            Some(StageStatus::Succeeded)
        );
    }

    #[tokio::test]
    async fn test_skip_checkout_and_prune() {
        let runtime = MockRuntime::default();
        let mut config = config();
        config.cleanup = Some(crate::config::deploy_config::CleanupConfig {
            prune_images: Some(false),
        });
        let outcome = DeployPipeline::new(runtime.clone(), StaticCheckout, StaticProbe { healthy: true }, config)
            .with_skip_checkout(true)
            .run()
            .await;

        assert!(outcome.result.is_ok());
        assert_eq!(outcome.report.status_of(DeployStage::Checkout), Some(StageStatus::Skipped));
        assert_eq!(outcome.report.status_of(DeployStage::Cleanup), Some(StageStatus::Skipped));
        assert!(!runtime.calls().contains(&"prune".to_string()));
    }

    #[test]
    fn test_planned_commands() {
        let plan = planned_commands(&config(), true);
        let rendered: Vec<String> = plan.iter().map(|(_, c)| c.clone()).collect();

        assert_eq!(plan[0].0, DeployStage::Build);
        assert!(rendered.contains(&"docker stop ocr-pdf-service || true".to_string()));
        assert!(rendered
            .iter()
            .any(|c| c.starts_with("docker run -d --name ocr-pdf-service -p 8001:8001")));
        assert_eq!(plan.last().map(|(s, _)| *s), Some(DeployStage::Cleanup));
    }

    #[test]
    fn test_planned_commands_use_configured_docker_program() {
        let mut config = config();
        config.docker = Some(crate::config::deploy_config::DockerConfig {
            program: Some("podman".to_string()),
            ..Default::default()
        });

        let plan = planned_commands(&config, true);
        let (_, health) = plan
            .iter()
            .find(|(stage, _)| *stage == DeployStage::HealthCheck)
            .unwrap();
        assert!(health.contains("(podman logs ocr-pdf-service; exit 1)"));
        assert!(plan.iter().all(|(_, c)| !c.contains("docker")));
    }

    #[tokio::test]
    async fn test_execution_summary() {
        let outcome = pipeline(MockRuntime::default(), false).run().await;
        let summary = get_execution_summary(&outcome.report);

        assert_eq!(summary["success"], serde_json::Value::Bool(false));
        assert_eq!(summary["failed_stage"], serde_json::json!("health-check"));
        assert_eq!(summary["total_stages"], serde_json::json!(6));
    }
}
