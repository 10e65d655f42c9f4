use crate::adapters::process::run_tool;
use crate::domain::model::{BuildSpec, RunSpec};
use crate::domain::ports::ContainerRuntime;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::ffi::OsString;
use std::time::Duration;

/// Docker CLI 實作
#[derive(Debug, Clone)]
pub struct DockerCli {
    program: String,
    build_timeout: Duration,
    command_timeout: Duration,
}

impl DockerCli {
    pub fn new(program: impl Into<String>, build_timeout: Duration, command_timeout: Duration) -> Self {
        Self {
            program: program.into(),
            build_timeout,
            command_timeout,
        }
    }

    pub fn build_args(spec: &BuildSpec) -> Vec<OsString> {
        vec![
            "build".into(),
            "-t".into(),
            spec.image.clone().into(),
            "-f".into(),
            spec.dockerfile.as_os_str().to_os_string(),
            spec.context.as_os_str().to_os_string(),
        ]
    }

    pub fn run_args(spec: &RunSpec) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "run".into(),
            "-d".into(),
            "--name".into(),
            spec.container_name.clone().into(),
            "-p".into(),
            format!("{}:{}", spec.host_port, spec.container_port).into(),
        ];
        if let Some(policy) = &spec.restart_policy {
            args.push("--restart".into());
            args.push(policy.clone().into());
        }
        for (key, value) in &spec.environment {
            args.push("-e".into());
            args.push(format!("{}={}", key, value).into());
        }
        args.push(spec.image.clone().into());
        args
    }

    pub fn stop_args(name: &str) -> Vec<OsString> {
        vec!["stop".into(), name.into()]
    }

    pub fn remove_args(name: &str) -> Vec<OsString> {
        vec!["rm".into(), name.into()]
    }

    pub fn logs_args(name: &str) -> Vec<OsString> {
        vec!["logs".into(), name.into()]
    }

    pub fn prune_args() -> Vec<OsString> {
        vec!["image".into(), "prune".into(), "-f".into()]
    }
}

#[async_trait]
impl ContainerRuntime for DockerCli {
    async fn build_image(&self, spec: &BuildSpec) -> Result<()> {
        run_tool(&self.program, Self::build_args(spec), self.build_timeout).await?;
        Ok(())
    }

    async fn stop_container(&self, name: &str) -> Result<()> {
        run_tool(&self.program, Self::stop_args(name), self.command_timeout).await?;
        Ok(())
    }

    async fn remove_container(&self, name: &str) -> Result<()> {
        run_tool(&self.program, Self::remove_args(name), self.command_timeout).await?;
        Ok(())
    }

    async fn run_container(&self, spec: &RunSpec) -> Result<String> {
        let output = run_tool(&self.program, Self::run_args(spec), self.command_timeout).await?;
        Ok(output.stdout.trim().to_string())
    }

    async fn container_logs(&self, name: &str) -> Result<String> {
        let output = run_tool(&self.program, Self::logs_args(name), self.command_timeout).await?;
        // docker logs 會把容器的 stderr 輸出到 stderr
        let mut logs = output.stdout;
        if !output.stderr.is_empty() {
            if !logs.is_empty() && !logs.ends_with('\n') {
                logs.push('\n');
            }
            logs.push_str(&output.stderr);
        }
        Ok(logs)
    }

    async fn prune_images(&self) -> Result<()> {
        run_tool(&self.program, Self::prune_args(), self.command_timeout).await?;
        Ok(())
    }
}
