use crate::domain::model::{BuildSpec, RunSpec, SourceSpec};
use crate::utils::error::{OcrError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_IMAGE: &str = "ocr-pdf-service:latest";
pub const DEFAULT_CONTAINER_NAME: &str = "ocr-pdf-service";
pub const DEFAULT_APP_PORT: u16 = 8001;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeployConfig {
    pub deploy: DeploySettings,
    pub source: Option<SourceConfig>,
    pub health_check: Option<HealthCheckConfig>,
    pub cleanup: Option<CleanupConfig>,
    pub docker: Option<DockerConfig>,
    /// 傳入容器的環境變數
    pub environment: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploySettings {
    pub image: String,
    pub container_name: String,
    pub app_port: u16,
    pub container_port: Option<u16>,
    pub build_context: Option<String>,
    pub dockerfile: Option<String>,
    pub restart_policy: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub repository: Option<String>,
    pub branch: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthCheckConfig {
    pub host: Option<String>,
    pub path: Option<String>,
    pub initial_delay_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CleanupConfig {
    pub prune_images: Option<bool>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DockerConfig {
    pub program: Option<String>,
    pub build_timeout_secs: Option<u64>,
    pub command_timeout_secs: Option<u64>,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            deploy: DeploySettings {
                image: DEFAULT_IMAGE.to_string(),
                container_name: DEFAULT_CONTAINER_NAME.to_string(),
                app_port: DEFAULT_APP_PORT,
                container_port: None,
                build_context: None,
                dockerfile: None,
                restart_policy: None,
            },
            source: None,
            health_check: None,
            cleanup: None,
            docker: None,
            environment: None,
        }
    }
}

impl DeployConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(OcrError::IoError)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content)?;

        toml::from_str(&processed_content).map_err(|e| OcrError::ConfigError {
            message: format!("TOML parsing error: {}", e),
        })
    }

    /// 只用預設值與環境變數（沒有配置檔時）
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env_overrides()?;
        Ok(config)
    }

    /// 替換環境變數 (例如 ${DOCKER_IMAGE})，未定義的保留原樣
    fn substitute_env_vars(content: &str) -> Result<String> {
        let re = Regex::new(r"\$\{([^}]+)\}").map_err(|e| OcrError::ConfigError {
            message: format!("env substitution pattern: {}", e),
        })?;

        let result = re.replace_all(content, |caps: &regex::Captures| {
            let var_name = &caps[1];
            std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
        });

        Ok(result.to_string())
    }

    /// `DOCKER_IMAGE`、`CONTAINER_NAME`、`APP_PORT` 優先於檔案內容
    pub fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_overrides_from(|key| std::env::var(key).ok())
    }

    pub fn apply_overrides_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(image) = lookup("DOCKER_IMAGE").filter(|v| !v.is_empty()) {
            tracing::debug!("DOCKER_IMAGE override: {}", image);
            self.deploy.image = image;
        }
        if let Some(name) = lookup("CONTAINER_NAME").filter(|v| !v.is_empty()) {
            tracing::debug!("CONTAINER_NAME override: {}", name);
            self.deploy.container_name = name;
        }
        if let Some(port) = lookup("APP_PORT").filter(|v| !v.is_empty()) {
            self.deploy.app_port = port.parse().map_err(|_| OcrError::InvalidConfigValueError {
                field: "APP_PORT".to_string(),
                value: port.clone(),
                reason: "Must be a port number".to_string(),
            })?;
        }
        Ok(())
    }

    /// 驗證配置的合理性
    pub fn validate_config(&self) -> Result<()> {
        validation::validate_non_empty_string("deploy.image", &self.deploy.image)?;
        validation::validate_container_name("deploy.container_name", &self.deploy.container_name)?;
        validation::validate_port("deploy.app_port", self.deploy.app_port)?;
        validation::validate_port("deploy.container_port", self.container_port())?;
        validation::validate_path("deploy.build_context", &self.build_context().to_string_lossy())?;

        if self.deploy.image.contains("${") {
            return Err(OcrError::MissingConfigError {
                field: format!("deploy.image ({})", self.deploy.image),
            });
        }

        let path = self.health_path();
        if !path.starts_with('/') {
            return Err(OcrError::InvalidConfigValueError {
                field: "health_check.path".to_string(),
                value: path.to_string(),
                reason: "Must start with '/'".to_string(),
            });
        }
        validation::validate_url("health_check", &self.health_url())?;

        if let Some(repository) = self.repository() {
            validation::validate_non_empty_string("source.repository", repository)?;
        }

        Ok(())
    }

    pub fn container_port(&self) -> u16 {
        self.deploy.container_port.unwrap_or(DEFAULT_APP_PORT)
    }

    pub fn build_context(&self) -> PathBuf {
        PathBuf::from(self.deploy.build_context.as_deref().unwrap_or("."))
    }

    pub fn dockerfile(&self) -> PathBuf {
        match &self.deploy.dockerfile {
            Some(dockerfile) => PathBuf::from(dockerfile),
            None => self.build_context().join("Dockerfile"),
        }
    }

    pub fn repository(&self) -> Option<&str> {
        self.source.as_ref().and_then(|s| s.repository.as_deref())
    }

    pub fn branch(&self) -> &str {
        self.source
            .as_ref()
            .and_then(|s| s.branch.as_deref())
            .unwrap_or("main")
    }

    pub fn health_path(&self) -> &str {
        self.health_check
            .as_ref()
            .and_then(|h| h.path.as_deref())
            .unwrap_or("/health")
    }

    pub fn health_url(&self) -> String {
        let host = self
            .health_check
            .as_ref()
            .and_then(|h| h.host.as_deref())
            .unwrap_or("localhost");
        format!("http://{}:{}{}", host, self.deploy.app_port, self.health_path())
    }

    /// 部署後、健康檢查前的固定等待時間
    pub fn health_initial_delay(&self) -> Duration {
        Duration::from_secs(
            self.health_check
                .as_ref()
                .and_then(|h| h.initial_delay_secs)
                .unwrap_or(10),
        )
    }

    pub fn health_timeout(&self) -> Duration {
        Duration::from_secs(
            self.health_check
                .as_ref()
                .and_then(|h| h.timeout_secs)
                .unwrap_or(5),
        )
    }

    pub fn prune_images(&self) -> bool {
        self.cleanup
            .as_ref()
            .and_then(|c| c.prune_images)
            .unwrap_or(true)
    }

    pub fn docker_program(&self) -> &str {
        self.docker
            .as_ref()
            .and_then(|d| d.program.as_deref())
            .unwrap_or("docker")
    }

    pub fn build_timeout(&self) -> Duration {
        Duration::from_secs(
            self.docker
                .as_ref()
                .and_then(|d| d.build_timeout_secs)
                .unwrap_or(30 * 60),
        )
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(
            self.docker
                .as_ref()
                .and_then(|d| d.command_timeout_secs)
                .unwrap_or(120),
        )
    }

    pub fn source_spec(&self) -> SourceSpec {
        SourceSpec {
            repository: self.repository().map(str::to_string),
            branch: self.branch().to_string(),
            directory: self.build_context(),
            dockerfile: self.dockerfile(),
        }
    }

    pub fn build_spec(&self) -> BuildSpec {
        BuildSpec {
            image: self.deploy.image.clone(),
            context: self.build_context(),
            dockerfile: self.dockerfile(),
        }
    }

    pub fn run_spec(&self) -> RunSpec {
        RunSpec {
            image: self.deploy.image.clone(),
            container_name: self.deploy.container_name.clone(),
            host_port: self.deploy.app_port,
            container_port: self.container_port(),
            restart_policy: self.deploy.restart_policy.clone(),
            environment: self.environment.clone().unwrap_or_default(),
        }
    }
}

impl Validate for DeployConfig {
    fn validate(&self) -> Result<()> {
        self.validate_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const BASIC: &str = r#"
[deploy]
image = "registry.local/ocr-pdf-service:1.2.0"
container_name = "ocr-api"
app_port = 8001
restart_policy = "unless-stopped"

[source]
repository = "https://git.example.com/ocr/ocr-pdf-service.git"
branch = "release"

[health_check]
initial_delay_secs = 3

[environment]
RUST_LOG = "info"
"#;

    #[test]
    fn test_parse_basic_toml_config() {
        let config = DeployConfig::from_toml_str(BASIC).unwrap();

        assert_eq!(config.deploy.container_name, "ocr-api");
        assert_eq!(config.branch(), "release");
        assert_eq!(config.health_url(), "http://localhost:8001/health");
        assert_eq!(config.health_initial_delay(), Duration::from_secs(3));
        assert!(config.prune_images());
        assert!(config.validate().is_ok());

        let run = config.run_spec();
        assert_eq!(run.container_port, 8001);
        assert_eq!(run.environment.get("RUST_LOG").map(String::as_str), Some("info"));
    }

    #[test]
    fn test_env_var_substitution() {
        std::env::set_var("OCR_DEPLOY_TEST_IMAGE", "registry.local/ocr:sha-abc");

        let toml_content = r#"
[deploy]
image = "${OCR_DEPLOY_TEST_IMAGE}"
container_name = "ocr-api"
app_port = 8001
"#;

        let config = DeployConfig::from_toml_str(toml_content).unwrap();
        assert_eq!(config.deploy.image, "registry.local/ocr:sha-abc");

        std::env::remove_var("OCR_DEPLOY_TEST_IMAGE");
    }

    #[test]
    fn test_unresolved_variable_fails_validation() {
        let toml_content = r#"
[deploy]
image = "${OCR_DEPLOY_TEST_UNSET_VARIABLE}"
container_name = "ocr-api"
app_port = 8001
"#;
        let config = DeployConfig::from_toml_str(toml_content).unwrap();
        assert!(matches!(
            config.validate(),
            Err(OcrError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_env_overrides_win() {
        let mut config = DeployConfig::from_toml_str(BASIC).unwrap();
        let env: HashMap<&str, &str> = [
            ("DOCKER_IMAGE", "ocr:override"),
            ("CONTAINER_NAME", "ocr-blue"),
            ("APP_PORT", "9001"),
        ]
        .into_iter()
        .collect();

        config
            .apply_overrides_from(|key| env.get(key).map(|v| v.to_string()))
            .unwrap();

        assert_eq!(config.deploy.image, "ocr:override");
        assert_eq!(config.deploy.container_name, "ocr-blue");
        assert_eq!(config.deploy.app_port, 9001);
        // 容器內仍監聽 8001
        assert_eq!(config.run_spec().container_port, 8001);
        assert_eq!(config.health_url(), "http://localhost:9001/health");
    }

    #[test]
    fn test_invalid_port_override() {
        let mut config = DeployConfig::default();
        let result = config.apply_overrides_from(|key| {
            (key == "APP_PORT").then(|| "not-a-port".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_defaults_without_file() {
        let config = DeployConfig::default();
        assert_eq!(config.deploy.image, DEFAULT_IMAGE);
        assert_eq!(config.dockerfile(), PathBuf::from("./Dockerfile"));
        assert_eq!(config.docker_program(), "docker");
        assert!(config.repository().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_health_path() {
        let mut config = DeployConfig::default();
        config.health_check = Some(HealthCheckConfig {
            path: Some("health".to_string()),
            ..Default::default()
        });
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_from_file() {
        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(BASIC.as_bytes()).unwrap();

        let config = DeployConfig::from_file(temp_file.path()).unwrap();
        assert_eq!(config.deploy.image, "registry.local/ocr-pdf-service:1.2.0");
    }
}
