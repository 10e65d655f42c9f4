use crate::domain::ports::HealthProbe;
use crate::utils::error::{OcrError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;

/// 對 `/health` 發出一次 GET，非 2xx 視為失敗（等同 `curl -f`）
#[derive(Debug, Clone)]
pub struct HttpHealthProbe {
    client: Client,
}

impl HttpHealthProbe {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HealthProbe for HttpHealthProbe {
    async fn probe(&self, url: &str) -> Result<()> {
        tracing::debug!("Probing {}", url);
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| OcrError::HealthCheckFailed {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(OcrError::HealthCheckFailed {
                url: url.to_string(),
                reason: format!("unexpected status {}", status),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    #[tokio::test]
    async fn test_probe_success() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(200).json_body(serde_json::json!({"status": "ok"}));
            })
            .await;

        let probe = HttpHealthProbe::new(Duration::from_secs(5)).unwrap();
        assert!(probe.probe(&server.url("/health")).await.is_ok());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_probe_error_status() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/health");
                then.status(503);
            })
            .await;

        let probe = HttpHealthProbe::new(Duration::from_secs(5)).unwrap();
        let result = probe.probe(&server.url("/health")).await;
        match result {
            Err(OcrError::HealthCheckFailed { reason, .. }) => assert!(reason.contains("503")),
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_probe_connection_refused() {
        let probe = HttpHealthProbe::new(Duration::from_secs(2)).unwrap();
        let result = probe.probe("http://127.0.0.1:1/health").await;
        assert!(matches!(result, Err(OcrError::HealthCheckFailed { .. })));
    }
}
