use anyhow::Context;
use clap::Parser;
use ocr_pdf_service::adapters::{process::run_tool, LocalStorage, OcrmypdfCli, PdftotextCli};
use ocr_pdf_service::api::{self, ApiState};
use ocr_pdf_service::utils::{logger, validation::Validate};
use ocr_pdf_service::{OcrService, ServerConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::parse();

    // 初始化日誌
    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("🚀 Starting ocr-pdf-service");
    if config.verbose {
        tracing::debug!("Server config: {:?}", config);
    }

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    check_tool(&config.ocrmypdf_bin, "--version").await;
    check_tool(&config.pdftotext_bin, "-v").await;

    let storage = LocalStorage::new(&config.work_dir);
    storage
        .ensure_base_dir()
        .await
        .with_context(|| format!("creating work directory {}", config.work_dir))?;

    let service = OcrService::new(
        OcrmypdfCli::new(config.ocrmypdf_bin.clone(), config.tool_timeout()),
        PdftotextCli::new(config.pdftotext_bin.clone(), config.tool_timeout()),
        storage,
        config.max_concurrent_jobs,
    );
    tracing::info!(
        "⚙️ Work dir: {}, max upload: {}MB, concurrent jobs: {}",
        config.work_dir,
        config.max_upload_mb,
        config.max_concurrent_jobs
    );

    let app = api::create_app(ApiState::new(Arc::new(service)), config.max_upload_bytes());
    let listener = TcpListener::bind(config.bind_address())
        .await
        .with_context(|| format!("binding {}", config.bind_address()))?;

    api::serve(listener, app, shutdown_signal()).await
}

/// 啟動時確認外部工具可執行；缺少時只警告，請求時才回傳錯誤
async fn check_tool(program: &str, version_flag: &str) {
    match run_tool(program, [version_flag], Duration::from_secs(10)).await {
        Ok(output) => {
            let version = if output.stdout.trim().is_empty() {
                output.stderr
            } else {
                output.stdout
            };
            tracing::info!(
                "🔧 {}: {}",
                program,
                version.lines().next().unwrap_or("unknown version")
            );
        }
        Err(e) => {
            tracing::warn!("⚠️ {}", e);
            tracing::warn!("💡 Suggestion: {}", e.recovery_suggestion());
        }
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("🛑 Shutdown signal received");
}
