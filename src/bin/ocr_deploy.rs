use clap::Parser;
use ocr_pdf_service::adapters::{DockerCli, GitCli, HttpHealthProbe};
use ocr_pdf_service::core::deploy::{get_execution_summary, planned_commands};
use ocr_pdf_service::domain::model::StageStatus;
use ocr_pdf_service::utils::{logger, validation::Validate};
use ocr_pdf_service::{DeployConfig, DeployPipeline};
use std::path::Path;

#[derive(Parser)]
#[command(name = "ocr-deploy")]
#[command(about = "Build, redeploy and health-check the OCR service container")]
struct Args {
    /// Path to TOML deployment configuration; defaults and env vars are used when absent
    #[arg(short, long, default_value = "deploy.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Use the current workspace without pulling from the repository
    #[arg(long)]
    skip_checkout: bool,

    /// Dry run - show the commands without executing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 初始化日誌
    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting ocr-deploy");

    let config = match load_config(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config '{}': {}", args.config, e);
            eprintln!("💡 {}", e.recovery_suggestion());
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    display_config_summary(&config, &args);

    if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - No commands will be executed");
        println!("🔍 Planned commands:");
        for (stage, command) in planned_commands(&config, args.skip_checkout) {
            println!("  [{}] {}", stage, command);
        }
        return Ok(());
    }

    let runtime = DockerCli::new(
        config.docker_program(),
        config.build_timeout(),
        config.command_timeout(),
    );
    let source = GitCli::new("git", config.command_timeout());
    let probe = HttpHealthProbe::new(config.health_timeout())?;

    let pipeline =
        DeployPipeline::new(runtime, source, probe, config).with_skip_checkout(args.skip_checkout);
    let outcome = pipeline.run().await;

    println!();
    println!("📋 Stage Results:");
    for stage in &outcome.report.stages {
        let icon = match stage.status {
            StageStatus::Succeeded => "✅",
            StageStatus::Skipped => "⏭️",
            StageStatus::Ignored => "⚠️",
            StageStatus::Failed => "❌",
        };
        println!(
            "  {} {:<14} {:>8.1?}  {}",
            icon,
            stage.stage.to_string(),
            stage.duration,
            stage.message.lines().next().unwrap_or_default()
        );
    }

    let summary = get_execution_summary(&outcome.report);
    tracing::info!("📊 Deployment summary: {:?}", summary);

    match outcome.result {
        Ok(()) => {
            println!("✅ Deployment completed successfully!");
            Ok(())
        }
        Err(e) => {
            tracing::error!(
                "❌ Deployment failed: {} (Category: {:?}, Severity: {:?})",
                e,
                e.category(),
                e.severity()
            );
            eprintln!("❌ {}", e.user_friendly_message());
            eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
            std::process::exit(e.exit_code().max(1));
        }
    }
}

fn load_config(path: &str) -> ocr_pdf_service::Result<DeployConfig> {
    if !Path::new(path).exists() {
        tracing::info!("📁 {} not found, using defaults and environment", path);
        return DeployConfig::from_env();
    }

    tracing::info!("📁 Loading configuration from: {}", path);
    let mut config = DeployConfig::from_file(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}

fn display_config_summary(config: &DeployConfig, args: &Args) {
    println!("📋 Deployment Summary:");
    println!("  Image: {}", config.deploy.image);
    println!("  Container: {}", config.deploy.container_name);
    println!(
        "  Port: {} -> {}",
        config.deploy.app_port,
        config.container_port()
    );
    println!("  Health: {} (after {:?})", config.health_url(), config.health_initial_delay());
    match config.repository() {
        Some(repository) if !args.skip_checkout => {
            println!("  Source: {} ({})", repository, config.branch())
        }
        _ => println!("  Source: local workspace"),
    }
    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }
    println!();
}
