use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use truth_common::observability::{LogConfig, init_logging};
use truth_config::TruthConfigLoader;
use truth_server::{AppState, build_router};

/// Claim analysis HTTP service.
#[derive(Debug, Parser)]
#[command(name = "truth-server", version)]
struct Cli {
    /// YAML config file; `truth.yaml` in the working directory is used when present.
    #[arg(long, env = "TRUTH_CONFIG")]
    config: Option<PathBuf>,

    #[arg(long)]
    host: Option<String>,

    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let loader = TruthConfigLoader::new();
    let loader = match &cli.config {
        Some(path) => loader.with_file(path),
        None => loader.with_optional_file("truth.yaml"),
    };
    let mut cfg = loader.load().context("loading configuration")?;
    if let Some(host) = cli.host {
        cfg.server.host = host;
    }
    if let Some(port) = cli.port {
        cfg.server.port = port;
    }

    let log_path = init_logging(LogConfig {
        app_name: "truth-server",
        log_dir: cfg.logging.dir.clone(),
        emit_stderr: cfg.logging.stderr,
        format: cfg.logging.format,
        default_filter: cfg.logging.filter.clone(),
    })?;

    let state = Arc::new(AppState::from_config(&cfg)?);
    tracing::info!(
        environment = %state.environment,
        ocr_provider = state.processor.provider_name(),
        ai_configured = state.fact_checker.is_configured(),
        log_file = %log_path.display(),
        "server.starting"
    );

    let addr = format!("{}:{}", cfg.server.host, cfg.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    tracing::info!(%addr, "server.listening");

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("server.shutdown");
        })
        .await?;

    Ok(())
}
