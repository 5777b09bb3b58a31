//! Rikstoto AI wrapper
//!
//! Entry point. Loads configuration, initialises structured logging,
//! resolves vendor credentials from the environment and serves the
//! REST API until Ctrl+C.

use anyhow::Result;
use std::sync::Arc;
use tracing::{info, warn};

use rikstoto_wrapper::config::{self, Credentials};
use rikstoto_wrapper::generation::GenerationService;
use rikstoto_wrapper::llm::ProviderRegistry;
use rikstoto_wrapper::server::{self, routes::ServerState};

const BANNER: &str = r#"
 ____  _ _        _        _
|  _ \(_) | _____| |_ ___ | |_ ___
| |_) | | |/ / __| __/ _ \| __/ _ \
|  _ <| |   <\__ \ || (_) | || (_) |
|_| \_\_|_|\_\___/\__\___/ \__\___/

  AI model wrapper for coupon analysis
"#;

const CONFIG_PATH_ENV: &str = "RIKSTOTO_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config.toml";

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (non-fatal if missing)
    let _ = dotenv::dotenv();

    init_logging();

    let config_path =
        std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
    let cfg = config::AppConfig::load_or_default(&config_path)?;

    println!("{BANNER}");

    let creds = Credentials::from_env(&cfg.providers);
    let registry = ProviderRegistry::from_config(&cfg, creds)?;

    let configured = registry.models_configured();
    info!(
        azure_openai = configured.azure_openai,
        mistral = configured.mistral,
        claude = configured.claude,
        gemini = configured.gemini,
        huggingface = registry.huggingface_configured(),
        "Providers configured"
    );
    if configured == Default::default() && !registry.huggingface_configured() {
        warn!("No provider credentials found; every generation request will fail");
    }

    let generation = GenerationService::from_config(&cfg, registry);
    let state = Arc::new(ServerState::new(generation));

    info!(
        host = %cfg.server.host,
        port = cfg.server.port,
        cache_ttl_minutes = cfg.cache.ttl_minutes,
        "Rikstoto wrapper starting up. Press Ctrl+C to stop."
    );

    server::serve(state, &cfg.server, shutdown_signal()).await?;

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Ctrl+C received, shutting down gracefully..."),
        Err(e) => warn!(error = %e, "Failed to listen for Ctrl+C; shutting down"),
    }
}

fn init_logging() {
    use tracing_subscriber::{fmt, EnvFilter};

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("rikstoto_wrapper=info,tower_http=info"));

    let json_logging = std::env::var("RIKSTOTO_LOG_JSON").is_ok();

    if json_logging {
        fmt()
            .json()
            .with_env_filter(env_filter)
            .with_target(true)
            .with_thread_ids(true)
            .init();
    } else {
        fmt()
            .with_env_filter(env_filter)
            .with_target(true)
            .init();
    }
}
