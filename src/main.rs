use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use vibetune_server::config;
use vibetune_server::server::{metrics, run_server, RequestsLoggingLevel, ServerConfig};
use vibetune_server::vibe::{SessionStore, VibeFlows};

fn parse_path(s: &str) -> Result<PathBuf, String> {
    let path_buf = PathBuf::from(s);
    let original_path = match path_buf.canonicalize() {
        Ok(path) => path,
        Err(msg) => {
            if msg.kind() == std::io::ErrorKind::NotFound {
                path_buf
            } else {
                return Err(format!("Error resolving path '{}': {}", s, msg));
            }
        }
    };
    if original_path.is_absolute() {
        return Ok(original_path);
    }
    let cwd = std::env::current_dir().map_err(|e| format!("Failed to get current dir: {}", e))?;
    Ok(cwd.join(original_path))
}

#[derive(Parser, Debug)]
struct CliArgs {
    /// Path to TOML configuration file. Values in the file override CLI arguments.
    #[clap(long, value_parser = parse_path)]
    pub config: Option<PathBuf>,

    /// The port to listen on.
    #[clap(short, long, default_value_t = 3001)]
    pub port: u16,

    /// The port for the metrics server (Prometheus scraping).
    #[clap(long, default_value_t = 9091)]
    pub metrics_port: u16,

    /// The level of logging to perform on each request.
    #[clap(long, default_value = "path")]
    pub logging_level: RequestsLoggingLevel,

    /// Path to the frontend directory to be statically served.
    #[clap(long)]
    pub frontend_dir_path: Option<String>,

    /// Public URL of the app, appended to share texts.
    #[clap(long)]
    pub public_url: Option<String>,

    /// Seconds of inactivity after which a vibe session is dropped.
    #[clap(long, default_value_t = 3600)]
    pub session_idle_timeout_secs: u64,

    /// Interval in seconds between idle session sweeps.
    #[clap(long, default_value_t = 300)]
    pub session_prune_interval_secs: u64,

    /// Pacing hint for clients between a quiz answer and the next question.
    #[clap(long, default_value_t = 300)]
    pub quiz_advance_delay_ms: u64,

    /// LLM provider: ollama or openai.
    #[clap(long)]
    pub llm_provider: Option<String>,

    /// Base URL of the LLM API.
    #[clap(long)]
    pub llm_base_url: Option<String>,

    /// Model name passed to the LLM provider.
    #[clap(long)]
    pub llm_model: Option<String>,

    /// API key for OpenAI-compatible providers.
    #[clap(long, env = "VIBETUNE_LLM_API_KEY", hide_env_values = true)]
    pub llm_api_key: Option<String>,
}

/// Convert CLI args to CliConfig for config resolution
impl From<&CliArgs> for config::CliConfig {
    fn from(args: &CliArgs) -> Self {
        config::CliConfig {
            port: args.port,
            metrics_port: args.metrics_port,
            logging_level: args.logging_level.clone(),
            frontend_dir_path: args.frontend_dir_path.clone(),
            public_url: args.public_url.clone(),
            session_idle_timeout_secs: args.session_idle_timeout_secs,
            session_prune_interval_secs: args.session_prune_interval_secs,
            quiz_advance_delay_ms: args.quiz_advance_delay_ms,
            llm_provider: args.llm_provider.clone(),
            llm_base_url: args.llm_base_url.clone(),
            llm_model: args.llm_model.clone(),
            llm_api_key: args.llm_api_key.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    // Load TOML config if provided
    let file_config = match &cli_args.config {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            Some(config::FileConfig::load(path)?)
        }
        None => None,
    };

    // Resolve final configuration (TOML overrides CLI)
    let cli_config: config::CliConfig = (&cli_args).into();
    let app_config = config::AppConfig::resolve(&cli_config, file_config)?;

    info!("Configuration loaded:");
    info!("  port: {}", app_config.port);
    info!(
        "  llm: {:?} {} at {}",
        app_config.llm.provider, app_config.llm.model, app_config.llm.base_url
    );
    info!(
        "  sessions: idle timeout {}s, pruned every {}s",
        app_config.session_idle_timeout_secs, app_config.session_prune_interval_secs
    );

    info!("Initializing metrics...");
    metrics::init_metrics();

    let provider = app_config.llm.build_provider();
    match provider.health_check().await {
        Ok(()) => info!("LLM provider {} is reachable", provider.name()),
        Err(e) => warn!(
            "LLM provider {} failed its health check, flows will fail until it recovers: {}",
            provider.name(),
            e
        ),
    }
    let flows = VibeFlows::new(provider, app_config.llm.completion_options());

    let sessions = Arc::new(SessionStore::new(app_config.session_settings()));

    // Spawn background task for idle session pruning
    let pruning_sessions = sessions.clone();
    let prune_interval = app_config.session_prune_interval();
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(prune_interval);

        // Skip the first immediate tick, wait for the first interval
        ticker.tick().await;

        loop {
            ticker.tick().await;
            pruning_sessions.prune_idle();
        }
    });

    info!("Ready to serve at port {}!", app_config.port);
    info!("Metrics available at port {}!", app_config.metrics_port);

    let server_config = ServerConfig {
        requests_logging_level: app_config.logging_level.clone(),
        port: app_config.port,
        metrics_port: app_config.metrics_port,
        frontend_dir_path: app_config.frontend_dir_path.clone(),
    };
    run_server(server_config, flows, sessions).await
}
