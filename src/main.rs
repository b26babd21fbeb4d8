use clap::Parser;
use gemini_proxy::{build_router, AppState, ProxyConfig, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "gemini-proxy",
    about = "OpenAI-compatible chat completions proxy for the Gemini API",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log file path
    #[arg(long, default_value = "gemini-proxy.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "gemini_proxy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in gemini_proxy::config::config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    let mut config = ProxyConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }

    let logger = SharedLogger::new(&cli.log_file)?;

    info!("gemini-proxy v{}", env!("CARGO_PKG_VERSION"));
    info!("  Base URL:    {}", config.base_url());
    info!("  Upload URL:  {}", config.provider.upload_url);
    info!("  Port:        {}", config.port);
    info!("  Body limit:  {} MB", config.body_limit_mb);
    info!("  Scratch dir: {}", config.media.scratch_dir.display());
    info!("  Overrides:   {} model mappings", config.models.len());
    info!("  Log file:    {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting gemini-proxy base_url={} port={}",
            config.base_url(),
            config.port
        ),
    );

    let client = reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(300))
        .build()?;

    let port = config.port;
    let state = Arc::new(AppState::new(config, client, logger));

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  OPENAI_BASE_URL=http://localhost:{}/v1", port);

    axum::serve(listener, app).await?;

    Ok(())
}
