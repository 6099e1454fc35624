//! Tilegate server binary.
//!
//! Loads gateway settings and the source configuration, builds the router,
//! and serves until interrupted:
//!
//! ```text
//! tilegate --config ./sources.json
//! tilegate --config ./conf.d --settings ./tilegate.toml --bind 0.0.0.0:8000
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tilegate::config;
use tilegate::gateway::Gateway;
use tilegate::observability::metrics;
use tilegate::source::http::HttpBackend;

#[derive(Parser)]
#[command(name = "tilegate")]
#[command(about = "Dynamic tile-serving gateway", long_about = None)]
struct Cli {
    /// Source configuration: a JSON file or a directory of JSON fragments.
    #[arg(short, long)]
    config: PathBuf,

    /// Gateway settings file (TOML); defaults apply when omitted.
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the route cache capacity.
    #[arg(long)]
    cache_size: Option<usize>,

    /// Override the static viewer assets directory.
    #[arg(long)]
    assets_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tilegate=debug,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    let mut settings = config::load_settings(cli.settings.as_deref())?;
    if let Some(bind) = cli.bind {
        settings.listener.bind_address = bind;
    }
    if let Some(capacity) = cli.cache_size {
        settings.route_cache.capacity = capacity;
    }
    if let Some(dir) = cli.assets_dir {
        settings.assets.dir = Some(dir);
    }

    let sources = config::load_sources(&cli.config)?;
    tracing::info!(
        prefixes = sources.len(),
        bind_address = %settings.listener.bind_address,
        route_cache_capacity = settings.route_cache.capacity,
        "configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "failed to parse metrics address"
            ),
        }
    }

    let resolver = Arc::new(HttpBackend::new());
    let gateway = Gateway::new(&settings, sources, resolver)?;

    let listener = TcpListener::bind(&settings.listener.bind_address).await?;
    gateway.run(listener).await?;

    tracing::info!("shutdown complete");
    Ok(())
}
