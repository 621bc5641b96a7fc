use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::info;

use pm2_datadog::{Bridge, Config, DogStatsd, Pm2Bus, Pm2Cli};

/// Forwards PM2 process events and resource usage to DogStatsD.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Configuration file path (YAML)
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// DogStatsD host (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// DogStatsD port (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Poll interval in milliseconds (overrides config)
    #[arg(short, long, value_name = "MS")]
    interval: Option<u64>,

    /// Global tag added to everything sent, `key:value` (repeatable)
    #[arg(short, long = "tag", value_name = "TAG")]
    tags: Vec<String>,

    /// PM2 home directory (overrides config and $PM2_HOME)
    #[arg(long, value_name = "DIR")]
    pm2_home: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    initialize_logging(args.debug);

    let mut config = match &args.config {
        Some(path) => {
            info!("Config file: {}", path.display());
            Config::load_from_file(path)?
        }
        None => Config::default(),
    };
    apply_overrides(&mut config, args);
    config.validate()?;

    info!(
        host = %config.host,
        port = config.port,
        interval = ?config.interval(),
        tags = ?config.global_tags,
        "starting pm2-datadog"
    );

    let sink = DogStatsd::connect(&config.host, config.port, config.global_tags.clone()).await;

    let home = config.resolved_pm2_home();
    let lister = Pm2Cli::new(config.pm2_bin.clone()).with_home(home);
    let source = Pm2Bus::new(config.pub_socket_path(), config.reconnect_backoff());

    Bridge::new(config, Arc::new(sink), Arc::new(lister))
        .run(Some(source))
        .await?;

    info!("pm2-datadog stopped");
    Ok(())
}

/// CLI values win over the file; `--tag` values are appended to the file's tags.
fn apply_overrides(config: &mut Config, args: Args) {
    if let Some(host) = args.host {
        config.host = host;
    }
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(interval) = args.interval {
        config.interval_ms = interval;
    }
    if let Some(home) = args.pm2_home {
        config.pm2_home = Some(home);
    }
    config.global_tags.extend(args.tags);
}

fn initialize_logging(debug: bool) {
    let level = if debug { "debug" } else { "info" };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}
