use std::{path::PathBuf, process::ExitCode, sync::Arc};

use {
    clap::Parser,
    tracing::{error, info},
    tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt},
};

use hopper_gateway::state::Registry;

#[derive(Parser)]
#[command(
    name = "hopper",
    about = "Hopper — in-memory message broker over HTTP and WebSocket"
)]
struct Cli {
    /// Load configuration from a file. Without it a single server runs on
    /// 127.0.0.1:3682 with no TLS and no authentication.
    #[arg(short = 'c', long)]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Output logs as JSON instead of human-readable.
    #[arg(long, default_value_t = false)]
    json_logs: bool,
}

fn init_telemetry(cli: &Cli) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));

    if cli.json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(true))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false).with_ansi(true))
            .init();
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_telemetry(&cli);

    let config = match &cli.config {
        Some(path) => match hopper_config::load(path) {
            Ok(config) => config,
            Err(e) => {
                error!("{e:#}");
                return ExitCode::from(2);
            }
        },
        None => hopper_config::Config::default(),
    };

    info!(
        version = env!("CARGO_PKG_VERSION"),
        servers = config.servers.len(),
        "hopper starting"
    );

    let registry = Arc::new(Registry::new());
    match hopper_gateway::server::run(&config, registry).await {
        Ok(()) => {
            info!("hopper stopped");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("{e:#}");
            ExitCode::FAILURE
        }
    }
}
