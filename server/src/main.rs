//! Gridrealm Game Server
//!
//! Loads the configuration, builds the world and serves it over UDP until
//! interrupted.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use log::info;

use gridrealm_server::config::ServerConfig;
use gridrealm_server::network::Server;
use gridrealm_server::world::GameWorld;
use gridrealm_shared::DEFAULT_PORT;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// Address to bind to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,
    /// UDP port to listen on
    #[arg(short, long, default_value_t = DEFAULT_PORT)]
    port: u16,
    /// JSON config file; built-in defaults when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Override the tick interval in milliseconds
    #[arg(long)]
    tick_ms: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();
    info!("Starting Gridrealm server...");

    let mut config = match &args.config {
        Some(path) => ServerConfig::load(path)?,
        None => ServerConfig::default(),
    };
    if let Some(tick_ms) = args.tick_ms {
        config.tick_interval_ms = tick_ms;
    }

    let tick_interval = Duration::from_millis(config.tick_interval_ms.max(1));
    let client_timeout = Duration::from_secs(config.client_timeout_secs);

    let mut world = GameWorld::new(config)?;

    let address = format!("{}:{}", args.host, args.port);
    let mut server = Server::bind(&address, client_timeout).await?;

    info!("Server started successfully!");

    tokio::select! {
        _ = server.run(&mut world, tick_interval) => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
        }
    }

    Ok(())
}
