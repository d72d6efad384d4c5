use clap::Parser;
use log::info;
use server::config::ServerConfig;
use server::network::Server;
use shared::{DEFAULT_MAX_MEMBERS, DEFAULT_MAX_ROOMS, DEFAULT_PROBE_PERIOD_SECS, DEFAULT_SERVER_PORT};
use std::net::IpAddr;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Control port; liveness traffic uses the next port up
    #[arg(default_value_t = DEFAULT_SERVER_PORT)]
    port: u16,

    /// Address to bind both sockets to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: IpAddr,

    /// Maximum number of rooms active at once
    #[arg(long, default_value_t = DEFAULT_MAX_ROOMS)]
    max_rooms: usize,

    /// Maximum number of members per room
    #[arg(long, default_value_t = DEFAULT_MAX_MEMBERS)]
    max_members: usize,

    /// Seconds between liveness probes
    #[arg(long, default_value_t = DEFAULT_PROBE_PERIOD_SECS)]
    probe_period_secs: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let config = ServerConfig {
        max_rooms: args.max_rooms,
        max_members: args.max_members,
        probe_period: Duration::from_secs(args.probe_period_secs),
        ..ServerConfig::on_port(args.host, args.port)
    };

    info!(
        "Starting server on ports {} and {}",
        config.control_addr.port(),
        config.probe_addr.port()
    );

    let mut server = Server::new(config).await?;

    tokio::select! {
        _ = server.run() => {}
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, shutting down");
        }
    }

    Ok(())
}
