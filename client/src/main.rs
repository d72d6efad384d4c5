use clap::Parser;
use client::network::{Client, ClientConfig};
use log::info;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Room server address, host:port
    #[arg(default_value = "127.0.0.1:7400")]
    server: String,

    /// Local port for server and room traffic (0 picks a free one)
    #[arg(short = 'p', long, default_value_t = 0)]
    port: u16,

    /// Display name shown to other players
    #[arg(short = 'n', long)]
    name: String,

    /// Pause before each drawn ball is sent, in milliseconds
    #[arg(short = 'd', long, default_value_t = 1000)]
    draw_delay_ms: u64,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let server_addr = tokio::net::lookup_host(&args.server)
        .await?
        .next()
        .ok_or_else(|| format!("could not resolve {}", args.server))?;

    info!("Starting client {}", args.name);
    info!("Room server: {}", server_addr);

    let config = ClientConfig {
        server_addr,
        bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), args.port),
        name: args.name,
        draw_delay: Duration::from_millis(args.draw_delay_ms),
    };

    let mut client = Client::new(config).await?;
    client.run().await?;

    Ok(())
}
