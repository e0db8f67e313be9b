use anyhow::{Context, Result};
use clap::Parser;
use std::net::SocketAddr;
use std::sync::Arc;
use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;
use tandem_server::{ConnectionRegistry, DEFAULT_ROOM_CAPACITY, RelayConfig, SignalingRelay, serve};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// WebSocket signaling relay for two-party WebRTC calls.
#[derive(Parser, Debug)]
#[command(name = "tandem-relay", version)]
struct Args {
    /// Address to listen on. Takes precedence over --port.
    #[arg(long, env = "TANDEM_LISTEN")]
    listen: Option<SocketAddr>,

    /// Port to listen on, on all interfaces.
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// Origins allowed to open the signaling socket, comma separated.
    #[arg(
        long,
        env = "TANDEM_ALLOWED_ORIGINS",
        value_delimiter = ',',
        default_value = "*"
    )]
    allowed_origins: Vec<String>,

    /// Maximum members per room, 0 for no limit.
    #[arg(long, env = "TANDEM_ROOM_CAPACITY", default_value_t = DEFAULT_ROOM_CAPACITY)]
    room_capacity: usize,

    /// STUN URLs handed to clients, comma separated.
    #[arg(long, env = "TANDEM_STUN_URLS", value_delimiter = ',')]
    stun_urls: Vec<String>,

    #[arg(long, env = "TURN_URL")]
    turn_url: Option<String>,

    #[arg(long, env = "TURN_USERNAME")]
    turn_username: Option<String>,

    #[arg(long, env = "TURN_CREDENTIAL")]
    turn_credential: Option<String>,
}

impl Args {
    fn into_config(self) -> RelayConfig {
        let defaults = RelayConfig::default();

        let listen_addr = self
            .listen
            .or_else(|| self.port.map(|port| SocketAddr::from(([0, 0, 0, 0], port))))
            .unwrap_or(defaults.listen_addr);

        let mut ice_servers = if self.stun_urls.is_empty() {
            default_ice_servers()
        } else {
            vec![IceServerConfig {
                urls: self.stun_urls,
                username: None,
                credential: None,
            }]
        };
        if let Some(turn_url) = self.turn_url {
            ice_servers.push(IceServerConfig {
                urls: vec![turn_url],
                username: self.turn_username,
                credential: self.turn_credential,
            });
        }

        RelayConfig {
            listen_addr,
            allowed_origins: self.allowed_origins,
            room_capacity: self.room_capacity,
            ice_servers,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Args::parse().into_config();
    info!(
        "Starting relay (room capacity {}, origins {:?})",
        config.room_capacity, config.allowed_origins
    );

    let listener = TcpListener::bind(config.listen_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    let relay = SignalingRelay::new(Arc::new(ConnectionRegistry::new()), config);

    serve(listener, relay, shutdown_signal())
        .await
        .context("Relay server failed")?;

    info!("Relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("Shutdown requested");
    }
}
