use std::net::SocketAddr;
use tandem_core::IceServerConfig;
use tandem_core::utils::default_ice_servers;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:8000";

/// Rooms are meant for one caller and one callee.
pub const DEFAULT_ROOM_CAPACITY: usize = 2;

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub listen_addr: SocketAddr,
    /// Origins allowed to open the signaling socket. `"*"` allows any.
    pub allowed_origins: Vec<String>,
    /// Maximum members per room; zero disables the limit.
    pub room_capacity: usize,
    /// Handed to every client in its `welcome` frame.
    pub ice_servers: Vec<IceServerConfig>,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            listen_addr: SocketAddr::from(([0, 0, 0, 0], 8000)),
            allowed_origins: vec!["*".to_owned()],
            room_capacity: DEFAULT_ROOM_CAPACITY,
            ice_servers: default_ice_servers(),
        }
    }
}

impl RelayConfig {
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.is_empty() || self.allowed_origins.iter().any(|o| o == "*")
    }
}
