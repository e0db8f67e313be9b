mod connection;
mod descriptor;
mod signaling;

pub use connection::ConnectionId;
pub use descriptor::Descriptor;
pub use signaling::{ClientSignal, IceServerConfig, RelaySignal};
