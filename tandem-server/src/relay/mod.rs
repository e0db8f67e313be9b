mod relay_config;
mod signaling_relay;

pub use relay_config::*;
pub use signaling_relay::*;
