mod agent;
mod error;
mod media;
mod negotiation;
mod signaling;
mod transport;

pub use agent::*;
pub use error::*;
pub use media::*;
pub use negotiation::*;
pub use signaling::*;
pub use transport::*;
