mod error;
mod registry;
mod relay;
mod signaling;

pub use error::*;
pub use registry::*;
pub use relay::*;
pub use signaling::*;
