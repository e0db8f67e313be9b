mod negotiation_session;
mod negotiation_state;
mod session_event;

pub use negotiation_session::*;
pub use negotiation_state::*;
pub use session_event::*;
