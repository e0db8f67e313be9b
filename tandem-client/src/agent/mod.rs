mod agent_event;
mod call_agent;
mod call_command;

pub use agent_event::*;
pub use call_agent::*;
pub use call_command::*;
