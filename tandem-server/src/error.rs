use tandem_core::ConnectionId;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// The identity was never registered or has already been unregistered.
    #[error("connection {0} is not registered")]
    UnknownConnection(ConnectionId),
}
