use crate::error::AgentStopped;
use crate::media::MediaKind;
use tandem_core::ConnectionId;
use tokio::sync::mpsc;

/// Requests to a running [`CallAgent`](crate::CallAgent).
#[derive(Debug)]
pub enum CallCommand<T> {
    JoinRoom {
        room: String,
        email: Option<String>,
    },

    Call { to: ConnectionId },

    /// Swap the outgoing track of the same kind, e.g. camera for screen.
    ReplaceTrack(T),

    SetMediaEnabled { kind: MediaKind, enabled: bool },

    EndCall,

    Shutdown,
}

/// Cloneable front end of a [`CallAgent`](crate::CallAgent).
pub struct CallHandle<T> {
    commands: mpsc::Sender<CallCommand<T>>,
}

impl<T> Clone for CallHandle<T> {
    fn clone(&self) -> Self {
        Self {
            commands: self.commands.clone(),
        }
    }
}

impl<T> CallHandle<T> {
    pub(crate) fn new(commands: mpsc::Sender<CallCommand<T>>) -> Self {
        Self { commands }
    }

    pub async fn join_room(
        &self,
        room: impl Into<String>,
        email: Option<String>,
    ) -> Result<(), AgentStopped> {
        self.send(CallCommand::JoinRoom {
            room: room.into(),
            email,
        })
        .await
    }

    pub async fn call(&self, to: ConnectionId) -> Result<(), AgentStopped> {
        self.send(CallCommand::Call { to }).await
    }

    pub async fn replace_track(&self, track: T) -> Result<(), AgentStopped> {
        self.send(CallCommand::ReplaceTrack(track)).await
    }

    pub async fn set_media_enabled(&self, kind: MediaKind, enabled: bool) -> Result<(), AgentStopped> {
        self.send(CallCommand::SetMediaEnabled { kind, enabled })
            .await
    }

    pub async fn end_call(&self) -> Result<(), AgentStopped> {
        self.send(CallCommand::EndCall).await
    }

    pub async fn shutdown(&self) -> Result<(), AgentStopped> {
        self.send(CallCommand::Shutdown).await
    }

    pub async fn send(&self, command: CallCommand<T>) -> Result<(), AgentStopped> {
        self.commands.send(command).await.map_err(|_| AgentStopped)
    }
}
