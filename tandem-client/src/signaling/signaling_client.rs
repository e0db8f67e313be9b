use crate::error::SignalingClientError;
use futures::{SinkExt, StreamExt};
use tandem_core::{ClientSignal, RelaySignal};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// WebSocket link to the relay.
///
/// Two background tasks own the socket: one writes queued
/// [`ClientSignal`]s as JSON text frames, the other parses incoming frames
/// into [`RelaySignal`]s. Dropping every sender closes the socket.
pub struct SignalingClient {
    outgoing: mpsc::UnboundedSender<ClientSignal>,
    incoming: mpsc::UnboundedReceiver<RelaySignal>,
}

impl SignalingClient {
    pub async fn connect(url: &str) -> Result<Self, SignalingClientError> {
        let (socket, _) = connect_async(url).await?;
        info!("Connected to relay at {}", url);

        let (mut sink, mut stream) = socket.split();
        let (outgoing, mut outgoing_rx) = mpsc::unbounded_channel::<ClientSignal>();
        let (incoming_tx, incoming) = mpsc::unbounded_channel::<RelaySignal>();

        tokio::spawn(async move {
            while let Some(signal) = outgoing_rx.recv().await {
                let json = match serde_json::to_string(&signal) {
                    Ok(json) => json,
                    Err(e) => {
                        warn!("Failed to serialize signal: {}", e);
                        continue;
                    }
                };
                if sink.send(Message::Text(json.into())).await.is_err() {
                    break;
                }
            }
            let _ = sink.close().await;
            debug!("Signaling writer finished");
        });

        tokio::spawn(async move {
            while let Some(Ok(msg)) = stream.next().await {
                match msg {
                    Message::Text(text) => match serde_json::from_str::<RelaySignal>(&text) {
                        Ok(signal) => {
                            if incoming_tx.send(signal).is_err() {
                                break;
                            }
                        }
                        Err(e) => warn!("Invalid relay signal: {}", e),
                    },
                    Message::Close(_) => break,
                    _ => {}
                }
            }
            debug!("Signaling reader finished");
        });

        Ok(Self { outgoing, incoming })
    }

    pub fn send(&self, signal: ClientSignal) -> Result<(), SignalingClientError> {
        self.outgoing
            .send(signal)
            .map_err(|_| SignalingClientError::Closed)
    }

    /// Next frame from the relay. `None` once the socket is gone.
    pub async fn recv(&mut self) -> Option<RelaySignal> {
        self.incoming.recv().await
    }

    pub fn into_parts(
        self,
    ) -> (
        mpsc::UnboundedSender<ClientSignal>,
        mpsc::UnboundedReceiver<RelaySignal>,
    ) {
        (self.outgoing, self.incoming)
    }
}
