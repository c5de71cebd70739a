//! WebSocket world feed.
//!
//! [`WorldFeed`] serves a WebSocket endpoint for external viewers.  Every
//! client receives newline-terminated JSON [`FeedMessage`]s: a snapshot as
//! soon as it connects, every bus event as it happens, and a fresh snapshot
//! at a fixed interval.  The feed only reads; nothing a client sends is
//! applied.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use striker_types::{Event, StrikerError};
use striker_world::{World, WorldSnapshot};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, watch};
use tokio::time::MissedTickBehavior;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};

use crate::bus::EventBus;

/// One line of the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data", rename_all = "snake_case")]
pub enum FeedMessage {
    Event(Event),
    Snapshot(WorldSnapshot),
}

impl FeedMessage {
    fn to_line(&self) -> Result<String, StrikerError> {
        let mut line = serde_json::to_string(self).map_err(|e| StrikerError::Channel(e.to_string()))?;
        line.push('\n');
        Ok(line)
    }
}

#[derive(Clone)]
pub struct WorldFeed {
    bus: EventBus,
    world: Arc<World>,
    snapshot_interval: Duration,
}

impl WorldFeed {
    pub fn new(bus: EventBus, world: Arc<World>, snapshot_interval: Duration) -> Self {
        Self {
            bus,
            world,
            snapshot_interval: snapshot_interval.max(Duration::from_millis(10)),
        }
    }

    /// Bind `addr` and serve clients until `shutdown` flips to `true`.
    pub async fn run(self, addr: SocketAddr, shutdown: watch::Receiver<bool>) -> Result<(), StrikerError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| StrikerError::Io(format!("feed bind error on {addr}: {e}")))?;
        self.serve(listener, shutdown).await;
        Ok(())
    }

    /// Serve clients on an already bound listener.
    pub async fn serve(self, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        info!(addr = ?listener.local_addr().ok(), "world feed listening");
        loop {
            tokio::select! {
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let feed = self.clone();
                        let client_shutdown = shutdown.clone();
                        tokio::spawn(async move {
                            if let Err(e) = feed.handle_client(stream, peer, client_shutdown).await {
                                error!(%peer, error = %e, "feed client error");
                            }
                        });
                    }
                    Err(e) => error!(error = %e, "feed accept error"),
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        info!("world feed stopped");
    }

    async fn handle_client(
        &self,
        stream: TcpStream,
        peer: SocketAddr,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), StrikerError> {
        let ws_stream = accept_async(stream)
            .await
            .map_err(|e| StrikerError::Channel(format!("ws handshake from {peer}: {e}")))?;
        let (mut ws_tx, mut ws_rx) = ws_stream.split();
        let mut events = self.bus.subscribe_all();
        let mut ticker = tokio::time::interval(self.snapshot_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        debug!(%peer, "feed client connected");

        loop {
            let message = tokio::select! {
                // First tick fires immediately: the client starts with a snapshot.
                _ = ticker.tick() => FeedMessage::Snapshot(self.world.snapshot()),
                result = events.recv() => match result {
                    Ok(event) => FeedMessage::Event(event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(%peer, lagged_by = n, "feed client lagged");
                        continue;
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                incoming = ws_rx.next() => match incoming {
                    Some(Ok(Message::Close(_))) | None | Some(Err(_)) => break,
                    Some(Ok(_)) => continue,
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        let _ = ws_tx.send(Message::Close(None)).await;
                        break;
                    }
                    continue;
                }
            };
            if ws_tx.send(Message::Text(message.to_line()?.into())).await.is_err() {
                break;
            }
        }

        debug!(%peer, "feed client disconnected");
        Ok(())
    }
}
