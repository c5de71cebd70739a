//! Destinations for encoded command frames.
//!
//! The dispatch task never talks to a socket directly; it hands every frame
//! to a [`CommandSink`].
//!
//! - [`UdpCommandSink`] – sends each frame as one datagram to the radio
//!   transmitter.
//! - [`MemorySink`] – records frames in memory, for tests and dry runs.

use std::net::SocketAddr;
use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use striker_types::{RobotCommand, StrikerError};
use tokio::net::UdpSocket;
use tracing::trace;

use crate::codec::{CommandCodec, FRAME_LEN};

/// Every outbound transport implements this trait.
#[async_trait]
pub trait CommandSink: Send + Sync {
    /// Transmit one encoded frame.
    async fn send(&self, frame: &[u8]) -> Result<(), StrikerError>;
}

/// Sends frames as UDP datagrams to a fixed target.
pub struct UdpCommandSink {
    socket: UdpSocket,
    target: SocketAddr,
}

impl UdpCommandSink {
    /// Bind an ephemeral local socket and aim it at `target`.
    pub async fn connect(target: SocketAddr) -> Result<Self, StrikerError> {
        let local: SocketAddr = if target.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };
        let socket = UdpSocket::bind(local).await?;
        Ok(Self { socket, target })
    }

    pub fn target(&self) -> SocketAddr {
        self.target
    }
}

#[async_trait]
impl CommandSink for UdpCommandSink {
    async fn send(&self, frame: &[u8]) -> Result<(), StrikerError> {
        let sent = self.socket.send_to(frame, self.target).await?;
        if sent != frame.len() {
            return Err(StrikerError::Io(format!(
                "short send to {}: {sent} of {} bytes",
                self.target,
                frame.len()
            )));
        }
        trace!(target = %self.target, len = sent, "frame sent");
        Ok(())
    }
}

/// Keeps every frame it is handed.
#[derive(Debug, Default)]
pub struct MemorySink {
    frames: Mutex<Vec<Vec<u8>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn frames(&self) -> Vec<Vec<u8>> {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Decode every recorded frame.
    pub fn commands(&self) -> Result<Vec<RobotCommand>, StrikerError> {
        self.frames().iter().map(|f| CommandCodec::decode(f)).collect()
    }

    pub fn clear(&self) {
        self.frames.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

#[async_trait]
impl CommandSink for MemorySink {
    async fn send(&self, frame: &[u8]) -> Result<(), StrikerError> {
        if frame.len() != FRAME_LEN {
            return Err(StrikerError::Codec(format!("refusing {}-byte frame", frame.len())));
        }
        self.frames
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(frame.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn memory_sink_records_frames() -> Result<(), Box<dyn std::error::Error>> {
        let sink = MemorySink::new();
        let frame = CommandCodec::encode(&RobotCommand::stop(3));
        sink.send(&frame).await?;
        assert_eq!(sink.commands()?, vec![RobotCommand::stop(3)]);

        assert!(sink.send(&frame[..4]).await.is_err());
        sink.clear();
        assert!(sink.frames().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn udp_sink_delivers_a_datagram() -> Result<(), Box<dyn std::error::Error>> {
        let receiver = UdpSocket::bind("127.0.0.1:0").await?;
        let sink = UdpCommandSink::connect(receiver.local_addr()?).await?;

        let frame = CommandCodec::encode(&RobotCommand::stop(9));
        sink.send(&frame).await?;

        let mut buf = [0u8; 64];
        let (len, _) = tokio::time::timeout(Duration::from_secs(1), receiver.recv_from(&mut buf)).await??;
        assert_eq!(CommandCodec::decode(&buf[..len])?, RobotCommand::stop(9));
        Ok(())
    }
}
