//! UDP ingestion channels.
//!
//! One [`UdpChannel`] task runs per inbound source.  Each datagram goes
//! through the [`wire`](crate::wire) dispatch table; a malformed payload is
//! dropped with a rate-limited warning and the channel keeps listening.
//! The task ends when the shutdown watch flips to `true`, dropping its
//! socket.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use striker_types::StrikerError;
use striker_world::World;
use tokio::net::UdpSocket;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::wire::{ingest, IngestOptions, PacketKind, MAX_PACKET_BYTES};

/// Malformed-packet warnings emitted per second per channel.
pub const WARNINGS_PER_SECOND: u32 = 2;

/// Counters reported when a channel stops.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChannelStats {
    pub received: u64,
    pub applied: u64,
    pub dropped: u64,
}

/// Bind a UDP socket for `addr`, joining the group when `addr` is an IPv4
/// multicast address.
pub async fn bind(addr: SocketAddr) -> Result<UdpSocket, StrikerError> {
    match addr.ip() {
        IpAddr::V4(group) if group.is_multicast() => {
            let socket = UdpSocket::bind(SocketAddr::from((Ipv4Addr::UNSPECIFIED, addr.port()))).await?;
            socket.join_multicast_v4(group, Ipv4Addr::UNSPECIFIED)?;
            Ok(socket)
        }
        _ => Ok(UdpSocket::bind(addr).await?),
    }
}

pub struct UdpChannel {
    kind: PacketKind,
    socket: UdpSocket,
    world: Arc<World>,
    options: IngestOptions,
    warnings: DefaultDirectRateLimiter,
    stats: ChannelStats,
}

impl UdpChannel {
    pub fn new(kind: PacketKind, socket: UdpSocket, world: Arc<World>, options: IngestOptions) -> Self {
        let per_second = NonZeroU32::new(WARNINGS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        Self {
            kind,
            socket,
            world,
            options,
            warnings: RateLimiter::direct(Quota::per_second(per_second)),
            stats: ChannelStats::default(),
        }
    }

    pub fn local_addr(&self) -> Result<SocketAddr, StrikerError> {
        Ok(self.socket.local_addr()?)
    }

    /// Receive and apply datagrams until `shutdown` becomes `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) -> ChannelStats {
        let channel = self.kind.name();
        info!(channel, addr = ?self.socket.local_addr().ok(), "ingestion channel started");
        let mut buf = vec![0u8; MAX_PACKET_BYTES];

        loop {
            let received = tokio::select! {
                result = self.socket.recv_from(&mut buf) => result,
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            };
            match received {
                Ok((len, peer)) => self.handle(&buf[..len], peer),
                Err(e) => {
                    if self.warnings.check().is_ok() {
                        warn!(channel, error = %e, "receive failed");
                    }
                }
            }
        }

        info!(
            channel,
            received = self.stats.received,
            applied = self.stats.applied,
            dropped = self.stats.dropped,
            "ingestion channel stopped"
        );
        self.stats
    }

    fn handle(&mut self, bytes: &[u8], peer: SocketAddr) {
        self.stats.received += 1;
        match ingest(self.kind, bytes, &self.world, &self.options) {
            Ok(changed) => {
                self.stats.applied += 1;
                debug!(channel = self.kind.name(), %peer, changed, "packet applied");
            }
            Err(e) => {
                self.stats.dropped += 1;
                if self.warnings.check().is_ok() {
                    warn!(
                        channel = self.kind.name(),
                        %peer,
                        len = bytes.len(),
                        dropped = self.stats.dropped,
                        error = %e,
                        "dropping malformed packet"
                    );
                }
            }
        }
    }
}
