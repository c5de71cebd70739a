//! `striker-middleware` – everything between the sockets and the world.
//!
//! Moves bytes in and out of the decision core without caring about
//! tactics.
//!
//! # Modules
//!
//! - [`wire`] – inbound packet schema and the static decode/apply dispatch
//!   table shared by live channels and log replay.
//! - [`channel`] – UDP ingestion tasks with rate-limited malformed-packet
//!   warnings.
//! - [`codec`] – the 11-byte outbound command frame.
//! - [`sink`] – [`CommandSink`] transports for encoded frames.
//! - [`log_file`] – match-log container reader, writer and replay.
//! - [`bus`] – topic-based notification bus built on Tokio broadcast channels.
//! - [`feed`] – WebSocket endpoint streaming events and snapshots as JSON.
//!
//! # Example
//!
//! ```rust
//! use striker_middleware::CommandCodec;
//! use striker_types::RobotCommand;
//!
//! let frame = CommandCodec::encode(&RobotCommand::stop(3));
//! assert_eq!(frame.len(), 11);
//! assert_eq!(CommandCodec::decode(&frame).unwrap(), RobotCommand::stop(3));
//! ```

pub mod bus;
pub mod channel;
pub mod codec;
pub mod feed;
pub mod log_file;
pub mod sink;
pub mod wire;

pub use bus::{EventBus, Topic, TopicReceiver};
pub use channel::{ChannelStats, UdpChannel};
pub use codec::{CommandCodec, FRAME_LEN};
pub use feed::{FeedMessage, WorldFeed};
pub use log_file::{LogMessageType, LogReader, LogRecord, LogWriter, ReplayStats};
pub use sink::{CommandSink, MemorySink, UdpCommandSink};
pub use wire::{IngestOptions, PacketKind};
