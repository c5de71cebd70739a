//! Match-log container: reader, writer and replay.
//!
//! ```text
//! header : "SSL_LOG_FILE" (12 bytes) | version i32 BE (= 1)
//! record : timestamp_ns i64 BE | type i32 BE | length i32 BE | payload
//! ```
//!
//! Record types: `1` blank, `2` vision wrapper, `3` referee.  Payloads are
//! the same bytes the live UDP channels receive, so [`replay`] feeds them
//! through [`ingest`] unchanged.
//!
//! A truncated trailing record ends iteration; the reader logs an error
//! rather than yielding a partial record.

use std::fs::File;
use std::io::{BufReader, ErrorKind, Read, Write};
use std::num::NonZeroU32;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use governor::{Quota, RateLimiter};
use striker_types::StrikerError;
use striker_world::World;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use crate::channel::WARNINGS_PER_SECOND;
use crate::wire::{ingest, IngestOptions, PacketKind};

pub const LOG_MAGIC: &[u8; 12] = b"SSL_LOG_FILE";
pub const LOG_VERSION: i32 = 1;

/// Records larger than this are treated as corruption.
pub const MAX_RECORD_BYTES: usize = 16 * 1024 * 1024;

const RECORD_HEADER_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogMessageType {
    Blank,
    Vision,
    Referee,
    Unknown(i32),
}

impl LogMessageType {
    pub fn to_wire(self) -> i32 {
        match self {
            LogMessageType::Blank => 1,
            LogMessageType::Vision => 2,
            LogMessageType::Referee => 3,
            LogMessageType::Unknown(code) => code,
        }
    }

    /// The live channel whose packets this record carries.
    pub fn packet_kind(self) -> Option<PacketKind> {
        match self {
            LogMessageType::Vision => Some(PacketKind::Vision),
            LogMessageType::Referee => Some(PacketKind::Referee),
            LogMessageType::Blank | LogMessageType::Unknown(_) => None,
        }
    }
}

impl From<i32> for LogMessageType {
    fn from(code: i32) -> Self {
        match code {
            1 => LogMessageType::Blank,
            2 => LogMessageType::Vision,
            3 => LogMessageType::Referee,
            other => LogMessageType::Unknown(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp_ns: i64,
    pub message_type: LogMessageType,
    pub payload: Vec<u8>,
}

// ────────────────────────────────────────────────────────────────────────────
// Reader
// ────────────────────────────────────────────────────────────────────────────

/// Iterates over the records of a log.
pub struct LogReader<R> {
    inner: R,
    records_read: u64,
    finished: bool,
}

impl LogReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StrikerError> {
        let path = path.as_ref();
        let file = File::open(path)
            .map_err(|e| StrikerError::LogFormat(format!("cannot open {}: {e}", path.display())))?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> LogReader<R> {
    /// Validate the header and position the reader on the first record.
    pub fn new(mut inner: R) -> Result<Self, StrikerError> {
        let mut header = [0u8; 16];
        inner
            .read_exact(&mut header)
            .map_err(|e| StrikerError::LogFormat(format!("missing header: {e}")))?;
        if &header[..12] != LOG_MAGIC {
            return Err(StrikerError::LogFormat("bad magic".to_string()));
        }
        let version = i32::from_be_bytes([header[12], header[13], header[14], header[15]]);
        if version != LOG_VERSION {
            return Err(StrikerError::LogFormat(format!("unsupported version {version}")));
        }
        Ok(Self {
            inner,
            records_read: 0,
            finished: false,
        })
    }

    pub fn records_read(&self) -> u64 {
        self.records_read
    }

    /// `Ok(None)` at a clean end of file.
    fn read_record(&mut self) -> Result<Option<LogRecord>, StrikerError> {
        let mut header = [0u8; RECORD_HEADER_LEN];
        let filled = fill(&mut self.inner, &mut header)?;
        if filled == 0 {
            return Ok(None);
        }
        if filled < RECORD_HEADER_LEN {
            return Err(StrikerError::LogFormat(format!(
                "truncated record header ({filled} of {RECORD_HEADER_LEN} bytes)"
            )));
        }

        let mut ts = [0u8; 8];
        ts.copy_from_slice(&header[..8]);
        let timestamp_ns = i64::from_be_bytes(ts);
        let message_type = LogMessageType::from(i32::from_be_bytes([header[8], header[9], header[10], header[11]]));
        let length = i32::from_be_bytes([header[12], header[13], header[14], header[15]]);
        let length = usize::try_from(length)
            .ok()
            .filter(|&l| l <= MAX_RECORD_BYTES)
            .ok_or_else(|| StrikerError::LogFormat(format!("invalid record length {length}")))?;

        let mut payload = vec![0u8; length];
        self.inner.read_exact(&mut payload).map_err(|e| match e.kind() {
            ErrorKind::UnexpectedEof => {
                StrikerError::LogFormat(format!("truncated payload, expected {length} bytes"))
            }
            _ => StrikerError::from(e),
        })?;

        self.records_read += 1;
        Ok(Some(LogRecord {
            timestamp_ns,
            message_type,
            payload,
        }))
    }
}

impl<R: Read> Iterator for LogReader<R> {
    type Item = LogRecord;

    fn next(&mut self) -> Option<LogRecord> {
        if self.finished {
            return None;
        }
        match self.read_record() {
            Ok(Some(record)) => Some(record),
            Ok(None) => {
                self.finished = true;
                None
            }
            Err(e) => {
                error!(after = self.records_read, error = %e, "log file ended abnormally");
                self.finished = true;
                None
            }
        }
    }
}

/// Read until `buf` is full or the input ends; returns the bytes read.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> Result<usize, StrikerError> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

// ────────────────────────────────────────────────────────────────────────────
// Writer
// ────────────────────────────────────────────────────────────────────────────

/// Writes a log in the same container format.
pub struct LogWriter<W: Write> {
    inner: W,
}

impl<W: Write> LogWriter<W> {
    pub fn new(mut inner: W) -> Result<Self, StrikerError> {
        inner.write_all(LOG_MAGIC)?;
        inner.write_all(&LOG_VERSION.to_be_bytes())?;
        Ok(Self { inner })
    }

    pub fn write_record(
        &mut self,
        timestamp_ns: i64,
        message_type: LogMessageType,
        payload: &[u8],
    ) -> Result<(), StrikerError> {
        let length = i32::try_from(payload.len())
            .map_err(|_| StrikerError::LogFormat(format!("payload of {} bytes too large", payload.len())))?;
        self.inner.write_all(&timestamp_ns.to_be_bytes())?;
        self.inner.write_all(&message_type.to_wire().to_be_bytes())?;
        self.inner.write_all(&length.to_be_bytes())?;
        self.inner.write_all(payload)?;
        Ok(())
    }

    pub fn into_inner(mut self) -> Result<W, StrikerError> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Replay
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReplayStats {
    pub records: u64,
    pub applied: u64,
    pub dropped: u64,
    pub skipped: u64,
}

/// Feed every record of `reader` into `world`, honouring the recorded
/// spacing divided by `speed`.  A `speed` that is not a positive finite
/// number replays as fast as possible.
///
/// Stops early when `shutdown` flips to `true`.
pub async fn replay<R: Read>(
    reader: LogReader<R>,
    world: Arc<World>,
    options: IngestOptions,
    speed: f64,
    mut shutdown: watch::Receiver<bool>,
) -> ReplayStats {
    let paced = speed.is_finite() && speed > 0.0;
    let per_second = NonZeroU32::new(WARNINGS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
    let warnings = RateLimiter::direct(Quota::per_second(per_second));
    let mut stats = ReplayStats::default();
    let mut origin: Option<(i64, Instant)> = None;

    info!(speed, "log replay started");
    for record in reader {
        if *shutdown.borrow() {
            break;
        }
        stats.records += 1;

        if paced {
            let (first_ns, started) = *origin.get_or_insert((record.timestamp_ns, Instant::now()));
            let offset_ns = record.timestamp_ns.saturating_sub(first_ns).max(0) as f64 / speed;
            let due = started + Duration::from_nanos(offset_ns as u64);
            tokio::select! {
                _ = tokio::time::sleep_until(due) => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        let Some(kind) = record.message_type.packet_kind() else {
            stats.skipped += 1;
            debug!(message_type = ?record.message_type, "skipping log record");
            continue;
        };
        match ingest(kind, &record.payload, &world, &options) {
            Ok(_) => stats.applied += 1,
            Err(e) => {
                stats.dropped += 1;
                if warnings.check().is_ok() {
                    warn!(channel = kind.name(), timestamp_ns = record.timestamp_ns, error = %e, "dropping malformed log record");
                }
            }
        }
    }

    info!(
        records = stats.records,
        applied = stats.applied,
        dropped = stats.dropped,
        skipped = stats.skipped,
        "log replay finished"
    );
    stats
}
