//! Inbound packet schema and the static decode/apply dispatch table.
//!
//! Both inbound sources deliver `bincode`-encoded serde structures:
//!
//! | Kind | Payload | Applied through |
//! |---|---|---|
//! | [`PacketKind::Vision`] | [`WrapperPacket`] | `apply_ball_detection`, `apply_detection`, `apply_geometry` |
//! | [`PacketKind::Referee`] | [`RefereePacket`] | `apply_referee_packet` |
//!
//! [`HANDLERS`] maps each kind to its decode and apply functions.  The UDP
//! channels and log replay both go through [`ingest`], so live and recorded
//! traffic take exactly the same path into the world.

use serde::{Deserialize, Serialize};
use striker_types::{Point, Pose, RefereeCommand, Stage, StrikerError, TeamColor};
use striker_world::{ApplyOutcome, FieldGeometry, RefereeUpdate, TeamInfo, World};
use tracing::{debug, warn};

/// Upper bound on an accepted datagram.
pub const MAX_PACKET_BYTES: usize = 64 * 1024;

// ────────────────────────────────────────────────────────────────────────────
// Vision
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallDetection {
    pub confidence: f32,
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotDetection {
    /// `0` yellow, `1` blue.
    pub team: u8,
    pub robot_id: u32,
    pub confidence: f32,
    pub x: f64,
    pub y: f64,
    /// Degrees.
    pub orientation: f64,
}

/// One camera frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionFrame {
    pub frame_number: u32,
    /// Capture time, seconds.
    pub t_capture: f64,
    pub camera_id: u32,
    pub balls: Vec<BallDetection>,
    pub robots: Vec<RobotDetection>,
}

/// Top-level vision datagram.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WrapperPacket {
    pub detection: Option<DetectionFrame>,
    pub geometry: Option<FieldGeometry>,
}

// ────────────────────────────────────────────────────────────────────────────
// Referee
// ────────────────────────────────────────────────────────────────────────────

/// Referee box datagram.  `stage` and `command` carry the numeric wire codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefereePacket {
    pub stage: u32,
    pub command: u32,
    pub command_counter: u32,
    /// Microseconds since the epoch.
    pub command_timestamp: u64,
    pub stage_time_left: i64,
    pub yellow: TeamInfo,
    pub blue: TeamInfo,
}

impl TryFrom<RefereePacket> for RefereeUpdate {
    type Error = StrikerError;

    fn try_from(packet: RefereePacket) -> Result<Self, Self::Error> {
        Ok(RefereeUpdate {
            command: RefereeCommand::try_from(packet.command)?,
            counter: packet.command_counter,
            stage: Stage::try_from(packet.stage)?,
            stage_time_left: packet.stage_time_left,
            yellow: packet.yellow,
            blue: packet.blue,
        })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Dispatch table
// ────────────────────────────────────────────────────────────────────────────

/// Which inbound stream a payload belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    Vision,
    Referee,
}

impl PacketKind {
    pub fn name(self) -> &'static str {
        match self {
            PacketKind::Vision => "vision",
            PacketKind::Referee => "referee",
        }
    }
}

/// A decoded inbound packet.
#[derive(Debug, Clone, PartialEq)]
pub enum Packet {
    Vision(WrapperPacket),
    Referee(RefereePacket),
}

/// Options that influence how decoded packets are applied.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IngestOptions {
    /// Detections below this confidence are dropped.
    pub min_confidence: f32,
}

impl Default for IngestOptions {
    fn default() -> Self {
        Self { min_confidence: 0.1 }
    }
}

pub type DecodeFn = fn(&[u8]) -> Result<Packet, StrikerError>;
pub type ApplyFn = fn(&World, Packet, &IngestOptions) -> Result<usize, StrikerError>;

/// Decode and apply functions of one [`PacketKind`].
#[derive(Debug, Clone, Copy)]
pub struct PacketHandler {
    pub kind: PacketKind,
    pub decode: DecodeFn,
    pub apply: ApplyFn,
}

/// Static dispatch table, indexed by [`PacketKind`].
pub static HANDLERS: [PacketHandler; 2] = [
    PacketHandler {
        kind: PacketKind::Vision,
        decode: decode_vision,
        apply: apply_vision,
    },
    PacketHandler {
        kind: PacketKind::Referee,
        decode: decode_referee,
        apply: apply_referee,
    },
];

pub fn handler(kind: PacketKind) -> &'static PacketHandler {
    match kind {
        PacketKind::Vision => &HANDLERS[0],
        PacketKind::Referee => &HANDLERS[1],
    }
}

/// Decode `bytes` as `kind` and apply the result to `world`.
///
/// Returns the number of world objects that changed.
pub fn ingest(
    kind: PacketKind,
    bytes: &[u8],
    world: &World,
    options: &IngestOptions,
) -> Result<usize, StrikerError> {
    let handler = handler(kind);
    let packet = (handler.decode)(bytes)?;
    (handler.apply)(world, packet, options)
}

fn malformed(kind: PacketKind, reason: impl ToString) -> StrikerError {
    StrikerError::MalformedPacket {
        channel: kind.name().to_string(),
        reason: reason.to_string(),
    }
}

fn check_size(kind: PacketKind, bytes: &[u8]) -> Result<(), StrikerError> {
    if bytes.is_empty() {
        return Err(malformed(kind, "empty payload"));
    }
    if bytes.len() > MAX_PACKET_BYTES {
        return Err(malformed(kind, format!("{} bytes exceeds limit", bytes.len())));
    }
    Ok(())
}

fn decode_vision(bytes: &[u8]) -> Result<Packet, StrikerError> {
    check_size(PacketKind::Vision, bytes)?;
    bincode::deserialize::<WrapperPacket>(bytes)
        .map(Packet::Vision)
        .map_err(|e| malformed(PacketKind::Vision, e))
}

fn decode_referee(bytes: &[u8]) -> Result<Packet, StrikerError> {
    check_size(PacketKind::Referee, bytes)?;
    bincode::deserialize::<RefereePacket>(bytes)
        .map(Packet::Referee)
        .map_err(|e| malformed(PacketKind::Referee, e))
}

fn changed(outcome: ApplyOutcome) -> usize {
    usize::from(outcome != ApplyOutcome::Ignored)
}

fn apply_vision(world: &World, packet: Packet, options: &IngestOptions) -> Result<usize, StrikerError> {
    let Packet::Vision(wrapper) = packet else {
        return Err(malformed(PacketKind::Vision, "not a vision packet"));
    };
    let mut count = 0;

    if let Some(geometry) = wrapper.geometry {
        count += changed(world.apply_geometry(geometry));
    }

    let Some(frame) = wrapper.detection else {
        return Ok(count);
    };

    // Only the most confident ball is tracked.
    let ball = frame
        .balls
        .iter()
        .filter(|b| b.confidence >= options.min_confidence)
        .max_by(|a, b| a.confidence.total_cmp(&b.confidence));
    if let Some(ball) = ball {
        let position = Point::new(ball.x, ball.y);
        match world.apply_ball_detection(position, frame.t_capture, frame.camera_id) {
            Ok(outcome) => count += changed(outcome),
            Err(e) => warn!(camera = frame.camera_id, error = %e, "ball detection rejected"),
        }
    }

    for robot in &frame.robots {
        if robot.confidence < options.min_confidence {
            continue;
        }
        let team = match TeamColor::try_from(robot.team) {
            Ok(team) => team,
            Err(e) => {
                warn!(camera = frame.camera_id, robot = robot.robot_id, error = %e, "robot detection rejected");
                continue;
            }
        };
        let pose = Pose::new(robot.x, robot.y, robot.orientation);
        match world.apply_detection(team, robot.robot_id, pose, frame.t_capture, frame.camera_id) {
            Ok(outcome) => count += changed(outcome),
            Err(e) => warn!(camera = frame.camera_id, robot = robot.robot_id, error = %e, "robot detection rejected"),
        }
    }

    debug!(frame = frame.frame_number, camera = frame.camera_id, applied = count, "vision frame applied");
    Ok(count)
}

fn apply_referee(world: &World, packet: Packet, _options: &IngestOptions) -> Result<usize, StrikerError> {
    let Packet::Referee(referee) = packet else {
        return Err(malformed(PacketKind::Referee, "not a referee packet"));
    };
    let update = RefereeUpdate::try_from(referee)?;
    Ok(changed(world.apply_referee_packet(update)))
}

/// Encode a vision wrapper for the wire.
pub fn encode_vision(packet: &WrapperPacket) -> Result<Vec<u8>, StrikerError> {
    bincode::serialize(packet).map_err(|e| malformed(PacketKind::Vision, e))
}

/// Encode a referee packet for the wire.
pub fn encode_referee(packet: &RefereePacket) -> Result<Vec<u8>, StrikerError> {
    bincode::serialize(packet).map_err(|e| malformed(PacketKind::Referee, e))
}
