//! `striker-types` – shared vocabulary of the Striker workspace.
//!
//! - [`geometry`] – points, angles, circles and polygons.
//! - [`referee`] – referee command and stage enums.
//! - [`command`] – behavior output ([`GotoPosition`]) and the outbound
//!   [`RobotCommand`].
//!
//! The crate root holds the small enums every layer needs, the world
//! notification [`Event`], and the global [`StrikerError`].

pub mod command;
pub mod geometry;
pub mod referee;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub use command::{GotoPosition, Kick, RobotCommand, MESSAGE_TYPE_DRIVE};
pub use geometry::{Circle, Point, Polygon, Pose};
pub use referee::{RefereeCommand, Stage};

/// Diameter of a robot, in millimetres.
pub const ROBOT_DIAMETER: f64 = 180.0;

/// Diameter of the ball, in millimetres.
pub const BALL_DIAMETER: f64 = 43.0;

/// Jersey colour of a team.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TeamColor {
    Yellow,
    Blue,
}

impl TeamColor {
    pub fn opponent(self) -> TeamColor {
        match self {
            TeamColor::Yellow => TeamColor::Blue,
            TeamColor::Blue => TeamColor::Yellow,
        }
    }
}

impl TryFrom<u8> for TeamColor {
    type Error = StrikerError;

    /// Wire encoding: `0` yellow, `1` blue.
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(TeamColor::Yellow),
            1 => Ok(TeamColor::Blue),
            other => Err(StrikerError::UnknownTeam(other)),
        }
    }
}

impl std::str::FromStr for TeamColor {
    type Err = StrikerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "yellow" => Ok(TeamColor::Yellow),
            "blue" => Ok(TeamColor::Blue),
            other => Err(StrikerError::Config(format!("unknown team colour {other:?}"))),
        }
    }
}

impl std::fmt::Display for TeamColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TeamColor::Yellow => write!(f, "yellow"),
            TeamColor::Blue => write!(f, "blue"),
        }
    }
}

/// Tactical assignment of an ally robot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Keeper,
    Defender,
    Attacker,
    Blocker,
    #[default]
    Unassigned,
}

/// Unified notification emitted by the world model and the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    /// e.g., "striker-world::ball"
    pub source: String,
    pub payload: EventPayload,
}

impl Event {
    pub fn new(source: impl Into<String>, payload: EventPayload) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            source: source.into(),
            payload,
        }
    }
}

/// Variants of data routed over the notification channel.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventPayload {
    RobotUpdated {
        team: TeamColor,
        id: u32,
        position: Point,
        orientation: f64,
    },
    RobotCreated {
        team: TeamColor,
        id: u32,
    },
    BallUpdated {
        position: Point,
        velocity: Point,
    },
    RefereeUpdated {
        command: RefereeCommand,
        counter: u32,
        stage: Stage,
    },
    GeometryUpdated,
    ModeChanged(String),
    RoleAssigned {
        id: u32,
        role: Role,
    },
    CommandDropped {
        id: u32,
        reason: String,
    },
}

/// Global error type spanning wire decoding, world updates and dispatch.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum StrikerError {
    #[error("Malformed {channel} packet: {reason}")]
    MalformedPacket { channel: String, reason: String },

    #[error("Unknown team colour value: {0}")]
    UnknownTeam(u8),

    #[error("Non-finite value in {0}")]
    NonFinite(String),

    #[error("Command codec error: {0}")]
    Codec(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Channel error: {0}")]
    Channel(String),

    #[error("Behavior failed for robot {robot_id}: {reason}")]
    Behavior { robot_id: u32, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Log file error: {0}")]
    LogFormat(String),
}

impl From<std::io::Error> for StrikerError {
    fn from(e: std::io::Error) -> Self {
        StrikerError::Io(e.to_string())
    }
}
