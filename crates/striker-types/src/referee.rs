//! Referee protocol enumerations.
//!
//! Numeric values match the referee box wire encoding so that packets can be
//! converted with [`TryFrom<u32>`].

use serde::{Deserialize, Serialize};

use crate::{StrikerError, TeamColor};

/// Command issued by the referee box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RefereeCommand {
    Halt,
    Stop,
    NormalStart,
    ForceStart,
    PrepareKickoffYellow,
    PrepareKickoffBlue,
    PreparePenaltyYellow,
    PreparePenaltyBlue,
    DirectFreeYellow,
    DirectFreeBlue,
    IndirectFreeYellow,
    IndirectFreeBlue,
    TimeoutYellow,
    TimeoutBlue,
    GoalYellow,
    GoalBlue,
}

impl RefereeCommand {
    /// The team a set-piece command is awarded to, if any.
    pub fn favors(&self) -> Option<TeamColor> {
        use RefereeCommand::*;
        match self {
            PrepareKickoffYellow | PreparePenaltyYellow | DirectFreeYellow
            | IndirectFreeYellow | TimeoutYellow | GoalYellow => Some(TeamColor::Yellow),
            PrepareKickoffBlue | PreparePenaltyBlue | DirectFreeBlue | IndirectFreeBlue
            | TimeoutBlue | GoalBlue => Some(TeamColor::Blue),
            Halt | Stop | NormalStart | ForceStart => None,
        }
    }

    /// `true` for the two commands that resume open play.
    pub fn is_start(&self) -> bool {
        matches!(self, RefereeCommand::NormalStart | RefereeCommand::ForceStart)
    }
}

impl TryFrom<u32> for RefereeCommand {
    type Error = StrikerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use RefereeCommand::*;
        Ok(match value {
            0 => Halt,
            1 => Stop,
            2 => NormalStart,
            3 => ForceStart,
            4 => PrepareKickoffYellow,
            5 => PrepareKickoffBlue,
            6 => PreparePenaltyYellow,
            7 => PreparePenaltyBlue,
            8 => DirectFreeYellow,
            9 => DirectFreeBlue,
            10 => IndirectFreeYellow,
            11 => IndirectFreeBlue,
            12 => TimeoutYellow,
            13 => TimeoutBlue,
            14 => GoalYellow,
            15 => GoalBlue,
            other => {
                return Err(StrikerError::MalformedPacket {
                    channel: "referee".to_string(),
                    reason: format!("unknown command {other}"),
                });
            }
        })
    }
}

/// Coarse phase of the match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    NormalFirstHalfPre,
    NormalFirstHalf,
    NormalHalfTime,
    NormalSecondHalfPre,
    NormalSecondHalf,
    ExtraTimeBreak,
    ExtraFirstHalfPre,
    ExtraFirstHalf,
    ExtraHalfTime,
    ExtraSecondHalfPre,
    ExtraSecondHalf,
    PenaltyShootoutBreak,
    PenaltyShootout,
    PostGame,
}

impl TryFrom<u32> for Stage {
    type Error = StrikerError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        use Stage::*;
        Ok(match value {
            0 => NormalFirstHalfPre,
            1 => NormalFirstHalf,
            2 => NormalHalfTime,
            3 => NormalSecondHalfPre,
            4 => NormalSecondHalf,
            5 => ExtraTimeBreak,
            6 => ExtraFirstHalfPre,
            7 => ExtraFirstHalf,
            8 => ExtraHalfTime,
            9 => ExtraSecondHalfPre,
            10 => ExtraSecondHalf,
            11 => PenaltyShootoutBreak,
            12 => PenaltyShootout,
            13 => PostGame,
            other => {
                return Err(StrikerError::MalformedPacket {
                    channel: "referee".to_string(),
                    reason: format!("unknown stage {other}"),
                });
            }
        })
    }
}
