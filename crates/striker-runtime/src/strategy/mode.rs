//! Team modes and their tuning constants.

use std::fmt;

use serde::{Deserialize, Serialize};
use striker_types::{Kick, RefereeCommand, TeamColor};
use striker_world::FieldGeometry;

/// Set-piece strategy selected by a referee command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StandardStrategy {
    Halt,
    Stop,
    KickOffAttack,
    KickOffDefense,
    FreeKickAttack,
    FreeKickDefense,
    PenaltyAttack,
    PenaltyDefense,
    Timeout,
    GoalScored,
}

/// Team-level tactical state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Mode {
    Attack,
    #[default]
    Defense,
    Standard(StandardStrategy),
}

impl Mode {
    /// `true` for the two open-play modes.
    pub fn is_open_play(&self) -> bool {
        matches!(self, Mode::Attack | Mode::Defense)
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mode::Attack => f.write_str("attack"),
            Mode::Defense => f.write_str("defense"),
            Mode::Standard(s) => write!(f, "standard:{s:?}"),
        }
    }
}

/// Set-piece strategy for `command` when we play as `ally`.
///
/// Returns `None` for NORMAL_START and FORCE_START, which resume open play.
pub fn strategy_for(command: RefereeCommand, ally: TeamColor) -> Option<StandardStrategy> {
    use RefereeCommand::*;
    use StandardStrategy as S;

    let ours = command.favors() == Some(ally);
    let pick = |attack: StandardStrategy, defense: StandardStrategy| if ours { attack } else { defense };

    Some(match command {
        NormalStart | ForceStart => return None,
        Halt => S::Halt,
        Stop => S::Stop,
        PrepareKickoffYellow | PrepareKickoffBlue => pick(S::KickOffAttack, S::KickOffDefense),
        PreparePenaltyYellow | PreparePenaltyBlue => pick(S::PenaltyAttack, S::PenaltyDefense),
        DirectFreeYellow | DirectFreeBlue | IndirectFreeYellow | IndirectFreeBlue => {
            pick(S::FreeKickAttack, S::FreeKickDefense)
        }
        TimeoutYellow | TimeoutBlue => S::Timeout,
        GoalYellow | GoalBlue => S::GoalScored,
    })
}

// ────────────────────────────────────────────────────────────────────────────
// Parameters
// ────────────────────────────────────────────────────────────────────────────

/// Distances and kick strengths used when configuring behaviors.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModeParameters {
    /// Keeper standoff from the goal centre.
    pub keeper_distance: f64,
    /// Keeper standoff while defending a penalty.
    pub penalty_keeper_distance: f64,
    /// Defender standoff from the own goal centre.
    pub defender_distance: f64,
    /// Sideways spacing between defenders.
    pub defender_spacing: f64,
    pub coverer_distance: f64,
    pub disturber_defense: f64,
    pub disturber_attack: f64,
    pub disturber_stop: f64,
    pub free_shot_kick: Kick,
    pub pass_kick: Kick,
    pub clear_kick: Kick,
    pub free_kick: Kick,
    /// Opponents in our half above which open play turns defensive.
    pub attacker_threshold: usize,
}

impl ModeParameters {
    pub fn for_field(field: &FieldGeometry) -> Self {
        Self {
            keeper_distance: field.goal_width / 2.0,
            penalty_keeper_distance: 100.0,
            defender_distance: field.defense_radius + field.defense_stretch / 2.0 + 50.0,
            defender_spacing: 250.0,
            coverer_distance: 250.0,
            disturber_defense: 300.0,
            disturber_attack: 200.0,
            disturber_stop: 700.0,
            free_shot_kick: Kick::Straight(100),
            pass_kick: Kick::Straight(70),
            clear_kick: Kick::Chip(40),
            free_kick: Kick::Straight(60),
            attacker_threshold: 3,
        }
    }
}

impl Default for ModeParameters {
    fn default() -> Self {
        Self::for_field(&FieldGeometry::default())
    }
}
