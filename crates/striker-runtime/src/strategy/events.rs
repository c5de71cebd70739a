//! Game events derived from consecutive world snapshots.
//!
//! [`EventDetector`] keeps the few values it needs from the previous poll
//! and reports what changed, in priority order:
//!
//! 1. a new referee command,
//! 2. ball capture by a team, or a change of owner within a team (only
//!    while the ball rolls slower than [`SETTLED_BALL_SPEED`]),
//! 3. the ball crossing the midline,
//! 4. the ball crossing the north/south axis,
//! 5. a change in the number of opponents in our half.
//!
//! The first poll only records a baseline for the crossing and count events.

use serde::{Deserialize, Serialize};
use striker_types::{RefereeCommand, TeamColor};
use striker_world::WorldSnapshot;
use tracing::trace;

/// Ball speed (mm/s) below which ownership changes are trusted.
pub const SETTLED_BALL_SPEED: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    RefereeNewCommand(RefereeCommand),
    BallAllyCapture,
    BallEnemyCapture,
    BallAllyChangeOwner,
    BallEnemyChangeOwner,
    BallMovesPastMidline,
    BallMovesPastNorthSouth,
    EnemyAttackCountChange(usize),
}

#[derive(Debug, Clone, Default)]
pub struct EventDetector {
    referee_counter: Option<u32>,
    owner: Option<(TeamColor, u32)>,
    ball_x_sign: Option<bool>,
    ball_y_sign: Option<bool>,
    attackers: Option<usize>,
}

impl EventDetector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compare `snapshot` with the previous poll and return the events that
    /// fired.
    pub fn poll(&mut self, snapshot: &WorldSnapshot, keeper_id: u32) -> Vec<GameEvent> {
        let mut events = Vec::new();

        if let (Some(command), Some(counter)) = (snapshot.referee.command, snapshot.referee.counter) {
            if self.referee_counter != Some(counter) {
                self.referee_counter = Some(counter);
                events.push(GameEvent::RefereeNewCommand(command));
            }
        }

        if let Some(ball) = snapshot.ball.as_ref() {
            if ball.speed() < SETTLED_BALL_SPEED {
                if let Some(event) = self.owner_event(ball.owner, snapshot.ally) {
                    events.push(event);
                }
                self.owner = ball.owner;
            }

            let x_sign = sign(ball.position.x);
            if crossed(&mut self.ball_x_sign, x_sign) {
                events.push(GameEvent::BallMovesPastMidline);
            }
            let y_sign = sign(ball.position.y);
            if crossed(&mut self.ball_y_sign, y_sign) {
                events.push(GameEvent::BallMovesPastNorthSouth);
            }
        }

        let attackers = snapshot.attacking_enemies_count(keeper_id);
        if self.attackers.is_some_and(|previous| previous != attackers) {
            events.push(GameEvent::EnemyAttackCountChange(attackers));
        }
        self.attackers = Some(attackers);

        if !events.is_empty() {
            trace!(?events, "game events");
        }
        events
    }

    fn owner_event(&self, owner: Option<(TeamColor, u32)>, ally: TeamColor) -> Option<GameEvent> {
        let (team, id) = owner?;
        let ours = team == ally;
        match self.owner {
            Some((previous_team, previous_id)) if previous_team == team => {
                (previous_id != id).then_some(if ours {
                    GameEvent::BallAllyChangeOwner
                } else {
                    GameEvent::BallEnemyChangeOwner
                })
            }
            _ => Some(if ours {
                GameEvent::BallAllyCapture
            } else {
                GameEvent::BallEnemyCapture
            }),
        }
    }
}

/// `Some(true)` for positive, `Some(false)` for negative, `None` on the axis.
fn sign(v: f64) -> Option<bool> {
    if v > 0.0 {
        Some(true)
    } else if v < 0.0 {
        Some(false)
    } else {
        None
    }
}

/// Record `now` and report whether it flipped relative to the stored sign.
fn crossed(stored: &mut Option<bool>, now: Option<bool>) -> bool {
    let Some(now) = now else {
        return false;
    };
    let flipped = stored.is_some_and(|before| before != now);
    *stored = Some(now);
    flipped
}
