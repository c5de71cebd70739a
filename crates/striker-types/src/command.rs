//! Behavior output and actuation command types.
//!
//! A behavior produces a [`GotoPosition`] (where to go, what to face, whether
//! to kick).  The motion layer turns it into a [`RobotCommand`], which is what
//! travels over the radio link.

use serde::{Deserialize, Serialize};

use crate::geometry::Point;

/// Kicker intention attached to a [`GotoPosition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Kick {
    /// Flat kick with the given power (0–127).
    Straight(u8),
    /// Chip kick with the given power (0–127).
    Chip(u8),
}

impl Kick {
    /// Signed wire value: positive for a flat kick, negative for a chip.
    pub fn to_wire(self) -> i8 {
        match self {
            Kick::Straight(p) => p.min(127) as i8,
            Kick::Chip(p) => -(p.min(127) as i8),
        }
    }

    /// Inverse of [`Kick::to_wire`]; `0` means no kick.
    pub fn from_wire(value: i8) -> Option<Kick> {
        match value {
            0 => None,
            v if v > 0 => Some(Kick::Straight(v as u8)),
            v => Some(Kick::Chip(v.unsigned_abs().min(127))),
        }
    }
}

/// Target produced by a low-level behavior for one robot and one tick.
///
/// A `None` destination means "hold position"; a `None` target means "keep
/// the current heading".
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GotoPosition {
    pub destination: Option<Point>,
    pub target: Option<Point>,
    pub kick: Option<Kick>,
    pub dribble: bool,
    /// Overrides the distance-based speed profile when set.
    pub forced_speed: Option<i16>,
}

impl GotoPosition {
    pub fn to(destination: Point) -> Self {
        Self {
            destination: Some(destination),
            ..Self::default()
        }
    }

    pub fn facing(mut self, target: Option<Point>) -> Self {
        self.target = target;
        self
    }

    pub fn with_kick(mut self, kick: Option<Kick>) -> Self {
        self.kick = kick;
        self
    }

    pub fn with_dribble(mut self, dribble: bool) -> Self {
        self.dribble = dribble;
        self
    }

    pub fn with_forced_speed(mut self, speed: Option<i16>) -> Self {
        self.forced_speed = speed;
        self
    }
}

/// Message type byte of a drive command frame.
pub const MESSAGE_TYPE_DRIVE: u8 = 1;

/// A single robot actuation command as carried by the outbound frame.
///
/// `direction` is the travel direction relative to the robot heading in
/// degrees, `speed` the travel speed in mm/s, `rotation` the rotation speed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RobotCommand {
    pub message_type: u8,
    pub robot_id: u8,
    pub direction: i16,
    pub speed: i16,
    pub rotation: i16,
    pub kick: i8,
    pub dribble: bool,
}

impl RobotCommand {
    /// A command that brings `robot_id` to a standstill.
    pub fn stop(robot_id: u8) -> Self {
        Self {
            message_type: MESSAGE_TYPE_DRIVE,
            robot_id,
            direction: 0,
            speed: 0,
            rotation: 0,
            kick: 0,
            dribble: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_is_negative_on_the_wire() {
        assert_eq!(Kick::Chip(40).to_wire(), -40);
        assert_eq!(Kick::Straight(100).to_wire(), 100);
        assert_eq!(Kick::Straight(255).to_wire(), 127);
        assert_eq!(Kick::from_wire(-40), Some(Kick::Chip(40)));
        assert_eq!(Kick::from_wire(-128), Some(Kick::Chip(127)));
        assert_eq!(Kick::from_wire(0), None);
    }

    #[test]
    fn goto_builder_sets_fields() {
        let g = GotoPosition::to(Point::new(1.0, 2.0))
            .facing(Some(Point::ORIGIN))
            .with_kick(Some(Kick::Straight(60)))
            .with_dribble(true);
        assert_eq!(g.destination, Some(Point::new(1.0, 2.0)));
        assert_eq!(g.target, Some(Point::ORIGIN));
        assert!(g.dribble);
        assert_eq!(g.forced_speed, None);
    }

    #[test]
    fn stop_command_is_all_zero() {
        let c = RobotCommand::stop(4);
        assert_eq!(c.robot_id, 4);
        assert_eq!((c.direction, c.speed, c.rotation, c.kick), (0, 0, 0, 0));
    }
}
