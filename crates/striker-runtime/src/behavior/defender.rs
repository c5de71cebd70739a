//! Defender: shields a reference point (usually the own goal) from the ball.

use striker_types::{GotoPosition, Point};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Defender {
    distance: f64,
    ball: Option<Point>,
    reference: Option<Point>,
    lateral_offset: f64,
    last: GotoPosition,
}

impl Defender {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stand `distance` from `reference` towards `ball`, shifted
    /// `lateral_offset` millimetres to the left of that line (negative:
    /// right).
    pub fn update(&mut self, distance: f64, ball: Option<Point>, reference: Option<Point>, lateral_offset: f64) {
        self.distance = distance;
        self.ball = ball;
        self.reference = reference;
        self.lateral_offset = lateral_offset;
    }
}

impl Behavior for Defender {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(_), Some(ball), Some(reference)) = (robot, self.ball, self.reference) else {
            return self.last;
        };

        let on_line = reference.toward(ball, self.distance);
        let destination = if self.lateral_offset == 0.0 {
            on_line
        } else {
            on_line.translate(reference.angle_to(ball) + 90.0, self.lateral_offset)
        };

        let next = GotoPosition::to(destination).facing(Some(ball));
        remember(&mut self.last, next)
    }

    fn last(&self) -> GotoPosition {
        self.last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::tests::{empty_world, robot_at};

    #[test]
    fn stands_between_goal_and_ball() {
        let world = empty_world();
        let mut defender = Defender::new();
        defender.update(1300.0, Some(Point::new(0.0, 0.0)), Some(Point::new(-4500.0, 0.0)), 0.0);

        let out = defender.calculate(Some(&robot_at(2, 0.0, 1000.0)), &world);
        let dest = out.destination.unwrap_or_default();
        assert!(dest.distance(Point::new(-3200.0, 0.0)) < 1e-6);
        assert_eq!(out.target, Some(Point::new(0.0, 0.0)));
    }

    #[test]
    fn lateral_offset_is_perpendicular() {
        let world = empty_world();
        let mut defender = Defender::new();
        defender.update(1300.0, Some(Point::new(0.0, 0.0)), Some(Point::new(-4500.0, 0.0)), 250.0);

        let dest = defender
            .calculate(Some(&robot_at(2, 0.0, 0.0)), &world)
            .destination
            .unwrap_or_default();
        assert!(dest.distance(Point::new(-3200.0, 250.0)) < 1e-6);

        defender.update(1300.0, Some(Point::new(0.0, 0.0)), Some(Point::new(-4500.0, 0.0)), -250.0);
        let dest = defender
            .calculate(Some(&robot_at(2, 0.0, 0.0)), &world)
            .destination
            .unwrap_or_default();
        assert!(dest.distance(Point::new(-3200.0, -250.0)) < 1e-6);
    }

    #[test]
    fn missing_ball_keeps_previous_target() {
        let world = empty_world();
        let mut defender = Defender::new();
        defender.update(1300.0, None, Some(Point::new(-4500.0, 0.0)), 0.0);
        assert_eq!(defender.calculate(Some(&robot_at(2, 0.0, 0.0)), &world), GotoPosition::default());

        defender.update(1300.0, Some(Point::new(0.0, 0.0)), Some(Point::new(-4500.0, 0.0)), 0.0);
        let placed = defender.calculate(Some(&robot_at(2, 0.0, 0.0)), &world);
        defender.update(1300.0, None, None, 0.0);
        assert_eq!(defender.calculate(Some(&robot_at(2, 0.0, 0.0)), &world), placed);
        assert_eq!(defender.calculate(None, &world), placed);
    }
}
