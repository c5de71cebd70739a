//! Attacker: takes the ball when it is the closest ally, supports otherwise.

use striker_types::{GotoPosition, Kick, Point, ROBOT_DIAMETER};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Attacker {
    free_position: Option<Point>,
    ball: Option<Point>,
    kick: Option<Kick>,
    dribble: bool,
    shoot_target: Option<Point>,
    is_closest: bool,
    last: GotoPosition,
}

impl Attacker {
    pub fn new() -> Self {
        Self::default()
    }

    /// * `free_position` – where to support from when not on the ball.
    /// * `shoot_target` – the point the ball should travel to.
    /// * `is_closest` – whether this robot is the ally nearest the ball.
    pub fn update(
        &mut self,
        free_position: Option<Point>,
        ball: Option<Point>,
        kick: Option<Kick>,
        dribble: bool,
        shoot_target: Option<Point>,
        is_closest: bool,
    ) {
        self.free_position = free_position;
        self.ball = ball;
        self.kick = kick;
        self.dribble = dribble;
        self.shoot_target = shoot_target;
        self.is_closest = is_closest;
    }

    /// Where to stand to play the ball towards `target`.
    pub fn stance(ball: Point, target: Point) -> Point {
        ball.translate(ball.angle_to(target) + 180.0, ROBOT_DIAMETER / 2.0)
    }
}

impl Behavior for Attacker {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(_), Some(ball)) = (robot, self.ball) else {
            return self.last;
        };

        let next = if self.is_closest {
            let Some(target) = self.shoot_target else {
                return self.last;
            };
            GotoPosition::to(Self::stance(ball, target))
                .facing(Some(target))
                .with_kick(self.kick)
                .with_dribble(self.dribble)
        } else {
            GotoPosition {
                destination: self.free_position,
                target: Some(ball),
                ..GotoPosition::default()
            }
        };
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
    fn closest_robot_lines_up_behind_ball() {
        let world = empty_world();
        let mut attacker = Attacker::new();
        let goal = Point::new(4500.0, 0.0);
        attacker.update(None, Some(Point::new(4000.0, 0.0)), Some(Kick::Straight(100)), true, Some(goal), true);

        let out = attacker.calculate(Some(&robot_at(3, 0.0, 0.0)), &world);
        let dest = out.destination.unwrap_or_default();
        assert!(dest.distance(Point::new(4000.0 - ROBOT_DIAMETER / 2.0, 0.0)) < 1e-6);
        assert_eq!(out.target, Some(goal));
        assert_eq!(out.kick, Some(Kick::Straight(100)));
        assert!(out.dribble);
    }

    #[test]
    fn supporter_goes_to_free_position() {
        let world = empty_world();
        let mut attacker = Attacker::new();
        let free = Point::new(2000.0, 1500.0);
        let ball = Point::new(0.0, 0.0);
        attacker.update(Some(free), Some(ball), Some(Kick::Straight(100)), false, Some(Point::new(4500.0, 0.0)), false);

        let out = attacker.calculate(Some(&robot_at(3, 0.0, 0.0)), &world);
        assert_eq!(out.destination, Some(free));
        assert_eq!(out.target, Some(ball));
        assert_eq!(out.kick, None);
    }

    #[test]
    fn supporter_without_free_position_stays() {
        let world = empty_world();
        let mut attacker = Attacker::new();
        attacker.update(None, Some(Point::new(0.0, 0.0)), None, false, None, false);
        assert_eq!(attacker.calculate(Some(&robot_at(3, 0.0, 0.0)), &world).destination, None);
    }

    #[test]
    fn tolerates_missing_inputs() {
        let world = empty_world();
        let mut attacker = Attacker::new();
        attacker.update(None, None, None, false, None, true);
        assert_eq!(attacker.calculate(Some(&robot_at(3, 0.0, 0.0)), &world), GotoPosition::default());

        attacker.update(None, Some(Point::new(0.0, 0.0)), None, false, None, true);
        assert_eq!(attacker.calculate(Some(&robot_at(3, 0.0, 0.0)), &world), GotoPosition::default());
        assert_eq!(attacker.calculate(None, &world), GotoPosition::default());
    }
}
