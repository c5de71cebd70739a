//! Counter: waits at a free position, or at the centre of its zone.

use striker_types::{GotoPosition, Point};
use striker_world::{FieldZone, RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Counter {
    zone: Option<FieldZone>,
    ball: Option<Point>,
    free_position: Option<Point>,
    last: GotoPosition,
}

impl Counter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Without a `zone` the MIDDLE zone of the enemy half is used.
    pub fn update(&mut self, zone: Option<FieldZone>, ball: Option<Point>, free_position: Option<Point>) {
        self.zone = zone;
        self.ball = ball;
        self.free_position = free_position;
    }
}

impl Behavior for Counter {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, world: &WorldSnapshot) -> GotoPosition {
        if robot.is_none() {
            return self.last;
        }
        let destination = self.free_position.unwrap_or_else(|| {
            let zone = self
                .zone
                .unwrap_or_else(|| FieldZone::middle(world.ally_side().opposite()));
            world.field.zone(zone).center_point()
        });
        let next = GotoPosition {
            destination: Some(destination),
            target: self.ball,
            ..GotoPosition::default()
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
    fn prefers_free_position() {
        let world = empty_world();
        let mut counter = Counter::new();
        let free = Point::new(1500.0, -1200.0);
        counter.update(Some(FieldZone::WestMiddle), Some(Point::ORIGIN), Some(free));
        let out = counter.calculate(Some(&robot_at(6, 0.0, 0.0)), &world);
        assert_eq!(out.destination, Some(free));
        assert_eq!(out.target, Some(Point::ORIGIN));
    }

    #[test]
    fn falls_back_to_zone_centre() {
        let world = empty_world();
        let mut counter = Counter::new();
        counter.update(Some(FieldZone::WestMiddle), None, None);
        let expected = world.field.zone(FieldZone::WestMiddle).center_point();
        let out = counter.calculate(Some(&robot_at(6, 0.0, 0.0)), &world);
        assert_eq!(out.destination, Some(expected));
        assert_eq!(out.target, None);
    }

    #[test]
    fn default_zone_is_enemy_middle() {
        // Ally plays west, so the enemy half is east.
        let world = empty_world();
        let mut counter = Counter::new();
        counter.update(None, None, None);
        let out = counter.calculate(Some(&robot_at(6, 0.0, 0.0)), &world);
        assert_eq!(out.destination, Some(Point::new(1250.0, 0.0)));
    }

    #[test]
    fn missing_robot_returns_previous() {
        let world = empty_world();
        let mut counter = Counter::new();
        assert_eq!(counter.calculate(None, &world), GotoPosition::default());
    }
}
