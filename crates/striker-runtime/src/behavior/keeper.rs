//! Goal keeper.

use striker_types::{GotoPosition, Point};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

/// Clearance kept from the goal line and from the goal posts.
pub const POST_MARGIN: f64 = 100.0;

/// Closer than this to the destination the keeper stops correcting.
pub const HOLD_DISTANCE: f64 = 15.0;

/// Guards the goal from a fixed standoff on the goal→ball ray.
#[derive(Debug, Clone, Default)]
pub struct Keeper {
    distance_to_goal: f64,
    go_to_kick: bool,
    ball: Option<Point>,
    goal_center: Option<Point>,
    y_max: f64,
    last: GotoPosition,
}

impl Keeper {
    pub fn new() -> Self {
        Self::default()
    }

    /// * `distance_to_goal` – standoff from the goal centre.
    /// * `go_to_kick` – drive onto the ball instead of guarding.
    /// * `y_max` – half the goal width; the keeper stays `POST_MARGIN`
    ///   inside it.
    pub fn update(
        &mut self,
        distance_to_goal: f64,
        go_to_kick: bool,
        ball: Option<Point>,
        goal_center: Option<Point>,
        y_max: f64,
    ) {
        self.distance_to_goal = distance_to_goal;
        self.go_to_kick = go_to_kick;
        self.ball = ball;
        self.goal_center = goal_center;
        self.y_max = y_max;
    }

    fn guard_position(&self, ball: Point, goal: Point) -> Point {
        let mut p = goal.translate(goal.angle_to(ball), self.distance_to_goal);
        // Never behind or on the goal line, whichever end we defend.
        if goal.x > 0.0 {
            p.x = p.x.min(goal.x - POST_MARGIN);
        } else if goal.x < 0.0 {
            p.x = p.x.max(goal.x + POST_MARGIN);
        }
        let limit = (self.y_max - POST_MARGIN).max(0.0);
        p.y = p.y.clamp(goal.y - limit, goal.y + limit);
        p
    }
}

impl Behavior for Keeper {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(robot), Some(ball), Some(goal)) = (robot, self.ball, self.goal_center) else {
            return self.last;
        };

        let destination = if self.go_to_kick {
            ball
        } else {
            self.guard_position(ball, goal)
        };
        let destination = (robot.position.distance(destination) >= HOLD_DISTANCE).then_some(destination);

        let next = GotoPosition {
            destination,
            target: Some(ball),
            ..GotoPosition::default()
        };
        remember(&mut self.last, next)
    }

    fn last(&self) -> GotoPosition {
        self.last
    }
}
