//! Runner: gets open for a pass.

use striker_types::{GotoPosition, Point};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Runner {
    ball: Option<Point>,
    free_position: Option<Point>,
    last: GotoPosition,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, ball: Option<Point>, free_position: Option<Point>) {
        self.ball = ball;
        self.free_position = free_position;
    }
}

impl Behavior for Runner {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(_), Some(free)) = (robot, self.free_position) else {
            return self.last;
        };
        let next = GotoPosition {
            destination: Some(free),
            target: self.ball,
            ..GotoPosition::default()
        };
        remember(&mut self.last, next)
    }

    fn last(&self) -> GotoPosition {
        self.last
    }
}
