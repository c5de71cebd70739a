//! Coverer: marks an opponent from the side of an object.

use striker_types::{GotoPosition, Point};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Coverer {
    distance: f64,
    object: Option<Point>,
    subject: Option<Point>,
    last: GotoPosition,
}

impl Coverer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stand `distance` from `subject` on its `object` side.
    pub fn update(&mut self, distance: f64, object: Option<Point>, subject: Option<Point>) {
        self.distance = distance;
        self.object = object;
        self.subject = subject;
    }
}

impl Behavior for Coverer {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(_), Some(object), Some(subject)) = (robot, self.object, self.subject) else {
            return self.last;
        };
        let next = GotoPosition::to(subject.toward(object, self.distance)).facing(Some(subject));
        remember(&mut self.last, next)
    }

    fn last(&self) -> GotoPosition {
        self.last
    }
}
