//! Blocker (disturber): puts itself between an object and the thing it
//! must not reach.
//!
//! The destination is `object` moved `distance` towards `subject`, never
//! past the subject, then clipped to the field rectangle.  Two cases share
//! that rule:
//!
//! - single size: the subject is inside the field and the standoff lands on
//!   the segment between both points;
//! - double size: the subject sits on or beyond the goal line (a goal
//!   centre, say), so the raw standoff can leave the field and the clip to
//!   ±half length / ±half width keeps the blocker playable.

use striker_types::{GotoPosition, Point};
use striker_world::{RobotSnapshot, WorldSnapshot};

use super::{remember, Behavior};

#[derive(Debug, Clone, Default)]
pub struct Blocker {
    distance: f64,
    subject: Option<Point>,
    object: Option<Point>,
    field_width: f64,
    field_length: f64,
    last: GotoPosition,
}

impl Blocker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(
        &mut self,
        distance: f64,
        subject: Option<Point>,
        object: Option<Point>,
        field_width: f64,
        field_length: f64,
    ) {
        self.distance = distance;
        self.subject = subject;
        self.object = object;
        self.field_width = field_width;
        self.field_length = field_length;
    }

    fn block_position(&self, subject: Point, object: Point) -> Point {
        let standoff = self.distance.min(object.distance(subject));
        let p = object.toward(subject, standoff);
        let (half_length, half_width) = (self.field_length / 2.0, self.field_width / 2.0);
        Point::new(p.x.clamp(-half_length, half_length), p.y.clamp(-half_width, half_width))
    }
}

impl Behavior for Blocker {
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, _world: &WorldSnapshot) -> GotoPosition {
        let (Some(_), Some(subject), Some(object)) = (robot, self.subject, self.object) else {
            return self.last;
        };
        let next = GotoPosition::to(self.block_position(subject, object)).facing(Some(object));
        remember(&mut self.last, next)
    }

    fn last(&self) -> GotoPosition {
        self.last
    }
}
