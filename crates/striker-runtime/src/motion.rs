//! Motion control: from a behavior's [`GotoPosition`] to a wire-ready
//! [`RobotCommand`].
//!
//! The destination is routed around the other robots with
//! [`striker_planner::plan`]; the robot drives towards the first waypoint.
//!
//! | Quantity | Rule |
//! |---|---|
//! | direction | heading error towards the next waypoint, robot frame (°) |
//! | speed | `max + 200` beyond the slow-down distance, linear ramp below it |
//! | rotation | `error / 180 · 1000 ± 200`, damped by the current speed |
//! | dribble | requested, or the ball is close and roughly ahead |
//! | kick | only while dribbling at the destination, at most once per cooldown |

use std::collections::HashMap;

use striker_planner::{plan, Bounds};
use striker_types::geometry::{angle_difference, normalize_angle};
use striker_types::{Circle, GotoPosition, Point, RobotCommand, StrikerError, MESSAGE_TYPE_DRIVE, ROBOT_DIAMETER};
use striker_world::{RobotSnapshot, WorldSnapshot};
use tracing::trace;

/// Below this distance to the next waypoint the robot starts braking (mm).
pub const SLOW_DOWN_DISTANCE: f64 = 450.0;
/// Braking distance when a forced speed is requested (mm).
pub const FORCED_SLOW_DOWN_DISTANCE: f64 = 90.0;
/// Cruise speed (mm/s).
pub const MAX_SPEED: f64 = 3000.0;
/// Offset added to every non-zero drive speed to overcome static friction.
pub const START_UP_SPEED: f64 = 200.0;
pub const MAX_ROTATION_SPEED: f64 = 1000.0;
pub const START_UP_ROTATION_SPEED: f64 = 200.0;
/// Radius of another robot as seen by the planner (mm).
pub const OBSTACLE_RADIUS: f64 = ROBOT_DIAMETER / 2.0 + 15.0;
/// Closer than this to the waypoint the robot is considered there (mm).
pub const ARRIVAL_TOLERANCE: f64 = 10.0;
/// Ball closer than this, and within [`DRIBBLE_ANGLE`], turns the dribbler on.
pub const DRIBBLE_RANGE: f64 = ROBOT_DIAMETER / 2.0 + 200.0;
pub const DRIBBLE_ANGLE: f64 = 20.0;
/// A kick is released within this distance of the destination (mm).
pub const KICK_RANGE: f64 = ROBOT_DIAMETER / 2.0 + 15.0;
/// Minimum time between two kicks of the same robot (s).
pub const KICK_COOLDOWN: f64 = 1.0;

/// Converts behavior targets into drive commands, one robot at a time.
#[derive(Debug, Default)]
pub struct MotionController {
    last_kick: HashMap<u32, f64>,
}

impl MotionController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the drive command for `robot` heading for `goto`.
    ///
    /// `now` is the world clock (seconds) and only gates the kick cooldown.
    pub fn command(
        &mut self,
        robot: &RobotSnapshot,
        goto: &GotoPosition,
        world: &WorldSnapshot,
        now: f64,
    ) -> Result<RobotCommand, StrikerError> {
        let robot_id = u8::try_from(robot.id).map_err(|_| StrikerError::Behavior {
            robot_id: robot.id,
            reason: "robot id does not fit the command frame".to_string(),
        })?;
        let position = robot.position;
        let heading_error = |from: Point, to: Point| normalize_angle(robot.orientation - from.angle_to(to));

        let dribble = goto.dribble || ball_at_feet(robot, world);

        let Some(destination) = goto.destination else {
            let rotation = goto
                .target
                .map_or(0.0, |t| rotation_speed(heading_error(position, t), 0.0));
            return Ok(RobotCommand {
                message_type: MESSAGE_TYPE_DRIVE,
                robot_id,
                direction: 0,
                speed: 0,
                rotation: saturate(rotation),
                kick: 0,
                dribble,
            });
        };

        let obstacles: Vec<Circle> = world
            .online_robots()
            .filter(|r| !(r.team == robot.team && r.id == robot.id))
            .map(|r| Circle::new(r.position, OBSTACLE_RADIUS))
            .collect();
        let margin = world.field.boundary_width;
        let bounds = Bounds::centered(world.field.half_length() + margin, world.field.half_width() + margin);
        let route = plan(position, destination, &obstacles, ROBOT_DIAMETER / 2.0, bounds);
        let Some(next) = route.next_waypoint() else {
            return Ok(RobotCommand::stop(robot_id));
        };

        let distance = position.distance(next);
        let direction = heading_error(position, next);
        let mut speed = match route.waypoints.get(1) {
            // Brake earlier ahead of a sharp turn.
            Some(after) => {
                let turn = turn_angle(position, next, *after);
                ramp(distance + SLOW_DOWN_DISTANCE * (1.0 - turn / 180.0), SLOW_DOWN_DISTANCE, MAX_SPEED)
            }
            None => ramp(distance, SLOW_DOWN_DISTANCE, MAX_SPEED),
        };
        let rotation = goto
            .target
            .map_or(0.0, |t| rotation_speed(heading_error(position, t), speed));
        if let Some(forced) = goto.forced_speed.filter(|s| *s > 0) {
            speed = ramp(distance, FORCED_SLOW_DOWN_DISTANCE, f64::from(forced));
        }
        if distance < ARRIVAL_TOLERANCE {
            speed = 0.0;
        }

        let kick = match goto.kick {
            Some(kick) if dribble && distance < KICK_RANGE && self.kick_ready(robot.id, now) => {
                self.last_kick.insert(robot.id, now);
                kick.to_wire()
            }
            _ => 0,
        };

        let command = RobotCommand {
            message_type: MESSAGE_TYPE_DRIVE,
            robot_id,
            direction: saturate(direction),
            speed: saturate(speed),
            rotation: saturate(rotation),
            kick,
            dribble,
        };
        trace!(id = robot.id, ?command, waypoints = route.waypoints.len(), fallback = route.fallback, "motion");
        Ok(command)
    }

    fn kick_ready(&self, id: u32, now: f64) -> bool {
        self.last_kick.get(&id).is_none_or(|last| now - last > KICK_COOLDOWN)
    }
}

/// Linear ramp up to `max` over `slow_down` millimetres plus the start-up
/// offset.
fn ramp(distance: f64, slow_down: f64, max: f64) -> f64 {
    let offset = if max > 0.0 { START_UP_SPEED } else { -START_UP_SPEED };
    if distance > slow_down {
        max + offset
    } else {
        distance / slow_down * max + offset
    }
}

/// Turn rate for a heading error of `error` degrees while driving at `speed`.
fn rotation_speed(error: f64, speed: f64) -> f64 {
    let base = error / 180.0 * MAX_ROTATION_SPEED;
    let with_start_up = if base < 0.0 {
        base - START_UP_ROTATION_SPEED
    } else {
        base + START_UP_ROTATION_SPEED
    };
    with_start_up * (1.0 - speed.abs() / (MAX_SPEED * 1.5))
}

/// Heading change at `via` when driving `from → via → to`, in `[0, 180]`.
fn turn_angle(from: Point, via: Point, to: Point) -> f64 {
    angle_difference(via.angle_to(to), from.angle_to(via)).abs()
}

fn ball_at_feet(robot: &RobotSnapshot, world: &WorldSnapshot) -> bool {
    world.ball_position().is_some_and(|ball| {
        let bearing = robot.position.angle_to(ball);
        angle_difference(robot.orientation, bearing).abs() < DRIBBLE_ANGLE
            && robot.position.distance(ball) < DRIBBLE_RANGE
    })
}

fn saturate(v: f64) -> i16 {
    v.round().clamp(f64::from(i16::MIN), f64::from(i16::MAX)) as i16
}
