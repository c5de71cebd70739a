//! Immutable copies of the world handed to the decision layer.
//!
//! A [`WorldSnapshot`] is taken once at the start of a tick; everything the
//! engine and the behaviors compute reads from it, so a tick never observes a
//! half-applied detection.  The derived queries (possession, attacking
//! enemies, motion permission) live here so they are pure functions of one
//! consistent state.

use serde::{Deserialize, Serialize};
use striker_types::geometry::{point_in_polygon, segment_distance};
use striker_types::{Point, RefereeCommand, Role, Stage, TeamColor, ROBOT_DIAMETER};

use crate::field::{FieldGeometry, FieldZone, Goal, Side};

/// Distance every robot must keep from the ball during STOP.
pub const STOP_BALL_DISTANCE: f64 = 500.0;

/// Per-team information announced by the referee.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TeamInfo {
    pub name: String,
    pub score: u32,
    pub red_cards: u32,
    pub yellow_cards: u32,
    pub timeouts_left: u32,
    /// Robot id of the goalkeeper, once the referee has announced one.
    pub goalie: Option<u32>,
}

/// Referee state as last accepted by the world.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefereeState {
    pub command: Option<RefereeCommand>,
    pub counter: Option<u32>,
    pub stage: Option<Stage>,
    /// Microseconds left in the current stage.
    pub stage_time_left: i64,
    pub yellow: TeamInfo,
    pub blue: TeamInfo,
    pub update_count: u64,
}

impl RefereeState {
    pub fn team(&self, color: TeamColor) -> &TeamInfo {
        match color {
            TeamColor::Yellow => &self.yellow,
            TeamColor::Blue => &self.blue,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BallSnapshot {
    pub position: Point,
    pub velocity: Point,
    /// `(team, robot id)` of the robot currently in possession.
    pub owner: Option<(TeamColor, u32)>,
    pub last_update: f64,
    pub update_count: u64,
}

impl BallSnapshot {
    pub fn speed(&self) -> f64 {
        self.velocity.length()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotSnapshot {
    pub id: u32,
    pub team: TeamColor,
    pub position: Point,
    /// Degrees, `(-180, 180]`.
    pub orientation: f64,
    pub velocity: Point,
    pub role: Role,
    pub online: bool,
    pub visible: bool,
    pub last_update: f64,
    pub update_count: u64,
}

/// A self-consistent copy of the whole world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub field: FieldGeometry,
    /// `None` until the ball has been detected at least once.
    pub ball: Option<BallSnapshot>,
    /// Every known robot, ordered by `(team, id)`.
    pub robots: Vec<RobotSnapshot>,
    pub referee: RefereeState,
    pub ally: TeamColor,
    pub ally_plays_west: bool,
}

impl WorldSnapshot {
    pub fn ball_position(&self) -> Option<Point> {
        self.ball.as_ref().map(|b| b.position)
    }

    pub fn robot(&self, team: TeamColor, id: u32) -> Option<&RobotSnapshot> {
        self.robots.iter().find(|r| r.team == team && r.id == id)
    }

    pub fn ally_robot(&self, id: u32) -> Option<&RobotSnapshot> {
        self.robot(self.ally, id)
    }

    /// Online ally robots, ordered by id.
    pub fn allies(&self) -> impl Iterator<Item = &RobotSnapshot> {
        let ally = self.ally;
        self.robots.iter().filter(move |r| r.team == ally && r.online)
    }

    /// Online opponent robots, ordered by id.
    pub fn enemies(&self) -> impl Iterator<Item = &RobotSnapshot> {
        let enemy = self.ally.opponent();
        self.robots.iter().filter(move |r| r.team == enemy && r.online)
    }

    pub fn online_robots(&self) -> impl Iterator<Item = &RobotSnapshot> {
        self.robots.iter().filter(|r| r.online)
    }

    /// Newest detection timestamp of any robot or the ball.
    pub fn latest_update(&self) -> Option<f64> {
        self.robots
            .iter()
            .map(|r| r.last_update)
            .chain(self.ball.as_ref().map(|b| b.last_update))
            .reduce(f64::max)
    }

    pub fn ally_side(&self) -> Side {
        if self.ally_plays_west { Side::West } else { Side::East }
    }

    pub fn own_goal(&self) -> Goal {
        self.field.goal(self.ally_side())
    }

    pub fn enemy_goal(&self) -> Goal {
        self.field.goal(self.ally_side().opposite())
    }

    /// Online robot (either team) closest to the ball.
    pub fn closest_robot_to_ball(&self) -> Option<&RobotSnapshot> {
        let ball = self.ball_position()?;
        closest_to(self.online_robots(), ball)
    }

    /// Online ally robot closest to the ball, excluding `skip`.
    pub fn closest_ally_to_ball(&self, skip: Option<u32>) -> Option<&RobotSnapshot> {
        let ball = self.ball_position()?;
        closest_to(self.allies().filter(|r| Some(r.id) != skip), ball)
    }

    /// Team in possession: the ball owner if one is known, otherwise the team
    /// whose nearest robot is closer to the ball (ties go to the ally).
    pub fn possession(&self) -> Option<TeamColor> {
        let ball = self.ball.as_ref()?;
        if let Some((team, _)) = ball.owner {
            return Some(team);
        }
        let nearest = |team: TeamColor| {
            self.online_robots()
                .filter(|r| r.team == team)
                .map(|r| r.position.distance(ball.position))
                .fold(f64::INFINITY, f64::min)
        };
        let (ally, enemy) = (nearest(self.ally), nearest(self.ally.opponent()));
        if ally.is_infinite() && enemy.is_infinite() {
            None
        } else if ally <= enemy {
            Some(self.ally)
        } else {
            Some(self.ally.opponent())
        }
    }

    pub fn ally_has_ball(&self) -> bool {
        self.possession() == Some(self.ally)
    }

    /// Number of opponents standing on the same half as our keeper (our own
    /// half when the keeper is not on the field).
    pub fn attacking_enemies_count(&self, keeper_id: u32) -> usize {
        let own_sign = match self.ally_robot(keeper_id).filter(|k| k.online) {
            Some(k) if k.position.x != 0.0 => k.position.x.signum(),
            _ => self.ally_side().sign(),
        };
        self.enemies()
            .filter(|e| e.position.x * own_sign > 0.0)
            .count()
    }

    /// Whether the referee currently allows ally robot `id` to move.
    pub fn robot_may_move(&self, id: u32) -> bool {
        match self.referee.command {
            Some(RefereeCommand::Halt) => false,
            Some(RefereeCommand::GoalYellow | RefereeCommand::GoalBlue) => false,
            Some(RefereeCommand::Stop) => {
                match (self.ally_robot(id), self.ball_position()) {
                    (Some(robot), Some(ball)) => robot.position.distance(ball) >= STOP_BALL_DISTANCE,
                    (Some(_), None) => true,
                    (None, _) => false,
                }
            }
            _ => true,
        }
    }

    /// Online robots whose body overlaps `zone`.
    pub fn robots_in_zone(&self, zone: FieldZone) -> Vec<&RobotSnapshot> {
        let polygon = self.field.zone(zone);
        self.online_robots()
            .filter(|r| circle_touches_polygon(r.position, ROBOT_DIAMETER / 2.0, polygon.vertices()))
            .collect()
    }

    pub fn locate(&self, p: Point) -> Option<FieldZone> {
        self.field.locate(p)
    }
}

fn closest_to<'a>(robots: impl Iterator<Item = &'a RobotSnapshot>, p: Point) -> Option<&'a RobotSnapshot> {
    robots.min_by(|a, b| {
        a.position
            .distance(p)
            .total_cmp(&b.position.distance(p))
            .then(a.id.cmp(&b.id))
    })
}

/// `true` when a circle lies inside or crosses the polygon outline.
pub(crate) fn circle_touches_polygon(center: Point, radius: f64, vertices: &[Point]) -> bool {
    if point_in_polygon(center, vertices) {
        return true;
    }
    let n = vertices.len();
    (0..n).any(|i| segment_distance(vertices[i], vertices[(i + 1) % n], center) < radius)
}
