//! The shared world model.
//!
//! One [`World`] exists per process.  It is created by the application root,
//! wrapped in an `Arc`, and handed to every task that needs it.
//!
//! # Locking
//!
//! | Object        | Lock                                                    |
//! |---------------|---------------------------------------------------------|
//! | field         | `RwLock<FieldGeometry>`, written once behind a flag     |
//! | ball          | `RwLock<BallEntry>`                                     |
//! | robots        | map `RwLock` taken for writing only to insert a robot;  |
//! |               | each robot behind its own `Arc<RwLock<RobotEntry>>`     |
//! | referee       | `RwLock<RefereeState>`                                  |
//! | allegiance    | `RwLock<Allegiance>`                                    |
//!
//! Detections for different robots therefore never contend.  No method holds
//! two object locks at once (the robot map read lock plus one robot lock is
//! the only nesting), so the order in which ingestion tasks call in does not
//! matter.
//!
//! Every accepted mutation is announced on a `tokio::sync::broadcast`
//! channel; sending never blocks and does not require a subscriber.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use serde::{Deserialize, Serialize};
use striker_perception::{BallKalman, RobotUkf, TrackOutcome, Tracker};
use striker_types::{
    Event, EventPayload, Point, Pose, RefereeCommand, Role, Stage, StrikerError, TeamColor,
};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::field::{FieldGeometry, FieldZone};
use crate::snapshot::{BallSnapshot, RefereeState, RobotSnapshot, TeamInfo, WorldSnapshot};

const EVENT_SOURCE_BALL: &str = "striker-world::ball";
const EVENT_SOURCE_ROBOT: &str = "striker-world::robot";
const EVENT_SOURCE_REFEREE: &str = "striker-world::referee";
const EVENT_SOURCE_FIELD: &str = "striker-world::field";

// ────────────────────────────────────────────────────────────────────────────
// Configuration and results
// ────────────────────────────────────────────────────────────────────────────

/// Tunables of the world model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Gap (s) after which an estimator is re-seeded instead of integrated.
    pub loss_threshold: f64,
    /// Unseen time (s) after which a robot is marked offline.
    pub offline_timeout: f64,
    /// Unseen time (s) after which a robot is no longer visible.
    pub visibility_timeout: f64,
    /// Maximum distance (mm) from the ball for a robot to own it.
    pub ownership_radius: f64,
    /// Ball speed (mm/s) below which ownership is re-evaluated.
    pub ownership_speed: f64,
    /// Capacity of the notification channel.
    pub event_capacity: usize,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            loss_threshold: 1.0,
            offline_timeout: 0.5,
            visibility_timeout: 0.2,
            ownership_radius: 250.0,
            ownership_speed: 100.0,
            event_capacity: 256,
        }
    }
}

/// What an `apply*` call did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplyOutcome {
    /// A new object was created and seeded.
    Created,
    /// An existing object was updated.
    Updated,
    /// Nothing changed (stale, replayed or already applied).
    Ignored,
}

/// A full referee packet.
#[derive(Debug, Clone, PartialEq)]
pub struct RefereeUpdate {
    pub command: RefereeCommand,
    pub counter: u32,
    pub stage: Stage,
    pub stage_time_left: i64,
    pub yellow: TeamInfo,
    pub blue: TeamInfo,
}

// ────────────────────────────────────────────────────────────────────────────
// Internal records
// ────────────────────────────────────────────────────────────────────────────

type RobotKey = (TeamColor, u32);

#[derive(Debug)]
struct RobotEntry {
    tracker: Tracker<RobotUkf>,
    role: Role,
    online: bool,
    visible: bool,
    last_update: f64,
    update_count: u64,
}

impl RobotEntry {
    fn snapshot(&self, (team, id): RobotKey) -> RobotSnapshot {
        let pose = self.tracker.pose();
        RobotSnapshot {
            id,
            team,
            position: pose.position,
            orientation: pose.orientation,
            velocity: self.tracker.velocity(),
            role: self.role,
            online: self.online,
            visible: self.visible,
            last_update: self.last_update,
            update_count: self.update_count,
        }
    }
}

#[derive(Debug)]
struct BallEntry {
    tracker: Tracker<BallKalman>,
    owner: Option<RobotKey>,
    last_update: Option<f64>,
    update_count: u64,
}

impl BallEntry {
    fn snapshot(&self) -> Option<BallSnapshot> {
        let last_update = self.last_update?;
        Some(BallSnapshot {
            position: self.tracker.pose().position,
            velocity: self.tracker.velocity(),
            owner: self.owner,
            last_update,
            update_count: self.update_count,
        })
    }
}

#[derive(Debug, Clone, Copy)]
struct Allegiance {
    ally: TeamColor,
    ally_plays_west: bool,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

// ────────────────────────────────────────────────────────────────────────────
// World
// ────────────────────────────────────────────────────────────────────────────

/// The single source of truth about the match.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    field: RwLock<FieldGeometry>,
    geometry_applied: AtomicBool,
    ball: RwLock<BallEntry>,
    robots: RwLock<BTreeMap<RobotKey, Arc<RwLock<RobotEntry>>>>,
    referee: RwLock<RefereeState>,
    allegiance: RwLock<Allegiance>,
    events: broadcast::Sender<Event>,
}

impl Default for World {
    fn default() -> Self {
        Self::new(WorldConfig::default())
    }
}

impl World {
    pub fn new(config: WorldConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Self {
            ball: RwLock::new(BallEntry {
                tracker: Tracker::with_loss_threshold(BallKalman::new(), config.loss_threshold),
                owner: None,
                last_update: None,
                update_count: 0,
            }),
            config,
            field: RwLock::new(FieldGeometry::default()),
            geometry_applied: AtomicBool::new(false),
            robots: RwLock::new(BTreeMap::new()),
            referee: RwLock::new(RefereeState::default()),
            allegiance: RwLock::new(Allegiance {
                ally: TeamColor::Yellow,
                ally_plays_west: true,
            }),
            events,
        }
    }

    pub fn config(&self) -> &WorldConfig {
        &self.config
    }

    /// Subscribe to world notifications.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.events.subscribe()
    }

    fn emit(&self, source: &str, payload: EventPayload) {
        // No receivers is the normal headless case.
        let _ = self.events.send(Event::new(source, payload));
    }

    // ── Allegiance ──────────────────────────────────────────────────────────

    pub fn set_ally(&self, color: TeamColor) {
        write(&self.allegiance).ally = color;
        info!(ally = %color, "ally colour set");
    }

    pub fn ally(&self) -> TeamColor {
        read(&self.allegiance).ally
    }

    pub fn set_ally_plays_west(&self, west: bool) {
        write(&self.allegiance).ally_plays_west = west;
        info!(ally_plays_west = west, "playing direction set");
    }

    pub fn ally_plays_west(&self) -> bool {
        read(&self.allegiance).ally_plays_west
    }

    // ── Detections ──────────────────────────────────────────────────────────

    /// Route a robot detection to its estimator, creating the robot on first
    /// sight.
    pub fn apply_detection(
        &self,
        team: TeamColor,
        id: u32,
        raw_pose: Pose,
        timestamp: f64,
        source_id: u32,
    ) -> Result<ApplyOutcome, StrikerError> {
        if !raw_pose.is_finite() || !timestamp.is_finite() {
            warn!(%team, id, source_id, ?raw_pose, timestamp, "rejecting non-finite robot detection");
            return Err(StrikerError::NonFinite(format!("detection of {team} robot {id}")));
        }

        let (entry, created) = self.robot_entry((team, id), timestamp);
        let snapshot = {
            let mut robot = write(&entry);
            if !created && timestamp < robot.last_update {
                debug!(%team, id, timestamp, last = robot.last_update, "stale robot detection ignored");
                return Ok(ApplyOutcome::Ignored);
            }
            if robot.tracker.observe(raw_pose, timestamp) == TrackOutcome::Reset && !created {
                debug!(%team, id, source_id, "robot track re-seeded");
            }
            robot.online = true;
            robot.visible = true;
            robot.last_update = timestamp;
            robot.update_count += 1;
            robot.snapshot((team, id))
        };

        if created {
            info!(%team, id, "robot created");
            self.emit(EVENT_SOURCE_ROBOT, EventPayload::RobotCreated { team, id });
        }
        self.emit(
            EVENT_SOURCE_ROBOT,
            EventPayload::RobotUpdated {
                team,
                id,
                position: snapshot.position,
                orientation: snapshot.orientation,
            },
        );
        Ok(if created { ApplyOutcome::Created } else { ApplyOutcome::Updated })
    }

    fn robot_entry(&self, key: RobotKey, timestamp: f64) -> (Arc<RwLock<RobotEntry>>, bool) {
        if let Some(entry) = read(&self.robots).get(&key) {
            return (Arc::clone(entry), false);
        }
        let mut robots = write(&self.robots);
        // Another ingestion task may have inserted it in between.
        if let Some(entry) = robots.get(&key) {
            return (Arc::clone(entry), false);
        }
        let entry = Arc::new(RwLock::new(RobotEntry {
            tracker: Tracker::with_loss_threshold(RobotUkf::new(), self.config.loss_threshold),
            role: Role::Unassigned,
            online: true,
            visible: true,
            last_update: timestamp,
            update_count: 0,
        }));
        robots.insert(key, Arc::clone(&entry));
        (entry, true)
    }

    /// Route a ball detection to the ball estimator and refresh ownership.
    pub fn apply_ball_detection(
        &self,
        raw_position: Point,
        timestamp: f64,
        source_id: u32,
    ) -> Result<ApplyOutcome, StrikerError> {
        if !raw_position.is_finite() || !timestamp.is_finite() {
            warn!(source_id, ?raw_position, timestamp, "rejecting non-finite ball detection");
            return Err(StrikerError::NonFinite("ball detection".to_string()));
        }

        let (outcome, position, velocity) = {
            let mut ball = write(&self.ball);
            let created = ball.last_update.is_none();
            if ball.last_update.is_some_and(|last| timestamp < last) {
                return Ok(ApplyOutcome::Ignored);
            }
            if ball.tracker.observe(raw_position, timestamp) == TrackOutcome::Reset && !created {
                debug!(source_id, "ball track re-seeded");
            }
            ball.last_update = Some(timestamp);
            ball.update_count += 1;
            let outcome = if created { ApplyOutcome::Created } else { ApplyOutcome::Updated };
            (outcome, ball.tracker.pose().position, ball.tracker.velocity())
        };

        if velocity.length() < self.config.ownership_speed {
            if let Some(owner) = self.nearest_robot_within(position, self.config.ownership_radius) {
                let mut ball = write(&self.ball);
                if ball.owner != Some(owner) {
                    debug!(team = %owner.0, id = owner.1, "ball owner changed");
                    ball.owner = Some(owner);
                }
            }
        }

        self.emit(EVENT_SOURCE_BALL, EventPayload::BallUpdated { position, velocity });
        Ok(outcome)
    }

    fn nearest_robot_within(&self, p: Point, radius: f64) -> Option<RobotKey> {
        let robots = read(&self.robots);
        robots
            .iter()
            .filter_map(|(key, entry)| {
                let robot = read(entry);
                let d = robot.tracker.pose().position.distance(p);
                (robot.online && d <= radius).then_some((*key, d))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(key, _)| key)
    }

    // ── Referee ─────────────────────────────────────────────────────────────

    /// Accept a referee command unless `counter` was already seen.
    pub fn apply_referee(
        &self,
        command: RefereeCommand,
        counter: u32,
        stage: Stage,
        stage_time_left: i64,
    ) -> ApplyOutcome {
        self.apply_referee_inner(command, counter, stage, stage_time_left, None)
    }

    /// [`World::apply_referee`] plus the per-team information.
    pub fn apply_referee_packet(&self, update: RefereeUpdate) -> ApplyOutcome {
        let RefereeUpdate { command, counter, stage, stage_time_left, yellow, blue } = update;
        self.apply_referee_inner(command, counter, stage, stage_time_left, Some((yellow, blue)))
    }

    fn apply_referee_inner(
        &self,
        command: RefereeCommand,
        counter: u32,
        stage: Stage,
        stage_time_left: i64,
        teams: Option<(TeamInfo, TeamInfo)>,
    ) -> ApplyOutcome {
        {
            let mut referee = write(&self.referee);
            if referee.counter.is_some_and(|last| counter <= last) {
                return ApplyOutcome::Ignored;
            }
            referee.command = Some(command);
            referee.counter = Some(counter);
            referee.stage = Some(stage);
            referee.stage_time_left = stage_time_left;
            if let Some((yellow, blue)) = teams {
                referee.yellow = yellow;
                referee.blue = blue;
            }
            referee.update_count += 1;
        }
        info!(?command, counter, ?stage, "referee command accepted");
        self.emit(
            EVENT_SOURCE_REFEREE,
            EventPayload::RefereeUpdated { command, counter, stage },
        );
        ApplyOutcome::Updated
    }

    // ── Geometry ────────────────────────────────────────────────────────────

    /// Install the field dimensions.  Only the first valid packet is applied.
    pub fn apply_geometry(&self, field: FieldGeometry) -> ApplyOutcome {
        if !field.is_valid() {
            warn!(?field, "ignoring invalid field geometry");
            return ApplyOutcome::Ignored;
        }
        if self.geometry_applied.swap(true, Ordering::AcqRel) {
            return ApplyOutcome::Ignored;
        }
        *write(&self.field) = field;
        info!("field geometry applied");
        self.emit(EVENT_SOURCE_FIELD, EventPayload::GeometryUpdated);
        ApplyOutcome::Updated
    }

    // ── Roles and liveness ──────────────────────────────────────────────────

    /// Set the role of ally robot `id`.  Returns `true` when it changed.
    pub fn assign_role(&self, id: u32, role: Role) -> bool {
        let key = (self.ally(), id);
        let Some(entry) = read(&self.robots).get(&key).cloned() else {
            return false;
        };
        let mut robot = write(&entry);
        if robot.role == role {
            return false;
        }
        robot.role = role;
        drop(robot);
        self.emit(EVENT_SOURCE_ROBOT, EventPayload::RoleAssigned { id, role });
        true
    }

    /// Update visibility and liveness of every robot against `now` (s).
    pub fn mark_stale(&self, now: f64) {
        for (&(team, id), entry) in read(&self.robots).iter() {
            let mut robot = write(entry);
            let unseen = now - robot.last_update;
            robot.visible = unseen <= self.config.visibility_timeout;
            let online = unseen <= self.config.offline_timeout;
            if robot.online && !online {
                info!(%team, id, unseen, "robot went offline");
            }
            robot.online = online;
        }
    }

    // ── Reads ───────────────────────────────────────────────────────────────

    pub fn field(&self) -> FieldGeometry {
        read(&self.field).clone()
    }

    pub fn ball(&self) -> Option<BallSnapshot> {
        read(&self.ball).snapshot()
    }

    pub fn robot(&self, team: TeamColor, id: u32) -> Option<RobotSnapshot> {
        let entry = read(&self.robots).get(&(team, id)).cloned()?;
        let snapshot = read(&entry).snapshot((team, id));
        Some(snapshot)
    }

    pub fn referee(&self) -> RefereeState {
        read(&self.referee).clone()
    }

    /// Copy every object under its own read lock.
    pub fn snapshot(&self) -> WorldSnapshot {
        let Allegiance { ally, ally_plays_west } = *read(&self.allegiance);
        let robots = read(&self.robots)
            .iter()
            .map(|(key, entry)| read(entry).snapshot(*key))
            .collect();
        WorldSnapshot {
            field: self.field(),
            ball: self.ball(),
            robots,
            referee: self.referee(),
            ally,
            ally_plays_west,
        }
    }

    pub fn closest_robot_to_ball(&self) -> Option<RobotSnapshot> {
        self.snapshot().closest_robot_to_ball().cloned()
    }

    pub fn ally_has_ball(&self) -> bool {
        self.snapshot().ally_has_ball()
    }

    pub fn attacking_enemies_count(&self, keeper_id: u32) -> usize {
        self.snapshot().attacking_enemies_count(keeper_id)
    }

    pub fn robot_may_move(&self, id: u32) -> bool {
        self.snapshot().robot_may_move(id)
    }

    pub fn robots_in_zone(&self, zone: FieldZone) -> Vec<RobotSnapshot> {
        self.snapshot().robots_in_zone(zone).into_iter().cloned().collect()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn first_detection_creates_unassigned_robot() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        let outcome = world.apply_detection(TeamColor::Blue, 2, Pose::new(100.0, 200.0, 0.0), 1.0, 0)?;
        assert_eq!(outcome, ApplyOutcome::Created);
        let robot = world.robot(TeamColor::Blue, 2).ok_or("robot missing")?;
        assert_eq!(robot.role, Role::Unassigned);
        assert_eq!(robot.position, Point::new(100.0, 200.0));
        assert_eq!(robot.update_count, 1);
        assert!(robot.online);

        let again = world.apply_detection(TeamColor::Blue, 2, Pose::new(101.0, 200.0, 0.0), 1.0 + DT, 1)?;
        assert_eq!(again, ApplyOutcome::Updated);
        assert_eq!(world.robot(TeamColor::Blue, 2).map(|r| r.update_count), Some(2));
        Ok(())
    }

    #[test]
    fn non_finite_detection_is_never_stored() {
        let world = World::default();
        let err = world.apply_detection(TeamColor::Yellow, 4, Pose::new(f64::NAN, 0.0, 0.0), 0.0, 0);
        assert!(matches!(err, Err(StrikerError::NonFinite(_))));
        assert!(world.robot(TeamColor::Yellow, 4).is_none());

        let err = world.apply_ball_detection(Point::new(0.0, f64::INFINITY), 0.0, 0);
        assert!(matches!(err, Err(StrikerError::NonFinite(_))));
        assert!(world.ball().is_none());
    }

    #[test]
    fn older_detection_loses_to_newer() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.apply_detection(TeamColor::Blue, 1, Pose::new(0.0, 0.0, 0.0), 2.0, 0)?;
        let outcome = world.apply_detection(TeamColor::Blue, 1, Pose::new(900.0, 0.0, 0.0), 1.5, 1)?;
        assert_eq!(outcome, ApplyOutcome::Ignored);
        assert_eq!(world.robot(TeamColor::Blue, 1).map(|r| r.position), Some(Point::ORIGIN));
        Ok(())
    }

    #[test]
    fn referee_counter_only_moves_forward() {
        let world = World::default();
        let first = world.apply_referee(RefereeCommand::Stop, 7, Stage::NormalFirstHalf, 0);
        assert_eq!(first, ApplyOutcome::Updated);
        let replay = world.apply_referee(RefereeCommand::ForceStart, 7, Stage::NormalFirstHalf, 0);
        assert_eq!(replay, ApplyOutcome::Ignored);
        let older = world.apply_referee(RefereeCommand::Halt, 3, Stage::NormalFirstHalf, 0);
        assert_eq!(older, ApplyOutcome::Ignored);
        let referee = world.referee();
        assert_eq!(referee.command, Some(RefereeCommand::Stop));
        assert_eq!(referee.counter, Some(7));
        assert_eq!(referee.update_count, 1);
    }

    #[test]
    fn first_referee_packet_is_always_accepted() {
        let world = World::default();
        let outcome = world.apply_referee_packet(RefereeUpdate {
            command: RefereeCommand::Halt,
            counter: 0,
            stage: Stage::NormalFirstHalfPre,
            stage_time_left: 1_000,
            yellow: TeamInfo::default(),
            blue: TeamInfo { goalie: Some(3), ..TeamInfo::default() },
        });
        assert_eq!(outcome, ApplyOutcome::Updated);
        assert_eq!(world.referee().blue.goalie, Some(3));
    }

    #[test]
    fn geometry_is_applied_once() {
        let world = World::default();
        let small = FieldGeometry { field_length: 6000.0, field_width: 4000.0, ..FieldGeometry::default() };
        assert_eq!(world.apply_geometry(small.clone()), ApplyOutcome::Updated);
        assert_eq!(world.apply_geometry(FieldGeometry::default()), ApplyOutcome::Ignored);
        assert_eq!(world.field(), small);

        let broken = FieldGeometry { field_length: 0.0, ..FieldGeometry::default() };
        assert_eq!(World::default().apply_geometry(broken), ApplyOutcome::Ignored);
    }

    #[test]
    fn slow_ball_is_owned_by_nearest_robot() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.apply_detection(TeamColor::Yellow, 3, Pose::new(0.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_detection(TeamColor::Blue, 5, Pose::new(600.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_ball_detection(Point::new(120.0, 0.0), 0.0, 0)?;
        assert_eq!(world.ball().and_then(|b| b.owner), Some((TeamColor::Yellow, 3)));
        Ok(())
    }

    #[test]
    fn fast_ball_keeps_previous_owner() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.apply_detection(TeamColor::Blue, 5, Pose::new(1000.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_ball_detection(Point::ORIGIN, 0.0, 0)?;
        assert_eq!(world.ball().and_then(|b| b.owner), None);
        for k in 1..30 {
            let t = k as f64 * DT;
            world.apply_ball_detection(Point::new(2000.0 * t, 0.0), t, 0)?;
        }
        let ball = world.ball().ok_or("ball missing")?;
        assert!(ball.speed() > 100.0);
        assert_eq!(ball.owner, None);
        Ok(())
    }

    #[test]
    fn mark_stale_takes_robots_offline() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.apply_detection(TeamColor::Blue, 1, Pose::new(0.0, 0.0, 0.0), 10.0, 0)?;
        world.mark_stale(10.3);
        let robot = world.robot(TeamColor::Blue, 1).ok_or("robot missing")?;
        assert!(!robot.visible);
        assert!(robot.online);
        world.mark_stale(10.6);
        assert_eq!(world.robot(TeamColor::Blue, 1).map(|r| r.online), Some(false));
        Ok(())
    }

    #[test]
    fn latest_update_tracks_newest_detection() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        assert_eq!(world.snapshot().latest_update(), None);
        world.apply_detection(TeamColor::Blue, 1, Pose::new(0.0, 0.0, 0.0), 4.0, 0)?;
        world.apply_ball_detection(Point::new(10.0, 0.0), 4.5, 0)?;
        world.apply_detection(TeamColor::Yellow, 2, Pose::new(0.0, 0.0, 0.0), 3.0, 0)?;
        assert_eq!(world.snapshot().latest_update(), Some(4.5));
        Ok(())
    }

    #[test]
    fn roles_apply_to_ally_robots_only() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.set_ally(TeamColor::Blue);
        world.apply_detection(TeamColor::Blue, 2, Pose::new(0.0, 0.0, 0.0), 0.0, 0)?;
        assert!(world.assign_role(2, Role::Defender));
        assert!(!world.assign_role(2, Role::Defender));
        assert!(!world.assign_role(9, Role::Keeper));
        assert_eq!(world.robot(TeamColor::Blue, 2).map(|r| r.role), Some(Role::Defender));
        Ok(())
    }

    #[test]
    fn halt_and_stop_restrict_motion() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.set_ally(TeamColor::Blue);
        world.apply_detection(TeamColor::Blue, 2, Pose::new(300.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_detection(TeamColor::Blue, 3, Pose::new(2000.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_ball_detection(Point::ORIGIN, 0.0, 0)?;
        assert!(world.robot_may_move(2));

        world.apply_referee(RefereeCommand::Stop, 1, Stage::NormalFirstHalf, 0);
        assert!(!world.robot_may_move(2));
        assert!(world.robot_may_move(3));

        world.apply_referee(RefereeCommand::Halt, 2, Stage::NormalFirstHalf, 0);
        assert!(!world.robot_may_move(3));
        Ok(())
    }

    #[test]
    fn attacking_enemies_are_counted_on_the_keeper_half() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.set_ally(TeamColor::Blue);
        world.apply_detection(TeamColor::Blue, 1, Pose::new(-4000.0, 0.0, 0.0), 0.0, 0)?;
        for (id, x) in [(1, -1000.0), (2, -200.0), (3, 1500.0)] {
            world.apply_detection(TeamColor::Yellow, id, Pose::new(x, 0.0, 0.0), 0.0, 0)?;
        }
        assert_eq!(world.attacking_enemies_count(1), 2);
        Ok(())
    }

    #[test]
    fn zone_queries_and_closest_robot() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        world.apply_detection(TeamColor::Yellow, 1, Pose::new(1200.0, 0.0, 0.0), 0.0, 0)?;
        world.apply_detection(TeamColor::Blue, 1, Pose::new(-3000.0, 2000.0, 0.0), 0.0, 0)?;
        world.apply_ball_detection(Point::new(1000.0, 0.0), 0.0, 0)?;
        let in_middle = world.robots_in_zone(FieldZone::EastMiddle);
        assert_eq!(in_middle.len(), 1);
        assert_eq!(world.closest_robot_to_ball().map(|r| (r.team, r.id)), Some((TeamColor::Yellow, 1)));
        Ok(())
    }

    #[tokio::test]
    async fn mutations_are_broadcast() -> Result<(), Box<dyn std::error::Error>> {
        let world = World::default();
        let mut rx = world.subscribe();
        world.apply_detection(TeamColor::Blue, 7, Pose::new(0.0, 0.0, 0.0), 0.0, 0)?;
        let created = rx.recv().await?;
        assert!(matches!(created.payload, EventPayload::RobotCreated { id: 7, .. }));
        let updated = rx.recv().await?;
        assert!(matches!(updated.payload, EventPayload::RobotUpdated { id: 7, .. }));
        Ok(())
    }
}
