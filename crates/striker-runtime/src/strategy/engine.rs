//! The strategy engine: mode state machine, role assignment and behavior
//! execution.
//!
//! One [`StrategyEngine::step`] per tick:
//!
//! 1. poll [`GameEvent`]s from the snapshot and apply mode transitions,
//! 2. in open play, re-derive the mode from possession if they disagree,
//! 3. reassign roles when the mode, the online allies or the keeper changed,
//! 4. configure and run one behavior per assigned robot.
//!
//! Standard (set-piece) modes are left only through a new referee command.

use std::collections::BTreeMap;
use std::mem::discriminant;

use serde::{Deserialize, Serialize};
use striker_types::{GotoPosition, Kick, Point, Role, StrikerError};
use striker_world::{FieldZone, RobotSnapshot, Side, WorldSnapshot, DEFAULT_MAX_OBSTACLES};
use tracing::{debug, info};

use crate::behavior::{Attacker, Behavior, Blocker, Counter, Coverer, Defender, Keeper, Runner};
use crate::strategy::events::{EventDetector, GameEvent, SETTLED_BALL_SPEED};
use crate::strategy::mode::{strategy_for, Mode, ModeParameters, StandardStrategy};

/// Field players kept as plain defenders before coverers are handed out.
pub const MIN_DEFENDERS: usize = 2;

/// Extra clearance of the kick-off blocker beyond the centre circle.
pub const KICKOFF_BLOCK_MARGIN: f64 = 200.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Keeper id used until the referee announces our goalie.
    pub keeper_id: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self { keeper_id: 1 }
    }
}

/// What [`StrategyEngine::step`] did this tick.
#[derive(Debug)]
pub struct TickOutcome {
    pub mode: Mode,
    pub mode_changed: bool,
    pub events: Vec<GameEvent>,
    /// Robots whose role changed, with the new role.  Robots that dropped
    /// out of the assignment are reported as [`Role::Unassigned`].
    pub role_changes: Vec<(u32, Role)>,
    pub outputs: Vec<(u32, Result<GotoPosition, StrikerError>)>,
}

#[derive(Debug, Clone)]
enum Tactic {
    Keeper(Keeper),
    Defender(Defender, f64),
    Attacker(Attacker),
    Runner(Runner),
    Blocker(Blocker, f64),
    Coverer(Coverer, u32),
    Counter(Counter, FieldZone),
    Idle,
}

#[derive(Debug, Clone)]
struct Assignment {
    role: Role,
    tactic: Tactic,
}

/// Values every behavior configuration reads, computed once per tick.
struct Situation {
    ball: Option<Point>,
    own_goal: Point,
    enemy_goal: Point,
    own_side: Side,
    params: ModeParameters,
    free_shot: Option<Point>,
    free_position: Option<Point>,
    closest: Option<u32>,
    runner: Option<Point>,
}

pub struct StrategyEngine {
    config: EngineConfig,
    mode: Mode,
    detector: EventDetector,
    assignments: BTreeMap<u32, Assignment>,
    roster: Vec<u32>,
    assigned_keeper: Option<u32>,
    needs_assignment: bool,
}

impl Default for StrategyEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl StrategyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            mode: Mode::default(),
            detector: EventDetector::new(),
            assignments: BTreeMap::new(),
            roster: Vec::new(),
            assigned_keeper: None,
            needs_assignment: true,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// Current role of every assigned robot, ordered by id.
    pub fn roles(&self) -> Vec<(u32, Role)> {
        self.assignments.iter().map(|(id, a)| (*id, a.role)).collect()
    }

    pub fn role(&self, id: u32) -> Option<Role> {
        self.assignments.get(&id).map(|a| a.role)
    }

    /// The referee-announced ally goalie, or the configured keeper id.
    pub fn keeper_id(&self, snapshot: &WorldSnapshot) -> u32 {
        snapshot
            .referee
            .team(snapshot.ally)
            .goalie
            .unwrap_or(self.config.keeper_id)
    }

    /// Run one full tick.
    pub fn step(&mut self, snapshot: &WorldSnapshot) -> TickOutcome {
        let before = self.mode;
        let events = self.observe(snapshot);

        let roster = online_allies(snapshot);
        let keeper = self.keeper_id(snapshot);
        if roster != self.roster || self.assigned_keeper != Some(keeper) {
            self.needs_assignment = true;
        }
        let role_changes = if self.needs_assignment {
            self.assign_roles(snapshot)
        } else {
            Vec::new()
        };

        let outputs = self.execute(snapshot);
        TickOutcome {
            mode: self.mode,
            mode_changed: self.mode != before,
            events,
            role_changes,
            outputs,
        }
    }

    /// Poll events, apply transitions and the possession catch-up.
    pub fn observe(&mut self, snapshot: &WorldSnapshot) -> Vec<GameEvent> {
        let keeper = self.keeper_id(snapshot);
        let events = self.detector.poll(snapshot, keeper);
        for event in &events {
            self.handle(*event, snapshot, keeper);
        }

        if self.mode.is_open_play() {
            if let Some(actual) = self.open_play_mode(snapshot, keeper) {
                if actual != self.mode {
                    debug!(tracked = %self.mode, %actual, "mode catch-up");
                    self.set_mode(actual);
                }
            }
        }
        events
    }

    fn handle(&mut self, event: GameEvent, snapshot: &WorldSnapshot, keeper: u32) {
        use GameEvent::*;
        match event {
            RefereeNewCommand(command) => {
                let next = match strategy_for(command, snapshot.ally) {
                    Some(strategy) => Mode::Standard(strategy),
                    None => self.open_play_mode(snapshot, keeper).unwrap_or(Mode::Defense),
                };
                info!(?command, mode = %next, "referee command");
                self.set_mode(next);
                self.needs_assignment = true;
            }
            _ if !self.mode.is_open_play() => {}
            BallAllyCapture => {
                self.set_mode(Mode::Attack);
                self.needs_assignment = true;
            }
            BallEnemyCapture => {
                self.set_mode(Mode::Defense);
                self.needs_assignment = true;
            }
            BallAllyChangeOwner | BallEnemyChangeOwner | BallMovesPastNorthSouth => {
                self.needs_assignment = true;
            }
            BallMovesPastMidline => {
                let next = if snapshot.ally_has_ball() { Mode::Attack } else { Mode::Defense };
                self.set_mode(next);
            }
            EnemyAttackCountChange(count) => {
                if count > ModeParameters::for_field(&snapshot.field).attacker_threshold {
                    self.set_mode(Mode::Defense);
                }
                self.needs_assignment = true;
            }
        }
    }

    /// The open-play mode the snapshot calls for, if possession is known.
    fn open_play_mode(&self, snapshot: &WorldSnapshot, keeper: u32) -> Option<Mode> {
        let threshold = ModeParameters::for_field(&snapshot.field).attacker_threshold;
        if snapshot.attacking_enemies_count(keeper) > threshold {
            return Some(Mode::Defense);
        }
        snapshot
            .possession()
            .map(|team| if team == snapshot.ally { Mode::Attack } else { Mode::Defense })
    }

    fn set_mode(&mut self, mode: Mode) {
        if mode != self.mode {
            info!(from = %self.mode, to = %mode, "mode changed");
            self.mode = mode;
            self.needs_assignment = true;
        }
    }

    // ────────────────────────────────────────────────────────────────────────
    // Role assignment
    // ────────────────────────────────────────────────────────────────────────

    /// Recompute the role of every online ally for the current mode.
    ///
    /// Returns the robots whose role changed.  Calling it twice on the same
    /// snapshot changes nothing the second time.
    pub fn assign_roles(&mut self, snapshot: &WorldSnapshot) -> Vec<(u32, Role)> {
        let keeper = self.keeper_id(snapshot);
        let plan = self.plan_roles(snapshot, keeper);

        let mut previous = std::mem::take(&mut self.assignments);
        let mut changes = Vec::new();
        for (id, role, tactic) in plan {
            let tactic = match previous.remove(&id) {
                Some(old) => {
                    if old.role != role {
                        changes.push((id, role));
                    }
                    // Keep behavior state when the robot keeps the same job.
                    if discriminant(&old.tactic) == discriminant(&tactic) {
                        merge_tactic(old.tactic, tactic)
                    } else {
                        tactic
                    }
                }
                None => {
                    changes.push((id, role));
                    tactic
                }
            };
            self.assignments.insert(id, Assignment { role, tactic });
        }
        changes.extend(previous.into_keys().map(|id| (id, Role::Unassigned)));
        changes.sort_by_key(|(id, _)| *id);

        self.roster = online_allies(snapshot);
        self.assigned_keeper = Some(keeper);
        self.needs_assignment = false;
        if !changes.is_empty() {
            debug!(mode = %self.mode, ?changes, "roles assigned");
        }
        changes
    }

    fn plan_roles(&self, snapshot: &WorldSnapshot, keeper: u32) -> Vec<(u32, Role, Tactic)> {
        let params = ModeParameters::for_field(&snapshot.field);
        let own_side = snapshot.ally_side();
        let mut plan = Vec::new();

        if snapshot.allies().any(|r| r.id == keeper) {
            plan.push((keeper, Role::Keeper, Tactic::Keeper(Keeper::new())));
        }

        let mut players: Vec<&RobotSnapshot> = snapshot.allies().filter(|r| r.id != keeper).collect();
        if let Some(ball) = snapshot.ball_position() {
            players.sort_by(|a, b| {
                a.position
                    .distance(ball)
                    .total_cmp(&b.position.distance(ball))
                    .then(a.id.cmp(&b.id))
            });
        } else {
            players.sort_by_key(|r| r.id);
        }
        let mut players = players.into_iter().map(|r| (r.id, r.position)).collect::<Vec<_>>().into_iter();

        let attacker = || Tactic::Attacker(Attacker::new());
        let blocker = |distance: f64| Tactic::Blocker(Blocker::new(), distance);

        use StandardStrategy as S;
        match self.mode {
            Mode::Attack => {
                if let Some((id, _)) = players.next() {
                    plan.push((id, Role::Attacker, attacker()));
                }
                attack_support(&mut plan, players.collect(), snapshot, &params);
            }
            Mode::Defense => {
                let enemy_owns = snapshot.possession() == Some(snapshot.ally.opponent());
                if enemy_owns {
                    // Press closer while the ball is still in the enemy half.
                    let pressing = snapshot
                        .ball_position()
                        .is_some_and(|b| b.x * own_side.sign() < 0.0);
                    let distance = if pressing { params.disturber_attack } else { params.disturber_defense };
                    if let Some((id, _)) = players.next() {
                        plan.push((id, Role::Blocker, blocker(distance)));
                    }
                }
                defend(&mut plan, players.map(|(id, _)| id).collect(), snapshot, &params, true);
            }
            Mode::Standard(S::Halt) => {
                plan.extend(players.map(|(id, _)| (id, Role::Defender, Tactic::Idle)));
            }
            Mode::Standard(S::Stop) => {
                if let Some((id, _)) = players.next() {
                    plan.push((id, Role::Blocker, blocker(params.disturber_stop)));
                }
                defend(&mut plan, players.map(|(id, _)| id).collect(), snapshot, &params, false);
            }
            Mode::Standard(S::KickOffAttack) | Mode::Standard(S::PenaltyAttack) => {
                if let Some((id, _)) = players.next() {
                    plan.push((id, Role::Attacker, attacker()));
                }
                counters(&mut plan, players.map(|(id, _)| id).collect(), own_side, Role::Attacker);
            }
            Mode::Standard(S::KickOffDefense) => {
                if let Some((id, _)) = players.next() {
                    let distance = snapshot.field.center_circle_radius + KICKOFF_BLOCK_MARGIN;
                    plan.push((id, Role::Blocker, blocker(distance)));
                }
                defend(&mut plan, players.map(|(id, _)| id).collect(), snapshot, &params, false);
            }
            Mode::Standard(S::FreeKickAttack) => {
                if let Some((id, _)) = players.next() {
                    plan.push((id, Role::Attacker, attacker()));
                }
                attack_support(&mut plan, players.collect(), snapshot, &params);
            }
            Mode::Standard(S::FreeKickDefense) => {
                if let Some((id, _)) = players.next() {
                    plan.push((id, Role::Blocker, blocker(params.disturber_stop)));
                }
                defend(&mut plan, players.map(|(id, _)| id).collect(), snapshot, &params, true);
            }
            Mode::Standard(S::PenaltyDefense) => {
                counters(&mut plan, players.map(|(id, _)| id).collect(), own_side.opposite(), Role::Defender);
            }
            Mode::Standard(S::Timeout) | Mode::Standard(S::GoalScored) => {
                counters(&mut plan, players.map(|(id, _)| id).collect(), own_side, Role::Defender);
            }
        }
        plan
    }

    // ────────────────────────────────────────────────────────────────────────
    // Execution
    // ────────────────────────────────────────────────────────────────────────

    /// Configure and run every assigned behavior against `snapshot`.
    pub fn execute(&mut self, snapshot: &WorldSnapshot) -> Vec<(u32, Result<GotoPosition, StrikerError>)> {
        let situation = self.situation(snapshot);
        let mode = self.mode;
        self.assignments
            .iter_mut()
            .map(|(id, assignment)| {
                let robot = snapshot.ally_robot(*id).filter(|r| r.online);
                let goto = run_tactic(&mut assignment.tactic, *id, robot, snapshot, &situation, mode);
                (*id, validate(*id, goto))
            })
            .collect()
    }

    fn situation(&self, snapshot: &WorldSnapshot) -> Situation {
        let keeper = self.keeper_id(snapshot);
        let runner = self.assignments.iter().find_map(|(id, a)| match a.tactic {
            Tactic::Runner(_) => snapshot.ally_robot(*id).filter(|r| r.online).map(|r| r.position),
            _ => None,
        });
        Situation {
            ball: snapshot.ball_position(),
            own_goal: snapshot.own_goal().center,
            enemy_goal: snapshot.enemy_goal().center,
            own_side: snapshot.ally_side(),
            params: ModeParameters::for_field(&snapshot.field),
            free_shot: snapshot.free_shot(DEFAULT_MAX_OBSTACLES),
            free_position: free_position(snapshot),
            closest: snapshot.closest_ally_to_ball(Some(keeper)).map(|r| r.id),
            runner,
        }
    }
}

fn online_allies(snapshot: &WorldSnapshot) -> Vec<u32> {
    let mut ids: Vec<u32> = snapshot.allies().map(|r| r.id).collect();
    ids.sort_unstable();
    ids
}

/// Keep the behavior state of `old` while taking the parameters of `new`.
fn merge_tactic(old: Tactic, new: Tactic) -> Tactic {
    match (old, new) {
        (Tactic::Defender(b, _), Tactic::Defender(_, offset)) => Tactic::Defender(b, offset),
        (Tactic::Blocker(b, _), Tactic::Blocker(_, distance)) => Tactic::Blocker(b, distance),
        (Tactic::Coverer(b, _), Tactic::Coverer(_, enemy)) => Tactic::Coverer(b, enemy),
        (Tactic::Counter(b, _), Tactic::Counter(_, zone)) => Tactic::Counter(b, zone),
        (old, _) => old,
    }
}

/// Runner nearest the enemy goal when at least two supporters exist, the
/// rest defend.
fn attack_support(
    plan: &mut Vec<(u32, Role, Tactic)>,
    mut rest: Vec<(u32, Point)>,
    snapshot: &WorldSnapshot,
    params: &ModeParameters,
) {
    if rest.len() >= 2 {
        let enemy_sign = snapshot.ally_side().opposite().sign();
        let runner = rest
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| (a.1.x * enemy_sign).total_cmp(&(b.1.x * enemy_sign)))
            .map(|(i, _)| i);
        if let Some(i) = runner {
            let (id, _) = rest.remove(i);
            plan.push((id, Role::Attacker, Tactic::Runner(Runner::new())));
        }
    }
    for (i, (id, _)) in rest.into_iter().enumerate() {
        plan.push((id, Role::Defender, Tactic::Defender(Defender::new(), lateral_offset(i, params))));
    }
}

/// Plain defenders first; with `cover` set, players beyond
/// [`MIN_DEFENDERS`] mark the opponents in our half, nearest to our goal
/// first.
fn defend(
    plan: &mut Vec<(u32, Role, Tactic)>,
    rest: Vec<u32>,
    snapshot: &WorldSnapshot,
    params: &ModeParameters,
    cover: bool,
) {
    let own_goal = snapshot.own_goal().center;
    let own_sign = snapshot.ally_side().sign();
    let mut attackers: Vec<&RobotSnapshot> = if cover {
        snapshot.enemies().filter(|e| e.position.x * own_sign > 0.0).collect()
    } else {
        Vec::new()
    };
    attackers.sort_by(|a, b| {
        a.position
            .distance(own_goal)
            .total_cmp(&b.position.distance(own_goal))
            .then(a.id.cmp(&b.id))
    });
    let mut attackers = attackers.into_iter();

    let mut defenders = 0;
    for (i, id) in rest.into_iter().enumerate() {
        if i >= MIN_DEFENDERS {
            if let Some(enemy) = attackers.next() {
                plan.push((id, Role::Defender, Tactic::Coverer(Coverer::new(), enemy.id)));
                continue;
            }
        }
        plan.push((id, Role::Defender, Tactic::Defender(Defender::new(), lateral_offset(defenders, params))));
        defenders += 1;
    }
}

/// Spread `rest` over the counter zones of `side`.
fn counters(plan: &mut Vec<(u32, Role, Tactic)>, rest: Vec<u32>, side: Side, role: Role) {
    let zones = counter_zones(side);
    for (i, id) in rest.into_iter().enumerate() {
        plan.push((id, role, Tactic::Counter(Counter::new(), zones[i % zones.len()])));
    }
}

fn counter_zones(side: Side) -> [FieldZone; 4] {
    use FieldZone::*;
    match side {
        Side::West => [WestMiddle, WestNorthFront, WestSouthFront, WestCenter],
        Side::East => [EastMiddle, EastNorthFront, EastSouthFront, EastCenter],
    }
}

/// 0, +s, -s, +2s, -2s, …
fn lateral_offset(index: usize, params: &ModeParameters) -> f64 {
    let step = index.div_ceil(2) as f64 * params.defender_spacing;
    if index % 2 == 1 { step } else { -step }
}

/// Support spot in the enemy half with the most room to the nearest
/// opponent.
pub fn free_position(snapshot: &WorldSnapshot) -> Option<Point> {
    use FieldZone::*;
    let candidates = match snapshot.ally_side().opposite() {
        Side::East => [EastMiddle, EastNorthFront, EastSouthFront, EastNorthSecondPost, EastSouthSecondPost],
        Side::West => [WestMiddle, WestNorthFront, WestSouthFront, WestNorthSecondPost, WestSouthSecondPost],
    };
    let enemies: Vec<Point> = snapshot.enemies().map(|e| e.position).collect();
    let clearance = |p: Point| enemies.iter().map(|e| e.distance(p)).fold(f64::INFINITY, f64::min);

    candidates
        .iter()
        .map(|z| snapshot.field.zone(*z).center_point())
        .fold(None, |best: Option<(Point, f64)>, p| {
            let room = clearance(p);
            match best {
                Some((_, best_room)) if best_room >= room => best,
                _ => Some((p, room)),
            }
        })
        .map(|(p, _)| p)
}

fn run_tactic(
    tactic: &mut Tactic,
    id: u32,
    robot: Option<&RobotSnapshot>,
    snapshot: &WorldSnapshot,
    s: &Situation,
    mode: Mode,
) -> GotoPosition {
    let p = &s.params;
    match tactic {
        Tactic::Keeper(keeper) => {
            let distance = if mode == Mode::Standard(StandardStrategy::PenaltyDefense) {
                p.penalty_keeper_distance
            } else {
                p.keeper_distance
            };
            let go_to_kick = mode.is_open_play()
                && snapshot.ball.as_ref().is_some_and(|b| {
                    b.speed() < SETTLED_BALL_SPEED
                        && snapshot.field.contains(b.position)
                        && b.position.distance(s.own_goal) < snapshot.field.defense_radius
                });
            keeper.update(distance, go_to_kick, s.ball, Some(s.own_goal), snapshot.field.goal_width / 2.0);
            keeper.calculate(robot, snapshot)
        }
        Tactic::Defender(defender, offset) => {
            defender.update(p.defender_distance, s.ball, Some(s.own_goal), *offset);
            defender.calculate(robot, snapshot)
        }
        Tactic::Attacker(attacker) => {
            let (target, kick) = shot_plan(s, mode);
            let is_closest = !mode.is_open_play() || s.closest == Some(id);
            attacker.update(s.free_position, s.ball, kick, false, Some(target), is_closest);
            attacker.calculate(robot, snapshot)
        }
        Tactic::Runner(runner) => {
            runner.update(s.ball, s.free_position);
            runner.calculate(robot, snapshot)
        }
        Tactic::Blocker(blocker, distance) => {
            blocker.update(
                *distance,
                Some(s.own_goal),
                s.ball,
                snapshot.field.field_width,
                snapshot.field.field_length,
            );
            blocker.calculate(robot, snapshot)
        }
        Tactic::Coverer(coverer, enemy) => {
            let subject = snapshot
                .robot(snapshot.ally.opponent(), *enemy)
                .filter(|r| r.online)
                .map(|r| r.position);
            coverer.update(p.coverer_distance, s.ball, subject);
            coverer.calculate(robot, snapshot)
        }
        Tactic::Counter(counter, zone) => {
            counter.update(Some(*zone), s.ball, None);
            counter.calculate(robot, snapshot)
        }
        Tactic::Idle => GotoPosition::default(),
    }
}

/// Where the ball carrier aims and how hard it kicks.
fn shot_plan(s: &Situation, mode: Mode) -> (Point, Option<Kick>) {
    let p = &s.params;
    let in_own_half = s.ball.is_some_and(|b| b.x * s.own_side.sign() > 0.0);
    let (target, kick) = match (s.free_shot, s.runner) {
        (Some(shot), _) => (shot, p.free_shot_kick),
        (None, _) if in_own_half => (s.enemy_goal, p.clear_kick),
        (None, Some(runner)) => (runner, p.pass_kick),
        (None, None) => (s.enemy_goal, p.free_shot_kick),
    };
    match mode {
        Mode::Standard(StandardStrategy::KickOffAttack) => (target, None),
        Mode::Standard(StandardStrategy::FreeKickAttack) => (target, Some(p.free_kick)),
        Mode::Standard(StandardStrategy::PenaltyAttack) => {
            (s.free_shot.unwrap_or(s.enemy_goal), Some(p.free_shot_kick))
        }
        _ => (target, Some(kick)),
    }
}

fn validate(id: u32, goto: GotoPosition) -> Result<GotoPosition, StrikerError> {
    let finite = |p: Option<Point>| p.is_none_or(|p| p.is_finite());
    if finite(goto.destination) && finite(goto.target) {
        Ok(goto)
    } else {
        Err(StrikerError::Behavior {
            robot_id: id,
            reason: "non-finite destination or target".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use striker_types::{Pose, RefereeCommand, Stage, TeamColor};
    use striker_world::{ApplyOutcome, World};

    fn blue_world() -> World {
        let world = World::default();
        world.set_ally(TeamColor::Blue);
        world
    }

    fn place(world: &World, team: TeamColor, id: u32, x: f64, y: f64) -> Result<(), StrikerError> {
        world.apply_detection(team, id, Pose::new(x, y, 0.0), 0.0, 0).map(|_| ())
    }

    fn output(outcome: &TickOutcome, id: u32) -> Option<GotoPosition> {
        outcome
            .outputs
            .iter()
            .find(|(robot, _)| *robot == id)
            .and_then(|(_, result)| result.clone().ok())
    }

    #[test]
    fn first_field_player_defends() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        let outcome = world.apply_detection(TeamColor::Blue, 2, Pose::new(100.0, 200.0, 0.0), 0.0, 0)?;
        assert_eq!(outcome, ApplyOutcome::Created);
        assert_eq!(world.robot(TeamColor::Blue, 2).map(|r| r.role), Some(Role::Unassigned));

        let mut engine = StrategyEngine::default();
        let tick = engine.step(&world.snapshot());
        assert_eq!(tick.mode, Mode::Defense);
        assert_eq!(engine.role(2), Some(Role::Defender));
        assert_eq!(tick.role_changes, vec![(2, Role::Defender)]);
        Ok(())
    }

    #[test]
    fn ally_kickoff_selects_kickoff_attack() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        place(&world, TeamColor::Blue, 2, -1000.0, 0.0)?;
        world.apply_referee(RefereeCommand::PrepareKickoffBlue, 1, Stage::NormalFirstHalf, 0);

        let mut engine = StrategyEngine::default();
        let tick = engine.step(&world.snapshot());
        assert_eq!(tick.mode, Mode::Standard(StandardStrategy::KickOffAttack));
        assert!(tick.mode_changed);
        assert_eq!(engine.role(2), Some(Role::Attacker));
        Ok(())
    }

    #[test]
    fn replayed_referee_counter_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        for (id, x) in [(1, -4000.0), (2, -1000.0), (3, -2000.0)] {
            place(&world, TeamColor::Blue, id, x, 0.0)?;
        }
        world.apply_ball_detection(Point::new(0.0, 0.0), 0.0, 0)?;
        world.apply_referee(RefereeCommand::PrepareKickoffYellow, 5, Stage::NormalFirstHalf, 0);

        let mut engine = StrategyEngine::default();
        engine.step(&world.snapshot());
        let (mode, roles) = (engine.mode(), engine.roles());
        assert_eq!(mode, Mode::Standard(StandardStrategy::KickOffDefense));

        let replay = world.apply_referee(RefereeCommand::Halt, 5, Stage::NormalFirstHalf, 0);
        assert_eq!(replay, ApplyOutcome::Ignored);
        let tick = engine.step(&world.snapshot());
        assert!(tick.events.is_empty());
        assert!(tick.role_changes.is_empty());
        assert_eq!(engine.mode(), mode);
        assert_eq!(engine.roles(), roles);
        Ok(())
    }

    #[test]
    fn roles_form_a_partition_with_one_keeper() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        for id in 1..=6u32 {
            place(&world, TeamColor::Blue, id, -500.0 * id as f64, 300.0 * id as f64 - 1000.0)?;
        }
        for id in 1..=4u32 {
            place(&world, TeamColor::Yellow, id, -800.0 * id as f64, -1500.0)?;
        }
        world.apply_ball_detection(Point::new(-1500.0, 0.0), 0.0, 0)?;

        let mut engine = StrategyEngine::default();
        let commands = [
            None,
            Some(RefereeCommand::Stop),
            Some(RefereeCommand::DirectFreeYellow),
            Some(RefereeCommand::PreparePenaltyBlue),
            Some(RefereeCommand::ForceStart),
        ];
        for (counter, command) in commands.into_iter().enumerate() {
            if let Some(command) = command {
                world.apply_referee(command, counter as u32, Stage::NormalFirstHalf, 0);
            }
            engine.step(&world.snapshot());
            let roles = engine.roles();
            assert_eq!(roles.len(), 6, "every online ally holds exactly one role");
            let keepers: Vec<u32> = roles.iter().filter(|(_, r)| *r == Role::Keeper).map(|(id, _)| *id).collect();
            assert_eq!(keepers, vec![1]);
            assert!(roles.iter().all(|(_, r)| *r != Role::Unassigned));
        }
        Ok(())
    }

    #[test]
    fn open_goal_shot_aims_at_goal_centre() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        place(&world, TeamColor::Blue, 2, 3000.0, 0.0)?;
        world.apply_ball_detection(Point::new(4000.0, 0.0), 0.0, 0)?;

        let mut engine = StrategyEngine::default();
        let tick = engine.step(&world.snapshot());
        assert_eq!(tick.mode, Mode::Attack);
        assert_eq!(engine.role(2), Some(Role::Attacker));

        let goto = output(&tick, 2).ok_or("no output for robot 2")?;
        assert_eq!(goto.target, Some(Point::new(4500.0, 0.0)));
        assert_eq!(goto.kick, Some(Kick::Straight(100)));
        let stance = goto.destination.ok_or("no destination")?;
        assert!(stance.distance(Point::new(4000.0 - 90.0, 0.0)) < 1e-6);
        Ok(())
    }

    #[test]
    fn enemy_owner_draws_a_blocker() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        place(&world, TeamColor::Blue, 1, -4400.0, 0.0)?;
        place(&world, TeamColor::Blue, 2, -2000.0, 0.0)?;
        place(&world, TeamColor::Blue, 3, -2500.0, 500.0)?;
        place(&world, TeamColor::Yellow, 7, -1000.0, 0.0)?;
        world.apply_ball_detection(Point::new(-900.0, 0.0), 0.0, 0)?;

        let mut engine = StrategyEngine::default();
        let tick = engine.step(&world.snapshot());
        assert_eq!(tick.mode, Mode::Defense);
        assert_eq!(engine.role(2), Some(Role::Blocker));
        assert_eq!(engine.role(3), Some(Role::Defender));

        let block = output(&tick, 2).and_then(|g| g.destination).ok_or("no blocker output")?;
        assert!(block.distance(Point::new(-1200.0, 0.0)) < 1e-6);
        Ok(())
    }

    #[test]
    fn set_pieces_ignore_open_play_events() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        place(&world, TeamColor::Blue, 2, 0.0, 0.0)?;
        world.apply_referee(RefereeCommand::Stop, 1, Stage::NormalFirstHalf, 0);

        let mut engine = StrategyEngine::default();
        engine.step(&world.snapshot());
        world.apply_ball_detection(Point::new(100.0, 0.0), 0.0, 0)?;
        let tick = engine.step(&world.snapshot());
        assert!(tick.events.contains(&GameEvent::BallAllyCapture));
        assert_eq!(engine.mode(), Mode::Standard(StandardStrategy::Stop));

        world.apply_referee(RefereeCommand::NormalStart, 2, Stage::NormalFirstHalf, 0);
        engine.step(&world.snapshot());
        assert_eq!(engine.mode(), Mode::Attack);
        Ok(())
    }

    #[test]
    fn assignment_and_execution_are_idempotent() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        for id in 1..=4u32 {
            place(&world, TeamColor::Blue, id, -1000.0 * id as f64, 200.0)?;
        }
        world.apply_ball_detection(Point::new(500.0, 500.0), 0.0, 0)?;
        let snapshot = world.snapshot();

        let mut engine = StrategyEngine::default();
        engine.observe(&snapshot);
        assert!(!engine.assign_roles(&snapshot).is_empty());
        assert!(engine.assign_roles(&snapshot).is_empty());
        assert_eq!(engine.execute(&snapshot), engine.execute(&snapshot));
        Ok(())
    }

    #[test]
    fn offline_robot_is_released() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        place(&world, TeamColor::Blue, 2, -1000.0, 0.0)?;
        place(&world, TeamColor::Blue, 3, -2000.0, 0.0)?;

        let mut engine = StrategyEngine::default();
        engine.step(&world.snapshot());
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        world.mark_stale(1.0);

        let tick = engine.step(&world.snapshot());
        assert_eq!(tick.role_changes, vec![(3, Role::Unassigned)]);
        assert_eq!(engine.role(3), None);
        Ok(())
    }

    #[test]
    fn free_position_avoids_opponents() {
        let world = blue_world();
        let mut snapshot = world.snapshot();
        assert_eq!(free_position(&snapshot), Some(Point::new(1250.0, 0.0)));

        snapshot.robots.push(striker_world::RobotSnapshot {
            id: 9,
            team: TeamColor::Yellow,
            position: Point::new(1250.0, 0.0),
            orientation: 0.0,
            velocity: Point::ORIGIN,
            role: Role::Unassigned,
            online: true,
            visible: true,
            last_update: 0.0,
            update_count: 1,
        });
        let spot = free_position(&snapshot);
        assert!(spot.is_some_and(|p| p != Point::new(1250.0, 0.0)));
    }

    #[test]
    fn lateral_offsets_alternate() {
        let p = ModeParameters::default();
        let offsets: Vec<f64> = (0..5).map(|i| lateral_offset(i, &p)).collect();
        assert_eq!(offsets, vec![0.0, 250.0, -250.0, 500.0, -500.0]);
    }
}
