//! Per-tick command pipeline.
//!
//! ```text
//!  World ──snapshot──▶ StrategyEngine ──GotoPosition──▶ MotionController
//!                                                            │ RobotCommand
//!                        CommandSink ◀──transmit── mpsc ◀── CommandCodec
//! ```
//!
//! [`Dispatcher::tick`] is synchronous and never touches a socket; encoded
//! frames are queued for [`transmit`], which owns the [`CommandSink`].
//! A failure for one robot drops that robot's command for the tick and is
//! reported on [`Topic::Dispatch`]; nothing is resent later.

use std::num::NonZeroU32;
use std::sync::Arc;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use serde::{Deserialize, Serialize};
use striker_middleware::codec::Frame;
use striker_middleware::{CommandCodec, CommandSink, EventBus, Topic};
use striker_types::{Event, EventPayload, GotoPosition, RobotCommand, StrikerError};
use striker_world::{World, WorldSnapshot};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

use crate::motion::MotionController;
use crate::strategy::StrategyEngine;

const EVENT_SOURCE: &str = "striker-runtime::dispatch";

/// Dropped-command warnings emitted per second.
pub const WARNINGS_PER_SECOND: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DispatchConfig {
    /// A robot unseen for longer than this (s) is sent a stop command.
    pub stale_after: f64,
    /// Frames buffered between the tick and the outbound task.
    pub queue_capacity: usize,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            stale_after: 0.2,
            queue_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    pub ticks: u64,
    /// Frames handed to the outbound queue, stop commands included.
    pub commands: u64,
    pub stops: u64,
    pub dropped: u64,
}

/// Owns the strategy engine and the motion controller and turns each world
/// snapshot into queued command frames.
pub struct Dispatcher {
    world: Arc<World>,
    engine: StrategyEngine,
    motion: MotionController,
    bus: EventBus,
    frames: mpsc::Sender<Frame>,
    config: DispatchConfig,
    warnings: DefaultDirectRateLimiter,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(
        world: Arc<World>,
        engine: StrategyEngine,
        bus: EventBus,
        frames: mpsc::Sender<Frame>,
        config: DispatchConfig,
    ) -> Self {
        let per_second = NonZeroU32::new(WARNINGS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
        Self {
            world,
            engine,
            motion: MotionController::new(),
            bus,
            frames,
            config,
            warnings: RateLimiter::direct(Quota::per_second(per_second)),
            stats: DispatchStats::default(),
        }
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }

    pub fn engine(&self) -> &StrategyEngine {
        &self.engine
    }

    /// Run one decision cycle and queue a frame per ally robot.
    ///
    /// Returns the commands that were produced, in robot-id order.
    pub fn tick(&mut self) -> Vec<RobotCommand> {
        self.stats.ticks += 1;
        if let Some(now) = self.world.snapshot().latest_update() {
            self.world.mark_stale(now);
        }
        let snapshot = self.world.snapshot();
        let now = snapshot.latest_update().unwrap_or_default();

        let outcome = self.engine.step(&snapshot);
        if outcome.mode_changed {
            debug!(mode = %outcome.mode, events = ?outcome.events, "publishing mode change");
            self.publish(Topic::Strategy, EventPayload::ModeChanged(outcome.mode.to_string()));
        }
        // The world emits RoleAssigned for every change it accepts.
        for &(id, role) in &outcome.role_changes {
            self.world.assign_role(id, role);
        }

        let mut commands = Vec::with_capacity(outcome.outputs.len());
        for (id, output) in outcome.outputs {
            match self.command_for(id, output, &snapshot, now) {
                Ok(command) => {
                    if self.enqueue(command) {
                        commands.push(command);
                    }
                }
                Err(e) => self.report_drop(id, &e),
            }
        }
        debug!(tick = self.stats.ticks, commands = commands.len(), "tick dispatched");
        commands
    }

    fn command_for(
        &mut self,
        id: u32,
        output: Result<GotoPosition, StrikerError>,
        snapshot: &WorldSnapshot,
        now: f64,
    ) -> Result<RobotCommand, StrikerError> {
        let goto = output?;
        let robot = snapshot.ally_robot(id).ok_or_else(|| StrikerError::Behavior {
            robot_id: id,
            reason: "robot missing from snapshot".to_string(),
        })?;

        let unseen = now - robot.last_update;
        if unseen > self.config.stale_after || !snapshot.robot_may_move(id) {
            let robot_id = u8::try_from(id).map_err(|_| StrikerError::Behavior {
                robot_id: id,
                reason: "robot id does not fit the command frame".to_string(),
            })?;
            self.stats.stops += 1;
            debug!(id, unseen, "holding robot");
            return Ok(RobotCommand::stop(robot_id));
        }
        self.motion.command(robot, &goto, snapshot, now)
    }

    fn enqueue(&mut self, command: RobotCommand) -> bool {
        let id = u32::from(command.robot_id);
        match self.frames.try_send(CommandCodec::encode(&command)) {
            Ok(()) => {
                self.stats.commands += 1;
                true
            }
            Err(TrySendError::Full(_)) => {
                self.report_drop(id, &StrikerError::Channel("command queue full".to_string()));
                false
            }
            Err(TrySendError::Closed(_)) => {
                self.report_drop(id, &StrikerError::Channel("command queue closed".to_string()));
                false
            }
        }
    }

    fn report_drop(&mut self, id: u32, error: &StrikerError) {
        self.stats.dropped += 1;
        if self.warnings.check().is_ok() {
            warn!(id, error = %error, dropped = self.stats.dropped, "command dropped");
        }
        self.publish(
            Topic::Dispatch,
            EventPayload::CommandDropped {
                id,
                reason: error.to_string(),
            },
        );
    }

    fn publish(&self, topic: Topic, payload: EventPayload) {
        self.bus.publish_to(topic, Event::new(EVENT_SOURCE, payload));
    }
}

/// Hand every queued frame to `sink` until all senders are gone.
///
/// Returns the number of frames the sink accepted.
pub async fn transmit(mut frames: mpsc::Receiver<Frame>, sink: Arc<dyn CommandSink>, bus: EventBus) -> u64 {
    let per_second = NonZeroU32::new(WARNINGS_PER_SECOND).unwrap_or(NonZeroU32::MIN);
    let warnings = RateLimiter::direct(Quota::per_second(per_second));
    let mut sent = 0u64;
    let mut failed = 0u64;

    while let Some(frame) = frames.recv().await {
        match sink.send(&frame).await {
            Ok(()) => sent += 1,
            Err(e) => {
                failed += 1;
                let id = u32::from(frame[1]);
                if warnings.check().is_ok() {
                    warn!(id, failed, error = %e, "command send failed");
                }
                bus.publish_to(
                    Topic::Dispatch,
                    Event::new(EVENT_SOURCE, EventPayload::CommandDropped { id, reason: e.to_string() }),
                );
            }
        }
    }
    info!(sent, failed, "outbound task stopped");
    sent
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use striker_middleware::MemorySink;
    use striker_types::{Pose, RefereeCommand, Role, Stage, TeamColor};
    use striker_world::WorldConfig;

    fn blue_world() -> Arc<World> {
        let world = Arc::new(World::new(WorldConfig::default()));
        world.set_ally(TeamColor::Blue);
        world
    }

    fn dispatcher(world: &Arc<World>, capacity: usize) -> (Dispatcher, mpsc::Receiver<Frame>, EventBus) {
        let bus = EventBus::default();
        let (tx, rx) = mpsc::channel(capacity);
        let d = Dispatcher::new(
            Arc::clone(world),
            StrategyEngine::default(),
            bus.clone(),
            tx,
            DispatchConfig::default(),
        );
        (d, rx, bus)
    }

    fn drain(rx: &mut mpsc::Receiver<Frame>) -> Result<Vec<RobotCommand>, StrikerError> {
        let mut out = Vec::new();
        while let Ok(frame) = rx.try_recv() {
            out.push(CommandCodec::decode(&frame)?);
        }
        Ok(out)
    }

    #[test]
    fn first_tick_assigns_roles_and_queues_frames() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        let (mut d, mut rx, _bus) = dispatcher(&world, 8);

        let produced = d.tick();
        assert_eq!(world.robot(TeamColor::Blue, 2).map(|r| r.role), Some(Role::Defender));
        let queued = drain(&mut rx)?;
        assert_eq!(queued, produced);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].robot_id, 2);
        assert_eq!(d.stats().commands, 1);
        Ok(())
    }

    #[tokio::test]
    async fn mode_change_is_published() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        let (mut d, _rx, bus) = dispatcher(&world, 8);
        let mut strategy = bus.subscribe_to(Topic::Strategy);

        world.apply_referee(RefereeCommand::PrepareKickoffBlue, 1, Stage::NormalFirstHalf, 0);
        d.tick();

        let event = strategy.recv().await?;
        assert!(matches!(event.payload, EventPayload::ModeChanged(ref m) if m == "standard:KickOffAttack"));
        Ok(())
    }

    #[test]
    fn halt_stops_everyone() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        world.apply_detection(TeamColor::Blue, 3, Pose::new(-500.0, 800.0, 0.0), 1.0, 0)?;
        world.apply_referee(RefereeCommand::Halt, 1, Stage::NormalFirstHalf, 0);
        let (mut d, mut rx, _bus) = dispatcher(&world, 8);

        d.tick();
        assert_eq!(drain(&mut rx)?, vec![RobotCommand::stop(2), RobotCommand::stop(3)]);
        assert_eq!(d.stats().stops, 2);
        Ok(())
    }

    #[test]
    fn unseen_robot_is_stopped() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        world.apply_detection(TeamColor::Blue, 3, Pose::new(-500.0, 800.0, 0.0), 1.0, 0)?;
        world.apply_detection(TeamColor::Blue, 3, Pose::new(-500.0, 800.0, 0.0), 1.3, 0)?;
        let (mut d, mut rx, _bus) = dispatcher(&world, 8);

        d.tick();
        let queued = drain(&mut rx)?;
        assert_eq!(queued.len(), 2);
        assert!(queued.contains(&RobotCommand::stop(2)));
        assert_eq!(d.stats().stops, 1);
        Ok(())
    }

    #[tokio::test]
    async fn unencodable_robot_is_dropped_and_reported() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        world.apply_detection(TeamColor::Blue, 300, Pose::new(-800.0, 900.0, 0.0), 1.0, 0)?;
        let (mut d, mut rx, bus) = dispatcher(&world, 8);
        let mut dispatch = bus.subscribe_to(Topic::Dispatch);

        d.tick();
        let queued = drain(&mut rx)?;
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].robot_id, 2);
        assert_eq!(d.stats().dropped, 1);

        let event = dispatch.recv().await?;
        assert!(matches!(event.payload, EventPayload::CommandDropped { id: 300, .. }));
        Ok(())
    }

    #[test]
    fn full_queue_drops_excess_frames() -> Result<(), Box<dyn std::error::Error>> {
        let world = blue_world();
        world.apply_detection(TeamColor::Blue, 2, Pose::new(-1000.0, 0.0, 0.0), 1.0, 0)?;
        world.apply_detection(TeamColor::Blue, 3, Pose::new(-500.0, 800.0, 0.0), 1.0, 0)?;
        let (mut d, mut rx, _bus) = dispatcher(&world, 1);

        let produced = d.tick();
        assert_eq!(produced.len(), 1);
        assert_eq!(d.stats().dropped, 1);
        assert_eq!(drain(&mut rx)?.len(), 1);
        Ok(())
    }

    #[tokio::test]
    async fn transmit_forwards_until_senders_close() -> Result<(), Box<dyn std::error::Error>> {
        let sink = Arc::new(MemorySink::new());
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(transmit(rx, sink.clone(), EventBus::default()));

        tx.send(CommandCodec::encode(&RobotCommand::stop(4))).await?;
        tx.send(CommandCodec::encode(&RobotCommand::stop(5))).await?;
        drop(tx);

        assert_eq!(task.await?, 2);
        assert_eq!(sink.commands()?, vec![RobotCommand::stop(4), RobotCommand::stop(5)]);
        Ok(())
    }

    struct FailingSink;

    #[async_trait]
    impl CommandSink for FailingSink {
        async fn send(&self, _frame: &[u8]) -> Result<(), StrikerError> {
            Err(StrikerError::Io("radio unplugged".to_string()))
        }
    }

    #[tokio::test]
    async fn send_failures_are_reported() -> Result<(), Box<dyn std::error::Error>> {
        let bus = EventBus::default();
        let mut dispatch = bus.subscribe_to(Topic::Dispatch);
        let (tx, rx) = mpsc::channel(4);
        let task = tokio::spawn(transmit(rx, Arc::new(FailingSink), bus.clone()));

        tx.send(CommandCodec::encode(&RobotCommand::stop(7))).await?;
        drop(tx);

        assert_eq!(task.await?, 0);
        let event = dispatch.recv().await?;
        assert!(matches!(event.payload, EventPayload::CommandDropped { id: 7, .. }));
        Ok(())
    }
}
