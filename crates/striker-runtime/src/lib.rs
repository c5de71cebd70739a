//! `striker-runtime` – the decision loop.
//!
//! Everything that happens once per tick, from a world snapshot to queued
//! command frames.
//!
//! # Modules
//!
//! - [`behavior`] – low-level behaviors ([`Keeper`][behavior::Keeper],
//!   [`Defender`][behavior::Defender], [`Attacker`][behavior::Attacker],
//!   [`Blocker`][behavior::Blocker], [`Coverer`][behavior::Coverer],
//!   [`Counter`][behavior::Counter], [`Runner`][behavior::Runner]), each
//!   producing a [`GotoPosition`][striker_types::GotoPosition].
//! - [`strategy`] – game events, the mode state machine and role
//!   assignment in [`StrategyEngine`].
//! - [`motion`] – [`MotionController`]: planner-routed drive commands with
//!   speed ramps, auto-dribble and kick cooldown.
//! - [`dispatch`] – [`Dispatcher`] wiring engine, motion and codec per tick,
//!   plus the outbound [`transmit`] task.
//! - [`scheduler`] – [`TickScheduler`], the fixed-cadence driver that skips
//!   ticks instead of queueing them.
//! - [`telemetry`] – [`init_tracing`]: `tracing-subscriber` with optional
//!   OTLP export.

pub mod behavior;
pub mod dispatch;
pub mod motion;
pub mod scheduler;
pub mod strategy;
pub mod telemetry;

pub use dispatch::{transmit, DispatchConfig, DispatchStats, Dispatcher};
pub use motion::MotionController;
pub use scheduler::{SchedulerStats, TickScheduler, DEFAULT_TICK_HZ};
pub use strategy::{EngineConfig, Mode, StandardStrategy, StrategyEngine};
pub use telemetry::{init_tracing, TracerProviderGuard};
