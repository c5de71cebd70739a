//! Team strategy: modes, game events and the engine that ties them to the
//! low-level behaviors.

pub mod engine;
pub mod events;
pub mod mode;

pub use engine::{free_position, EngineConfig, StrategyEngine, TickOutcome};
pub use events::{EventDetector, GameEvent};
pub use mode::{strategy_for, Mode, ModeParameters, StandardStrategy};
