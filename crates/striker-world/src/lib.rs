//! `striker-world` – the shared belief about the match.
//!
//! # Modules
//!
//! - [`field`] – [`FieldGeometry`], goals and the named [`FieldZone`]s.
//! - [`world`] – [`World`]: the concurrent world model fed by the ingestion
//!   channels (`apply_*`) and read by the decision layer as snapshots.
//! - [`snapshot`] – [`WorldSnapshot`] and the derived queries (possession,
//!   attacking enemies, referee motion rules).
//! - [`free_shot`] – open shooting lane towards the enemy goal.
//!
//! # Example
//!
//! ```rust
//! use striker_types::{Pose, Role, TeamColor};
//! use striker_world::World;
//!
//! let world = World::default();
//! world.set_ally(TeamColor::Blue);
//! world.apply_detection(TeamColor::Blue, 2, Pose::new(100.0, 200.0, 0.0), 0.0, 0).unwrap();
//! let snap = world.snapshot();
//! assert_eq!(snap.ally_robot(2).map(|r| r.role), Some(Role::Unassigned));
//! ```

pub mod field;
pub mod free_shot;
pub mod snapshot;
pub mod world;

pub use field::{FieldGeometry, FieldZone, Goal, Side};
pub use free_shot::DEFAULT_MAX_OBSTACLES;
pub use snapshot::{BallSnapshot, RefereeState, RobotSnapshot, TeamInfo, WorldSnapshot};
pub use world::{ApplyOutcome, RefereeUpdate, World, WorldConfig};
