//! Low-level behaviors.
//!
//! A behavior turns a handful of stored parameters into a [`GotoPosition`]
//! for one robot.  The strategy engine calls `update(..)` with fresh
//! parameters every tick and then [`Behavior::calculate`].
//!
//! | Behavior | Stands | Faces |
//! |---|---|---|
//! | [`Keeper`] | on the goal→ball ray, inside the goal width | ball |
//! | [`Defender`] | on the reference→ball line, optionally offset sideways | ball |
//! | [`Attacker`] | behind the ball along the shot line, or at a free spot | shot target / ball |
//! | [`Blocker`] | between the ball and what it protects, clipped to the field | object |
//! | [`Coverer`] | next to an opponent, on the side of the object | opponent |
//! | [`Counter`] | at a free position or a zone centre | ball |
//! | [`Runner`] | at a free position | ball |
//!
//! Every behavior tolerates missing inputs: without a robot pose, a ball or
//! a required target it returns its previous output (initially
//! [`GotoPosition::default`], which holds position).

pub mod attacker;
pub mod blocker;
pub mod counter;
pub mod coverer;
pub mod defender;
pub mod keeper;
pub mod runner;

pub use attacker::Attacker;
pub use blocker::Blocker;
pub use counter::Counter;
pub use coverer::Coverer;
pub use defender::Defender;
pub use keeper::Keeper;
pub use runner::Runner;

use striker_types::GotoPosition;
use striker_world::{RobotSnapshot, WorldSnapshot};

/// Common interface of every low-level behavior.
pub trait Behavior {
    /// Compute this tick's target for `robot` from the stored parameters.
    ///
    /// `robot` is `None` when the robot is not in the snapshot.
    fn calculate(&mut self, robot: Option<&RobotSnapshot>, world: &WorldSnapshot) -> GotoPosition;

    /// The most recent output of [`Behavior::calculate`].
    fn last(&self) -> GotoPosition;
}

/// Store `next` as the latest output and return it.
fn remember(last: &mut GotoPosition, next: GotoPosition) -> GotoPosition {
    *last = next;
    next
}
