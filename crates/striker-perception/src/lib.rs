//! `striker-perception` – per-object state estimation.
//!
//! Turns noisy, asynchronous camera detections into smoothed positions and
//! velocities.
//!
//! # Modules
//!
//! - [`kalman`] – [`BallKalman`][kalman::BallKalman]: linear
//!   constant-velocity Kalman filter over `[x, y, vx, vy]`.
//! - [`ukf`] – [`RobotUkf`][ukf::RobotUkf]: unscented Kalman filter over
//!   `[x, y, vx, vy, θ]` with pluggable motion and measurement models.
//! - [`tracker`] – [`Tracker`][tracker::Tracker]: wraps any [`Estimator`]
//!   with timestamps and a loss threshold after which the filter is
//!   re-seeded instead of integrated across the gap.

pub mod kalman;
pub mod tracker;
pub mod ukf;

use striker_types::{Point, Pose};

pub use kalman::BallKalman;
pub use tracker::{TrackOutcome, Tracker};
pub use ukf::RobotUkf;

/// Common contract of the recursive filters.
///
/// `predict` advances the internal state by `dt` seconds, `update` folds in a
/// camera reading, and `reset` discards all history and seeds the state on a
/// single reading with zero velocity.
pub trait Estimator {
    /// What a camera reports for the tracked object.
    type Measurement: Copy;

    fn predict(&mut self, dt: f64);
    fn update(&mut self, measurement: Self::Measurement);
    fn reset(&mut self, measurement: Self::Measurement);

    /// Current position (and orientation in degrees, `0` for the ball).
    fn pose(&self) -> Pose;

    /// Current velocity in mm/s.
    fn velocity(&self) -> Point;
}
