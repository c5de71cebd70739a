//! Timestamped wrapper around an [`Estimator`].
//!
//! A [`Tracker`] decides, per measurement, whether to integrate it into the
//! running estimate or to start over:
//!
//! | Situation                                   | Action              |
//! |---------------------------------------------|---------------------|
//! | first measurement                           | reset               |
//! | gap since last update > loss threshold      | reset               |
//! | timestamp earlier than the last update      | reset               |
//! | same timestamp (second camera, same frame)  | update only         |
//! | otherwise                                   | predict(Δt), update |
//!
//! # Example
//!
//! ```rust
//! use striker_perception::{BallKalman, TrackOutcome, Tracker};
//! use striker_types::Point;
//!
//! let mut tracker = Tracker::new(BallKalman::new());
//! assert_eq!(tracker.observe(Point::new(0.0, 0.0), 10.0), TrackOutcome::Reset);
//! assert_eq!(tracker.observe(Point::new(10.0, 0.0), 10.1), TrackOutcome::Updated);
//! // Lost for more than a second: the estimate is re-seeded.
//! assert_eq!(tracker.observe(Point::new(2000.0, 0.0), 11.5), TrackOutcome::Reset);
//! ```

use striker_types::{Point, Pose};
use tracing::debug;

use crate::Estimator;

/// Default loss threshold, in seconds.
pub const DEFAULT_LOSS_THRESHOLD: f64 = 1.0;

/// How a measurement was folded into the estimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackOutcome {
    /// The estimator was re-seeded on the measurement.
    Reset,
    /// The measurement was integrated as a correction.
    Updated,
}

/// An estimator plus the bookkeeping needed to feed it real timestamps.
#[derive(Debug, Clone)]
pub struct Tracker<E: Estimator> {
    estimator: E,
    last_update: Option<f64>,
    loss_threshold: f64,
}

impl<E: Estimator> Tracker<E> {
    pub fn new(estimator: E) -> Self {
        Self::with_loss_threshold(estimator, DEFAULT_LOSS_THRESHOLD)
    }

    pub fn with_loss_threshold(estimator: E, loss_threshold: f64) -> Self {
        Self {
            estimator,
            last_update: None,
            loss_threshold,
        }
    }

    /// Integrate `measurement` taken at `timestamp` seconds.
    pub fn observe(&mut self, measurement: E::Measurement, timestamp: f64) -> TrackOutcome {
        let outcome = match self.last_update {
            None => {
                self.estimator.reset(measurement);
                TrackOutcome::Reset
            }
            Some(last) => {
                let dt = timestamp - last;
                if dt < 0.0 || dt > self.loss_threshold {
                    debug!(dt, threshold = self.loss_threshold, "track lost; re-seeding estimator");
                    self.estimator.reset(measurement);
                    TrackOutcome::Reset
                } else {
                    if dt > 0.0 {
                        self.estimator.predict(dt);
                    }
                    self.estimator.update(measurement);
                    TrackOutcome::Updated
                }
            }
        };
        self.last_update = Some(timestamp);
        outcome
    }

    /// Seconds of the last accepted measurement, if any.
    pub fn last_update(&self) -> Option<f64> {
        self.last_update
    }

    pub fn loss_threshold(&self) -> f64 {
        self.loss_threshold
    }

    pub fn pose(&self) -> Pose {
        self.estimator.pose()
    }

    pub fn velocity(&self) -> Point {
        self.estimator.velocity()
    }

    pub fn estimator(&self) -> &E {
        &self.estimator
    }
}

impl<E: Estimator + Default> Default for Tracker<E> {
    fn default() -> Self {
        Self::new(E::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BallKalman, RobotUkf};

    const DT: f64 = 1.0 / 60.0;

    #[test]
    fn first_measurement_resets() {
        let mut t = Tracker::new(BallKalman::new());
        assert_eq!(t.observe(Point::new(5.0, 5.0), 3.0), TrackOutcome::Reset);
        assert_eq!(t.pose().position, Point::new(5.0, 5.0));
        assert_eq!(t.last_update(), Some(3.0));
    }

    #[test]
    fn gap_beyond_threshold_yields_zero_velocity() {
        let mut t = Tracker::new(BallKalman::new());
        for k in 0..60 {
            t.observe(Point::new(1000.0 * k as f64 * DT, 0.0), k as f64 * DT);
        }
        assert!(t.velocity().x > 500.0);

        let outcome = t.observe(Point::new(3000.0, 0.0), 60.0 * DT + 1.5);
        assert_eq!(outcome, TrackOutcome::Reset);
        assert_eq!(t.velocity(), Point::ORIGIN);
        assert_eq!(t.pose().position, Point::new(3000.0, 0.0));
    }

    #[test]
    fn robot_detection_far_away_after_loss_has_no_velocity() {
        let mut t = Tracker::new(RobotUkf::new());
        t.observe(Pose::new(0.0, 0.0, 0.0), 0.0);
        t.observe(Pose::new(10.0, 0.0, 0.0), DT);
        let outcome = t.observe(Pose::new(2000.0, 0.0, 45.0), 2.0);
        assert_eq!(outcome, TrackOutcome::Reset);
        assert_eq!(t.velocity(), Point::ORIGIN);
        assert!((t.pose().orientation - 45.0).abs() < 1e-9);
    }

    #[test]
    fn backwards_time_resets() {
        let mut t = Tracker::new(BallKalman::new());
        t.observe(Point::ORIGIN, 5.0);
        assert_eq!(t.observe(Point::new(1.0, 0.0), 4.0), TrackOutcome::Reset);
    }

    #[test]
    fn same_timestamp_is_an_extra_correction() {
        let mut t = Tracker::new(BallKalman::new());
        t.observe(Point::ORIGIN, 1.0);
        assert_eq!(t.observe(Point::new(2.0, 0.0), 1.0), TrackOutcome::Updated);
        let x = t.pose().position.x;
        assert!(x > 0.0 && x < 2.0);
    }

    #[test]
    fn custom_threshold_is_honoured() {
        let mut t = Tracker::with_loss_threshold(BallKalman::new(), 0.1);
        t.observe(Point::ORIGIN, 0.0);
        assert_eq!(t.observe(Point::ORIGIN, 0.2), TrackOutcome::Reset);
        assert!((t.loss_threshold() - 0.1).abs() < 1e-12);
    }
}
