//! Linear constant-velocity Kalman filter for the ball.
//!
//! State vector `[x, y, vx, vy]` in millimetres and mm/s.  Only the position
//! is observed; velocity is inferred from consecutive corrections.
//!
//! ```text
//! predict:  x⁻ = F(Δt)·x          P⁻ = F·P·Fᵀ + Q
//! update:   K  = P⁻·Hᵀ·(H·P⁻·Hᵀ + R)⁻¹
//!           x  = x⁻ + K·(z − H·x⁻)  P  = (I − K·H)·P⁻
//! ```
//!
//! `Q` and `R` are fixed diagonals: `Q` is tuned for a 60 Hz camera cycle,
//! `R` for overhead-camera jitter.
//!
//! # Example
//!
//! ```rust
//! use striker_perception::kalman::BallKalman;
//! use striker_types::Point;
//!
//! let mut kf = BallKalman::new();
//! kf.reset(Point::new(0.0, 0.0));
//! for k in 1..=30 {
//!     kf.predict(1.0 / 60.0);
//!     kf.update(Point::new(1000.0 * k as f64 / 60.0, 0.0));
//! }
//! assert!((kf.velocity().x - 1000.0).abs() < 10.0);
//! ```

use nalgebra::{Matrix2, Matrix2x4, Matrix4, Vector2, Vector4};
use striker_types::{Point, Pose};

use crate::Estimator;

/// Process noise added to each position component per prediction, mm².
const POSITION_PROCESS_VARIANCE: f64 = 0.2;

/// Process noise added to each velocity component per prediction, (mm/s)².
const VELOCITY_PROCESS_VARIANCE: f64 = 2500.0;

/// Variance of a single camera position reading, mm².
const MEASUREMENT_VARIANCE: f64 = 4.0;

// ────────────────────────────────────────────────────────────────────────────
// BallKalman
// ────────────────────────────────────────────────────────────────────────────

/// Constant-velocity Kalman filter over `[x, y, vx, vy]`.
#[derive(Debug, Clone)]
pub struct BallKalman {
    x: Vector4<f64>,
    p: Matrix4<f64>,
    h: Matrix2x4<f64>,
    r: Matrix2<f64>,
}

impl Default for BallKalman {
    fn default() -> Self {
        Self::new()
    }
}

impl BallKalman {
    pub fn new() -> Self {
        let mut h = Matrix2x4::zeros();
        h[(0, 0)] = 1.0;
        h[(1, 1)] = 1.0;
        Self {
            x: Vector4::zeros(),
            p: Matrix4::identity(),
            h,
            r: Matrix2::identity() * MEASUREMENT_VARIANCE,
        }
    }

    fn transition(dt: f64) -> Matrix4<f64> {
        let mut f = Matrix4::identity();
        f[(0, 2)] = dt;
        f[(1, 3)] = dt;
        f
    }

    fn process_noise() -> Matrix4<f64> {
        Matrix4::from_diagonal(&Vector4::new(
            POSITION_PROCESS_VARIANCE,
            POSITION_PROCESS_VARIANCE,
            VELOCITY_PROCESS_VARIANCE,
            VELOCITY_PROCESS_VARIANCE,
        ))
    }

    /// Advance the state by `dt` seconds (a priori estimate).
    pub fn predict(&mut self, dt: f64) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        let f = Self::transition(dt);
        self.x = f * self.x;
        self.p = f * self.p * f.transpose() + Self::process_noise();
    }

    /// Fold in a position measurement (a posteriori correction).
    pub fn update(&mut self, z: Point) {
        let z = Vector2::new(z.x, z.y);
        let innovation = z - self.h * self.x;
        let s = self.h * self.p * self.h.transpose() + self.r;
        let Some(s_inv) = s.try_inverse() else {
            tracing::warn!("ball innovation covariance is singular; skipping correction");
            return;
        };
        let k = self.p * self.h.transpose() * s_inv;
        self.x += k * innovation;
        self.p = (Matrix4::identity() - k * self.h) * self.p;
    }

    /// Reseed on `z` with zero velocity and identity covariance.
    pub fn reset(&mut self, z: Point) {
        self.x = Vector4::new(z.x, z.y, 0.0, 0.0);
        self.p = Matrix4::identity();
    }

    pub fn position(&self) -> Point {
        Point::new(self.x[0], self.x[1])
    }

    pub fn velocity(&self) -> Point {
        Point::new(self.x[2], self.x[3])
    }
}

impl Estimator for BallKalman {
    type Measurement = Point;

    fn predict(&mut self, dt: f64) {
        BallKalman::predict(self, dt);
    }

    fn update(&mut self, measurement: Point) {
        BallKalman::update(self, measurement);
    }

    fn reset(&mut self, measurement: Point) {
        BallKalman::reset(self, measurement);
    }

    fn pose(&self) -> Pose {
        Pose {
            position: self.position(),
            orientation: 0.0,
        }
    }

    fn velocity(&self) -> Point {
        BallKalman::velocity(self)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f64 = 1.0 / 60.0;

    fn feed_constant_velocity(kf: &mut BallKalman, v: Point, ticks: usize) -> Vec<Point> {
        let mut out = Vec::with_capacity(ticks);
        for k in 1..=ticks {
            kf.predict(DT);
            kf.update(Point::new(v.x * k as f64 * DT, v.y * k as f64 * DT));
            out.push(kf.velocity());
        }
        out
    }

    #[test]
    fn reset_zeroes_velocity() {
        let mut kf = BallKalman::new();
        feed_constant_velocity(&mut kf, Point::new(2000.0, 0.0), 20);
        kf.reset(Point::new(500.0, 500.0));
        assert_eq!(kf.position(), Point::new(500.0, 500.0));
        assert_eq!(kf.velocity(), Point::ORIGIN);
    }

    #[test]
    fn velocity_converges_and_stays_stable() {
        let mut kf = BallKalman::new();
        kf.reset(Point::ORIGIN);
        let v = Point::new(1000.0, -500.0);
        let history = feed_constant_velocity(&mut kf, v, 120);
        for est in &history[20..] {
            assert!((est.x - v.x).abs() < 20.0, "vx drifted: {}", est.x);
            assert!((est.y - v.y).abs() < 10.0, "vy drifted: {}", est.y);
        }
    }

    #[test]
    fn stationary_ball_stays_put() {
        let mut kf = BallKalman::new();
        kf.reset(Point::new(100.0, 200.0));
        for _ in 0..30 {
            kf.predict(DT);
            kf.update(Point::new(100.0, 200.0));
        }
        assert!(kf.position().distance(Point::new(100.0, 200.0)) < 1e-6);
        assert!(kf.velocity().length() < 1e-6);
    }

    #[test]
    fn predict_extrapolates_with_velocity() {
        let mut kf = BallKalman::new();
        kf.reset(Point::ORIGIN);
        feed_constant_velocity(&mut kf, Point::new(600.0, 0.0), 60);
        let before = kf.position();
        kf.predict(0.5);
        assert!((kf.position().x - before.x - 300.0).abs() < 5.0);
    }

    #[test]
    fn process_noise_is_a_fixed_diagonal() {
        let q = BallKalman::process_noise();
        for row in 0..4 {
            for col in 0..4 {
                if row != col {
                    assert_eq!(q[(row, col)], 0.0);
                }
            }
        }
        assert_eq!(q[(0, 0)], POSITION_PROCESS_VARIANCE);
        assert_eq!(q[(3, 3)], VELOCITY_PROCESS_VARIANCE);

        // Same growth of uncertainty whatever the step.
        let mut short = BallKalman::new();
        let mut long = BallKalman::new();
        short.reset(Point::ORIGIN);
        long.reset(Point::ORIGIN);
        short.predict(DT);
        long.predict(0.5);
        assert_eq!(short.p[(2, 2)], long.p[(2, 2)]);
        assert_eq!(short.p[(2, 2)], 1.0 + VELOCITY_PROCESS_VARIANCE);
    }

    #[test]
    fn non_positive_dt_is_ignored() {
        let mut kf = BallKalman::new();
        kf.reset(Point::new(1.0, 1.0));
        kf.predict(0.0);
        kf.predict(-1.0);
        kf.predict(f64::NAN);
        assert_eq!(kf.position(), Point::new(1.0, 1.0));
    }
}
