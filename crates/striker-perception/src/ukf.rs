//! Unscented Kalman filter for robots.
//!
//! State `[x, y, vx, vy, θ]` (mm, mm/s, radians).  Cameras report position
//! and orientation directly, so the measurement is `[x, y, θ]`.  The
//! sigma-point formulation keeps the filter generic over the motion and
//! measurement models: both are plain function pointers that can be swapped
//! with [`RobotUkf::with_models`].
//!
//! Sigma points use the symmetric set with `λ = 2`:
//!
//! ```text
//! χ₀     = μ
//! χᵢ     = μ + (√((n+λ)P))ᵢ      i = 1..n
//! χᵢ₊ₙ   = μ − (√((n+λ)P))ᵢ
//! W₀ = λ/(n+λ)      Wᵢ = 1/(2(n+λ))
//! ```
//!
//! Orientation is averaged on the circle and every angular residual is
//! wrapped into `(-π, π]`, so headings near ±180° do not tear the estimate.

use std::f64::consts::PI;

use nalgebra::{SMatrix, SVector};
use striker_types::geometry::normalize_angle;
use striker_types::{Point, Pose};
use tracing::warn;

use crate::Estimator;

const N: usize = 5;
const SIGMA_COUNT: usize = 2 * N + 1;
const LAMBDA: f64 = 2.0;

/// Fixed per-prediction process noise: mm², (mm/s)² and rad².
const POSITION_PROCESS_VARIANCE: f64 = 0.2;
const VELOCITY_PROCESS_VARIANCE: f64 = 2500.0;
const ORIENTATION_PROCESS_VARIANCE: f64 = 1.0e-2;
const POSITION_MEASUREMENT_VARIANCE: f64 = 4.0;
const ORIENTATION_MEASUREMENT_VARIANCE: f64 = 1.0e-4;

pub type UkfState = SVector<f64, N>;
pub type UkfCovariance = SMatrix<f64, N, N>;
pub type UkfMeasurement = SVector<f64, 3>;

/// Motion model: propagate a state by `dt` seconds.
pub type TransitionFn = fn(&UkfState, f64) -> UkfState;
/// Measurement model: map a state into measurement space.
pub type ObservationFn = fn(&UkfState) -> UkfMeasurement;

/// Constant-velocity motion; orientation is held.
pub fn constant_velocity(x: &UkfState, dt: f64) -> UkfState {
    let mut next = *x;
    next[0] += x[2] * dt;
    next[1] += x[3] * dt;
    next
}

/// Direct observation of position and orientation.
pub fn observe_pose(x: &UkfState) -> UkfMeasurement {
    UkfMeasurement::new(x[0], x[1], x[4])
}

fn wrap_pi(a: f64) -> f64 {
    let mut a = (a + PI).rem_euclid(2.0 * PI) - PI;
    if a <= -PI {
        a += 2.0 * PI;
    }
    a
}

fn weight(i: usize) -> f64 {
    if i == 0 {
        LAMBDA / (N as f64 + LAMBDA)
    } else {
        1.0 / (2.0 * (N as f64 + LAMBDA))
    }
}

/// Weighted circular mean of one component across a sigma set.
fn circular_mean<const D: usize>(points: &[SVector<f64, D>], index: usize) -> f64 {
    let (mut s, mut c) = (0.0, 0.0);
    for (i, p) in points.iter().enumerate() {
        s += weight(i) * p[index].sin();
        c += weight(i) * p[index].cos();
    }
    s.atan2(c)
}

// ────────────────────────────────────────────────────────────────────────────
// RobotUkf
// ────────────────────────────────────────────────────────────────────────────

/// Unscented Kalman filter over `[x, y, vx, vy, θ]`.
#[derive(Debug, Clone)]
pub struct RobotUkf {
    x: UkfState,
    p: UkfCovariance,
    r: SMatrix<f64, 3, 3>,
    transition: TransitionFn,
    observation: ObservationFn,
}

impl Default for RobotUkf {
    fn default() -> Self {
        Self::new()
    }
}

impl RobotUkf {
    /// Filter with the constant-velocity model and direct pose observation.
    pub fn new() -> Self {
        Self::with_models(constant_velocity, observe_pose)
    }

    pub fn with_models(transition: TransitionFn, observation: ObservationFn) -> Self {
        let r = SMatrix::<f64, 3, 3>::from_diagonal(&SVector::<f64, 3>::new(
            POSITION_MEASUREMENT_VARIANCE,
            POSITION_MEASUREMENT_VARIANCE,
            ORIENTATION_MEASUREMENT_VARIANCE,
        ));
        Self {
            x: UkfState::zeros(),
            p: UkfCovariance::identity(),
            r,
            transition,
            observation,
        }
    }

    fn process_noise() -> UkfCovariance {
        UkfCovariance::from_diagonal(&UkfState::new(
            POSITION_PROCESS_VARIANCE,
            POSITION_PROCESS_VARIANCE,
            VELOCITY_PROCESS_VARIANCE,
            VELOCITY_PROCESS_VARIANCE,
            ORIENTATION_PROCESS_VARIANCE,
        ))
    }

    fn sigma_points(&self) -> Option<[UkfState; SIGMA_COUNT]> {
        let scaled = self.p * (N as f64 + LAMBDA);
        let l = scaled.cholesky()?.l();
        let mut points = [self.x; SIGMA_COUNT];
        for i in 0..N {
            let column: UkfState = l.column(i).into_owned();
            points[1 + i] = self.x + column;
            points[1 + N + i] = self.x - column;
        }
        Some(points)
    }

    fn state_mean(points: &[UkfState; SIGMA_COUNT]) -> UkfState {
        let mut mean = UkfState::zeros();
        for (i, p) in points.iter().enumerate() {
            mean += *p * weight(i);
        }
        mean[4] = circular_mean(&points[..], 4);
        mean
    }

    fn state_residual(a: &UkfState, b: &UkfState) -> UkfState {
        let mut d = a - b;
        d[4] = wrap_pi(d[4]);
        d
    }

    fn measurement_residual(a: &UkfMeasurement, b: &UkfMeasurement) -> UkfMeasurement {
        let mut d = a - b;
        d[2] = wrap_pi(d[2]);
        d
    }

    /// Covariance lost positive-definiteness; start the uncertainty over.
    fn recover_covariance(&mut self) {
        warn!("robot UKF covariance not positive definite; resetting covariance");
        self.p = UkfCovariance::identity();
    }

    /// Advance the state by `dt` seconds through the motion model.
    pub fn predict(&mut self, dt: f64) {
        if dt <= 0.0 || !dt.is_finite() {
            return;
        }
        let Some(points) = self.sigma_points() else {
            self.recover_covariance();
            return;
        };
        let propagated = points.map(|p| (self.transition)(&p, dt));
        let mean = Self::state_mean(&propagated);
        let mut cov = Self::process_noise();
        for (i, p) in propagated.iter().enumerate() {
            let d = Self::state_residual(p, &mean);
            cov += d * d.transpose() * weight(i);
        }
        self.x = mean;
        self.p = cov;
    }

    /// Fold in a camera pose (orientation in degrees).
    pub fn update(&mut self, measurement: Pose) {
        let z = UkfMeasurement::new(
            measurement.position.x,
            measurement.position.y,
            measurement.orientation.to_radians(),
        );
        let Some(points) = self.sigma_points() else {
            self.recover_covariance();
            return;
        };
        let observed = points.map(|p| (self.observation)(&p));

        let mut z_mean = UkfMeasurement::zeros();
        for (i, zp) in observed.iter().enumerate() {
            z_mean += *zp * weight(i);
        }
        z_mean[2] = circular_mean(&observed[..], 2);

        let mut s = self.r;
        let mut cross = SMatrix::<f64, N, 3>::zeros();
        for i in 0..SIGMA_COUNT {
            let dz = Self::measurement_residual(&observed[i], &z_mean);
            let dx = Self::state_residual(&points[i], &self.x);
            s += dz * dz.transpose() * weight(i);
            cross += dx * dz.transpose() * weight(i);
        }
        let Some(s_inv) = s.try_inverse() else {
            warn!("robot innovation covariance is singular; skipping correction");
            return;
        };
        let k = cross * s_inv;
        self.x += k * Self::measurement_residual(&z, &z_mean);
        self.x[4] = wrap_pi(self.x[4]);
        self.p -= k * s * k.transpose();
        self.p = (self.p + self.p.transpose()) * 0.5;
    }

    /// Reseed on a camera pose with zero velocity and identity covariance.
    pub fn reset(&mut self, measurement: Pose) {
        self.x = UkfState::new(
            measurement.position.x,
            measurement.position.y,
            0.0,
            0.0,
            wrap_pi(measurement.orientation.to_radians()),
        );
        self.p = UkfCovariance::identity();
    }

    pub fn position(&self) -> Point {
        Point::new(self.x[0], self.x[1])
    }

    pub fn velocity(&self) -> Point {
        Point::new(self.x[2], self.x[3])
    }

    /// Orientation in degrees, `(-180, 180]`.
    pub fn orientation(&self) -> f64 {
        normalize_angle(self.x[4].to_degrees())
    }
}

impl Estimator for RobotUkf {
    type Measurement = Pose;

    fn predict(&mut self, dt: f64) {
        RobotUkf::predict(self, dt);
    }

    fn update(&mut self, measurement: Pose) {
        RobotUkf::update(self, measurement);
    }

    fn reset(&mut self, measurement: Pose) {
        RobotUkf::reset(self, measurement);
    }

    fn pose(&self) -> Pose {
        Pose {
            position: self.position(),
            orientation: self.orientation(),
        }
    }

    fn velocity(&self) -> Point {
        RobotUkf::velocity(self)
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
    fn weights_sum_to_one() {
        let total: f64 = (0..SIGMA_COUNT).map(weight).sum();
        assert!((total - 1.0).abs() < 1e-12);
    }

    #[test]
    fn wrap_pi_range() {
        assert!((wrap_pi(3.5 * PI) + 0.5 * PI).abs() < 1e-9);
        assert!((wrap_pi(-PI) - PI).abs() < 1e-9);
        assert!((wrap_pi(0.1) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn reset_seeds_pose_without_velocity() {
        let mut ukf = RobotUkf::new();
        ukf.reset(Pose::new(100.0, 200.0, 90.0));
        assert_eq!(ukf.position(), Point::new(100.0, 200.0));
        assert_eq!(ukf.velocity(), Point::ORIGIN);
        assert!((ukf.orientation() - 90.0).abs() < 1e-9);
    }

    #[test]
    fn velocity_converges_for_constant_motion() {
        let mut ukf = RobotUkf::new();
        ukf.reset(Pose::new(0.0, 0.0, 0.0));
        for k in 1..=90 {
            ukf.predict(DT);
            let t = k as f64 * DT;
            ukf.update(Pose::new(800.0 * t, 400.0 * t, 0.0));
        }
        let v = ukf.velocity();
        assert!((v.x - 800.0).abs() < 20.0, "vx = {}", v.x);
        assert!((v.y - 400.0).abs() < 20.0, "vy = {}", v.y);
    }

    #[test]
    fn orientation_tracks_across_the_wrap() {
        let mut ukf = RobotUkf::new();
        ukf.reset(Pose::new(0.0, 0.0, 178.0));
        for heading in [179.0, -179.0, -178.0, -178.0, -178.0] {
            ukf.predict(DT);
            ukf.update(Pose::new(0.0, 0.0, heading));
        }
        let o = ukf.orientation();
        assert!(
            (normalize_angle(o + 178.0)).abs() < 2.0,
            "orientation {o} should be near -178"
        );
    }

    #[test]
    fn process_noise_is_a_fixed_diagonal() {
        let q = RobotUkf::process_noise();
        assert_eq!(q, UkfCovariance::from_diagonal(&q.diagonal()));
        assert_eq!(q[(4, 4)], ORIENTATION_PROCESS_VARIANCE);
        assert!(q.diagonal().iter().all(|v| *v > 0.0));
    }

    #[test]
    fn custom_models_are_used() {
        fn frozen(x: &UkfState, _dt: f64) -> UkfState {
            let mut n = *x;
            n[2] = 0.0;
            n[3] = 0.0;
            n
        }
        let mut ukf = RobotUkf::with_models(frozen, observe_pose);
        ukf.reset(Pose::new(0.0, 0.0, 0.0));
        ukf.predict(1.0);
        assert!(ukf.velocity().length() < 1e-9);
    }
}
