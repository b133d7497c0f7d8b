//! Cubic Hermite spline planner
//!
//! Each pair of neighbouring waypoints is joined by a cubic in the frame of
//! the chord between them, with the end slopes set by the waypoint headings.
//! The whole path is then driven with a trapezoidal velocity profile along its
//! arc length, and the centre velocity is split between the wheels using the
//! local curvature.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::debug;
use std::f64::consts::FRAC_PI_2;

// Internal
use super::{KinematicLimits, PathGenError, Planner, TrajectoryPair, TrajectorySegment, Waypoint};
use util::maths::wrap_pi;

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Number of integration steps used to find the arc length of each spline.
const ARC_STEPS_PER_SPLINE: usize = 1000;

/// Closest a waypoint heading may get to perpendicular with its chord.
///
/// Units: radians
const MAX_HEADING_ERROR_RAD: f64 = FRAC_PI_2 - 1e-3;

/// Waypoints closer together than this are treated as coincident.
///
/// Units: meters
const MIN_CHORD_LENGTH_M: f64 = 1e-6;

/// Most samples a single planned trajectory may contain, about 28 hours of
/// driving at 100 Hz.
pub const MAX_SAMPLES: usize = 10_000_000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Plans trajectories by fitting cubic Hermite splines between waypoints.
#[derive(Debug, Clone)]
pub struct HermitePlanner {
    /// Distance between the left and right wheel contact points.
    ///
    /// Units: meters
    wheel_track_m: f64,

    /// Time between samples in the produced trajectory.
    ///
    /// Units: seconds
    sample_period_s: f64,
}

/// A cubic `y = a x^3 + b x^2 + c x` in the frame of a chord of length
/// `length_m`.
struct Spline {
    a: f64,
    b: f64,
    c: f64,
    length_m: f64,
}

/// Curvature along the path, tabulated against arc length.
struct CurvatureTable {
    /// `(arc length, curvature)` pairs, increasing in arc length.
    points: Vec<(f64, f64)>,
}

/// A trapezoidal velocity profile over a fixed distance.
struct TrapezoidProfile {
    accel_mss: f64,
    peak_vel_ms: f64,
    accel_time_s: f64,
    cruise_time_s: f64,
    distance_m: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl HermitePlanner {
    pub fn new(wheel_track_m: f64, sample_period_s: f64) -> Self {
        Self {
            wheel_track_m,
            sample_period_s,
        }
    }

    /// Fit one spline per waypoint pair.
    fn fit_splines(waypoints: &[Waypoint]) -> Result<Vec<Spline>, PathGenError> {
        let mut splines = Vec::with_capacity(waypoints.len().saturating_sub(1));

        for (index, pair) in waypoints.windows(2).enumerate() {
            let (start, end) = (&pair[0], &pair[1]);

            let chord = end.position_m - start.position_m;
            let length_m = chord.norm();
            if length_m < MIN_CHORD_LENGTH_M {
                return Err(PathGenError::CoincidentWaypoints(index));
            }

            // Headings relative to the chord. If either end points across the
            // chord the spline would need the chassis to move sideways.
            let chord_heading = chord[1].atan2(chord[0]);
            let start_rel = wrap_pi(start.heading_rad - chord_heading);
            let end_rel = wrap_pi(end.heading_rad - chord_heading);

            for rel in [start_rel, end_rel].iter() {
                if rel.abs() > MAX_HEADING_ERROR_RAD {
                    return Err(PathGenError::InfeasibleSegment {
                        index,
                        heading_error_rad: *rel,
                    });
                }
            }

            let t0 = start_rel.tan();
            let t1 = end_rel.tan();

            splines.push(Spline {
                a: (t0 + t1) / (length_m * length_m),
                b: -(2.0 * t0 + t1) / length_m,
                c: t0,
                length_m,
            });
        }

        Ok(splines)
    }

    /// Split a centre line sample into the two wheel velocities.
    fn wheel_velocities(&self, centre_vel_ms: f64, curvature_m: f64) -> (f64, f64) {
        let offset = curvature_m * self.wheel_track_m / 2.0;
        (centre_vel_ms * (1.0 - offset), centre_vel_ms * (1.0 + offset))
    }
}

impl Planner for HermitePlanner {
    fn plan(
        &self,
        waypoints: &[Waypoint],
        limits: &KinematicLimits,
    ) -> Result<TrajectoryPair, PathGenError> {
        limits.validate()?;

        let dt = self.sample_period_s;
        if !(dt.is_finite() && dt > 0.0) {
            return Err(PathGenError::InvalidSamplePeriod(dt));
        }

        if waypoints.len() < 2 {
            debug!("Fewer than two waypoints, planning an empty path");
            return Ok(TrajectoryPair::empty());
        }

        let splines = Self::fit_splines(waypoints)?;
        let table = CurvatureTable::build(&splines);
        let profile = TrapezoidProfile::new(table.length_m(), limits);

        let num_samples_f = (profile.duration_s() / dt).ceil() + 1.0;
        if !num_samples_f.is_finite() || num_samples_f > MAX_SAMPLES as f64 {
            return Err(PathGenError::TooManySamples {
                num_samples: num_samples_f,
                max: MAX_SAMPLES,
            });
        }
        let num_samples = num_samples_f as usize;

        let mut left: Vec<TrajectorySegment> = Vec::with_capacity(num_samples);
        let mut right: Vec<TrajectorySegment> = Vec::with_capacity(num_samples);

        for i in 0..num_samples {
            let t = i as f64 * dt;
            let (s, v, a) = profile.sample(t);
            let curv = table.curvature_at(s);
            let (vl, vr) = self.wheel_velocities(v, curv);

            let (left_seg, right_seg) = match (left.last(), right.last()) {
                (Some(pl), Some(pr)) => (
                    TrajectorySegment::new(
                        pl.position_m + 0.5 * (pl.velocity_ms + vl) * dt,
                        vl,
                        (vl - pl.velocity_ms) / dt,
                    ),
                    TrajectorySegment::new(
                        pr.position_m + 0.5 * (pr.velocity_ms + vr) * dt,
                        vr,
                        (vr - pr.velocity_ms) / dt,
                    ),
                ),
                _ => {
                    let (al, ar) = self.wheel_velocities(a, curv);
                    (
                        TrajectorySegment::new(0.0, vl, al),
                        TrajectorySegment::new(0.0, vr, ar),
                    )
                }
            };

            left.push(left_seg);
            right.push(right_seg);
        }

        let all_finite = left.iter().chain(right.iter()).all(|s| {
            s.position_m.is_finite() && s.velocity_ms.is_finite() && s.accel_mss.is_finite()
        });
        if !all_finite {
            return Err(PathGenError::NonFinite);
        }

        debug!(
            "Planned {:.3} m path through {} waypoints in {} samples",
            table.length_m(),
            waypoints.len(),
            left.len()
        );

        // Both sides were built together so can't differ in length
        TrajectoryPair::new(left, right).ok_or(PathGenError::NonFinite)
    }
}

impl Spline {
    fn slope(&self, x: f64) -> f64 {
        3.0 * self.a * x * x + 2.0 * self.b * x + self.c
    }

    fn curvature(&self, x: f64) -> f64 {
        let dy = self.slope(x);
        let ddy = 6.0 * self.a * x + 2.0 * self.b;
        ddy / (1.0 + dy * dy).powf(1.5)
    }
}

impl CurvatureTable {
    fn build(splines: &[Spline]) -> Self {
        let mut points = Vec::with_capacity(splines.len() * ARC_STEPS_PER_SPLINE + 1);
        let mut s = 0.0;

        for spline in splines {
            let dx = spline.length_m / ARC_STEPS_PER_SPLINE as f64;

            points.push((s, spline.curvature(0.0)));

            for step in 0..ARC_STEPS_PER_SPLINE {
                // Midpoint rule for the arc length element
                let x_mid = (step as f64 + 0.5) * dx;
                s += (1.0 + spline.slope(x_mid).powi(2)).sqrt() * dx;
                points.push((s, spline.curvature((step + 1) as f64 * dx)));
            }
        }

        Self { points }
    }

    fn length_m(&self) -> f64 {
        self.points.last().map(|p| p.0).unwrap_or(0.0)
    }

    fn curvature_at(&self, s: f64) -> f64 {
        let idx = self.points.partition_point(|p| p.0 < s);
        match self.points.get(idx) {
            Some(p) => p.1,
            None => self.points.last().map(|p| p.1).unwrap_or(0.0),
        }
    }
}

impl TrapezoidProfile {
    fn new(distance_m: f64, limits: &KinematicLimits) -> Self {
        let accel_mss = limits.max_accel_mss;
        let accel_dist_m = limits.max_vel_ms.powi(2) / (2.0 * accel_mss);

        // If we can't reach max velocity before having to brake the profile
        // becomes a triangle
        let (peak_vel_ms, cruise_time_s) = if 2.0 * accel_dist_m > distance_m {
            ((distance_m * accel_mss).sqrt(), 0.0)
        } else {
            (
                limits.max_vel_ms,
                (distance_m - 2.0 * accel_dist_m) / limits.max_vel_ms,
            )
        };

        Self {
            accel_mss,
            peak_vel_ms,
            accel_time_s: peak_vel_ms / accel_mss,
            cruise_time_s,
            distance_m,
        }
    }

    fn duration_s(&self) -> f64 {
        2.0 * self.accel_time_s + self.cruise_time_s
    }

    /// Get `(distance, velocity, acceleration)` at time `t`.
    fn sample(&self, t: f64) -> (f64, f64, f64) {
        let a = self.accel_mss;
        let t_acc = self.accel_time_s;
        let t_dec = t_acc + self.cruise_time_s;
        let t_end = self.duration_s();

        if t < t_acc {
            (0.5 * a * t * t, a * t, a)
        } else if t < t_dec {
            (
                0.5 * a * t_acc * t_acc + self.peak_vel_ms * (t - t_acc),
                self.peak_vel_ms,
                0.0,
            )
        } else if t < t_end {
            let remaining = t_end - t;
            (
                self.distance_m - 0.5 * a * remaining * remaining,
                a * remaining,
                -a,
            )
        } else {
            (self.distance_m, 0.0, 0.0)
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::f64::consts::FRAC_PI_4;

    const FT: f64 = 0.3048;

    fn planner() -> HermitePlanner {
        HermitePlanner::new(0.2667, 0.01)
    }

    #[test]
    fn test_straight_line() {
        let pair = planner()
            .plan(
                &[Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(3.0 * FT, 0.0, 0.0)],
                &KinematicLimits::default(),
            )
            .unwrap();

        assert!(pair.len() > 2);

        // No turning so both sides match exactly
        assert_eq!(pair.left(), pair.right());

        let last = pair.left().last().unwrap();
        assert_abs_diff_eq!(last.position_m, 3.0 * FT, epsilon = 1e-2);
        assert_abs_diff_eq!(last.velocity_ms, 0.0, epsilon = 1e-9);

        // Never exceed the velocity limit
        assert!(pair.left().iter().all(|s| s.velocity_ms <= 1.0 + 1e-9));
        assert!(pair.left().iter().all(|s| s.velocity_ms >= 0.0));
    }

    #[test]
    fn test_left_turn_drives_right_side_faster() {
        let pair = planner()
            .plan(
                &[
                    Waypoint::new(0.0, 0.0, 0.0),
                    Waypoint::new(FT, FT, 2.0 * FRAC_PI_4),
                ],
                &KinematicLimits::default(),
            )
            .unwrap();

        let left_end = pair.left().last().unwrap().position_m;
        let right_end = pair.right().last().unwrap().position_m;
        assert!(right_end > left_end);

        let left_max = pair.left().iter().map(|s| s.velocity_ms).fold(0.0, f64::max);
        let right_max = pair.right().iter().map(|s| s.velocity_ms).fold(0.0, f64::max);
        assert!(right_max > left_max);
    }

    #[test]
    fn test_arc_length_of_parabola() {
        // Symmetric end slopes give a parabola, y = x^2/sqrt(2) - x in the
        // chord frame, whose length has a closed form
        let splines = HermitePlanner::fit_splines(&[
            Waypoint::new(0.0, 0.0, 0.0),
            Waypoint::new(1.0, 1.0, 2.0 * FRAC_PI_4),
        ])
        .unwrap();
        let table = CurvatureTable::build(&splines);

        assert_abs_diff_eq!(
            table.length_m(),
            1.0 + 1f64.asinh() / 2f64.sqrt(),
            epsilon = 1e-4
        );
    }

    #[test]
    fn test_too_few_waypoints_is_empty() {
        let limits = KinematicLimits::default();
        assert!(planner().plan(&[], &limits).unwrap().is_empty());
        assert!(planner()
            .plan(&[Waypoint::new(1.0, 1.0, 0.0)], &limits)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_sideways_path_is_infeasible() {
        let result = planner().plan(
            &[
                Waypoint::new(0.0, 0.0, 0.0),
                Waypoint::new(3.0 * FT, 0.0, 0.0),
                Waypoint::new(3.0 * FT, FT, 0.0),
                Waypoint::new(2.0 * FT, FT, 0.0),
                Waypoint::new(FT, 1.0, 0.0),
                Waypoint::new(FT, 0.0, 0.0),
            ],
            &KinematicLimits::default(),
        );

        assert!(matches!(
            result,
            Err(PathGenError::InfeasibleSegment { index: 1, .. })
        ));
    }

    #[test]
    fn test_coincident_waypoints() {
        let result = planner().plan(
            &[Waypoint::new(1.0, 1.0, 0.0), Waypoint::new(1.0, 1.0, 0.0)],
            &KinematicLimits::default(),
        );

        assert!(matches!(result, Err(PathGenError::CoincidentWaypoints(0))));
    }

    #[test]
    fn test_invalid_limits() {
        let limits = KinematicLimits {
            max_accel_mss: -1.0,
            ..Default::default()
        };
        let result = planner().plan(
            &[Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(1.0, 0.0, 0.0)],
            &limits,
        );

        assert!(matches!(result, Err(PathGenError::InvalidLimits(_))));
    }

    #[test]
    fn test_tiny_velocity_limit_is_rejected() {
        let limits = KinematicLimits {
            max_vel_ms: 1e-9,
            ..Default::default()
        };
        let result = planner().plan(
            &[Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(FT, 0.0, 0.0)],
            &limits,
        );

        assert!(matches!(
            result,
            Err(PathGenError::TooManySamples { max: MAX_SAMPLES, .. })
        ));
    }

    #[test]
    fn test_invalid_sample_period() {
        let waypoints = [Waypoint::new(0.0, 0.0, 0.0), Waypoint::new(FT, 0.0, 0.0)];
        let limits = KinematicLimits::default();

        for dt in [0.0, -0.01, std::f64::NAN, std::f64::INFINITY].iter() {
            let result = HermitePlanner::new(0.2667, *dt).plan(&waypoints, &limits);
            assert!(matches!(result, Err(PathGenError::InvalidSamplePeriod(_))));
        }
    }

    #[test]
    fn test_short_path_uses_triangle_profile() {
        let limits = KinematicLimits::default();
        let profile = TrapezoidProfile::new(0.1, &limits);

        assert_eq!(profile.cruise_time_s, 0.0);
        assert!(profile.peak_vel_ms < limits.max_vel_ms);

        let (s, v, _) = profile.sample(profile.duration_s());
        assert_abs_diff_eq!(s, 0.1, epsilon = 1e-12);
        assert_eq!(v, 0.0);
    }
}
