//! # Path generation
//!
//! Turns a sequence of waypoints into a pair of time parameterised wheel
//! trajectories, one for each side of a skid steer chassis.
//!
//! Planning itself sits behind the [`Planner`] trait so the motion controller
//! doesn't care how a trajectory was produced. [`HermitePlanner`] is the
//! planner used by default.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod hermite;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use nalgebra::Vector2;
use serde::{Deserialize, Serialize};

// Internal
pub use hermite::HermitePlanner;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point the rover must pass through, and the heading it must have when it
/// does.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Waypoint {
    /// Position of the point.
    ///
    /// Units: meters
    pub position_m: Vector2<f64>,

    /// Heading (angle to the +ve x axis) of the rover at the point.
    ///
    /// Units: radians
    pub heading_rad: f64,
}

/// One time sample of the motion of a single wheel.
///
/// All quantities are linear and measured at the wheel's contact point.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TrajectorySegment {
    /// Distance travelled by the wheel since the start of the trajectory.
    ///
    /// Units: meters
    pub position_m: f64,

    /// Units: meters/second
    pub velocity_ms: f64,

    /// Units: meters/second^2
    pub accel_mss: f64,
}

/// Synchronised left and right wheel trajectories describing one path.
///
/// Both sides always have the same number of samples. A pair with no samples
/// is an empty path.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct TrajectoryPair {
    left: Vec<TrajectorySegment>,
    right: Vec<TrajectorySegment>,
}

/// Kinematic limits a generated trajectory must respect.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct KinematicLimits {
    /// Units: meters/second
    pub max_vel_ms: f64,

    /// Units: meters/second^2
    pub max_accel_mss: f64,

    /// Units: meters/second^3
    pub max_jerk_msss: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Reasons a path could not be generated.
#[derive(Debug, Clone, thiserror::Error)]
pub enum PathGenError {
    #[error("Kinematic limits must all be positive and finite, found {0:?}")]
    InvalidLimits(KinematicLimits),

    #[error("Waypoint {0} is at the same position as the waypoint following it")]
    CoincidentWaypoints(usize),

    #[error(
        "Segment {index} is impossible for a skid steer chassis, a heading is {heading_error_rad:.3} \
         rad from the direction of travel"
    )]
    InfeasibleSegment {
        index: usize,
        heading_error_rad: f64,
    },

    #[error("The generated trajectory contains non-finite values")]
    NonFinite,

    #[error("Sample period must be positive and finite, found {0}")]
    InvalidSamplePeriod(f64),

    #[error("The trajectory would need {num_samples} samples, more than the limit of {max}")]
    TooManySamples { num_samples: f64, max: usize },
}

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// Produces wheel trajectories from waypoints.
pub trait Planner: Send + Sync {
    /// Plan a trajectory passing through all `waypoints` in order.
    ///
    /// Fewer than two waypoints gives an empty pair.
    fn plan(
        &self,
        waypoints: &[Waypoint],
        limits: &KinematicLimits,
    ) -> Result<TrajectoryPair, PathGenError>;
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(x_m: f64, y_m: f64, heading_rad: f64) -> Self {
        Self {
            position_m: Vector2::new(x_m, y_m),
            heading_rad,
        }
    }
}

impl TrajectorySegment {
    pub fn new(position_m: f64, velocity_ms: f64, accel_mss: f64) -> Self {
        Self {
            position_m,
            velocity_ms,
            accel_mss,
        }
    }

    /// The same motion driven backwards.
    pub fn reversed(&self) -> Self {
        Self {
            position_m: -self.position_m,
            velocity_ms: -self.velocity_ms,
            accel_mss: -self.accel_mss,
        }
    }
}

impl TrajectoryPair {
    /// Build a pair from its two sides.
    ///
    /// Returns `None` if the sides have different lengths.
    pub fn new(left: Vec<TrajectorySegment>, right: Vec<TrajectorySegment>) -> Option<Self> {
        if left.len() != right.len() {
            return None;
        }

        Some(Self { left, right })
    }

    /// A pair with no samples.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The number of samples in the pair.
    pub fn len(&self) -> usize {
        self.left.len()
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty()
    }

    pub fn left(&self) -> &[TrajectorySegment] {
        &self.left
    }

    pub fn right(&self) -> &[TrajectorySegment] {
        &self.right
    }

    /// Get the left and right samples at the given time step.
    pub fn get(&self, index: usize) -> Option<(&TrajectorySegment, &TrajectorySegment)> {
        match (self.left.get(index), self.right.get(index)) {
            (Some(l), Some(r)) => Some((l, r)),
            _ => None,
        }
    }
}

impl KinematicLimits {
    /// Check that all limits are positive and finite.
    pub fn validate(&self) -> Result<(), PathGenError> {
        let all_valid = [self.max_vel_ms, self.max_accel_mss, self.max_jerk_msss]
            .iter()
            .all(|l| l.is_finite() && *l > 0.0);

        if all_valid {
            Ok(())
        } else {
            Err(PathGenError::InvalidLimits(*self))
        }
    }
}

impl Default for KinematicLimits {
    fn default() -> Self {
        Self {
            max_vel_ms: 1.0,
            max_accel_mss: 2.0,
            max_jerk_msss: 10.0,
        }
    }
}
