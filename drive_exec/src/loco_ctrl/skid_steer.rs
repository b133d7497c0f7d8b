//! Skid steer chassis model

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;

// Internal
use super::{ChassisModel, Motor};
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A tank-like drivetrain with a left and a right side motor.
///
/// Demands are saturated to `±max_velocity` before being passed on.
pub struct SkidSteerModel<L: Motor, R: Motor> {
    left: L,
    right: R,
    max_velocity: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<L: Motor, R: Motor> SkidSteerModel<L, R> {
    pub fn new(left: L, right: R, max_velocity: f64) -> Self {
        Self {
            left,
            right,
            max_velocity: max_velocity.abs(),
        }
    }

    pub fn max_velocity(&self) -> f64 {
        self.max_velocity
    }
}

impl<L: Motor, R: Motor> ChassisModel for SkidSteerModel<L, R> {
    fn set_left_right_velocity(&mut self, left: f64, right: f64) {
        let left = clamp(left, -self.max_velocity, self.max_velocity);
        let right = clamp(right, -self.max_velocity, self.max_velocity);

        trace!("SkidSteer demand: left {:.4}, right {:.4}", left, right);

        self.left.move_velocity(left);
        self.right.move_velocity(right);
    }

    fn stop_all_motors(&mut self) {
        self.left.move_velocity(0.0);
        self.right.move_velocity(0.0);
    }
}
