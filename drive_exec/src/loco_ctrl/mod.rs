//! Locomotion control module
//!
//! Provides the drivetrain abstraction the motion controller drives. The
//! controller only ever sees a [`ChassisModel`], which takes a left and right
//! side velocity demand in whatever unit the underlying motors expect. The
//! [`SkidSteerModel`] implements this for a drivetrain with one motor (or
//! motor group) per side.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod motor;
mod skid_steer;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use motor::*;
pub use skid_steer::*;

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A drivetrain which can be commanded by side.
///
/// Implementors are moved into the motion controller's background thread, so
/// must be `Send`.
pub trait ChassisModel: Send {
    /// Command the left and right sides of the chassis.
    ///
    /// Units: as expected by the model's motors, see
    /// `mp_ctrl::CommandUnit`.
    fn set_left_right_velocity(&mut self, left: f64, right: f64);

    /// Bring all motors to a stop.
    fn stop_all_motors(&mut self);
}

impl<C: ChassisModel + ?Sized> ChassisModel for Box<C> {
    fn set_left_right_velocity(&mut self, left: f64, right: f64) {
        (**self).set_left_right_velocity(left, right)
    }

    fn stop_all_motors(&mut self) {
        (**self).stop_all_motors()
    }
}
