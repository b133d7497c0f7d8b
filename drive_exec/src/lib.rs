//! # Drive library.
//!
//! Motion profile control for skid steer drivetrains. This library allows the
//! executable, tests and benchmarks to access items defined inside the drive
//! crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Locomotion control module - the chassis and motor interfaces driven by the motion controller
pub mod loco_ctrl;

/// Motion profile control module - drives generated paths asynchronously
pub mod mp_ctrl;

/// Path generation module - converts waypoints into wheel trajectories
pub mod path_gen;
