//! Motion profile control parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

// Internal
use crate::path_gen::KinematicLimits;
use util::time::secs_to_duration;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for motion profile control
#[derive(Deserialize, Debug, Clone)]
pub struct Params {
    /// Default limits used when generating paths.
    pub limits: KinematicLimits,

    /// Geometry of the chassis.
    pub scales: ChassisScales,

    /// Gear ratio between the wheels and the motors, applied to the wheel's
    /// rotational speed to get the motor's.
    #[serde(default = "default_gear_ratio")]
    pub gear_ratio: f64,

    /// The unit the chassis model expects its velocity demands in.
    #[serde(default)]
    pub command_unit: CommandUnit,

    /// The motor speed corresponding to a normalised demand of 1. Only used
    /// with `CommandUnit::Normalised`.
    ///
    /// Units: rotations/minute
    #[serde(default = "default_max_motor_rpm")]
    pub max_motor_rpm: f64,

    /// Time between trajectory samples, which is also the period of the
    /// execution loop.
    ///
    /// Units: seconds
    #[serde(default = "default_sample_period_s")]
    pub sample_period_s: f64,

    /// Mount point that stored paths live under.
    #[serde(default = "default_storage_root")]
    pub storage_root: PathBuf,
}

/// Chassis geometry
#[derive(Deserialize, Debug, Clone, Copy)]
pub struct ChassisScales {
    /// Units: meters
    pub wheel_diameter_m: f64,

    /// Distance between the left and right wheels.
    ///
    /// Units: meters
    pub wheel_track_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// The unit of velocity demands sent to the chassis model.
#[derive(Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum CommandUnit {
    /// Linear wheel speed.
    ///
    /// Units: meters/second
    Linear,

    /// Motor rotational speed.
    ///
    /// Units: rotations/minute
    Rotational,

    /// Motor rotational speed as a fraction of `max_motor_rpm`, between -1 and
    /// +1.
    Normalised,
}

/// Invalid controller configuration.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    #[error("Wheel diameter must be positive, found {0}")]
    NonPositiveWheelDiameter(f64),

    #[error("Wheel track must be positive, found {0}")]
    NonPositiveWheelTrack(f64),

    #[error("Gear ratio must be finite and non-zero, found {0}")]
    InvalidGearRatio(f64),

    #[error("Sample period must be positive, found {0} s")]
    NonPositiveSamplePeriod(f64),

    #[error("Max motor speed must be positive, found {0} rpm")]
    NonPositiveMaxMotorRpm(f64),

    #[error("Kinematic limits must all be positive and finite, found {0:?}")]
    InvalidLimits(KinematicLimits),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Params {
    /// Build parameters from the chassis geometry, using defaults for
    /// everything else.
    pub fn new(limits: KinematicLimits, scales: ChassisScales, gear_ratio: f64) -> Self {
        Self {
            limits,
            scales,
            gear_ratio,
            command_unit: CommandUnit::default(),
            max_motor_rpm: default_max_motor_rpm(),
            sample_period_s: default_sample_period_s(),
            storage_root: default_storage_root(),
        }
    }

    /// Check that the parameters describe a drivable chassis.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.scales.wheel_diameter_m > 0.0) || !self.scales.wheel_diameter_m.is_finite() {
            return Err(ConfigError::NonPositiveWheelDiameter(self.scales.wheel_diameter_m));
        }
        if !(self.scales.wheel_track_m > 0.0) || !self.scales.wheel_track_m.is_finite() {
            return Err(ConfigError::NonPositiveWheelTrack(self.scales.wheel_track_m));
        }
        if self.gear_ratio == 0.0 || !self.gear_ratio.is_finite() {
            return Err(ConfigError::InvalidGearRatio(self.gear_ratio));
        }
        if !(self.sample_period_s > 0.0) || !self.sample_period_s.is_finite() {
            return Err(ConfigError::NonPositiveSamplePeriod(self.sample_period_s));
        }
        if self.command_unit == CommandUnit::Normalised && !(self.max_motor_rpm > 0.0) {
            return Err(ConfigError::NonPositiveMaxMotorRpm(self.max_motor_rpm));
        }
        if self.limits.validate().is_err() {
            return Err(ConfigError::InvalidLimits(self.limits));
        }

        Ok(())
    }

    /// The execution loop period.
    pub fn sample_period(&self) -> Duration {
        secs_to_duration(self.sample_period_s)
    }
}

impl Default for CommandUnit {
    fn default() -> Self {
        CommandUnit::Rotational
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn default_gear_ratio() -> f64 {
    1.0
}

fn default_max_motor_rpm() -> f64 {
    200.0
}

fn default_sample_period_s() -> f64 {
    0.01
}

fn default_storage_root() -> PathBuf {
    PathBuf::from(super::store::STORAGE_ROOT)
}
