//! Conversion between linear wheel speed and motor speed

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::f64::consts::PI;

// Internal
use super::{CommandUnit, ConfigError, Params};
use util::maths::{clamp, lin_map};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

const SECONDS_PER_MINUTE: f64 = 60.0;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Converts trajectory velocities into chassis demands.
///
/// Built from validated parameters, so conversion itself can't fail.
#[derive(Debug, Clone, Copy)]
pub struct Converter {
    unit: CommandUnit,
    wheel_diameter_m: f64,
    gear_ratio: f64,
    max_motor_rpm: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Converter {
    pub fn from_params(params: &Params) -> Result<Self, ConfigError> {
        params.validate()?;

        Ok(Self {
            unit: params.command_unit,
            wheel_diameter_m: params.scales.wheel_diameter_m,
            gear_ratio: params.gear_ratio,
            max_motor_rpm: params.max_motor_rpm,
        })
    }

    /// Convert a linear wheel velocity into a chassis demand.
    pub fn demand(&self, linear_ms: f64) -> f64 {
        match self.unit {
            CommandUnit::Linear => linear_ms,
            CommandUnit::Rotational => self.motor_rpm(linear_ms),
            CommandUnit::Normalised => clamp(
                lin_map(
                    (-self.max_motor_rpm, self.max_motor_rpm),
                    (-1.0, 1.0),
                    self.motor_rpm(linear_ms),
                ),
                -1.0,
                1.0,
            ),
        }
    }

    fn motor_rpm(&self, linear_ms: f64) -> f64 {
        rotational_speed(linear_ms, self.wheel_diameter_m, self.gear_ratio)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Convert a linear wheel speed into a motor rotational speed.
///
/// The wheel's rotational speed is `linear / (pi * diameter)`, which is then
/// multiplied by `gear_ratio` to get the motor's.
///
/// Units:
///  - `linear_ms`: meters/second
///  - `wheel_diameter_m`: meters
///  - returns: rotations/minute
pub fn to_rotational_speed(
    linear_ms: f64,
    wheel_diameter_m: f64,
    gear_ratio: f64,
) -> Result<f64, ConfigError> {
    if !(wheel_diameter_m > 0.0) || !wheel_diameter_m.is_finite() {
        return Err(ConfigError::NonPositiveWheelDiameter(wheel_diameter_m));
    }
    if gear_ratio == 0.0 || !gear_ratio.is_finite() {
        return Err(ConfigError::InvalidGearRatio(gear_ratio));
    }

    Ok(rotational_speed(linear_ms, wheel_diameter_m, gear_ratio))
}

fn rotational_speed(linear_ms: f64, wheel_diameter_m: f64, gear_ratio: f64) -> f64 {
    linear_ms / (PI * wheel_diameter_m) * SECONDS_PER_MINUTE * gear_ratio
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{mp_ctrl::ChassisScales, path_gen::KinematicLimits};
    use approx::assert_abs_diff_eq;

    /// 4 inch wheels
    const WHEEL_DIAM_M: f64 = 0.1016;

    #[test]
    fn test_reference_speed() {
        // 4 inch wheels, 2 wheel rotations per motor rotation
        let rpm = to_rotational_speed(1.0, WHEEL_DIAM_M, 0.5).unwrap();
        assert_abs_diff_eq!(rpm, 93.989, epsilon = 0.001);
    }

    #[test]
    fn test_linear_and_sign_preserving() {
        let one = to_rotational_speed(1.0, WHEEL_DIAM_M, 0.5).unwrap();

        for v in [-2.5, -1.0, -0.01, 0.0, 0.3, 1.0, 4.0].iter() {
            let rpm = to_rotational_speed(*v, WHEEL_DIAM_M, 0.5).unwrap();
            assert_abs_diff_eq!(rpm, one * v, epsilon = 1e-9);
            assert_eq!(rpm > 0.0, *v > 0.0);
            assert_eq!(rpm < 0.0, *v < 0.0);
        }
    }

    #[test]
    fn test_invalid_geometry() {
        assert!(matches!(
            to_rotational_speed(1.0, 0.0, 1.0),
            Err(ConfigError::NonPositiveWheelDiameter(_))
        ));
        assert!(matches!(
            to_rotational_speed(1.0, -0.1, 1.0),
            Err(ConfigError::NonPositiveWheelDiameter(_))
        ));
        assert!(matches!(
            to_rotational_speed(1.0, WHEEL_DIAM_M, 0.0),
            Err(ConfigError::InvalidGearRatio(_))
        ));
    }

    #[test]
    fn test_converter_units() {
        let scales = ChassisScales {
            wheel_diameter_m: WHEEL_DIAM_M,
            wheel_track_m: 0.2667,
        };
        let mut params = Params::new(KinematicLimits::default(), scales, 0.5);

        params.command_unit = CommandUnit::Linear;
        let conv = Converter::from_params(&params).unwrap();
        assert_eq!(conv.demand(0.7), 0.7);

        params.command_unit = CommandUnit::Rotational;
        let conv = Converter::from_params(&params).unwrap();
        assert_abs_diff_eq!(conv.demand(-1.0), -93.989, epsilon = 0.001);

        params.command_unit = CommandUnit::Normalised;
        params.max_motor_rpm = 187.978;
        let conv = Converter::from_params(&params).unwrap();
        assert_abs_diff_eq!(conv.demand(1.0), 0.5, epsilon = 1e-3);
        assert_eq!(conv.demand(10.0), 1.0);
        assert_eq!(conv.demand(-10.0), -1.0);
    }
}
