//! Motor interface and a simulated motor

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use std::sync::{Arc, Mutex, PoisonError};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// A single velocity controlled motor.
pub trait Motor: Send {
    /// Demand a velocity from the motor.
    fn move_velocity(&mut self, velocity: f64);
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A motor which doesn't drive any hardware, it just remembers what it was
/// told.
///
/// Clones share the same record, so a handle can be kept to inspect the demands
/// after the motor itself has been moved into a chassis model.
#[derive(Clone, Debug, Default)]
pub struct SimMotor {
    name: &'static str,
    record: Arc<Mutex<SimMotorRecord>>,
}

/// Demands received by a [`SimMotor`].
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct SimMotorRecord {
    /// The most recent velocity demand
    pub last_velocity: f64,

    /// The largest (signed) velocity demand seen so far
    pub max_velocity: f64,

    /// The smallest (signed) velocity demand seen so far
    pub min_velocity: f64,

    /// Number of demands received
    pub num_demands: usize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SimMotor {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            record: Arc::new(Mutex::new(SimMotorRecord::default())),
        }
    }

    /// Get a copy of the demands received so far.
    pub fn record(&self) -> SimMotorRecord {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn last_velocity(&self) -> f64 {
        self.record().last_velocity
    }

    pub fn max_velocity(&self) -> f64 {
        self.record().max_velocity
    }

    pub fn min_velocity(&self) -> f64 {
        self.record().min_velocity
    }

    /// Forget all previous demands.
    pub fn clear(&self) {
        *self.record.lock().unwrap_or_else(PoisonError::into_inner) =
            SimMotorRecord::default();
    }
}

impl Motor for SimMotor {
    fn move_velocity(&mut self, velocity: f64) {
        trace!("SimMotor {}: {:.4}", self.name, velocity);

        let mut rec = self.record.lock().unwrap_or_else(PoisonError::into_inner);
        rec.last_velocity = velocity;
        if velocity > rec.max_velocity {
            rec.max_velocity = velocity;
        }
        if velocity < rec.min_velocity {
            rec.min_velocity = velocity;
        }
        rec.num_demands += 1;
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_sim_motor_records() {
        let motor = SimMotor::new("left");
        let mut m = motor.clone();

        m.move_velocity(10.0);
        m.move_velocity(-5.0);

        let rec = motor.record();
        assert_eq!(rec.last_velocity, -5.0);
        assert_eq!(rec.max_velocity, 10.0);
        assert_eq!(rec.min_velocity, -5.0);
        assert_eq!(rec.num_demands, 2);

        motor.clear();
        assert_eq!(motor.record(), SimMotorRecord::default());
    }
}
