//! # Motion Profile Control
//!
//! Asynchronous trajectory following for a skid steer chassis.
//!
//! Paths are generated from waypoints and kept in a registry under
//! caller-chosen ids. Setting a path as the target hands it to a background
//! engine thread, which streams the path's wheel velocities to the chassis one
//! sample at a time while the caller carries on. The caller can wait for the
//! controller to settle, disable it, or reset it at any time.
//!
//! Generated paths can be stored to and loaded from disk so they don't have to
//! be regenerated on every run.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod conv;
mod engine;
mod params;
mod registry;
mod state;
mod store;


// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use std::io;

// Internal
pub use conv::{to_rotational_speed, Converter};
pub use engine::TargetOptions;
pub use params::{ChassisScales, CommandUnit, ConfigError, Params};
pub use registry::PathRegistry;
pub use state::MpCtrl;
pub use store::{
    load_trajectory, make_file_path, make_file_path_in, store_trajectory, Side, StoreError,
    STORAGE_ROOT,
};

use crate::path_gen::PathGenError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors returned by the motion profile controller.
#[derive(Debug, thiserror::Error)]
pub enum MpCtrlError {
    #[error("Could not generate path: {0}")]
    PathGenerationFailed(PathGenError),

    #[error("Could not load path: {0}")]
    CorruptPathData(StoreError),

    #[error("Could not access path storage: {0}")]
    StorageError(StoreError),

    #[error("Invalid controller configuration: {0}")]
    ConfigurationError(ConfigError),

    #[error("Could not start the engine thread: {0}")]
    EngineSpawnError(io::Error),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl From<StoreError> for MpCtrlError {
    fn from(e: StoreError) -> Self {
        if e.is_corrupt() {
            MpCtrlError::CorruptPathData(e)
        } else {
            MpCtrlError::StorageError(e)
        }
    }
}
