//! Main drive executable entry point.
//!
//! # Architecture
//!
//! Drives a simulated skid steer chassis through a list of paths:
//!
//!     - Initialise the session, logging and parameters
//!     - Generate every path listed in `drive_exec.toml` and store it
//!     - Reload the stored paths, so the paths driven are the ones on disk
//!     - Drive each path in turn, waiting for the controller to settle

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{eyre::WrapErr, Report};
use log::{info, warn};
use serde::Deserialize;
use std::time::Instant;

// Internal
use drive_lib::{
    loco_ctrl::{SimMotor, SkidSteerModel},
    mp_ctrl::{self, MpCtrl, TargetOptions},
    path_gen::Waypoint,
};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the drive executable
#[derive(Debug, Deserialize)]
struct DriveExecParams {
    /// Directory under the storage root that paths are stored in
    path_dir: String,

    /// Saturation limit of the simulated drivetrain, in the controller's
    /// command unit
    chassis_max_velocity: f64,

    /// Paths to drive, in order
    paths: Vec<PathDef>,
}

#[derive(Debug, Deserialize)]
struct PathDef {
    id: String,

    waypoints: Vec<Waypoint>,

    #[serde(default)]
    options: TargetOptions,
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("drive_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Drive Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let mut mp_ctrl_params: mp_ctrl::Params =
        util::params::load("mp_ctrl.toml").wrap_err("Could not load mp_ctrl params")?;
    let exec_params: DriveExecParams =
        util::params::load("drive_exec.toml").wrap_err("Could not load exec params")?;

    // Keep stored paths with the rest of this session's output
    mp_ctrl_params.storage_root = session.session_root.join("usd");

    info!("Exec parameters loaded");

    // ---- INITIALISE MODULES ----

    let left = SimMotor::new("left");
    let right = SimMotor::new("right");
    let chassis = SkidSteerModel::new(left.clone(), right.clone(), exec_params.chassis_max_velocity);

    let mp_ctrl = MpCtrl::new(mp_ctrl_params, chassis).wrap_err("Failed to initialise MpCtrl")?;

    // ---- GENERATE PATHS ----

    for path in exec_params.paths.iter() {
        mp_ctrl
            .generate_path(&path.waypoints, &path.id)
            .wrap_err_with(|| format!("Failed to generate path \"{}\"", path.id))?;
        mp_ctrl
            .store_path(&exec_params.path_dir, &path.id)
            .wrap_err_with(|| format!("Failed to store path \"{}\"", path.id))?;
    }

    for id in mp_ctrl.get_paths() {
        mp_ctrl
            .load_path(&exec_params.path_dir, &id)
            .wrap_err_with(|| format!("Failed to load path \"{}\"", id))?;
    }

    info!("{} paths ready: {:?}", mp_ctrl.get_paths().len(), mp_ctrl.get_paths());

    // ---- DRIVE ----

    for path in exec_params.paths.iter() {
        let num_samples = match mp_ctrl.get_path(&path.id) {
            Some(p) => p.len(),
            None => {
                warn!("Path \"{}\" has no trajectory, skipping", path.id);
                continue;
            }
        };

        left.clear();
        right.clear();

        let start = Instant::now();
        mp_ctrl.set_target(&path.id, path.options);
        mp_ctrl.wait_until_settled();

        let (left_rec, right_rec) = (left.record(), right.record());
        info!(
            "Path \"{}\" ({} samples) driven in {:.2} s, left demands [{:.2}, {:.2}], right demands [{:.2}, {:.2}]",
            path.id,
            num_samples,
            start.elapsed().as_secs_f64(),
            left_rec.min_velocity,
            left_rec.max_velocity,
            right_rec.min_velocity,
            right_rec.max_velocity
        );
    }

    info!("End of execution");

    Ok(())
}
