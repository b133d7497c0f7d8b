//! Motion profile controller state and public interface

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, error, info, warn};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::PathBuf;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, PoisonError,
};
use std::thread::{self, JoinHandle};
use std::time::Duration;

// Internal
use super::{
    engine::{engine_thread, Shared, Target, TargetOptions},
    load_trajectory, make_file_path_in, store_trajectory, Converter, MpCtrlError, Params,
    StoreError,
};
use crate::{
    loco_ctrl::ChassisModel,
    path_gen::{HermitePlanner, KinematicLimits, Planner, TrajectoryPair, Waypoint},
};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Prefix of the ids used for the temporary paths created by `move_to`.
const MOVE_TO_ID_PREFIX: &str = "__mp_ctrl_move_to_";

/// How long `reset` waits for the engine to stop the motors.
const RESET_TIMEOUT: Duration = Duration::from_secs(1);

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Asynchronous motion profile controller.
///
/// Owns a background engine thread which drives the chassis. The thread is
/// stopped and joined, and the motors stopped, when the controller is
/// dropped.
pub struct MpCtrl {
    params: Params,

    planner: Box<dyn Planner>,

    shared: Arc<Shared>,

    engine_jh: Option<JoinHandle<()>>,

    num_move_tos: AtomicUsize,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl MpCtrl {
    /// Create a new controller using the [`HermitePlanner`].
    pub fn new<C>(params: Params, chassis: C) -> Result<Self, MpCtrlError>
    where
        C: ChassisModel + 'static,
    {
        let planner = HermitePlanner::new(params.scales.wheel_track_m, params.sample_period_s);

        Self::with_planner(params, chassis, planner)
    }

    /// Create a new controller which generates paths with the given planner.
    pub fn with_planner<C, P>(params: Params, chassis: C, planner: P) -> Result<Self, MpCtrlError>
    where
        C: ChassisModel + 'static,
        P: Planner + 'static,
    {
        let converter = Converter::from_params(&params).map_err(MpCtrlError::ConfigurationError)?;
        let period = params.sample_period();

        let shared = Arc::new(Shared::new());
        let shared_engine = shared.clone();

        let engine_jh = thread::Builder::new()
            .name("mp_ctrl::engine".into())
            .spawn(move || engine_thread(shared_engine, chassis, converter, period))
            .map_err(MpCtrlError::EngineSpawnError)?;

        info!(
            "MpCtrl initialised ({:?} demands, {:?} period)",
            params.command_unit, period
        );

        Ok(Self {
            params,
            planner: Box::new(planner),
            shared,
            engine_jh: Some(engine_jh),
            num_move_tos: AtomicUsize::new(0),
        })
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Generate a path through the waypoints and register it under `id`,
    /// using the configured kinematic limits.
    ///
    /// Fewer than two waypoints registers nothing. On failure any path already
    /// registered under `id` is left in place.
    pub fn generate_path(&self, waypoints: &[Waypoint], id: &str) -> Result<(), MpCtrlError> {
        let limits = self.params.limits;
        self.generate_path_with_limits(waypoints, id, &limits)
    }

    /// Generate a path with limits other than the configured ones.
    pub fn generate_path_with_limits(
        &self,
        waypoints: &[Waypoint],
        id: &str,
        limits: &KinematicLimits,
    ) -> Result<(), MpCtrlError> {
        // Planning can be slow, so do it without holding the lock
        let path = self.planner.plan(waypoints, limits).map_err(|e| {
            warn!("Could not generate path \"{}\": {}", id, e);
            MpCtrlError::PathGenerationFailed(e)
        })?;

        self.register(id, path, "Generated");

        Ok(())
    }

    /// Remove a path. Unknown ids are ignored.
    pub fn remove_path(&self, id: &str) {
        match self.shared.lock().registry.remove(id) {
            Some(_) => info!("Removed path \"{}\"", id),
            None => warn!("Cannot remove path \"{}\", it doesn't exist", id),
        }
    }

    /// Ids of all registered paths, in the order they were first generated.
    pub fn get_paths(&self) -> Vec<String> {
        self.shared.lock().registry.ids()
    }

    pub fn get_path(&self, id: &str) -> Option<Arc<TrajectoryPair>> {
        self.shared.lock().registry.get(id)
    }

    /// Request that a path be driven.
    ///
    /// The engine starts the path on its next tick, preempting any path which
    /// is already running. If `id` isn't registered the target is recorded
    /// but nothing is driven. While disabled the target is recorded but not
    /// started.
    pub fn set_target(&self, id: &str, options: TargetOptions) {
        // Read the flag under the lock so a concurrent `flip_disable(true)`
        // can't leave a pending target behind
        let mut state = self.shared.lock();
        let disabled = self.shared.is_disabled();
        let known = state.registry.contains(id);

        state.target = Some(Target {
            id: id.to_string(),
            options,
        });
        state.pending = known && !disabled;

        if !known {
            warn!("Target path \"{}\" doesn't exist, nothing will be driven", id);
        } else if disabled {
            debug!("Target set to \"{}\" while disabled, not starting", id);
        } else {
            debug!("Target set to \"{}\" ({:?})", id, options);
        }

        self.shared.work_cv.notify_all();
        self.shared.settled_cv.notify_all();
    }

    /// The id of the current target, if any.
    pub fn get_target(&self) -> Option<String> {
        self.shared.lock().target.as_ref().map(|t| t.id.clone())
    }

    /// Set the target path, driving it forwards and unmirrored.
    pub fn controller_set(&self, id: &str) {
        self.set_target(id, TargetOptions::default())
    }

    /// Generate a path through the waypoints, drive it, and block until
    /// settled.
    pub fn move_to(&self, waypoints: &[Waypoint]) -> Result<(), MpCtrlError> {
        self.move_to_with(waypoints, TargetOptions::default())
    }

    /// As [`MpCtrl::move_to`], driving the path with the given options.
    pub fn move_to_with(
        &self,
        waypoints: &[Waypoint],
        options: TargetOptions,
    ) -> Result<(), MpCtrlError> {
        let id = format!(
            "{}{}",
            MOVE_TO_ID_PREFIX,
            self.num_move_tos.fetch_add(1, Ordering::SeqCst)
        );

        self.generate_path(waypoints, &id)?;

        if self.get_path(&id).is_none() {
            debug!("move_to: nothing to drive");
            return Ok(());
        }

        self.set_target(&id, options);
        self.wait_until_settled();
        self.remove_path(&id);

        Ok(())
    }

    /// True if no path is being driven.
    pub fn is_settled(&self) -> bool {
        let state = self.shared.lock();
        self.shared.is_settled(&state)
    }

    /// Block until no path is being driven.
    pub fn wait_until_settled(&self) {
        let state = self.shared.lock();
        let _state = self
            .shared
            .settled_cv
            .wait_while(state, |s| !self.shared.is_settled(s))
            .unwrap_or_else(PoisonError::into_inner);
    }

    /// Block until no path is being driven, or the timeout expires.
    ///
    /// Returns whether the controller is settled.
    pub fn wait_until_settled_timeout(&self, timeout: Duration) -> bool {
        let state = self.shared.lock();
        let (state, _) = self
            .shared
            .settled_cv
            .wait_timeout_while(state, timeout, |s| !self.shared.is_settled(s))
            .unwrap_or_else(PoisonError::into_inner);

        self.shared.is_settled(&state)
    }

    pub fn is_disabled(&self) -> bool {
        self.shared.is_disabled()
    }

    /// Enable or disable the controller.
    ///
    /// Disabling stops any running path within one period. Enabling does not
    /// resume it.
    pub fn flip_disable(&self, disabled: bool) {
        let was_disabled = {
            let mut state = self.shared.lock();
            let was_disabled = self.shared.disabled.swap(disabled, Ordering::SeqCst);
            if disabled {
                state.pending = false;
            }
            was_disabled
        };
        self.shared.work_cv.notify_all();
        self.shared.settled_cv.notify_all();

        if was_disabled != disabled {
            debug!("MpCtrl {}", if disabled { "disabled" } else { "enabled" });
        }
    }

    /// Cancel any running path, clear the target, and stop the motors.
    ///
    /// Returns once the motors have been stopped. The controller is left
    /// enabled.
    pub fn reset(&self) {
        debug!("Resetting MpCtrl");

        let ticket = {
            let mut state = self.shared.lock();
            state.target = None;
            state.pending = false;
            state.cancel_requests += 1;
            state.cancel_requests
        };
        self.shared.disabled.store(false, Ordering::SeqCst);
        self.shared.work_cv.notify_all();

        let state = self.shared.lock();
        let (_state, result) = self
            .shared
            .settled_cv
            .wait_timeout_while(state, RESET_TIMEOUT, |s| s.cancels_handled < ticket)
            .unwrap_or_else(PoisonError::into_inner);

        if result.timed_out() {
            warn!(
                "Engine didn't acknowledge the reset within {:?}",
                RESET_TIMEOUT
            );
        }
    }

    /// Index of the sample of the running path last sent to the chassis.
    pub fn running_segment_index(&self) -> Option<usize> {
        self.shared.lock().running_index
    }

    /// Store a path to the files `<id>.left.bin` and `<id>.right.bin` in
    /// `directory` under the storage root.
    ///
    /// Storing an unknown path does nothing.
    pub fn store_path(&self, directory: &str, id: &str) -> Result<(), MpCtrlError> {
        if self.get_path(id).is_none() {
            warn!("Cannot store path \"{}\", it doesn't exist", id);
            return Ok(());
        }

        let (left_path, right_path) = self.path_files(directory, id);
        let mut left = BufWriter::new(create_file(left_path)?);
        let mut right = BufWriter::new(create_file(right_path)?);

        self.store_path_to(id, &mut left, &mut right)
    }

    /// Store a path to a pair of streams.
    pub fn store_path_to<L, R>(&self, id: &str, left: &mut L, right: &mut R) -> Result<(), MpCtrlError>
    where
        L: Write,
        R: Write,
    {
        let path = match self.get_path(id) {
            Some(p) => p,
            None => {
                warn!("Cannot store path \"{}\", it doesn't exist", id);
                return Ok(());
            }
        };

        store_trajectory(&path, left, right)?;

        info!("Stored path \"{}\" ({} samples)", id, path.len());

        Ok(())
    }

    /// Load a path stored with [`MpCtrl::store_path`] and register it under
    /// `id`.
    pub fn load_path(&self, directory: &str, id: &str) -> Result<(), MpCtrlError> {
        let (left_path, right_path) = self.path_files(directory, id);
        let mut left = BufReader::new(open_file(left_path)?);
        let mut right = BufReader::new(open_file(right_path)?);

        self.load_path_from(id, &mut left, &mut right)
    }

    /// Load a path from a pair of streams and register it under `id`.
    ///
    /// On failure any path already registered under `id` is left in place.
    pub fn load_path_from<L, R>(&self, id: &str, left: &mut L, right: &mut R) -> Result<(), MpCtrlError>
    where
        L: Read,
        R: Read,
    {
        let path = load_trajectory(left, right).map_err(|e| {
            warn!("Could not load path \"{}\": {}", id, e);
            MpCtrlError::from(e)
        })?;

        self.register(id, path, "Loaded");

        Ok(())
    }

    fn register(&self, id: &str, path: TrajectoryPair, action: &str) {
        let num_samples = path.len();

        if self.shared.lock().registry.insert_or_replace(id, path) {
            info!("{} path \"{}\" ({} samples)", action, id, num_samples);
        } else {
            info!("{} path \"{}\" is empty, nothing registered", action, id);
        }
    }

    fn path_files(&self, directory: &str, id: &str) -> (PathBuf, PathBuf) {
        let root = self.params.storage_root.to_string_lossy();

        (
            PathBuf::from(make_file_path_in(&root, directory, &format!("{}.left.bin", id))),
            PathBuf::from(make_file_path_in(&root, directory, &format!("{}.right.bin", id))),
        )
    }
}

impl Drop for MpCtrl {
    fn drop(&mut self) {
        self.shared.shutdown.store(true, Ordering::SeqCst);
        {
            let _state = self.shared.lock();
            self.shared.work_cv.notify_all();
        }

        if let Some(jh) = self.engine_jh.take() {
            if jh.join().is_err() {
                error!("MpCtrl engine thread panicked");
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

fn create_file(path: PathBuf) -> Result<File, StoreError> {
    let result = match path.parent() {
        Some(dir) => fs::create_dir_all(dir).and_then(|_| File::create(&path)),
        None => File::create(&path),
    };

    result.map_err(|source| {
        warn!("Could not open {:?} for writing: {}", path, source);
        StoreError::OpenError { path, source }
    })
}

fn open_file(path: PathBuf) -> Result<File, StoreError> {
    File::open(&path).map_err(|source| {
        warn!("Could not open {:?} for reading: {}", path, source);
        StoreError::OpenError { path, source }
    })
}
