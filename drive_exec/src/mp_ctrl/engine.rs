//! Background execution of motion profiles
//!
//! The engine thread owns the chassis model for the lifetime of the
//! controller. It waits for a target to be requested, then streams the target
//! path to the chassis one sample per period until the path ends or the run
//! is disabled, cancelled or preempted.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::{debug, trace, warn};
use serde::{Deserialize, Serialize};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc, Condvar, Mutex, MutexGuard, PoisonError,
};
use std::time::Duration;

// Internal
use super::{conv::Converter, registry::PathRegistry};
use crate::{loco_ctrl::ChassisModel, path_gen::TrajectoryPair};
use util::time::Rate;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// How a target path should be driven.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOptions {
    /// Drive the path backwards, negating every demand.
    #[serde(default)]
    pub reverse: bool,

    /// Drive the left trajectory on the right side and vice versa, inverting
    /// the direction of any turns.
    #[serde(default)]
    pub mirrored: bool,
}

/// The path the caller has asked to be driven.
#[derive(Debug, Clone, PartialEq)]
pub(super) struct Target {
    pub id: String,
    pub options: TargetOptions,
}

/// State shared between the controller and its engine thread.
#[derive(Debug)]
pub(super) struct Shared {
    pub state: Mutex<ExecState>,

    /// Signalled whenever the controller may have become settled, or a cancel
    /// has been handled.
    pub settled_cv: Condvar,

    /// Signalled to wake an idle engine.
    pub work_cv: Condvar,

    pub disabled: AtomicBool,
    pub shutdown: AtomicBool,
}

/// Everything guarded by the shared lock.
#[derive(Debug)]
pub(super) struct ExecState {
    pub registry: PathRegistry,

    pub target: Option<Target>,

    /// A target has been set which the engine has yet to start.
    pub pending: bool,

    /// Written only by the engine, true whenever no path is being streamed.
    pub settled: bool,

    /// Index of the sample last sent to the chassis, written only by the
    /// engine.
    pub running_index: Option<usize>,

    pub cancel_requests: u64,
    pub cancels_handled: u64,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Why a run ended.
#[derive(Debug, Clone, Copy, PartialEq)]
enum RunEnd {
    Complete,
    Disabled,
    Cancelled,
    Preempted,
    Shutdown,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Shared {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ExecState {
                registry: PathRegistry::new(),
                target: None,
                pending: false,
                settled: true,
                running_index: None,
                cancel_requests: 0,
                cancels_handled: 0,
            }),
            settled_cv: Condvar::new(),
            work_cv: Condvar::new(),
            disabled: AtomicBool::new(false),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Lock the shared state.
    ///
    /// A panic while holding the lock can't leave the state invalid, so a
    /// poisoned lock is recovered rather than propagated.
    pub fn lock(&self) -> MutexGuard<'_, ExecState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    /// Settled given the current state. Disabled always counts as settled.
    pub fn is_settled(&self, state: &ExecState) -> bool {
        self.is_disabled() || (state.settled && !state.pending)
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Engine thread main function.
pub(super) fn engine_thread<C: ChassisModel>(
    shared: Arc<Shared>,
    mut chassis: C,
    converter: Converter,
    period: Duration,
) {
    debug!("Motion profile engine started");

    while let Some((target, path, cancel_ticket)) = wait_for_run(&shared, &mut chassis, period) {
        debug!(
            "Starting path \"{}\" ({} samples, {:?})",
            target.id,
            path.len(),
            target.options
        );

        let end = execute(
            &shared,
            &mut chassis,
            &converter,
            period,
            &target,
            &path,
            cancel_ticket,
        );

        debug!("Path \"{}\" ended: {:?}", target.id, end);

        // A preempting run takes over the motors directly
        if end == RunEnd::Preempted {
            continue;
        }

        chassis.stop_all_motors();

        {
            let mut state = shared.lock();
            state.settled = true;
            state.running_index = None;
            state.cancels_handled = state.cancel_requests;
        }
        shared.settled_cv.notify_all();
    }

    chassis.stop_all_motors();

    debug!("Motion profile engine stopped");
}

/// Block until there's a run to start, servicing cancel requests meanwhile.
///
/// Returns `None` once the engine is shut down.
fn wait_for_run<C: ChassisModel>(
    shared: &Shared,
    chassis: &mut C,
    period: Duration,
) -> Option<(Target, Arc<TrajectoryPair>, u64)> {
    let mut state = shared.lock();

    loop {
        if shared.is_shutdown() {
            return None;
        }

        if state.cancels_handled != state.cancel_requests {
            chassis.stop_all_motors();
            state.settled = true;
            state.running_index = None;
            state.cancels_handled = state.cancel_requests;
            shared.settled_cv.notify_all();
        }

        if state.pending && !shared.is_disabled() {
            state.pending = false;

            let run = state
                .target
                .clone()
                .and_then(|t| state.registry.get(&t.id).map(|p| (t, p)));

            match run {
                Some((target, path)) => {
                    state.settled = false;
                    state.running_index = None;
                    return Some((target, path, state.cancel_requests));
                }
                None => {
                    warn!("Pending target no longer in the registry, not starting");
                    shared.settled_cv.notify_all();
                }
            }
        }

        // A preempted run whose replacement didn't start
        if !state.settled {
            chassis.stop_all_motors();
            state.settled = true;
            state.running_index = None;
            shared.settled_cv.notify_all();
        }

        state = shared
            .work_cv
            .wait_timeout(state, period)
            .unwrap_or_else(PoisonError::into_inner)
            .0;
    }
}

/// Stream a path to the chassis, one sample per period.
fn execute<C: ChassisModel>(
    shared: &Shared,
    chassis: &mut C,
    converter: &Converter,
    period: Duration,
    target: &Target,
    path: &TrajectoryPair,
    cancel_ticket: u64,
) -> RunEnd {
    let mut rate = Rate::new();

    for (index, (left, right)) in path.left().iter().zip(path.right()).enumerate() {
        if shared.is_shutdown() {
            return RunEnd::Shutdown;
        }
        if shared.is_disabled() {
            return RunEnd::Disabled;
        }

        {
            let mut state = shared.lock();
            if state.cancel_requests != cancel_ticket {
                return RunEnd::Cancelled;
            }
            if state.pending {
                return RunEnd::Preempted;
            }
            state.running_index = Some(index);
        }

        let (left, right) = if target.options.reverse {
            (left.reversed(), right.reversed())
        } else {
            (*left, *right)
        };
        let (left, right) = if target.options.mirrored {
            (right, left)
        } else {
            (left, right)
        };

        let left_demand = converter.demand(left.velocity_ms);
        let right_demand = converter.demand(right.velocity_ms);

        trace!(
            "Sample {}: left {:.4} m/s -> {:.4}, right {:.4} m/s -> {:.4}",
            index,
            left.velocity_ms,
            left_demand,
            right.velocity_ms,
            right_demand
        );

        chassis.set_left_right_velocity(left_demand, right_demand);

        rate.delay_until(period);
    }

    RunEnd::Complete
}
