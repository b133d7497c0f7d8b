//! Session management
//!
//! A session is one run of an executable. Each session gets its own directory
//! for logs and any other output, named after the executable and the time
//! the session started (the session epoch).

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use chrono::{DateTime, Utc};
use conquer_once::OnceCell;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

// Internal imports
use crate::{host, time};

// ---------------------------------------------------------------------------
// STATICS
// ---------------------------------------------------------------------------

static SESSION_EPOCH: OnceCell<DateTime<Utc>> = OnceCell::uninit();

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Format of the timestamp in session directory names, see
/// https://docs.rs/chrono/0.4/chrono/format/strftime/index.html
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Directories and files belonging to the current session
#[derive(Clone, Debug)]
pub struct Session {
    /// The root directory for this session
    pub session_root: PathBuf,

    /// The path to the session's log file
    pub log_file_path: PathBuf,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Error, Debug)]
pub enum SessionError {
    #[error("The software root is not available: {0}")]
    SwRootNotSet(host::HostError),

    #[error("Cannot create the session directory: {0}")]
    CannotCreateDir(std::io::Error),

    #[error("A session has already been started in this execution ({0})")]
    CannotInitEpoch(conquer_once::TryInitError),

    #[error("Cannot get the session epoch")]
    CannotGetEpoch,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Session {
    /// Start a new session in `sessions_dir` under the software root.
    ///
    /// The session directory is named `{exec_name}_{timestamp}`. Only one
    /// session can be started per execution.
    pub fn new(exec_name: &str, sessions_dir: &str) -> Result<Self, SessionError> {
        let sw_root = host::get_sw_root().map_err(SessionError::SwRootNotSet)?;

        Self::new_in(exec_name, sw_root.join(sessions_dir))
    }

    /// Start a new session in an explicit directory.
    pub fn new_in<P: AsRef<Path>>(exec_name: &str, sessions_dir: P) -> Result<Self, SessionError> {
        SESSION_EPOCH
            .try_init_once(Utc::now)
            .map_err(SessionError::CannotInitEpoch)?;
        let epoch = SESSION_EPOCH.get().ok_or(SessionError::CannotGetEpoch)?;

        let session_root = sessions_dir
            .as_ref()
            .join(format!("{}_{}", exec_name, epoch.format(TIMESTAMP_FORMAT)));

        fs::create_dir_all(&session_root).map_err(SessionError::CannotCreateDir)?;

        Ok(Self {
            log_file_path: session_root.join(format!("{}.log", exec_name)),
            session_root,
        })
    }
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Seconds since the start of the session, or `NAN` before a session has
/// been started.
pub fn get_elapsed_seconds() -> f64 {
    SESSION_EPOCH
        .get()
        .and_then(|epoch| time::duration_to_seconds(Utc::now() - *epoch))
        .unwrap_or(std::f64::NAN)
}

/// The session epoch, or `None` if no session has been started.
pub fn get_epoch() -> Option<&'static DateTime<Utc>> {
    SESSION_EPOCH.get()
}
