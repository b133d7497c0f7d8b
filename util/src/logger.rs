//! Logger initialisation
//!
//! Log lines are written to stdout, with coloured level tags, and to the
//! session's log file, without colours. Each line is prefixed with the number
//! of seconds since the session started.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::Colorize;
use log::{info, Level};
use std::fmt;
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors associated with initialising the logger.
#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("Expected a log level of at least `INFO`, found `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Error initialising the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("An error occured while setting up the logger: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Initialise the logger for this execution.
///
/// `min_level` must include `INFO`. Only the first call in an execution can
/// succeed.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    let stdout = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_line(record.level(), record.target(), message, true)
            ))
        })
        .chain(std::io::stdout());

    let file = fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}",
                format_line(record.level(), record.target(), message, false)
            ))
        })
        .chain(log_file);

    fern::Dispatch::new()
        .level(min_level)
        .chain(stdout)
        .chain(file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging initialised");
    if let Some(epoch) = session::get_epoch() {
        info!("    Session epoch: {}", epoch);
    }
    info!("    Log level: {:?}", min_level);
    info!("    Log file path: {:?}", session.log_file_path);

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format a single log line.
///
/// Debug and trace lines include the target so the noisy modules can be
/// picked out.
fn format_line(level: Level, target: &str, message: &fmt::Arguments, coloured: bool) -> String {
    let tag = if coloured {
        coloured_tag(level).to_string()
    } else {
        plain_tag(level).to_string()
    };

    if level > Level::Info {
        format!(
            "[{:10.6} {}] {}: {}",
            session::get_elapsed_seconds(),
            tag,
            target,
            message
        )
    } else {
        format!("[{:10.6} {}] {}", session::get_elapsed_seconds(), tag, message)
    }
}

fn plain_tag(level: Level) -> &'static str {
    match level {
        Level::Trace => "TRC",
        Level::Debug => "DBG",
        Level::Info => "INF",
        Level::Warn => "WRN",
        Level::Error => "ERR",
    }
}

fn coloured_tag(level: Level) -> colored::ColoredString {
    let tag = plain_tag(level);
    match level {
        Level::Trace => tag.dimmed().italic(),
        Level::Debug => tag.dimmed(),
        Level::Info => tag.normal(),
        Level::Warn => tag.yellow(),
        Level::Error => tag.red().bold(),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_rejects_quiet_levels() {
        let session = Session {
            session_root: PathBuf::from("."),
            log_file_path: PathBuf::from("./never_created.log"),
        };

        assert!(matches!(
            logger_init(LevelFilter::Warn, &session),
            Err(LoggerInitError::InvalidMinLogLevel(LevelFilter::Warn))
        ));
    }

    #[test]
    fn test_line_format() {
        let line = format_line(
            Level::Debug,
            "drive_lib::mp_ctrl",
            &format_args!("path {}", 3),
            false,
        );
        assert!(line.starts_with('['));
        assert!(line.ends_with(" DBG] drive_lib::mp_ctrl: path 3"));

        let line = format_line(Level::Warn, "drive_lib::mp_ctrl", &format_args!("path"), false);
        assert!(line.ends_with(" WRN] path"));
    }
}
