//! fern logger writing to stderr and the log file. Stdout is reserved for the transcript.

use crate::paths;
use std::path::PathBuf;

fn line_format(out: fern::FormatCallback<'_>, message: &std::fmt::Arguments<'_>, record: &log::Record) {
    out.finish(format_args!(
        "[{}][{}][{}][{:?}] {}",
        chrono::Local::now().format("%Y-%m-%d"),
        chrono::Local::now().format("%H:%M:%S"),
        record.target(),
        record.level(),
        message
    ))
}

/// Install the global logger. Returns the log file path.
pub fn init_logger(level: log::LevelFilter) -> Result<PathBuf, fern::InitError> {
    let log_file = paths::log_file_path()?;

    fern::Dispatch::new()
        .format(line_format)
        .level(level)
        // HTTP client internals are noisy at debug.
        .level_for("hyper", log::LevelFilter::Info)
        .level_for("reqwest", log::LevelFilter::Info)
        .chain(std::io::stderr())
        .chain(fern::log_file(&log_file)?)
        .apply()?;

    Ok(log_file)
}

/// `-v` raises the default `Info` to `Debug`, `-q` lowers it to `Warn`.
pub fn level_from_flags(verbose: bool, quiet: bool) -> log::LevelFilter {
    match (verbose, quiet) {
        (true, _) => log::LevelFilter::Debug,
        (false, true) => log::LevelFilter::Warn,
        (false, false) => log::LevelFilter::Info,
    }
}
