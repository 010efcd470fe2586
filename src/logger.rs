//! Methods specific to the svsweep logger
//!

use camino::{Utf8Path, Utf8PathBuf};

use crate::cli;
use crate::globals::PROGRAM_NAME;
use crate::os_utils::create_dir_all;

fn get_log_level(debug: bool) -> log::LevelFilter {
    if debug {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    }
}

/// Log file written in the output directory in addition to stderr
fn get_log_filename(output_dir: &Utf8Path) -> Utf8PathBuf {
    output_dir.join(PROGRAM_NAME.to_string() + ".log")
}

/// If debug is true set the default logger to the more verbose debug level
///
fn setup_logger(output_dir: &Utf8Path, debug: bool) -> Result<(), fern::InitError> {
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                PROGRAM_NAME,
                record.level(),
                message
            ))
        })
        .level(get_log_level(debug))
        .chain(std::io::stderr())
        .chain(fern::log_file(get_log_filename(output_dir))?)
        .apply()?;
    Ok(())
}

/// Check and create output directory, then setup logger to write there
///
/// An existing output directory is reused only if `clobber` is set.
///
/// #Arguments
/// * `debug` - If true use debug log level, and info level otherwise
///
pub fn setup_output_dir_and_logger(output_dir: &Utf8Path, clobber: bool, debug: bool) {
    // No logger is available yet, so errors here follow the pattern of the command-line settings
    // validation methods

    if let Err(msg) = cli::check_novel_dirname(output_dir, "Output directory") {
        if !clobber {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    };
    create_dir_all(output_dir, "output");
    if let Err(err) = setup_logger(output_dir, debug) {
        eprintln!("Unable to setup logger: {}", err);
        std::process::exit(exitcode::CANTCREAT);
    }
}
