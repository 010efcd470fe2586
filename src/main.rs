mod call_filters;
mod call_output;
mod call_svs;
mod cli;
mod cluster_jumps;
mod genome_section;
mod globals;
mod int_range;
mod jump;
mod jump_source;
mod log_utils;
mod logger;
mod os_utils;
mod rectangle;
mod reference;
mod run_stats;
mod squeezed_vector;
mod sv_call;
mod sweep_sections;

use std::{error, process};

use hhmmss::Hhmmss;
use log::info;

use crate::call_svs::run_call;
use crate::cli::Commands;
use crate::globals::{PROGRAM_NAME, PROGRAM_VERSION};
use crate::logger::setup_output_dir_and_logger;

fn run(settings: &cli::Settings) -> Result<(), Box<dyn error::Error>> {
    info!("Starting {PROGRAM_NAME} {PROGRAM_VERSION}");
    info!(
        "cmdline: {}",
        std::env::args().collect::<Vec<_>>().join(" ")
    );
    info!("Running on {} threads", settings.shared.thread_count);

    let start = std::time::Instant::now();

    match &settings.command {
        Commands::Call(x) => {
            run_call(&settings.shared, x)?;
        }
    }

    info!(
        "{PROGRAM_NAME} completed. Total Runtime: {}",
        start.elapsed().hhmmssxxx()
    );
    Ok(())
}

fn main() {
    let settings = cli::validate_and_fix_settings(cli::parse_settings());

    // Setup logger, including creation of the output directory for the log file:
    setup_output_dir_and_logger(
        settings.get_output_dir(),
        settings.shared.clobber,
        settings.shared.debug,
    );

    if let Err(err) = run(&settings) {
        log::error!("{err}");
        process::exit(2);
    }
}
