use std::sync::Mutex;

use camino::Utf8Path;
use log::info;
use simple_error::{SimpleResult, bail};

use crate::call_output::TsvCallStore;
use crate::cli;
use crate::jump_source::{JumpTable, read_jump_table};
use crate::reference::GenomePack;
use crate::run_stats::{CallRunStats, write_call_run_stats};
use crate::sweep_sections::{SweepSettings, call_svs_in_sections};

pub const CALLS_FILENAME: &str = "calls.tsv";
pub const RUN_STATS_FILENAME: &str = "run.stats.json";
pub const SETTINGS_FILENAME: &str = "call.settings.json";
pub const SUPPORT_FILENAME: &str = "call_support.tsv";

/// Select the run to call SVs from
///
/// Without a requested run id the jump table must hold exactly one run.
///
fn resolve_run_id(table: &JumpTable, run_id: Option<i64>) -> SimpleResult<i64> {
    let run_ids = table.run_ids().collect::<Vec<_>>();
    match run_id {
        Some(x) => {
            if !run_ids.contains(&x) {
                bail!("Requested run id {} not found in jump evidence file", x);
            }
            Ok(x)
        }
        None => match run_ids.as_slice() {
            [x] => Ok(*x),
            [] => bail!("No jump evidence found in jump evidence file"),
            _ => bail!(
                "Jump evidence file contains multiple run ids ({:?}), select one with --run-id",
                run_ids
            ),
        },
    }
}

pub fn run_call(
    shared_settings: &cli::SharedSettings,
    settings: &cli::CallSettings,
) -> SimpleResult<()> {
    cli::write_call_settings(&settings.output_dir, settings);

    let genome = GenomePack::from_fasta(&settings.ref_filename);
    let table = read_jump_table(
        Utf8Path::new(&settings.jumps_filename),
        settings.min_jump_fuzziness,
    )?;
    let run_id = resolve_run_id(&table, settings.run_id)?;

    info!("Calling SVs from run id {run_id}");

    let start = std::time::Instant::now();
    let store = Mutex::new(TsvCallStore::new(&settings.output_dir, &genome)?);
    let section_stats = call_svs_in_sections(
        shared_settings.thread_count,
        &SweepSettings::new(settings)?,
        &table,
        run_id,
        &genome,
        &store,
    )?;

    let cluster_stats = &section_stats.cluster_stats;
    info!(
        "Coarse sweep found {} clusters from {} swept jumps",
        thousands::Separable::separate_with_commas(&cluster_stats.coarse_cluster_count),
        thousands::Separable::separate_with_commas(&cluster_stats.swept_jump_count)
    );
    info!(
        "Exact sweep refined these into {} calls, removing {} duplicate read jumps",
        thousands::Separable::separate_with_commas(&cluster_stats.refined_call_count),
        cluster_stats.duplicate_read_jumps_removed
    );
    section_stats.filter_stats.log();

    let run_stats = CallRunStats {
        run_id,
        section_stats,
        total_sweep_time_secs: start.elapsed().as_secs_f64(),
    };
    write_call_run_stats(&settings.output_dir, &run_stats);

    Ok(())
}
