//! Parallel SV calling over all genome sections
//!

use std::sync::Mutex;
use std::sync::mpsc::channel;

use log::info;
use simple_error::SimpleResult;

use crate::call_filters::{CallFilterPipeline, FilterSettings};
use crate::call_output::{BufferedCallSink, CallRecord, CallStore};
use crate::cli;
use crate::cluster_jumps::{ClusterSettings, cluster_section};
use crate::genome_section::{GenomeSection, GenomeSectionPlanner};
use crate::jump_source::SortedJumpSource;
use crate::log_utils::debug_msg;
use crate::reference::GenomePack;
use crate::run_stats::SectionStats;
use crate::sv_call::SvCall;

pub struct SweepSettings {
    pub cluster_settings: ClusterSettings,
    pub filters: CallFilterPipeline,

    /// Coverage assigned to all calls, 0 if unknown
    pub mean_coverage: u32,

    pub sections_per_thread: usize,
    pub min_section_size: i64,
    pub sink_batch_size: usize,

    /// Restrict the sweep to a single section index for debugging
    pub target_section: Option<usize>,
}

impl SweepSettings {
    pub fn new(settings: &cli::CallSettings) -> SimpleResult<Self> {
        let filter_settings = FilterSettings::new(settings);
        let filters = if settings.filter_stages.is_empty() {
            CallFilterPipeline::new(filter_settings)
        } else {
            CallFilterPipeline::with_stages(filter_settings, settings.filter_stages.clone())?
        };
        Ok(Self {
            cluster_settings: ClusterSettings::new(settings),
            filters,
            mean_coverage: settings.mean_coverage,
            sections_per_thread: settings.sections_per_thread,
            min_section_size: settings.min_section_size,
            sink_batch_size: settings.sink_batch_size,
            target_section: settings.target_section,
        })
    }
}

/// Annotate each call with the coverage used to normalize its score
fn set_call_coverage(calls: &mut [SvCall], mean_coverage: u32) {
    for call in calls.iter_mut() {
        call.coverage = mean_coverage;
    }
}

/// Shared inputs of all section tasks
struct SectionTaskData<'a, S, C> {
    settings: &'a SweepSettings,
    source: &'a S,
    run_id: i64,
    genome: &'a GenomePack,
    max_from_size: i64,
    store: &'a Mutex<C>,
}

/// Cluster, filter and write out all calls owned by one section
fn call_svs_in_section<S: SortedJumpSource, C: CallStore>(
    data: &SectionTaskData<S, C>,
    section: GenomeSection,
    debug: bool,
) -> SimpleResult<SectionStats> {
    let (mut calls, cluster_stats) = cluster_section(
        &data.settings.cluster_settings,
        data.source,
        data.run_id,
        data.genome.forward_strand_size(),
        &section,
        data.max_from_size,
    )?;

    set_call_coverage(&mut calls, data.settings.mean_coverage);

    let (calls, filter_stats) = data.settings.filters.run(calls, data.genome);

    let mut sink = BufferedCallSink::new(data.store, data.settings.sink_batch_size);
    for call in calls.iter() {
        sink.push(CallRecord::new(call, data.genome))?;
    }
    sink.flush()?;

    if debug {
        for call in calls.iter() {
            debug_msg!(debug, "Output call: {:?}", call);
        }
    }
    let (contig_index, contig_pos) = data
        .genome
        .to_contig_pos(data.genome.forward_strand_coord(section.start()));
    debug_msg!(
        debug,
        "Finished section {:?} starting at {}:{}, {} coarse clusters, {} output calls",
        section,
        data.genome.contig_label(contig_index),
        contig_pos,
        cluster_stats.coarse_cluster_count,
        calls.len()
    );

    Ok(SectionStats {
        cluster_stats,
        filter_stats,
        output_call_count: calls.len(),
    })
}

/// Call SVs from all jumps of one run, writing the calls to `store`
///
/// The genome is split into sections on both strands, and each section is processed as an
/// independent task on a pool of `thread_count` workers. Stats from all sections are merged. Any
/// section error fails the whole run.
///
pub fn call_svs_in_sections<S: SortedJumpSource, C: CallStore>(
    thread_count: usize,
    settings: &SweepSettings,
    source: &S,
    run_id: i64,
    genome: &GenomePack,
    store: &Mutex<C>,
) -> SimpleResult<SectionStats> {
    let planner = GenomeSectionPlanner::new(
        genome.forward_strand_size(),
        thread_count,
        settings.sections_per_thread,
        settings.min_section_size,
    );
    let section_count = planner.section_count();

    info!(
        "Sweeping {} genome sections of size {} on {} threads",
        section_count,
        thousands::Separable::separate_with_commas(&planner.section_size()),
        thread_count
    );

    let data = SectionTaskData {
        settings,
        source,
        run_id,
        genome,
        max_from_size: source.max_from_size(run_id)?,
        store,
    };

    let worker_pool = rayon::ThreadPoolBuilder::new()
        .num_threads(thread_count)
        .build()
        .unwrap();

    let planner = &planner;
    let data = &data;
    let target_section = settings.target_section;
    let (tx, rx) = channel();
    worker_pool.scope(move |scope| {
        for _ in 0..section_count {
            let tx = tx.clone();
            scope.spawn(move |_| {
                if let Some((section_index, section)) = planner.next_section() {
                    let debug = target_section == Some(section_index);
                    if target_section.is_some() && !debug {
                        return;
                    }
                    tx.send(call_svs_in_section(data, section, debug)).unwrap();
                }
            });
        }
    });

    let mut stats = SectionStats::default();
    for section_result in rx {
        stats.merge(&section_result?);
    }

    store.lock().unwrap().commit()?;

    info!(
        "Finished sweeping {} genome sections, found {} SV calls",
        stats.cluster_stats.section_count,
        thousands::Separable::separate_with_commas(&stats.output_call_count)
    );

    Ok(stats)
}
