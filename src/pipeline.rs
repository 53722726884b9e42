use std::{path::PathBuf, sync::atomic::AtomicBool};

use log::info;

use crate::{
    disease_parameters::ParameterTables,
    error::EpiError,
    parameters::{validate_inputs, Params},
    population_loader::{load_demographics, sample_population},
    profiling::{open_span, write_profiling_data_to_file},
    reports::{
        summary_report::{summarize, write_summary_report},
        timeline_report::write_timeline_report,
        ReportOptions,
    },
    simulation_driver::{run_simulation_with_cancellation, SimulationOptions},
};

/// What a completed run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub agents: usize,
    pub timeline_records: usize,
    pub summary_rows: usize,
    pub timeline_report: PathBuf,
    pub summary_report: PathBuf,
    pub profiling_data: Option<PathBuf>,
}

/// Runs the whole simulation described by `params` and writes its reports.
/// # Errors
/// - Any validation error, before any report file is written.
/// - Any I/O error while reading inputs or writing reports.
pub fn run(params: &Params, options: &ReportOptions) -> Result<RunSummary, EpiError> {
    run_with_cancellation(params, options, &AtomicBool::new(false))
}

/// Same as `run`, but stops with `Cancelled` once `cancel` is set. Reports are only
/// written after the simulation has finished, so a cancelled run leaves no output.
/// # Errors
/// - `Cancelled`, or any error `run` can return.
pub fn run_with_cancellation(
    params: &Params,
    options: &ReportOptions,
    cancel: &AtomicBool,
) -> Result<RunSummary, EpiError> {
    validate_inputs(params)?;
    let demographics = load_demographics(&params.countries_file)?;
    let tables = ParameterTables::from_json_file(&params.disease_parameters_file)?;

    let population = {
        let _span = open_span("sample population");
        sample_population(&demographics, &params.countries, params.sample_ratio)?
    };

    // Fail on existing outputs before spending time on the simulation.
    options.writable_path(&params.timeline_report_name)?;
    options.writable_path(&params.summary_report_name)?;
    let profiling_path = params
        .profiling_data_path
        .as_ref()
        .map(|path| options.check_writable(options.directory.join(path)))
        .transpose()?;

    let simulation_options = SimulationOptions {
        seed: params.seed,
        chunk_size: params.chunk_size,
    };
    let timeline = run_simulation_with_cancellation(
        &population,
        params.start_date,
        params.end_date,
        &tables,
        &simulation_options,
        cancel,
    )?;
    let summary = summarize(&timeline);

    let timeline_report = write_timeline_report(options, &params.timeline_report_name, &timeline)?;
    let summary_report = write_summary_report(options, &params.summary_report_name, &summary)?;

    if let Some(path) = &profiling_path {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        write_profiling_data_to_file(path)?;
    }

    info!(
        "Simulated {} agents from {} to {}: {} timeline rows, {} summary rows",
        population.len(),
        params.start_date,
        params.end_date,
        timeline.len(),
        summary.len()
    );

    Ok(RunSummary {
        agents: population.len(),
        timeline_records: timeline.len(),
        summary_rows: summary.len(),
        timeline_report,
        summary_report,
        profiling_data: profiling_path,
    })
}
