use std::{path::PathBuf, process::ExitCode};

use clap::Parser;
use epi_census::{
    error::EpiError,
    parameters::Params,
    pipeline,
    profiling::print_profiling_data,
    reports::ReportOptions,
};
use log::LevelFilter;

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// path to the input file
    #[arg(short, long)]
    input_file: PathBuf,

    /// path to the output directory
    #[arg(short, long)]
    output_directory: PathBuf,

    /// prefix prepended to every report file name
    #[arg(long, default_value = "")]
    file_prefix: String,

    /// replace report files that already exist
    #[arg(long)]
    overwrite: bool,

    /// overrides the seed in the input file
    #[arg(long)]
    seed: Option<u64>,

    /// number of worker threads (default: all cores)
    #[arg(short, long)]
    threads: Option<usize>,

    #[arg(long, default_value = "info")]
    log_level: LevelFilter,
}

fn initialize(args: &Args) -> Result<Params, EpiError> {
    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .map_err(|e| EpiError::ConfigurationError(e.to_string()))?;
    }

    let mut params = Params::load(&args.input_file)?;
    if let Some(seed) = args.seed {
        params.seed = seed;
    }
    Ok(params)
}

fn main() -> ExitCode {
    let args = Args::parse();
    env_logger::Builder::new()
        .filter_level(args.log_level)
        .init();

    let options = ReportOptions::new(&args.output_directory)
        .file_prefix(args.file_prefix.as_str())
        .overwrite(args.overwrite);

    match initialize(&args).and_then(|params| pipeline::run(&params, &options)) {
        Ok(summary) => {
            println!(
                "Simulated {} agents; wrote {} and {}",
                summary.agents,
                summary.timeline_report.display(),
                summary.summary_report.display()
            );
            print_profiling_data();
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
