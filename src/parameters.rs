use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::{
    agent_simulator::validate_date_range, error::EpiError, population_loader::validate_ratio,
    simulation_driver::DEFAULT_CHUNK_SIZE,
};

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_timeline_report_name() -> String {
    "simulated-timeseries.csv".to_string()
}

fn default_summary_report_name() -> String {
    "summary-timeseries.csv".to_string()
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Params {
    /// The random seed for the simulation.
    pub seed: u64,
    /// The path to the demographics CSV loaded in `population_loader`
    pub countries_file: PathBuf,
    /// The path to the holding time and transition probability tables
    pub disease_parameters_file: PathBuf,
    /// Countries to sample, in output order. A country listed twice is sampled twice.
    pub countries: Vec<String>,
    /// One agent is created per `sample_ratio` people of each country.
    pub sample_ratio: f64,
    /// First simulated day, inclusive.
    pub start_date: NaiveDate,
    /// Last simulated day, inclusive.
    pub end_date: NaiveDate,
    /// Agents per RNG stream
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_timeline_report_name")]
    pub timeline_report_name: String,
    #[serde(default = "default_summary_report_name")]
    pub summary_report_name: String,
    /// Where to write span and count tables as JSON; relative paths are placed in the
    /// output directory.
    #[serde(default)]
    pub profiling_data_path: Option<PathBuf>,
}

impl Params {
    /// Reads parameters from a JSON file. Relative input file paths are resolved against the
    /// directory containing the JSON file.
    /// # Errors
    /// - If the file cannot be read or parsed, or fails `validate_inputs`.
    pub fn load(path: &Path) -> Result<Self, EpiError> {
        let file = std::fs::File::open(path)?;
        let mut params: Params = serde_json::from_reader(std::io::BufReader::new(file))?;
        if let Some(base) = path.parent() {
            params.countries_file = base.join(&params.countries_file);
            params.disease_parameters_file = base.join(&params.disease_parameters_file);
        }
        validate_inputs(&params)?;
        Ok(params)
    }
}

/// # Errors
/// - `ConfigurationError` for an empty country list, a zero chunk size, or report names
///   that collide.
/// - `InvalidRatio` if the sample ratio is not positive and finite.
/// - `InvalidDateRange` if the end date is before the start date.
pub fn validate_inputs(parameters: &Params) -> Result<(), EpiError> {
    if parameters.countries.is_empty() {
        return Err(EpiError::ConfigurationError(
            "At least one country must be selected.".to_string(),
        ));
    }
    validate_ratio(parameters.sample_ratio)?;
    validate_date_range(parameters.start_date, parameters.end_date)?;
    if parameters.chunk_size == 0 {
        return Err(EpiError::ConfigurationError(
            "The simulation chunk size must be positive.".to_string(),
        ));
    }
    if parameters.timeline_report_name == parameters.summary_report_name {
        return Err(EpiError::ConfigurationError(
            "The timeline and summary reports must have different names.".to_string(),
        ));
    }
    Ok(())
}
