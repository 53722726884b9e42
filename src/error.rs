use std::path::PathBuf;

use chrono::NaiveDate;
use thiserror::Error;

use crate::disease_parameters::DiseaseState;
use crate::population_loader::AgeGroup;

/// Every failure the model can report. Nothing is recovered from internally: an error
/// anywhere in the pipeline aborts the whole run.
#[derive(Debug, Error)]
pub enum EpiError {
    #[error("Country {0:?} is not present in the demographic data.")]
    UnknownCountry(String),
    #[error("The downsampling ratio must be a positive number. Instead got {0}.")]
    InvalidRatio(f64),
    #[error("No holding time or transition distribution for age group {age_group} in state {state}.")]
    UnknownAgeGroupOrState {
        age_group: AgeGroup,
        state: DiseaseState,
    },
    #[error("The end date {end} precedes the start date {start}.")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },
    #[error("{0}")]
    ConfigurationError(String),
    #[error("The simulation was cancelled.")]
    Cancelled,
    #[error("Output file already exists: {}", .0.display())]
    OutputExists(PathBuf),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
