use std::path::Path;
#[cfg(feature = "profiling")]
use std::{
    fs::File,
    io::Write,
    time::{Duration, SystemTime},
};

#[cfg(feature = "profiling")]
use serde::Serialize;

#[cfg(feature = "profiling")]
use super::{
    display::transitions_per_agent, profiling_data, NAMED_COUNTS_HEADERS, NAMED_SPANS_HEADERS,
};

#[cfg(feature = "profiling")]
#[derive(Serialize)]
struct ProfilingData {
    date_time: SystemTime,
    named_counts_headers: Vec<String>,
    named_counts_data: Vec<(String, usize, f64)>,
    named_spans_headers: Vec<String>,
    named_spans_data: Vec<(String, usize, Duration, f64)>,
    transitions_per_agent: Option<f64>,
}

/// Writes all profiling data collected so far to `file_path` as JSON.
/// # Errors
/// - If the file cannot be created or written.
#[cfg(feature = "profiling")]
pub fn write_profiling_data_to_file<P: AsRef<Path>>(file_path: P) -> std::io::Result<()> {
    let profiling_data = {
        let container = profiling_data();
        ProfilingData {
            date_time: SystemTime::now(),
            named_counts_headers: NAMED_COUNTS_HEADERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            named_counts_data: container.get_named_counts_table(),
            named_spans_headers: NAMED_SPANS_HEADERS
                .iter()
                .map(|s| (*s).to_string())
                .collect(),
            named_spans_data: container.get_named_spans_table(),
            transitions_per_agent: transitions_per_agent(&container),
        }
    };

    let json = serde_json::to_string_pretty(&profiling_data).map_err(std::io::Error::other)?;

    let mut file = File::create(file_path)?;
    file.write_all(json.as_bytes())?;
    Ok(())
}

#[cfg(not(feature = "profiling"))]
pub fn write_profiling_data_to_file<P: AsRef<Path>>(_file_path: P) -> std::io::Result<()> {
    Ok(())
}
