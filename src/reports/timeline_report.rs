use std::{io::Write, path::PathBuf};

use log::info;

use crate::{
    agent_simulator::AgentDayRecord,
    error::EpiError,
    profiling::open_span,
    reports::{create_csv_writer, ReportOptions},
};

/// Writes one CSV row per agent per day with the columns
/// `agent_id,age_group,country,date,state,days_in_state,previous_state`.
/// # Errors
/// - If serialization or the underlying writer fails.
pub fn write_timeline<W: Write>(
    writer: &mut csv::Writer<W>,
    records: &[AgentDayRecord],
) -> Result<(), EpiError> {
    for record in records {
        writer.serialize(record)?;
    }
    writer.flush()?;
    Ok(())
}

/// # Errors
/// - `OutputExists` if the report exists and overwriting is off, or any I/O error.
pub fn write_timeline_report(
    options: &ReportOptions,
    name: &str,
    records: &[AgentDayRecord],
) -> Result<PathBuf, EpiError> {
    let _span = open_span("write timeline report");
    let path = options.writable_path(name)?;
    let mut writer = create_csv_writer(&path)?;
    write_timeline(&mut writer, records)?;
    info!("Wrote {} timeline rows to {}", records.len(), path.display());
    Ok(path)
}
