use std::{collections::BTreeMap, io::Write, path::PathBuf, sync::Arc};

use chrono::NaiveDate;
use log::info;
use rayon::prelude::*;

use crate::{
    agent_simulator::AgentDayRecord,
    disease_parameters::DiseaseState,
    error::EpiError,
    profiling::open_span,
    reports::{create_csv_writer, ReportOptions},
};

type StateCounts = [usize; DiseaseState::COUNT];
type CensusMap = BTreeMap<(NaiveDate, Arc<str>), StateCounts>;

/// Number of agents in each disease state for one country on one date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryRow {
    pub date: NaiveDate,
    pub country: Arc<str>,
    pub counts: StateCounts,
}

impl SummaryRow {
    #[must_use]
    pub fn count(&self, state: DiseaseState) -> usize {
        self.counts[state.index()]
    }

    /// Agents of this country observed on this date.
    #[must_use]
    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }
}

fn merge(mut left: CensusMap, right: CensusMap) -> CensusMap {
    for (key, counts) in right {
        let entry = left.entry(key).or_insert([0; DiseaseState::COUNT]);
        for (total, count) in entry.iter_mut().zip(counts) {
            *total += count;
        }
    }
    left
}

/// Reduces a timeline into one row per distinct (date, country), ordered by date and then
/// country. States no agent occupied are reported as zero. Dates with no records produce
/// no row.
#[must_use]
pub fn summarize(records: &[AgentDayRecord]) -> Vec<SummaryRow> {
    let _span = open_span("summarize");
    let census = records
        .par_iter()
        .fold(CensusMap::new, |mut census, record| {
            let counts = census
                .entry((record.date, Arc::clone(&record.country)))
                .or_insert([0; DiseaseState::COUNT]);
            counts[record.state.index()] += 1;
            census
        })
        .reduce(CensusMap::new, merge);

    census
        .into_iter()
        .map(|((date, country), counts)| SummaryRow {
            date,
            country,
            counts,
        })
        .collect()
}

/// Writes the summary with the columns `date,country,H,I,S,M,D`.
/// # Errors
/// - If the underlying writer fails.
pub fn write_summary<W: Write>(
    writer: &mut csv::Writer<W>,
    rows: &[SummaryRow],
) -> Result<(), EpiError> {
    let mut header = vec!["date", "country"];
    header.extend(DiseaseState::ALL.iter().map(|state| state.code()));
    writer.write_record(&header)?;

    for row in rows {
        let mut record = vec![row.date.to_string(), row.country.to_string()];
        record.extend(row.counts.iter().map(ToString::to_string));
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

/// # Errors
/// - `OutputExists` if the report exists and overwriting is off, or any I/O error.
pub fn write_summary_report(
    options: &ReportOptions,
    name: &str,
    rows: &[SummaryRow],
) -> Result<PathBuf, EpiError> {
    let path = options.writable_path(name)?;
    let mut writer = create_csv_writer(&path)?;
    write_summary(&mut writer, rows)?;
    info!("Wrote {} summary rows to {}", rows.len(), path.display());
    Ok(path)
}
