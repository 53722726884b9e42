use std::{
    fmt::{Display, Formatter},
    path::Path,
    sync::Arc,
};

use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::EpiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum AgeGroup {
    #[serde(rename = "less_5")]
    Under5,
    #[serde(rename = "5_to_14")]
    From5To14,
    #[serde(rename = "15_to_24")]
    From15To24,
    #[serde(rename = "25_to_64")]
    From25To64,
    #[serde(rename = "over_65")]
    Over65,
}

impl AgeGroup {
    pub const COUNT: usize = 5;
    /// Age groups in the order they are sampled.
    pub const ALL: [AgeGroup; AgeGroup::COUNT] = [
        AgeGroup::Under5,
        AgeGroup::From5To14,
        AgeGroup::From15To24,
        AgeGroup::From25To64,
        AgeGroup::Over65,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The column name used for this age group in the demographic table.
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            AgeGroup::Under5 => "less_5",
            AgeGroup::From5To14 => "5_to_14",
            AgeGroup::From15To24 => "15_to_24",
            AgeGroup::From25To64 => "25_to_64",
            AgeGroup::Over65 => "over_65",
        }
    }
}

impl Display for AgeGroup {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// One synthetic person. Ids are dense across the whole population, not per country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Agent {
    pub id: usize,
    pub age_group: AgeGroup,
    pub country: Arc<str>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CountryDemographics {
    pub population: u64,
    /// Percentage of the population in each age group, indexed by `AgeGroup::index`. Used
    /// as-is; the percentages need not sum to exactly 100.
    pub age_group_percentages: [f64; AgeGroup::COUNT],
}

impl CountryDemographics {
    #[must_use]
    pub fn percentage(&self, age_group: AgeGroup) -> f64 {
        self.age_group_percentages[age_group.index()]
    }
}

/// Demographic table keyed by country name, in file order.
pub type Demographics = IndexMap<String, CountryDemographics>;

#[derive(Deserialize, Debug)]
struct CountryRecord {
    country: String,
    population: f64,
    less_5: f64,
    #[serde(rename = "5_to_14")]
    from_5_to_14: f64,
    #[serde(rename = "15_to_24")]
    from_15_to_24: f64,
    #[serde(rename = "25_to_64")]
    from_25_to_64: f64,
    over_65: f64,
}

fn demographics_from_record(record: &CountryRecord) -> Result<CountryDemographics, EpiError> {
    if !record.population.is_finite() || record.population < 0.0 {
        return Err(EpiError::ConfigurationError(format!(
            "The population of {} must be a non-negative number. Instead got {}.",
            record.country, record.population
        )));
    }
    let age_group_percentages = [
        record.less_5,
        record.from_5_to_14,
        record.from_15_to_24,
        record.from_25_to_64,
        record.over_65,
    ];
    for (age_group, pct) in AgeGroup::ALL.iter().zip(age_group_percentages) {
        if !pct.is_finite() || pct < 0.0 {
            return Err(EpiError::ConfigurationError(format!(
                "The {age_group} percentage of {} must be a non-negative number. Instead got {pct}.",
                record.country
            )));
        }
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let population = record.population.trunc() as u64;
    Ok(CountryDemographics {
        population,
        age_group_percentages,
    })
}

/// Reads the country table from any CSV source with the columns
/// `country,population,less_5,5_to_14,15_to_24,25_to_64,over_65`.
/// # Errors
/// - If the CSV is malformed, a value is negative, or a country appears twice.
pub fn read_demographics<R: std::io::Read>(reader: R) -> Result<Demographics, EpiError> {
    let mut reader = csv::Reader::from_reader(reader);
    let mut demographics = Demographics::new();
    for record in reader.deserialize() {
        let record: CountryRecord = record?;
        let country_demographics = demographics_from_record(&record)?;
        if demographics
            .insert(record.country.clone(), country_demographics)
            .is_some()
        {
            return Err(EpiError::ConfigurationError(format!(
                "Country {} appears more than once in the demographic data.",
                record.country
            )));
        }
    }
    Ok(demographics)
}

/// # Errors
/// - If the file cannot be opened, or any error from `read_demographics`.
pub fn load_demographics(path: &Path) -> Result<Demographics, EpiError> {
    let file = std::fs::File::open(path)?;
    let demographics = read_demographics(file)?;
    debug!(
        "Loaded demographics for {} countries from {}",
        demographics.len(),
        path.display()
    );
    Ok(demographics)
}

/// Checks that the downsampling ratio is a positive, finite number.
/// # Errors
/// - `InvalidRatio` otherwise.
pub fn validate_ratio(ratio: f64) -> Result<(), EpiError> {
    if ratio.is_finite() && ratio > 0.0 {
        Ok(())
    } else {
        Err(EpiError::InvalidRatio(ratio))
    }
}

/// Number of agents to sample for one age group: the population is scaled down by `ratio`
/// and truncated, then the group's share is truncated again. Rounding loss is not
/// redistributed across groups.
#[must_use]
pub fn group_size(population: u64, ratio: f64, pct: f64) -> usize {
    #[allow(clippy::cast_precision_loss)]
    let scaled = (population as f64 / ratio).floor();
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let size = (scaled * pct / 100.0).floor() as usize;
    size
}

/// Builds the synthetic population for `countries`, in the order given, with each country's
/// agents laid out age group by age group.
/// # Errors
/// - `InvalidRatio` if `ratio` is not a positive, finite number.
/// - `UnknownCountry` if a requested country is not in `demographics`. Every country is
///   checked before any agent is created.
pub fn sample_population<S: AsRef<str>>(
    demographics: &Demographics,
    countries: &[S],
    ratio: f64,
) -> Result<Vec<Agent>, EpiError> {
    validate_ratio(ratio)?;
    let selected = countries
        .iter()
        .map(|country| {
            let country = country.as_ref();
            demographics
                .get(country)
                .map(|data| (country, data))
                .ok_or_else(|| EpiError::UnknownCountry(country.to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut population = Vec::new();
    for (country, data) in selected {
        let country_start = population.len();
        let country: Arc<str> = Arc::from(country);
        for age_group in AgeGroup::ALL {
            let size = group_size(data.population, ratio, data.percentage(age_group));
            let first_id = population.len();
            population.extend((first_id..first_id + size).map(|id| Agent {
                id,
                age_group,
                country: Arc::clone(&country),
            }));
        }
        debug!(
            "Sampled {} agents for {country}",
            population.len() - country_start
        );
    }
    info!(
        "Sampled {} agents from {} countries",
        population.len(),
        countries.len()
    );
    Ok(population)
}
