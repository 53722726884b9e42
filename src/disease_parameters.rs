use std::{
    collections::BTreeMap,
    fmt::{Display, Formatter},
    fs::File,
    io::BufReader,
    path::Path,
};

use log::debug;
use rand::{
    distr::{weighted::WeightedIndex, Distribution},
    Rng,
};
use serde::{Deserialize, Serialize};

use crate::{error::EpiError, population_loader::AgeGroup};

/// How far a transition distribution may stray from summing to one.
pub const PROBABILITY_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DiseaseState {
    #[serde(rename = "H", alias = "Healthy")]
    Healthy,
    #[serde(rename = "I", alias = "Infected")]
    Infected,
    #[serde(rename = "S", alias = "Severe")]
    Severe,
    #[serde(rename = "M", alias = "Mild")]
    Mild,
    #[serde(rename = "D", alias = "Deceased")]
    Deceased,
}

impl DiseaseState {
    pub const COUNT: usize = 5;
    pub const ALL: [DiseaseState; DiseaseState::COUNT] = [
        DiseaseState::Healthy,
        DiseaseState::Infected,
        DiseaseState::Severe,
        DiseaseState::Mild,
        DiseaseState::Deceased,
    ];

    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// The single-letter code used as a column name in reports.
    #[must_use]
    pub fn code(self) -> &'static str {
        match self {
            DiseaseState::Healthy => "H",
            DiseaseState::Infected => "I",
            DiseaseState::Severe => "S",
            DiseaseState::Mild => "M",
            DiseaseState::Deceased => "D",
        }
    }
}

impl Display for DiseaseState {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// The on-disk shape of the parameter tables. Entries may be missing; a missing entry only
/// becomes an error once an agent needs it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiseaseParametersConfig {
    /// Minimum whole days an agent stays in a state before a transition is attempted.
    pub holding_times: BTreeMap<AgeGroup, BTreeMap<DiseaseState, u32>>,
    /// Next-state probabilities for each (age group, state), self-transitions included.
    pub transition_probabilities:
        BTreeMap<AgeGroup, BTreeMap<DiseaseState, BTreeMap<DiseaseState, f64>>>,
}

/// A validated categorical distribution over next states.
#[derive(Debug, Clone)]
pub struct TransitionDistribution {
    outcomes: Vec<DiseaseState>,
    probabilities: Vec<f64>,
    sampler: WeightedIndex<f64>,
}

impl TransitionDistribution {
    /// # Errors
    /// - If the distribution is empty, has a negative or non-finite weight, has no positive
    ///   weight, or does not sum to one within `PROBABILITY_TOLERANCE`.
    pub fn new(weights: &BTreeMap<DiseaseState, f64>) -> Result<Self, EpiError> {
        if weights.is_empty() {
            return Err(EpiError::ConfigurationError(
                "A transition distribution must have at least one outcome.".to_string(),
            ));
        }
        for (state, weight) in weights {
            if !weight.is_finite() || *weight < 0.0 {
                return Err(EpiError::ConfigurationError(format!(
                    "Transition probabilities must be finite and non-negative. Instead, the probability of moving to {state} is {weight}."
                )));
            }
        }
        let total: f64 = weights.values().sum();
        if (total - 1.0).abs() > PROBABILITY_TOLERANCE {
            return Err(EpiError::ConfigurationError(format!(
                "Transition probabilities must sum to 1.0. Instead, they sum to {total}."
            )));
        }
        let outcomes: Vec<DiseaseState> = weights.keys().copied().collect();
        let probabilities: Vec<f64> = weights.values().copied().collect();
        let sampler = WeightedIndex::new(probabilities.iter()).map_err(|e| {
            EpiError::ConfigurationError(format!("Invalid transition distribution: {e}"))
        })?;
        Ok(TransitionDistribution {
            outcomes,
            probabilities,
            sampler,
        })
    }

    /// Draws the next state. Outcomes are ordered by `DiseaseState`, so a fixed RNG stream
    /// always yields the same sequence of draws.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> DiseaseState {
        self.outcomes[self.sampler.sample(rng)]
    }

    #[must_use]
    pub fn probability(&self, state: DiseaseState) -> f64 {
        self.outcomes
            .iter()
            .position(|s| *s == state)
            .map_or(0.0, |i| self.probabilities[i])
    }

    /// States that can actually be drawn.
    pub fn successors(&self) -> impl Iterator<Item = DiseaseState> + '_ {
        self.outcomes
            .iter()
            .zip(&self.probabilities)
            .filter(|(_, p)| **p > 0.0)
            .map(|(s, _)| *s)
    }
}

/// Holding times and transition distributions for every (age group, state) pair, validated
/// once and shared read-only by every worker for the whole run.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "DiseaseParametersConfig")]
pub struct ParameterTables {
    holding_times: [[Option<u32>; DiseaseState::COUNT]; AgeGroup::COUNT],
    transitions: [[Option<TransitionDistribution>; DiseaseState::COUNT]; AgeGroup::COUNT],
}

impl ParameterTables {
    /// # Errors
    /// - `ConfigurationError` if any transition distribution is malformed.
    pub fn new(config: &DiseaseParametersConfig) -> Result<Self, EpiError> {
        let mut holding_times = [[None; DiseaseState::COUNT]; AgeGroup::COUNT];
        for (age_group, times) in &config.holding_times {
            for (state, days) in times {
                holding_times[age_group.index()][state.index()] = Some(*days);
            }
        }

        let mut transitions: [[Option<TransitionDistribution>; DiseaseState::COUNT];
            AgeGroup::COUNT] = Default::default();
        for (age_group, by_state) in &config.transition_probabilities {
            for (state, weights) in by_state {
                let distribution = TransitionDistribution::new(weights).map_err(|e| match e {
                    EpiError::ConfigurationError(msg) => EpiError::ConfigurationError(format!(
                        "Age group {age_group}, state {state}: {msg}"
                    )),
                    other => other,
                })?;
                transitions[age_group.index()][state.index()] = Some(distribution);
            }
        }

        Ok(ParameterTables {
            holding_times,
            transitions,
        })
    }

    /// Reads and validates the tables from a JSON file.
    /// # Errors
    /// - If the file cannot be read or parsed, or the tables are malformed.
    pub fn from_json_file(path: &Path) -> Result<Self, EpiError> {
        let reader = BufReader::new(File::open(path)?);
        let config: DiseaseParametersConfig = serde_json::from_reader(reader)?;
        let tables = ParameterTables::new(&config)?;
        debug!("Loaded disease parameters from {}", path.display());
        Ok(tables)
    }

    /// # Errors
    /// - `UnknownAgeGroupOrState` if there is no holding time for the pair.
    pub fn holding_time(&self, age_group: AgeGroup, state: DiseaseState) -> Result<u32, EpiError> {
        self.holding_times[age_group.index()][state.index()]
            .ok_or(EpiError::UnknownAgeGroupOrState { age_group, state })
    }

    /// # Errors
    /// - `UnknownAgeGroupOrState` if there is no transition distribution for the pair.
    pub fn transition(
        &self,
        age_group: AgeGroup,
        state: DiseaseState,
    ) -> Result<&TransitionDistribution, EpiError> {
        self.transitions[age_group.index()][state.index()]
            .as_ref()
            .ok_or(EpiError::UnknownAgeGroupOrState { age_group, state })
    }

    /// Checks that every state an agent of `age_group` can reach from `Healthy` has both a
    /// holding time and a transition distribution, so a run cannot fail part way through for
    /// lack of parameters.
    /// # Errors
    /// - `UnknownAgeGroupOrState` naming the first reachable state with a missing entry.
    pub fn validate_reachable(&self, age_group: AgeGroup) -> Result<(), EpiError> {
        let mut visited = [false; DiseaseState::COUNT];
        let mut stack = vec![DiseaseState::Healthy];
        visited[DiseaseState::Healthy.index()] = true;
        while let Some(state) = stack.pop() {
            self.holding_time(age_group, state)?;
            for next in self.transition(age_group, state)?.successors() {
                if !visited[next.index()] {
                    visited[next.index()] = true;
                    stack.push(next);
                }
            }
        }
        Ok(())
    }
}

impl TryFrom<DiseaseParametersConfig> for ParameterTables {
    type Error = EpiError;

    fn try_from(config: DiseaseParametersConfig) -> Result<Self, Self::Error> {
        ParameterTables::new(&config)
    }
}
