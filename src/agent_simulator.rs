use std::sync::Arc;

use chrono::NaiveDate;
use log::trace;
use rand::Rng;
use serde::Serialize;

use crate::{
    disease_parameters::{DiseaseState, ParameterTables},
    error::EpiError,
    population_loader::{AgeGroup, Agent},
};

/// One row of an agent's timeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentDayRecord {
    pub agent_id: usize,
    pub age_group: AgeGroup,
    pub country: Arc<str>,
    pub date: NaiveDate,
    pub state: DiseaseState,
    pub days_in_state: u32,
    pub previous_state: Option<DiseaseState>,
}

impl AgentDayRecord {
    /// Whether the agent moved into `state` on this day.
    #[must_use]
    pub fn is_transition(&self) -> bool {
        self.days_in_state == 0 && self.previous_state.is_some()
    }
}

/// The mutable part of an agent during a simulation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AgentState {
    pub current: DiseaseState,
    pub days_in_state: u32,
    /// The state occupied just before the most recent transition.
    pub previous: Option<DiseaseState>,
}

impl Default for AgentState {
    fn default() -> Self {
        AgentState {
            current: DiseaseState::Healthy,
            days_in_state: 0,
            previous: None,
        }
    }
}

impl AgentState {
    /// Once the holding time is reached, draws a candidate next state. Drawing the current
    /// state leaves `days_in_state` untouched, so the draw is retried every following day.
    /// Returns whether the state changed.
    /// # Errors
    /// - `UnknownAgeGroupOrState` if the tables have no entry for the current state.
    pub fn try_transition<R: Rng + ?Sized>(
        &mut self,
        age_group: AgeGroup,
        tables: &ParameterTables,
        rng: &mut R,
    ) -> Result<bool, EpiError> {
        let holding_time = tables.holding_time(age_group, self.current)?;
        let distribution = tables.transition(age_group, self.current)?;
        if self.days_in_state < holding_time {
            return Ok(false);
        }
        let next = distribution.sample(rng);
        if next == self.current {
            return Ok(false);
        }
        self.previous = Some(self.current);
        self.current = next;
        self.days_in_state = 0;
        Ok(true)
    }

    pub fn end_day(&mut self) {
        self.days_in_state = self.days_in_state.saturating_add(1);
    }
}

/// # Errors
/// - `InvalidDateRange` if `end` precedes `start`.
pub fn validate_date_range(start: NaiveDate, end: NaiveDate) -> Result<(), EpiError> {
    if end < start {
        return Err(EpiError::InvalidDateRange { start, end });
    }
    Ok(())
}

/// Number of days in the inclusive range.
#[must_use]
pub fn days_in_range(start: NaiveDate, end: NaiveDate) -> usize {
    usize::try_from(end.signed_duration_since(start).num_days() + 1).unwrap_or(0)
}

/// Runs one agent from `start` to `end` inclusive, starting out healthy, and returns one
/// record per day.
/// # Errors
/// - `InvalidDateRange` if `end` precedes `start`.
/// - `UnknownAgeGroupOrState` if the agent reaches a state the tables do not cover.
pub fn simulate_agent<R: Rng + ?Sized>(
    agent: &Agent,
    start: NaiveDate,
    end: NaiveDate,
    tables: &ParameterTables,
    rng: &mut R,
) -> Result<Vec<AgentDayRecord>, EpiError> {
    validate_date_range(start, end)?;
    let mut timeline = Vec::with_capacity(days_in_range(start, end));
    let mut state = AgentState::default();

    for date in start.iter_days().take_while(|date| *date <= end) {
        if state.try_transition(agent.age_group, tables, rng)? {
            trace!(
                "Agent {}: {:?} -> {} on {date}",
                agent.id,
                state.previous,
                state.current
            );
        }
        timeline.push(AgentDayRecord {
            agent_id: agent.id,
            age_group: agent.age_group,
            country: Arc::clone(&agent.country),
            date,
            state: state.current,
            days_in_state: state.days_in_state,
            previous_state: state.previous,
        });
        state.end_day();
    }

    Ok(timeline)
}

#[cfg(test)]
mod test {
    use std::{collections::BTreeMap, sync::Arc};

    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand_xoshiro::Xoshiro256PlusPlus;

    use super::{simulate_agent, AgentDayRecord, AgentState};
    use crate::{
        disease_parameters::{DiseaseParametersConfig, DiseaseState, ParameterTables},
        error::EpiError,
        population_loader::{AgeGroup, Agent},
    };

    const AGE_GROUP: AgeGroup = AgeGroup::From25To64;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn agent() -> Agent {
        Agent {
            id: 3,
            age_group: AGE_GROUP,
            country: Arc::from("Freedonia"),
        }
    }

    fn tables(
        holding_times: &[(DiseaseState, u32)],
        transitions: &[(DiseaseState, &[(DiseaseState, f64)])],
    ) -> ParameterTables {
        let mut config = DiseaseParametersConfig::default();
        config
            .holding_times
            .insert(AGE_GROUP, holding_times.iter().copied().collect());
        config.transition_probabilities.insert(
            AGE_GROUP,
            transitions
                .iter()
                .map(|(state, weights)| (*state, weights.iter().copied().collect()))
                .collect::<BTreeMap<_, BTreeMap<_, _>>>(),
        );
        ParameterTables::new(&config).unwrap()
    }

    /// Healthy for exactly 2 days, infected for exactly 3, then healthy again.
    fn cycling_tables() -> ParameterTables {
        tables(
            &[(DiseaseState::Healthy, 2), (DiseaseState::Infected, 3)],
            &[
                (DiseaseState::Healthy, &[(DiseaseState::Infected, 1.0)]),
                (DiseaseState::Infected, &[(DiseaseState::Healthy, 1.0)]),
            ],
        )
    }

    fn summary(timeline: &[AgentDayRecord]) -> Vec<(DiseaseState, u32, Option<DiseaseState>)> {
        timeline
            .iter()
            .map(|r| (r.state, r.days_in_state, r.previous_state))
            .collect()
    }

    #[test]
    fn test_single_day() {
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let day = date(2021, 4, 1);
        let timeline = simulate_agent(&agent(), day, day, &tables, &mut rng).unwrap();
        assert_eq!(
            timeline,
            vec![AgentDayRecord {
                agent_id: 3,
                age_group: AGE_GROUP,
                country: Arc::from("Freedonia"),
                date: day,
                state: DiseaseState::Healthy,
                days_in_state: 0,
                previous_state: None,
            }]
        );
    }

    #[test]
    fn test_single_day_zero_holding_time() {
        let tables = tables(
            &[(DiseaseState::Healthy, 0), (DiseaseState::Infected, 3)],
            &[
                (DiseaseState::Healthy, &[(DiseaseState::Infected, 1.0)]),
                (DiseaseState::Infected, &[(DiseaseState::Infected, 1.0)]),
            ],
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let day = date(2021, 4, 1);
        let timeline = simulate_agent(&agent(), day, day, &tables, &mut rng).unwrap();
        assert_eq!(
            summary(&timeline),
            vec![(DiseaseState::Infected, 0, Some(DiseaseState::Healthy))]
        );
        assert!(timeline[0].is_transition());
    }

    #[test]
    fn test_holding_times_and_previous_state() {
        use DiseaseState::{Healthy as H, Infected as I};
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let timeline =
            simulate_agent(&agent(), date(2021, 4, 1), date(2021, 4, 9), &tables, &mut rng)
                .unwrap();
        assert_eq!(
            summary(&timeline),
            vec![
                (H, 0, None),
                (H, 1, None),
                (I, 0, Some(H)),
                (I, 1, Some(H)),
                (I, 2, Some(H)),
                (H, 0, Some(I)),
                (H, 1, Some(I)),
                (I, 0, Some(H)),
                (I, 1, Some(H)),
            ]
        );
    }

    #[test]
    fn test_dates_cover_range_in_order() {
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        // Crosses a month boundary and a leap day.
        let start = date(2024, 2, 27);
        let end = date(2024, 3, 2);
        let timeline = simulate_agent(&agent(), start, end, &tables, &mut rng).unwrap();
        let dates: Vec<NaiveDate> = timeline.iter().map(|r| r.date).collect();
        assert_eq!(
            dates,
            vec![
                date(2024, 2, 27),
                date(2024, 2, 28),
                date(2024, 2, 29),
                date(2024, 3, 1),
                date(2024, 3, 2),
            ]
        );
        assert!(timeline.iter().all(|r| r.agent_id == 3));
    }

    #[test]
    fn test_self_transition_keeps_counting() {
        let tables = tables(
            &[(DiseaseState::Healthy, 1)],
            &[(DiseaseState::Healthy, &[(DiseaseState::Healthy, 1.0)])],
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let timeline =
            simulate_agent(&agent(), date(2021, 4, 1), date(2021, 4, 6), &tables, &mut rng)
                .unwrap();
        let days: Vec<u32> = timeline.iter().map(|r| r.days_in_state).collect();
        assert_eq!(days, vec![0, 1, 2, 3, 4, 5]);
        assert!(timeline.iter().all(|r| r.previous_state.is_none()));
    }

    #[test]
    fn test_check_is_retried_every_day() {
        // With a holding time of zero and an even split, the first transition day is
        // geometric: half of the agents leave on day 0, a quarter on day 1, and so on.
        let tables = tables(
            &[(DiseaseState::Healthy, 0), (DiseaseState::Infected, 1000)],
            &[
                (
                    DiseaseState::Healthy,
                    &[(DiseaseState::Healthy, 0.5), (DiseaseState::Infected, 0.5)],
                ),
                (DiseaseState::Infected, &[(DiseaseState::Infected, 1.0)]),
            ],
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(11);
        let n = 20_000;
        let mut first_day_counts = [0usize; 4];
        for _ in 0..n {
            let timeline =
                simulate_agent(&agent(), date(2021, 4, 1), date(2021, 4, 4), &tables, &mut rng)
                    .unwrap();
            if let Some(day) = timeline.iter().position(AgentDayRecord::is_transition) {
                first_day_counts[day] += 1;
            }
        }
        let expected = [0.5, 0.25, 0.125, 0.0625];
        for (count, p) in first_day_counts.iter().zip(expected) {
            #[allow(clippy::cast_precision_loss)]
            let fraction = *count as f64 / f64::from(n);
            assert!((fraction - p).abs() < 0.015, "{first_day_counts:?}");
        }
    }

    #[test]
    fn test_invalid_date_range() {
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let e = simulate_agent(&agent(), date(2021, 4, 2), date(2021, 4, 1), &tables, &mut rng);
        assert!(matches!(e, Err(EpiError::InvalidDateRange { .. })));
    }

    #[test]
    fn test_unknown_age_group() {
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut child = agent();
        child.age_group = AgeGroup::Under5;
        let e = simulate_agent(&child, date(2021, 4, 1), date(2021, 4, 2), &tables, &mut rng);
        assert!(matches!(
            e,
            Err(EpiError::UnknownAgeGroupOrState {
                age_group: AgeGroup::Under5,
                state: DiseaseState::Healthy
            })
        ));
    }

    #[test]
    fn test_unknown_state_reached_mid_run() {
        let tables = tables(
            &[(DiseaseState::Healthy, 1)],
            &[(DiseaseState::Healthy, &[(DiseaseState::Severe, 1.0)])],
        );
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let e = simulate_agent(&agent(), date(2021, 4, 1), date(2021, 4, 5), &tables, &mut rng);
        assert!(matches!(
            e,
            Err(EpiError::UnknownAgeGroupOrState {
                state: DiseaseState::Severe,
                ..
            })
        ));
    }

    #[test]
    fn test_same_seed_same_timeline() {
        let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
            .join("input/disease_parameters.json");
        let tables = ParameterTables::from_json_file(&path).unwrap();
        let run = |seed| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
            simulate_agent(&agent(), date(2021, 4, 1), date(2022, 4, 30), &tables, &mut rng)
                .unwrap()
        };
        assert_eq!(run(5), run(5));
    }

    #[test]
    fn test_agent_state_transition() {
        let tables = cycling_tables();
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(0);
        let mut state = AgentState {
            current: DiseaseState::Infected,
            days_in_state: 2,
            previous: Some(DiseaseState::Healthy),
        };
        assert!(!state.try_transition(AGE_GROUP, &tables, &mut rng).unwrap());
        state.end_day();
        assert!(state.try_transition(AGE_GROUP, &tables, &mut rng).unwrap());
        assert_eq!(
            state,
            AgentState {
                current: DiseaseState::Healthy,
                days_in_state: 0,
                previous: Some(DiseaseState::Infected),
            }
        );
    }
}
