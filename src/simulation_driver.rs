use std::{
    collections::BTreeSet,
    sync::atomic::{AtomicBool, Ordering},
};

use chrono::NaiveDate;
use log::{debug, info};
use rand::{Rng, SeedableRng};
use rand_xoshiro::Xoshiro256PlusPlus;
use rayon::prelude::*;

use crate::{
    agent_simulator::{days_in_range, simulate_agent, validate_date_range, AgentDayRecord},
    disease_parameters::ParameterTables,
    error::EpiError,
    population_loader::{AgeGroup, Agent},
    profiling::{add_named_count, open_span},
};

/// Agents per RNG stream when none is configured.
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimulationOptions {
    /// Master seed. Every chunk draws from its own stream seeded from this one.
    pub seed: u64,
    /// Number of consecutive agents sharing one RNG stream. Part of what makes a run
    /// reproducible, together with the seed and the population order.
    pub chunk_size: usize,
}

impl Default for SimulationOptions {
    fn default() -> Self {
        SimulationOptions {
            seed: 0,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Checks everything that can be checked before any agent is simulated.
fn validate(
    population: &[Agent],
    start: NaiveDate,
    end: NaiveDate,
    tables: &ParameterTables,
    options: &SimulationOptions,
) -> Result<(), EpiError> {
    validate_date_range(start, end)?;
    if options.chunk_size == 0 {
        return Err(EpiError::ConfigurationError(
            "The simulation chunk size must be positive.".to_string(),
        ));
    }
    let age_groups: BTreeSet<AgeGroup> = population.iter().map(|a| a.age_group).collect();
    for age_group in age_groups {
        tables.validate_reachable(age_group)?;
    }
    Ok(())
}

/// One seed per chunk, drawn from a generator seeded with the master seed, so that
/// neighbouring master seeds do not share chunk streams.
fn chunk_seeds(seed: u64, chunks: usize) -> Vec<u64> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    (0..chunks).map(|_| rng.random()).collect()
}

fn simulate_chunk(
    chunk_index: usize,
    chunk: &[Agent],
    start: NaiveDate,
    end: NaiveDate,
    tables: &ParameterTables,
    chunk_seed: u64,
    cancel: &AtomicBool,
) -> Result<Vec<AgentDayRecord>, EpiError> {
    let mut rng = Xoshiro256PlusPlus::seed_from_u64(chunk_seed);
    let mut records = Vec::with_capacity(chunk.len() * days_in_range(start, end));
    for agent in chunk {
        if cancel.load(Ordering::Relaxed) {
            return Err(EpiError::Cancelled);
        }
        records.extend(simulate_agent(agent, start, end, tables, &mut rng)?);
    }
    let transitions = records.iter().filter(|r| r.is_transition()).count();
    add_named_count("agent simulated", chunk.len());
    add_named_count("transition", transitions);
    debug!(
        "Chunk {chunk_index}: simulated {} agents with {transitions} transitions",
        chunk.len()
    );
    Ok(records)
}

/// Simulates every agent over `start..=end` and concatenates their timelines in population
/// order. The first failing agent fails the whole run.
/// # Errors
/// - `InvalidDateRange`, `ConfigurationError` or `UnknownAgeGroupOrState` from validation,
///   which happens before any agent is simulated.
pub fn run_simulation(
    population: &[Agent],
    start: NaiveDate,
    end: NaiveDate,
    tables: &ParameterTables,
    options: &SimulationOptions,
) -> Result<Vec<AgentDayRecord>, EpiError> {
    run_simulation_with_cancellation(
        population,
        start,
        end,
        tables,
        options,
        &AtomicBool::new(false),
    )
}

/// Like `run_simulation`, but checks `cancel` before each agent. A cancelled run returns
/// `Cancelled`; agents are never left half simulated.
/// # Errors
/// - Any error from `run_simulation`, or `Cancelled`.
pub fn run_simulation_with_cancellation(
    population: &[Agent],
    start: NaiveDate,
    end: NaiveDate,
    tables: &ParameterTables,
    options: &SimulationOptions,
    cancel: &AtomicBool,
) -> Result<Vec<AgentDayRecord>, EpiError> {
    validate(population, start, end, tables, options)?;
    let _span = open_span("simulate population");
    info!(
        "Simulating {} agents from {start} to {end} ({} days)",
        population.len(),
        days_in_range(start, end)
    );

    // Chunking does not depend on the number of threads, so neither does the output.
    let seeds = chunk_seeds(options.seed, population.len().div_ceil(options.chunk_size));
    let chunks = population
        .par_chunks(options.chunk_size)
        .zip(seeds.par_iter())
        .enumerate()
        .map(|(chunk_index, (chunk, &chunk_seed))| {
            simulate_chunk(chunk_index, chunk, start, end, tables, chunk_seed, cancel)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(chunks.into_iter().flatten().collect())
}
