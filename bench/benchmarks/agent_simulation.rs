use std::{path::Path, sync::Arc};

use chrono::NaiveDate;
use criterion::Criterion;
use epi_census::{
    reports::summary_report::summarize, run_simulation, simulate_agent, AgeGroup, Agent,
    ParameterTables, SimulationOptions,
};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::hint::black_box;

fn tables() -> ParameterTables {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("input/disease_parameters.json");
    ParameterTables::from_json_file(&path).expect("Valid disease parameters")
}

fn population(n: usize) -> Vec<Agent> {
    let country: Arc<str> = Arc::from("Sweden");
    (0..n)
        .map(|id| Agent {
            id,
            age_group: AgeGroup::ALL[id % AgeGroup::COUNT],
            country: Arc::clone(&country),
        })
        .collect()
}

fn date_range() -> (NaiveDate, NaiveDate) {
    (
        NaiveDate::from_ymd_opt(2021, 4, 1).expect("Valid start date"),
        NaiveDate::from_ymd_opt(2022, 4, 30).expect("Valid end date"),
    )
}

pub fn simulate_agent_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("agent_simulator::simulate_agent");
    let tables = tables();
    let (start, end) = date_range();

    for age_group in [AgeGroup::Under5, AgeGroup::Over65] {
        let agent = Agent {
            id: 0,
            age_group,
            country: Arc::from("Sweden"),
        };
        group.bench_function(format!("one_year_{age_group}"), |b| {
            let mut rng = Xoshiro256PlusPlus::seed_from_u64(42);
            b.iter(|| {
                black_box(simulate_agent(black_box(&agent), start, end, &tables, &mut rng))
            });
        });
    }
    group.finish();
}

pub fn summarize_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("summary_report::summarize");
    let tables = tables();
    let (start, end) = date_range();
    let timeline = run_simulation(
        &population(1_000),
        start,
        end,
        &tables,
        &SimulationOptions::default(),
    )
    .expect("Simulation succeeds");

    group.bench_function("thousand_agents_one_year", |b| {
        b.iter(|| black_box(summarize(black_box(&timeline))));
    });
    group.finish();
}
