use criterion::{criterion_group, criterion_main};

mod benchmarks;
use benchmarks::agent_simulation::{simulate_agent_benchmarks, summarize_benchmarks};

criterion_group!(
    simulation_benches,
    simulate_agent_benchmarks,
    summarize_benchmarks,
);

criterion_main!(simulation_benches);
