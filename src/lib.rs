pub mod agent_simulator;
pub mod disease_parameters;
pub mod error;
pub mod parameters;
pub mod pipeline;
pub mod population_loader;
pub mod profiling;
pub mod reports;
pub mod simulation_driver;

// Re-export commonly used types at the crate root
pub use agent_simulator::{simulate_agent, AgentDayRecord};
pub use disease_parameters::{DiseaseState, ParameterTables};
pub use error::EpiError;
pub use parameters::Params;
pub use population_loader::{sample_population, AgeGroup, Agent};
pub use reports::{summary_report::SummaryRow, ReportOptions};
pub use simulation_driver::{run_simulation, SimulationOptions};
