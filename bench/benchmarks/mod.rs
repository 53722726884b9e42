pub mod agent_simulation;
