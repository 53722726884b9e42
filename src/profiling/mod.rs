//! This module provides a lightweight profiling interface for simulation runs, tracking
//! event counts and measuring elapsed time for named operations ("spans"). It supports:
//!
//! - **Event counting** – Track how often named events occur during a run.
//! - **Rate calculation** – Compute rates (events per second) since the first count.
//! - **Span timing** – Measure time intervals between span creation and reporting.
//! - **Transition reporting** – Report the mean number of state transitions per agent when
//!   the "agent simulated" and "transition" counts are available.
//!
//! The functionality of this module is gated behind the `profiling` feature, which is enabled by
//! default. Disabling this feature leaves the public API defined but with an empty implementation,
//! which is optimized away by the compiler.
//!
//! ## Example Output
//!
//! ```ignore
//! Span Label                   Count          Duration  % runtime
//! ---------------------------------------------------------------
//! sample population                1            93us       0.01%
//! simulate population              1   612ms 40us 9ns     88.11%
//! summarize                        1    48ms 3us 17ns      6.91%
//! Total Measured                   3  660ms 136us 1ns     95.03%
//!
//! Event Label        Count  Rate (per sec)
//! ----------------------------------------
//! agent simulated      127          182.84
//! transition           402          578.76
//!
//! Transitions per agent: 3.17 (402 transitions across 127 agents)
//! ```
//!
//! ## How to Use
//!
//! Counts are thread safe, but every update takes a lock, so count in bulk from worker
//! threads rather than once per simulated day:
//!
//! ```rust,ignore
//! add_named_count("transition", transitions_in_chunk);
//! ```
//!
//! **Time an operation** using a span, which is closed when dropped:
//!
//! ```rust,ignore
//! fn summarize(records: &[AgentDayRecord]) -> Vec<SummaryRow> {
//!     let _span = open_span("summarize");
//!     // ...
//! }
//! ```
//!
//! **Print all profiling data** after the run with `print_profiling_data()`, or write it to
//! a JSON file with `write_profiling_data_to_file(path)`.

mod data;
mod display;
mod file;

pub use data::*;
pub use display::*;
pub use file::write_profiling_data_to_file;
#[cfg(feature = "profiling")]
use std::time::Instant;

/// The distinguished total measured time label.
#[cfg(feature = "profiling")]
const TOTAL_MEASURED: &str = "Total Measured";
/// Count of agents whose timelines have been produced.
#[cfg(feature = "profiling")]
const AGENT_SIMULATED_LABEL: &str = "agent simulated";
/// Count of state changes across all timelines.
#[cfg(feature = "profiling")]
const TRANSITION_LABEL: &str = "transition";
#[cfg(feature = "profiling")]
const NAMED_SPANS_HEADERS: &[&str] = &["Span Label", "Count", "Duration", "% runtime"];
#[cfg(feature = "profiling")]
const NAMED_COUNTS_HEADERS: &[&str] = &["Event Label", "Count", "Rate (per sec)"];

pub struct Span {
    #[cfg(feature = "profiling")]
    label: &'static str,
    #[cfg(feature = "profiling")]
    start_time: Instant,
}

impl Span {
    fn new(#[allow(unused_variables)] label: &'static str) -> Self {
        Self {
            #[cfg(feature = "profiling")]
            label,
            #[cfg(feature = "profiling")]
            start_time: Instant::now(),
        }
    }
}

#[cfg(feature = "profiling")]
impl Drop for Span {
    fn drop(&mut self) {
        let mut container = profiling_data();
        container.close_span(self);
    }
}
