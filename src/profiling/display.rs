#[cfg(feature = "profiling")]
use super::{
    profiling_data, ProfilingDataContainer, AGENT_SIMULATED_LABEL, NAMED_COUNTS_HEADERS,
    NAMED_SPANS_HEADERS, TRANSITION_LABEL,
};
#[cfg(feature = "profiling")]
use humantime::format_duration;

/// Prints spans, counts, and the transitions-per-agent statistic to stdout.
#[cfg(feature = "profiling")]
pub fn print_profiling_data() {
    let container = profiling_data();
    if container.start_time.is_none() {
        return;
    }
    print_named_spans(&container);
    println!();
    print_named_counts(&container);
    print_transitions_per_agent(&container);
}

#[cfg(not(feature = "profiling"))]
pub fn print_profiling_data() {}

#[cfg(feature = "profiling")]
fn print_named_spans(container: &ProfilingDataContainer) {
    let rows: Vec<(String, usize, String, f64)> = container
        .get_named_spans_table()
        .into_iter()
        .map(|(label, count, duration, percent)| {
            (label, count, format_duration(duration).to_string(), percent)
        })
        .collect();
    if rows.is_empty() {
        return;
    }
    let label_width = rows
        .iter()
        .map(|row| row.0.len())
        .chain(std::iter::once(NAMED_SPANS_HEADERS[0].len()))
        .max()
        .unwrap_or_default();
    let duration_width = rows
        .iter()
        .map(|row| row.2.len())
        .chain(std::iter::once(NAMED_SPANS_HEADERS[2].len()))
        .max()
        .unwrap_or_default();

    let header = format!(
        "{:<label_width$} {:>8} {:>duration_width$} {:>10}",
        NAMED_SPANS_HEADERS[0], NAMED_SPANS_HEADERS[1], NAMED_SPANS_HEADERS[2],
        NAMED_SPANS_HEADERS[3],
    );
    println!("{header}");
    println!("{}", "-".repeat(header.len()));
    for (label, count, duration, percent) in rows {
        println!("{label:<label_width$} {count:>8} {duration:>duration_width$} {percent:>9.2}%");
    }
}

#[cfg(feature = "profiling")]
fn print_named_counts(container: &ProfilingDataContainer) {
    let rows = container.get_named_counts_table();
    if rows.is_empty() {
        return;
    }
    let label_width = rows
        .iter()
        .map(|row| row.0.len())
        .chain(std::iter::once(NAMED_COUNTS_HEADERS[0].len()))
        .max()
        .unwrap_or_default();

    let header = format!(
        "{:<label_width$} {:>10} {:>15}",
        NAMED_COUNTS_HEADERS[0], NAMED_COUNTS_HEADERS[1], NAMED_COUNTS_HEADERS[2],
    );
    println!("{header}");
    println!("{}", "-".repeat(header.len()));
    for (label, count, rate) in rows {
        println!("{label:<label_width$} {count:>10} {rate:>15.2}");
    }
}

#[cfg(feature = "profiling")]
fn print_transitions_per_agent(container: &ProfilingDataContainer) {
    if let Some(mean) = transitions_per_agent(container) {
        println!(
            "\nTransitions per agent: {mean:.2} ({} transitions across {} agents)",
            container.get_named_count(TRANSITION_LABEL).unwrap_or_default(),
            container.get_named_count(AGENT_SIMULATED_LABEL).unwrap_or_default()
        );
    }
}

#[cfg(feature = "profiling")]
pub(super) fn transitions_per_agent(container: &ProfilingDataContainer) -> Option<f64> {
    match (
        container.get_named_count(TRANSITION_LABEL),
        container.get_named_count(AGENT_SIMULATED_LABEL),
    ) {
        (Some(transitions), Some(agents)) if agents > 0 => {
            #[allow(clippy::cast_precision_loss)]
            let mean = transitions as f64 / agents as f64;
            Some(mean)
        }
        _ => None,
    }
}
