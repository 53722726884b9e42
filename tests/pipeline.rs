use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use epi_census::{
    error::EpiError,
    parameters::Params,
    pipeline::{run, run_with_cancellation},
    reports::ReportOptions,
};
use tempfile::tempdir;

fn input_path(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("input").join(name)
}

fn sweden_params(days: u32) -> Params {
    Params {
        seed: 7,
        countries_file: input_path("countries.csv"),
        disease_parameters_file: input_path("disease_parameters.json"),
        countries: vec!["Sweden".to_string()],
        sample_ratio: 100_000.0,
        start_date: NaiveDate::from_ymd_opt(2021, 4, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2021, 4, days).unwrap(),
        chunk_size: 16,
        timeline_report_name: "timeline.csv".to_string(),
        summary_report_name: "summary.csv".to_string(),
        profiling_data_path: None,
    }
}

#[test]
fn test_run_writes_consistent_reports() {
    let dir = tempdir().unwrap();
    let options = ReportOptions::new(dir.path());
    let summary = run(&sweden_params(10), &options).unwrap();

    // 10,099,270 / 100,000 = 100 people split 5.8/11.6/11.0/51.3/20.3 percent.
    assert_eq!(summary.agents, 5 + 11 + 11 + 51 + 20);
    assert_eq!(summary.timeline_records, summary.agents * 10);
    assert_eq!(summary.summary_rows, 10);

    let timeline = std::fs::read_to_string(&summary.timeline_report).unwrap();
    assert_eq!(timeline.lines().count(), summary.timeline_records + 1);

    let mut reader = csv::Reader::from_path(&summary.summary_report).unwrap();
    let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
    assert_eq!(headers, vec!["date", "country", "H", "I", "S", "M", "D"]);
    for row in reader.records() {
        let row = row.unwrap();
        assert_eq!(&row[1], "Sweden");
        let total: usize = (2..7).map(|i| row[i].parse::<usize>().unwrap()).sum();
        assert_eq!(total, summary.agents);
    }
}

#[test]
fn test_unknown_country_writes_nothing() {
    let dir = tempdir().unwrap();
    let output = dir.path().join("out");
    let params = Params {
        countries: vec!["Sweden".to_string(), "Atlantis".to_string()],
        ..sweden_params(10)
    };
    let result = run(&params, &ReportOptions::new(&output));
    match result {
        Err(EpiError::UnknownCountry(country)) => assert_eq!(country, "Atlantis"),
        Err(ue) => panic!("Expected an unknown country error. Instead got {:?}", ue.to_string()),
        Ok(_) => panic!("Expected an error. Instead, the run succeeded."),
    }
    assert!(!output.exists());
}

#[test]
fn test_same_seed_same_reports() {
    let first = tempdir().unwrap();
    let second = tempdir().unwrap();
    let params = sweden_params(30);
    let a = run(&params, &ReportOptions::new(first.path())).unwrap();
    let b = run(&params, &ReportOptions::new(second.path())).unwrap();
    assert_eq!(
        std::fs::read(a.timeline_report).unwrap(),
        std::fs::read(b.timeline_report).unwrap()
    );
    assert_eq!(
        std::fs::read(a.summary_report).unwrap(),
        std::fs::read(b.summary_report).unwrap()
    );
}

#[test]
fn test_single_day_has_one_record_per_agent() {
    let dir = tempdir().unwrap();
    let summary = run(&sweden_params(1), &ReportOptions::new(dir.path())).unwrap();
    assert_eq!(summary.timeline_records, summary.agents);
    assert_eq!(summary.summary_rows, 1);
}

#[test]
fn test_existing_reports_need_overwrite() {
    let dir = tempdir().unwrap();
    let params = sweden_params(2);
    run(&params, &ReportOptions::new(dir.path())).unwrap();

    match run(&params, &ReportOptions::new(dir.path())) {
        Err(EpiError::OutputExists(path)) => assert!(path.ends_with("timeline.csv")),
        Err(ue) => panic!("Expected an output exists error. Instead got {:?}", ue.to_string()),
        Ok(_) => panic!("Expected an error. Instead, the run succeeded."),
    }
    assert!(run(&params, &ReportOptions::new(dir.path()).overwrite(true)).is_ok());
}

#[test]
fn test_colliding_report_names_write_nothing() {
    let dir = tempdir().unwrap();
    let params = Params {
        timeline_report_name: "out.csv".to_string(),
        summary_report_name: "out.csv".to_string(),
        ..sweden_params(3)
    };
    for overwrite in [false, true] {
        let result = run(&params, &ReportOptions::new(dir.path()).overwrite(overwrite));
        assert!(matches!(result, Err(EpiError::ConfigurationError(_))));
    }
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_cancelled_run_writes_nothing() {
    let dir = tempdir().unwrap();
    let cancel = std::sync::atomic::AtomicBool::new(true);
    let result = run_with_cancellation(&sweden_params(5), &ReportOptions::new(dir.path()), &cancel);
    assert!(matches!(result, Err(EpiError::Cancelled)));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[cfg(feature = "profiling")]
#[test]
fn test_profiling_data_is_written_to_output_directory() {
    let dir = tempdir().unwrap();
    let params = Params {
        profiling_data_path: Some(PathBuf::from("profiling.json")),
        ..sweden_params(3)
    };
    let summary = run(&params, &ReportOptions::new(dir.path())).unwrap();
    let path = summary.profiling_data.unwrap();
    assert_eq!(path, dir.path().join("profiling.json"));
    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
    assert!(json["named_spans_data"].is_array());
}

#[test]
fn test_existing_profiling_data_needs_overwrite() {
    let dir = tempdir().unwrap();
    let profiling = dir.path().join("profiling.json");
    std::fs::write(&profiling, "{}").unwrap();
    let params = Params {
        profiling_data_path: Some(PathBuf::from("profiling.json")),
        ..sweden_params(3)
    };

    match run(&params, &ReportOptions::new(dir.path())) {
        Err(EpiError::OutputExists(path)) => assert_eq!(path, profiling),
        Err(ue) => panic!("Expected an output exists error. Instead got {:?}", ue.to_string()),
        Ok(_) => panic!("Expected an error. Instead, the run succeeded."),
    }
    assert!(!dir.path().join("timeline.csv").exists());
    assert_eq!(std::fs::read_to_string(&profiling).unwrap(), "{}");

    assert!(run(&params, &ReportOptions::new(dir.path()).overwrite(true)).is_ok());
}
