use std::io::{BufRead, BufReader, Write};
use std::path::Path;

use hashbrown::HashMap;
use proptest::prelude::*;
use tempfile::NamedTempFile;

use station_stats::{run, run_file, ParseError, PipelineConfig, PipelineError, Report, Tenths};

struct Data {
    min: f64,
    max: f64,
    sum: f64,
    count: u64,
}

/// Line-at-a-time aggregation used as the expected result.
fn reference(input: &[u8]) -> HashMap<String, Data> {
    let mut result: HashMap<String, Data> = HashMap::new();
    for line in BufReader::new(input).lines() {
        let line = line.unwrap();
        let (key, value) = line.split_once(';').unwrap();
        let value = fast_float::parse::<f64, _>(value).unwrap();
        result
            .entry(key.to_string())
            .and_modify(|e| {
                e.min = e.min.min(value);
                e.max = e.max.max(value);
                e.sum += value;
                e.count += 1;
            })
            .or_insert_with(|| Data {
                min: value,
                max: value,
                sum: value,
                count: 1,
            });
    }
    result
}

fn config(block_size: usize, workers: usize) -> PipelineConfig {
    PipelineConfig {
        block_size,
        workers,
        block_queue_capacity: 4,
        unit_queue_capacity: 4,
    }
}

fn write_file(contents: &[u8]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents).unwrap();
    file.flush().unwrap();
    file
}

fn aggregate_file(contents: &[u8]) -> String {
    let file = write_file(contents);
    run_file(file.path(), &PipelineConfig::default())
        .unwrap()
        .report
        .to_string()
}

fn render(records: &[(usize, i64)]) -> Vec<u8> {
    const NAMES: [&str; 8] = [
        "Abha", "Abidjan", "Zürich", "St. John's", "Ürümqi", "Las Palmas de Gran Canaria", "A", "a",
    ];
    let mut out = String::new();
    for (name, tenths) in records {
        let sign = if *tenths < 0 { "-" } else { "" };
        let abs = tenths.unsigned_abs();
        out.push_str(&format!("{};{}{}.{}\n", NAMES[*name], sign, abs / 10, abs % 10));
    }
    out.into_bytes()
}

fn as_f64(tenths: Tenths) -> f64 {
    tenths.0 as f64 / 10.0
}

fn assert_matches_reference(report: &Report, input: &[u8]) {
    let expected = reference(input);
    assert_eq!(report.len(), expected.len());
    for station in report.stations() {
        let data = &expected[&station.name.to_string()];
        assert_eq!(as_f64(station.min), data.min);
        assert_eq!(as_f64(station.max), data.max);
        let mean = data.sum / data.count as f64;
        assert!((as_f64(station.mean) - mean).abs() <= 0.05 + 1e-9);
    }
}

#[test]
fn example_file() {
    assert_eq!(
        aggregate_file(b"Hamburg;12.0\nBerlin;-3.5\nHamburg;8.0\n"),
        "{Berlin=-3.5/-3.5/-3.5, Hamburg=8.0/10.0/12.0}"
    );
}

#[test]
fn file_without_trailing_newline() {
    assert_eq!(aggregate_file(b"Paris;20.0"), "{Paris=20.0/20.0/20.0}");
}

#[test]
fn empty_file() {
    assert_eq!(aggregate_file(b""), "{}");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("measurements.txt");
    let err = run_file(&path, &PipelineConfig::default()).unwrap_err();
    assert!(matches!(err, PipelineError::Open { ref path, .. } if path.ends_with("measurements.txt")));
}

#[test]
fn invalid_config_is_reported_before_opening() {
    let err = run_file(Path::new("/nonexistent/measurements.txt"), &config(1, 0)).unwrap_err();
    assert!(matches!(err, PipelineError::Config(_)));
}

#[test]
fn malformed_file_produces_no_report() {
    let file = write_file(b"Hamburg;12.0\nBerlin;-3.5x\n");
    let err = run_file(file.path(), &config(8, 2)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Parse(ParseError::UnexpectedByte { byte: b'x', .. })
    ));
}

#[test]
fn overflowing_sum_produces_no_report() {
    let file = write_file(b"Vostok;922337203685477580.7\nVostok;0.1\n");
    let err = run_file(file.path(), &config(1 << 16, 1)).unwrap_err();
    assert!(matches!(
        err,
        PipelineError::Parse(ParseError::ValueOutOfRange { ref line }) if line == "Vostok;0.1"
    ));
}

#[test]
fn large_file_matches_reference() {
    let records = (0..50_000)
        .map(|i: i64| ((i as usize * 7) % 8, (i * 37) % 1999 - 999))
        .collect::<Vec<_>>();
    let input = render(&records);
    let file = write_file(&input);
    let summary = run_file(file.path(), &config(4096, 8)).unwrap();

    assert_eq!(summary.stats.records, records.len() as u64);
    assert_eq!(summary.stats.bytes, input.len() as u64);
    assert_matches_reference(&summary.report, &input);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn block_size_does_not_change_result(
        records in proptest::collection::vec((0usize..8, -999i64..=999), 0..300),
        block_size in 1usize..97,
        workers in 1usize..6,
    ) {
        let input = render(&records);
        let whole = run(&input[..], &config(input.len().max(1), 1)).unwrap();
        let chunked = run(&input[..], &config(block_size, workers)).unwrap();

        prop_assert_eq!(&whole.report, &chunked.report);
        prop_assert_eq!(chunked.stats.records, records.len() as u64);

        let names = chunked.report.stations().iter().map(|s| s.name).collect::<Vec<_>>();
        prop_assert!(names.windows(2).all(|w| w[0] < w[1]));
        for s in chunked.report.stations() {
            prop_assert!(s.min <= s.mean && s.mean <= s.max);
        }
        assert_matches_reference(&chunked.report, &input);
    }
}
