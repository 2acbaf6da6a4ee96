// src/batch/tests.rs

use super::*;
use crate::cost_model::WorkerId;
use crate::testing::SequenceModel;
use anyhow::Result;
use std::collections::HashSet;
use test_log::test;

const SEED: u64 = 0xC0FFEE;

fn oracle() -> OracleCost {
    OracleCost::new(vec![2.0, 1.0]).unwrap()
}

#[test]
fn it_should_name_files_by_index() {
    assert_eq!(file_name_for(0), "data_0.jsonl");
    assert_eq!(file_name_for(42), "data_42.jsonl");

    let names: HashSet<String> = (0..1000).map(file_name_for).collect();
    assert_eq!(names.len(), 1000);
}

#[test]
fn it_should_derive_distinct_seeds_per_file() {
    let seeds: HashSet<u64> = (0..1000).map(|i| file_seed(SEED, i)).collect();
    assert_eq!(seeds.len(), 1000);
    assert_eq!(file_seed(SEED, 7), file_seed(SEED, 7));
    assert_ne!(file_seed(SEED, 7), file_seed(SEED + 1, 7));
}

#[test]
fn it_should_write_exactly_samples_per_file_records_in_sampling_order() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let model = SequenceModel;
    let oracle = oracle();
    let writer = BatchWriter::new(&model, &oracle, Metric::Raw, dir.path(), 5, SEED);
    let mut worker = Worker::new(WorkerId(0), 0);

    let report = writer.write_batch(3, &mut worker)?;
    assert_eq!(report.index, 3);
    assert_eq!(report.records, 5);
    assert_eq!(report.path, dir.path().join("data_3.jsonl"));
    assert!(!dir.path().join("data_3.jsonl.tmp").exists());

    // Replay the same stream by hand.
    let mut replay = Worker::new(WorkerId(9), 0);
    replay.reseed(file_seed(SEED, 3));
    let mut expected = Vec::new();
    let mut failures = 0;
    while expected.len() < 5 {
        match model.map_cost(Metric::Raw, &mut replay) {
            Ok((x, _)) => expected.push(x as f32),
            Err(_) => failures += 1,
        }
    }

    let records = read_records(&report.path)?;
    assert_eq!(records.len(), 5);
    let inputs: Vec<f32> = records.iter().map(|r| r.input[0]).collect();
    assert_eq!(inputs, expected);
    for record in &records {
        let x = record.input[0] as f64;
        assert_eq!(record.cost, vec![x, x]);
    }
    assert_eq!(report.sample_failures, failures);
    Ok(())
}

#[test]
fn it_should_produce_identical_files_for_the_same_index_on_any_worker() -> Result<()> {
    let a = tempfile::tempdir()?;
    let b = tempfile::tempdir()?;
    let model = SequenceModel;
    let oracle = oracle();

    let first = BatchWriter::new(&model, &oracle, Metric::Raw, a.path(), 8, SEED)
        .write_batch(1, &mut Worker::new(WorkerId(0), 123))?;
    let second = BatchWriter::new(&model, &oracle, Metric::Raw, b.path(), 8, SEED)
        .write_batch(1, &mut Worker::new(WorkerId(5), 456))?;

    assert_eq!(fs::read(&first.path)?, fs::read(&second.path)?);
    Ok(())
}

#[test]
fn it_should_fail_the_batch_when_the_directory_is_missing() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let missing = dir.path().join("not-created");
    let model = SequenceModel;
    let oracle = oracle();
    let writer = BatchWriter::new(&model, &oracle, Metric::Raw, &missing, 2, SEED);

    let err = writer.write_batch(0, &mut Worker::new(WorkerId(0), 0)).unwrap_err();
    assert!(matches!(err, DataGenError::Io { .. }));
    Ok(())
}

#[test]
fn it_should_fail_the_batch_when_cost_and_oracle_lengths_differ() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let model = SequenceModel;
    let oracle = OracleCost::new(vec![1.0, 1.0, 1.0])?;
    let writer = BatchWriter::new(&model, &oracle, Metric::Raw, dir.path(), 2, SEED);

    let err = writer.write_batch(0, &mut Worker::new(WorkerId(0), 0)).unwrap_err();
    assert!(matches!(err, DataGenError::CostLengthMismatch { expected: 3, actual: 2 }));
    assert!(!dir.path().join(file_name_for(0)).exists());
    Ok(())
}
