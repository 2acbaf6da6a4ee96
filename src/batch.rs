// src/batch.rs

//! Batch generation: fills one dataset file with a fixed number of records.
//!
//! Records are collected in memory and written as JSON Lines, one record per
//! line in generation order. The file is first written under a temporary
//! name and renamed into place, so a `data_{i}.jsonl` file is always whole.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use crate::cost_model::{CostModel, Metric, Worker};
use crate::error::{DataGenError, Result};
use crate::record::{OracleCost, Record, RecordBuilder};
use crate::sampler::ResilientSampler;

/// File name of the dataset with the given index.
pub fn file_name_for(index: usize) -> String {
    format!("data_{}.jsonl", index)
}

/// Seed of the sample stream for one file.
///
/// Depends only on the run seed and the file index, so a file's contents do
/// not depend on which worker produced it.
pub fn file_seed(run_seed: u64, index: usize) -> u64 {
    // splitmix64 finalizer
    let mut z = run_seed ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Outcome of one written batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchReport {
    pub index: usize,
    pub path: PathBuf,
    pub records: usize,
    /// Sampling failures absorbed while filling the batch.
    pub sample_failures: usize,
}

pub struct BatchWriter<'a, C: CostModel> {
    model: &'a C,
    oracle: &'a OracleCost,
    metric: Metric,
    output_dir: &'a Path,
    samples_per_file: usize,
    run_seed: u64,
}

impl<'a, C: CostModel> BatchWriter<'a, C> {
    pub fn new(
        model: &'a C,
        oracle: &'a OracleCost,
        metric: Metric,
        output_dir: &'a Path,
        samples_per_file: usize,
        run_seed: u64,
    ) -> Self {
        Self {
            model,
            oracle,
            metric,
            output_dir,
            samples_per_file,
            run_seed,
        }
    }

    pub fn path_for(&self, index: usize) -> PathBuf {
        self.output_dir.join(file_name_for(index))
    }

    /// Generates `samples_per_file` records for `index` and writes them.
    pub fn write_batch(&self, index: usize, worker: &mut Worker) -> Result<BatchReport> {
        worker.reseed(file_seed(self.run_seed, index));
        let sampler = ResilientSampler::new(self.model, self.metric);
        let builder = RecordBuilder::new(self.model, self.oracle);

        let mut records = Vec::with_capacity(self.samples_per_file);
        let mut sample_failures = 0usize;
        for n in 0..self.samples_per_file {
            let sample = sampler.sample(worker);
            sample_failures += sample.failures;
            records.push(builder.build(&sample.mapping, &sample.raw_cost)?);
            log::debug!(
                "{}: {} of {} mappings completed for file {}",
                worker.id(),
                n + 1,
                self.samples_per_file,
                index
            );
        }

        let path = self.path_for(index);
        write_records(&path, &records)?;
        log::info!(
            "{}: wrote {} records to {} ({} failed samples)",
            worker.id(),
            records.len(),
            path.display(),
            sample_failures
        );

        Ok(BatchReport {
            index,
            path,
            records: records.len(),
            sample_failures,
        })
    }
}

/// Writes `records` as JSON Lines, replacing `path` only once fully written.
pub fn write_records(path: &Path, records: &[Record]) -> Result<()> {
    let tmp_path = path.with_extension("jsonl.tmp");
    let file = File::create(&tmp_path).map_err(|e| DataGenError::io(&tmp_path, e))?;
    let mut writer = BufWriter::new(file);
    for record in records {
        serde_json::to_writer(&mut writer, record).map_err(|e| DataGenError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        writer
            .write_all(b"\n")
            .map_err(|e| DataGenError::io(&tmp_path, e))?;
    }
    writer.flush().map_err(|e| DataGenError::io(&tmp_path, e))?;
    drop(writer);
    fs::rename(&tmp_path, path).map_err(|e| DataGenError::io(path, e))
}

/// Reads a dataset file back, in file order.
pub fn read_records(path: &Path) -> Result<Vec<Record>> {
    let file = File::open(path).map_err(|e| DataGenError::io(path, e))?;
    let mut records = Vec::new();
    for line in BufReader::new(file).lines() {
        let line = line.map_err(|e| DataGenError::io(path, e))?;
        if line.trim().is_empty() {
            continue;
        }
        let record = serde_json::from_str(&line).map_err(|e| DataGenError::Serialize {
            path: path.to_path_buf(),
            source: e,
        })?;
        records.push(record);
    }
    Ok(records)
}

#[cfg(test)]
mod tests;
