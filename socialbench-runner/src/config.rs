/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{path::PathBuf, time::Duration};

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::snapshot::{RunLabels, SnapshotError};

/// How memory is sampled at the end of every phase.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemorySampling {
    /// Return free heap pages to the OS, then read the resident set size.
    #[default]
    Trim,
    /// Read the resident set size as is.
    Resident,
}

/// Options for a single benchmark run.
///
/// Every option can also be supplied through the environment variable named after it,
/// matching the way the benchmark harness hands options to each tool.
#[derive(Debug, Clone, Args, Serialize)]
pub struct RunConfig {
    /// Registered tool (backend) to benchmark.
    #[arg(long, env = "Tool")]
    pub tool: String,

    /// Directory holding the baseline files and the `changeNN.csv` batches.
    #[arg(long = "change-path", env = "ChangePath")]
    pub change_path: PathBuf,

    /// Label of the dataset variant. Rendered as an empty field when absent.
    #[arg(long = "change-set", env = "ChangeSet")]
    pub change_set: Option<String>,

    /// Query to evaluate (for example `Q1` or `Q2`).
    #[arg(long, env = "Query")]
    pub query: String,

    /// Repetition id of this run.
    #[arg(long = "run-index", env = "RunIndex")]
    pub run_index: u64,

    /// Number of change batches to apply after the initial query.
    #[arg(long, env = "Sequences")]
    pub sequences: usize,

    /// Memory sampling policy used at the end of every phase.
    #[arg(
        long = "memory-sampling",
        env = "MemorySampling",
        value_enum,
        default_value_t = MemorySampling::Trim
    )]
    pub memory_sampling: MemorySampling,

    /// Upper bound on how long a backend may take to settle after a batch. Unbounded if
    /// not given.
    #[arg(long = "settle-timeout-ms", env = "SettleTimeoutMs")]
    pub settle_timeout_ms: Option<u64>,

    /// Optional JSON file that receives every snapshot as the run progresses.
    #[arg(long = "output-file", env = "OutputFile")]
    pub output_file: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("change path {0:?} is not a directory")]
    NotADirectory(PathBuf),
    #[error("settle timeout must be positive")]
    ZeroTimeout,
    #[error(transparent)]
    Label(#[from] SnapshotError),
}

impl RunConfig {
    /// The fixed prefix of every metric line produced by this run.
    pub fn labels(&self) -> RunLabels {
        RunLabels {
            tool: self.tool.clone(),
            query: self.query.clone(),
            change_set: self.change_set.clone().filter(|s| !s.is_empty()),
            run_index: self.run_index,
        }
    }

    pub fn settle_timeout(&self) -> Option<Duration> {
        self.settle_timeout_ms.map(Duration::from_millis)
    }

    /// Validate everything that can be validated without touching a backend.
    pub fn check(&self) -> Result<(), ConfigError> {
        self.labels().check()?;
        if !self.change_path.is_dir() {
            return Err(ConfigError::NotADirectory(self.change_path.clone()));
        }
        if self.settle_timeout_ms == Some(0) {
            return Err(ConfigError::ZeroTimeout);
        }
        Ok(())
    }
}

///////////
// Tests //
///////////
