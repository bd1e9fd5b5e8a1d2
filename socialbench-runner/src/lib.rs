/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Measurement plumbing shared by every socialbench tool: metric snapshots, scoped phase
//! timing, the output sink and the command line application.

mod result;

pub mod app;
pub mod config;
pub mod output;
pub mod recorder;
pub mod registry;
pub mod snapshot;
pub mod timer;
pub mod utils;

pub use app::App;
pub use config::{MemorySampling, RunConfig};
pub use output::Output;
pub use recorder::Recorder;
pub use snapshot::{Metric, MetricValue, Phase, RunLabels, Snapshot};
pub use timer::PhaseTimer;
