/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{sync::Once, time::Instant};

use crate::{
    config::MemorySampling,
    recorder::Recorder,
    snapshot::{Metric, Phase},
    utils::NanoSeconds,
};

/// Scoped timing of one phase.
///
/// Ending the timer emits a `Time` snapshot followed by a `Memory` snapshot. This happens
/// exactly once: either through [`PhaseTimer::finish`], or from `Drop` when the phase is
/// left early (an error return or a panic). Phases must not nest: memory sampling may trim
/// the heap, which perturbs the timing of an enclosing phase.
pub struct PhaseTimer<'r, 'a> {
    recorder: &'r mut Recorder<'a>,
    iteration: u64,
    phase: Phase,
    start: Instant,
    finished: bool,
}

impl<'r, 'a> PhaseTimer<'r, 'a> {
    pub fn begin(recorder: &'r mut Recorder<'a>, iteration: u64, phase: Phase) -> Self {
        tracing::debug!(%phase, iteration, "phase started");
        Self {
            recorder,
            iteration,
            phase,
            start: Instant::now(),
            finished: false,
        }
    }

    /// Stop the clock and emit the phase metrics, returning the elapsed time.
    pub fn finish(mut self) -> anyhow::Result<NanoSeconds> {
        self.finished = true;
        self.emit()
    }

    fn emit(&mut self) -> anyhow::Result<NanoSeconds> {
        let elapsed: NanoSeconds = self.start.elapsed().into();
        self.recorder
            .record(self.iteration, self.phase, Metric::Time, elapsed.as_nanos())?;

        let memory = sample_memory(self.recorder.sampling());
        self.recorder
            .record(self.iteration, self.phase, Metric::Memory, memory)?;

        tracing::debug!(
            phase = %self.phase,
            iteration = self.iteration,
            %elapsed,
            memory,
            "phase finished"
        );
        Ok(elapsed)
    }
}

impl Drop for PhaseTimer<'_, '_> {
    fn drop(&mut self) {
        if !self.finished {
            self.finished = true;
            if let Err(err) = self.emit() {
                tracing::error!(
                    error = %err,
                    phase = %self.phase,
                    iteration = self.iteration,
                    "could not record metrics of an abandoned phase"
                );
            }
        }
    }
}

static NO_RSS: Once = Once::new();

/// Sample process memory in bytes according to `sampling`.
///
/// Falls back to the peak resident set size where the current one is unavailable, and to
/// `0` (with a one-time warning) where neither is.
pub fn sample_memory(sampling: MemorySampling) -> u64 {
    if sampling == MemorySampling::Trim {
        socialbench_platform::trim_heap();
    }

    socialbench_platform::get_resident_set_size()
        .or_else(socialbench_platform::get_peak_resident_set_size)
        .unwrap_or_else(|| {
            NO_RSS.call_once(|| {
                tracing::warn!("resident set size is unavailable on this platform, reporting 0")
            });
            0
        })
}

///////////
// Tests //
///////////
