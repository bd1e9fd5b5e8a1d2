/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{io::Write, path::PathBuf};

use crate::{
    config::MemorySampling,
    output::Output,
    result::Checkpoint,
    snapshot::{HEADER, Metric, MetricValue, Phase, RunLabels, Snapshot, SnapshotError},
    timer::PhaseTimer,
};

/// Serializes snapshots for one run to an [`Output`].
///
/// Every emitted line is also mirrored to the structured log and, if a checkpoint path
/// is configured, every snapshot so far is saved to a JSON file after each emission.
pub struct Recorder<'a> {
    labels: RunLabels,
    output: &'a mut dyn Output,
    sampling: MemorySampling,
    history: Vec<Snapshot>,
    checkpoint: Option<PathBuf>,
}

impl<'a> Recorder<'a> {
    pub fn new(
        labels: RunLabels,
        sampling: MemorySampling,
        output: &'a mut dyn Output,
    ) -> Result<Self, SnapshotError> {
        labels.check()?;
        Ok(Self {
            labels,
            output,
            sampling,
            history: Vec::new(),
            checkpoint: None,
        })
    }

    /// Save all snapshots to `path` each time a new one is emitted.
    pub fn with_checkpoint(mut self, path: PathBuf) -> Self {
        self.checkpoint = Some(path);
        self
    }

    pub fn sampling(&self) -> MemorySampling {
        self.sampling
    }

    /// All snapshots emitted so far, in emission order.
    pub fn snapshots(&self) -> &[Snapshot] {
        &self.history
    }

    pub fn draw_target(&self) -> indicatif::ProgressDrawTarget {
        self.output.draw_target()
    }

    /// Write the column header. Must precede the first snapshot.
    pub fn header(&mut self) -> anyhow::Result<()> {
        writeln!(self.output, "{}", HEADER)?;
        Ok(())
    }

    /// Build a snapshot from the parts and emit it.
    ///
    /// A text value that would corrupt the line aborts with [`SnapshotError::Malformed`]
    /// and nothing is written.
    pub fn record(
        &mut self,
        iteration: u64,
        phase: Phase,
        metric: Metric,
        value: impl Into<MetricValue>,
    ) -> anyhow::Result<()> {
        let snapshot = Snapshot::new(iteration, phase, metric, value)?;
        self.emit(snapshot)
    }

    fn emit(&mut self, snapshot: Snapshot) -> anyhow::Result<()> {
        writeln!(self.output, "{}", snapshot.line(&self.labels))?;
        tracing::info!(
            iteration = snapshot.iteration(),
            phase = %snapshot.phase(),
            metric = %snapshot.metric(),
            value = %snapshot.value(),
            "snapshot"
        );
        self.history.push(snapshot);

        if let Some(path) = &self.checkpoint {
            Checkpoint {
                labels: &self.labels,
                snapshots: &self.history,
            }
            .save(path)?;
        }
        Ok(())
    }

    /// Start timing `phase`. See [`PhaseTimer`].
    pub fn begin(&mut self, iteration: u64, phase: Phase) -> PhaseTimer<'_, 'a> {
        PhaseTimer::begin(self, iteration, phase)
    }

    /// Run `op` as one timed phase.
    ///
    /// Time and Memory are emitted whether or not `op` succeeds. If `op` fails its error is
    /// returned unchanged after the metrics are written.
    pub fn timed<T, F>(&mut self, iteration: u64, phase: Phase, op: F) -> anyhow::Result<T>
    where
        F: FnOnce() -> anyhow::Result<T>,
    {
        let timer = self.begin(iteration, phase);
        let result = op();
        let finished = timer.finish();

        match (result, finished) {
            (Ok(value), Ok(_)) => Ok(value),
            (Ok(_), Err(err)) => Err(err),
            (Err(err), Ok(_)) => Err(err),
            (Err(err), Err(finish)) => {
                tracing::error!(
                    error = %finish,
                    %phase,
                    iteration,
                    "could not record phase metrics"
                );
                Err(err)
            }
        }
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;
    use crate::output::Memory;

    fn labels() -> RunLabels {
        RunLabels {
            tool: "Mock".into(),
            query: "Q2".into(),
            change_set: Some("1".into()),
            run_index: 0,
        }
    }

    #[test]
    fn header_then_lines() {
        let mut output = Memory::new();
        {
            let mut recorder =
                Recorder::new(labels(), MemorySampling::Resident, &mut output).unwrap();
            recorder.header().unwrap();
            recorder
                .record(0, Phase::Initial, Metric::Elements, "5|4")
                .unwrap();
            assert_eq!(recorder.snapshots().len(), 1);
        }

        assert_eq!(
            output.lines(),
            vec![
                HEADER.to_string(),
                "Mock,Q2,1,0,0,Initial,Elements,5|4".to_string()
            ]
        );
    }

    #[test]
    fn malformed_value_writes_nothing() {
        let mut output = Memory::new();
        {
            let mut recorder =
                Recorder::new(labels(), MemorySampling::Resident, &mut output).unwrap();
            let err = recorder
                .record(0, Phase::Initial, Metric::Elements, "1,2")
                .unwrap_err();
            assert!(err.downcast_ref::<SnapshotError>().is_some());
            assert!(recorder.snapshots().is_empty());
        }
        assert!(output.lines().is_empty());
    }

    #[test]
    fn bad_labels_are_rejected() {
        let mut output = Memory::new();
        let mut labels = labels();
        labels.change_set = Some("a\nb".into());
        assert!(Recorder::new(labels, MemorySampling::Resident, &mut output).is_err());
    }

    #[test]
    fn timed_failure_still_emits_metrics() {
        let mut output = Memory::new();
        {
            let mut recorder =
                Recorder::new(labels(), MemorySampling::Resident, &mut output).unwrap();
            let err = recorder
                .timed(0, Phase::Loading, || -> anyhow::Result<()> {
                    Err(anyhow::anyhow!("boom"))
                })
                .unwrap_err();
            assert_eq!(err.to_string(), "boom");

            let metrics: Vec<_> = recorder.snapshots().iter().map(|s| s.metric()).collect();
            assert_eq!(metrics, vec![Metric::Time, Metric::Memory]);
        }

        let lines = output.lines();
        assert!(lines[0].starts_with("Mock,Q2,1,0,0,Loading,Time,"));
        assert!(lines[1].starts_with("Mock,Q2,1,0,0,Loading,Memory,"));
    }

    #[test]
    fn checkpoint_follows_every_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("snapshots.json");

        let mut output = Memory::new();
        let mut recorder = Recorder::new(labels(), MemorySampling::Resident, &mut output)
            .unwrap()
            .with_checkpoint(path.clone());

        recorder.timed(0, Phase::Initialization, || Ok(())).unwrap();

        let saved: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(saved["snapshots"].as_array().unwrap().len(), 2);
        assert_eq!(saved["labels"]["tool"], "Mock");
    }
}
