/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The phase state machine.
//!
//! A run moves through
//! ```text
//! Init -> Loaded -> Settled(0) -> Settled(1) -> ... -> Settled(N) -> Done
//! ```
//! and can be `Aborted` from any state. Each transition is one timed phase, so a run over
//! `N` batches emits `2 * (3 + N)` Time/Memory snapshots plus `1 + N` Elements snapshots.

use std::fmt;

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use scopeguard::ScopeGuard;
use socialbench_runner::{Metric, Phase, Recorder};

use crate::{
    backend::{Backend, QueryId, Schema},
    changes::ChangeSequence,
    fingerprint::fingerprint,
};

/// Where a run currently stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Init,
    Loaded,
    /// The first `k` batches are applied and visible to queries.
    Settled(usize),
    Done,
    Aborted,
}

/// The class of a fatal failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Configuration,
    Load,
    Query,
    Synchronization,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Configuration => "configuration",
            Self::Load => "load",
            Self::Query => "query",
            Self::Synchronization => "synchronization",
        };
        f.write_str(s)
    }
}

/// Context attached to every error that aborts a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhaseFailure {
    pub phase: Phase,
    pub iteration: u64,
    pub kind: FailureKind,
}

impl PhaseFailure {
    pub fn new(phase: Phase, iteration: u64, kind: FailureKind) -> Self {
        Self {
            phase,
            iteration,
            kind,
        }
    }
}

impl fmt::Display for PhaseFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} failure in phase {} (iteration {})",
            self.kind, self.phase, self.iteration
        )
    }
}

/// Sequences one run of `query` over a baseline and its change batches.
#[derive(Debug)]
pub struct Driver {
    query: QueryId,
    schema: Schema,
    changes: ChangeSequence,
    state: State,
}

impl Driver {
    pub fn new(query: QueryId, schema: Schema, changes: ChangeSequence) -> Self {
        Self {
            query,
            schema,
            changes,
            state: State::Init,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    /// Run every phase against `backend`, reporting through `recorder`.
    ///
    /// `backend.shutdown()` is called exactly once on every exit path, including panics.
    /// If the run itself failed, a shutdown error is only logged and the original error is
    /// returned.
    pub fn run(
        &mut self,
        backend: &mut dyn Backend,
        recorder: &mut Recorder<'_>,
    ) -> anyhow::Result<()> {
        let mut guard = scopeguard::guard(backend, |backend| {
            if let Err(err) = backend.shutdown() {
                tracing::error!(error = ?err, "backend shutdown failed while aborting");
            }
        });

        let result = self.phases(&mut **guard, recorder);
        match result {
            Ok(()) => {
                let backend = ScopeGuard::into_inner(guard);
                backend.shutdown().context("failed to shut down the backend")?;
                self.state = State::Done;
                tracing::info!(query = %self.query, batches = self.changes.len(), "run finished");
                Ok(())
            }
            Err(err) => {
                self.state = State::Aborted;
                match err.downcast_ref::<PhaseFailure>() {
                    Some(failure) => tracing::error!(
                        phase = %failure.phase,
                        iteration = failure.iteration,
                        kind = %failure.kind,
                        error = ?err,
                        "run aborted"
                    ),
                    None => tracing::error!(error = ?err, "run aborted"),
                }
                drop(guard);
                Err(err)
            }
        }
    }

    fn phases(
        &mut self,
        backend: &mut dyn Backend,
        recorder: &mut Recorder<'_>,
    ) -> anyhow::Result<()> {
        self.state = State::Init;

        let schema = &self.schema;
        recorder
            .timed(0, Phase::Initialization, || {
                backend.initialize()?;
                backend.register_schema(schema)
            })
            .context(PhaseFailure::new(
                Phase::Initialization,
                0,
                FailureKind::Configuration,
            ))?;

        let baseline = self.changes.baseline();
        recorder
            .timed(0, Phase::Loading, || backend.load_baseline(baseline))
            .with_context(|| format!("while loading the baseline from {}", baseline.display()))
            .context(PhaseFailure::new(Phase::Loading, 0, FailureKind::Load))?;
        self.state = State::Loaded;

        let query = &self.query;
        let rows = recorder
            .timed(0, Phase::Initial, || backend.run_query(query))
            .context(PhaseFailure::new(Phase::Initial, 0, FailureKind::Query))?;
        recorder.record(0, Phase::Initial, Metric::Elements, fingerprint(&rows))?;
        tracing::info!(%query, rows = rows.len(), "initial query evaluated");
        self.state = State::Settled(0);

        let progress =
            ProgressBar::with_draw_target(Some(self.changes.len() as u64), recorder.draw_target());
        progress.set_style(ProgressStyle::with_template(
            "Updates [{elapsed_precise}] {wide_bar} {pos}/{len}",
        )?);

        for batch in self.changes.batches() {
            let iteration = batch.sequence as u64;
            let failure = |kind| PhaseFailure::new(Phase::Updates, iteration, kind);

            recorder.timed(iteration, Phase::Updates, || {
                batch.check_exists().context(failure(FailureKind::Load))?;
                backend
                    .apply_change_batch(&batch)
                    .with_context(|| format!("while applying {}", batch.path.display()))
                    .context(failure(FailureKind::Load))?;
                backend
                    .await_settled()
                    .context(failure(FailureKind::Synchronization))
            })?;

            let rows = backend.run_query(query).context(failure(FailureKind::Query))?;
            recorder.record(iteration, Phase::Updates, Metric::Elements, fingerprint(&rows))?;

            tracing::debug!(sequence = batch.sequence, rows = rows.len(), "batch settled");
            self.state = State::Settled(batch.sequence);
            progress.inc(1);
        }

        progress.finish();
        Ok(())
    }
}

///////////
// Tests //
///////////
