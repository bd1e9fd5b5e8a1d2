/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use anyhow::Context;
use socialbench_core::{ChangeSequence, Driver, QueryId, Schema};
use socialbench_inmem::{InMemoryBackend, QueryKind, Strategy, model::records};
use socialbench_runner::{Recorder, RunConfig, registry::Tools};

/// Queries answered by every in-memory tool.
const QUERIES: &[&str] = &["Q1", "Q2"];

pub(crate) fn register_tools(tools: &mut Tools) -> anyhow::Result<()> {
    tools.register_checked("InMemory", QUERIES, check_inputs, |config, recorder| {
        run_inmem(Strategy::Incremental, config, recorder)
    })?;
    tools.register_checked("InMemoryBatch", QUERIES, check_inputs, |config, recorder| {
        run_inmem(Strategy::Batch, config, recorder)
    })?;
    Ok(())
}

/// Every baseline file must be present before the header is written.
fn check_inputs(config: &RunConfig) -> anyhow::Result<()> {
    records::check_baseline(&config.change_path).context("invalid change path")
}

fn run_inmem(
    strategy: Strategy,
    config: &RunConfig,
    recorder: &mut Recorder<'_>,
) -> anyhow::Result<()> {
    let changes = ChangeSequence::new(&config.change_path, config.sequences)?;
    let query = QueryId::new(config.query.as_str());
    let mut backend = InMemoryBackend::new(QueryKind::from_id(&query)?, strategy)
        .with_settle_timeout(config.settle_timeout());

    Driver::new(query, Schema::social_network(), changes).run(&mut backend, recorder)
}
