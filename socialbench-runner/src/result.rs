/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Incremental JSON checkpoints of the snapshots emitted so far.

use std::path::Path;

use serde::Serialize;

use crate::snapshot::{RunLabels, Snapshot};

/// Everything a run has reported up to the point the checkpoint is taken.
#[derive(Debug, Serialize)]
pub(crate) struct Checkpoint<'a> {
    pub(crate) labels: &'a RunLabels,
    pub(crate) snapshots: &'a [Snapshot],
}

impl Checkpoint<'_> {
    pub(crate) fn save(&self, path: &Path) -> anyhow::Result<()> {
        atomic_save(path, self)
    }
}

/// Atomically save the serializable `object` to a JSON file at `path`.
///
/// The object is first written to `format!("{}.temp", path)` and then moved into place
/// with `std::fs::rename`, so an interrupted run never leaves a truncated file behind.
///
/// Fails if the temporary file already exists, if serialization fails or if renaming
/// fails.
pub(crate) fn atomic_save<T>(path: &Path, object: &T) -> anyhow::Result<()>
where
    T: Serialize + ?Sized,
{
    let temp = format!("{}.temp", path.display());
    if Path::new(&temp).exists() {
        return Err(anyhow::Error::msg(format!(
            "Temporary file {} already exists. Aborting!",
            temp
        )));
    }

    let buffer = std::fs::File::create(&temp)?;
    serde_json::to_writer_pretty(buffer, object)?;
    std::fs::rename(&temp, path)?;
    Ok(())
}

///////////
// Tests //
///////////
