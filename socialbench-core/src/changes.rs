/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::backend::ChangeBatch;

#[derive(Debug, Error)]
#[error("change directory {0:?} does not exist or is not a directory")]
pub struct MissingDirectory(pub PathBuf);

/// The file name of change batch `sequence`.
pub fn batch_file_name(sequence: usize) -> String {
    format!("change{:02}.csv", sequence)
}

/// A baseline directory and the `N` change batches that follow it.
///
/// Batch `k` is located by formatting alone; the directory is never scanned.
#[derive(Debug, Clone)]
pub struct ChangeSequence {
    directory: PathBuf,
    sequences: usize,
}

impl ChangeSequence {
    pub fn new(directory: impl Into<PathBuf>, sequences: usize) -> Result<Self, MissingDirectory> {
        let directory = directory.into();
        if !directory.is_dir() {
            return Err(MissingDirectory(directory));
        }
        Ok(Self {
            directory,
            sequences,
        })
    }

    /// The directory holding the baseline model.
    pub fn baseline(&self) -> &Path {
        &self.directory
    }

    pub fn len(&self) -> usize {
        self.sequences
    }

    pub fn is_empty(&self) -> bool {
        self.sequences == 0
    }

    /// Change batch `sequence` (1-based). Existence is checked when the batch is applied.
    pub fn batch(&self, sequence: usize) -> ChangeBatch {
        ChangeBatch {
            sequence,
            path: self.directory.join(batch_file_name(sequence)),
        }
    }

    /// All batches in application order.
    pub fn batches(&self) -> impl ExactSizeIterator<Item = ChangeBatch> + use<'_> {
        (1..self.sequences + 1).map(|k| self.batch(k))
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(1, "change01.csv")]
    #[case(9, "change09.csv")]
    #[case(10, "change10.csv")]
    #[case(123, "change123.csv")]
    fn file_names(#[case] sequence: usize, #[case] expected: &str) {
        assert_eq!(batch_file_name(sequence), expected);
    }

    #[test]
    fn batches_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let sequence = ChangeSequence::new(dir.path(), 3).unwrap();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.baseline(), dir.path());

        let batches: Vec<_> = sequence.batches().collect();
        assert_eq!(batches.len(), 3);
        for (i, batch) in batches.iter().enumerate() {
            assert_eq!(batch.sequence, i + 1);
            assert_eq!(batch.path, dir.path().join(batch_file_name(i + 1)));
        }
    }

    #[rstest]
    fn batch_count_is_known_up_front(#[values(0, 1, 5)] n: usize) {
        let dir = tempfile::tempdir().unwrap();
        let sequence = ChangeSequence::new(dir.path(), n).unwrap();

        let mut batches = sequence.batches();
        assert_eq!(batches.len(), n);
        if n > 0 {
            batches.next();
            assert_eq!(batches.len(), n - 1);
        }
    }

    #[test]
    fn empty_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let sequence = ChangeSequence::new(dir.path(), 0).unwrap();
        assert!(sequence.is_empty());
        assert_eq!(sequence.batches().count(), 0);
    }

    #[test]
    fn missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ChangeSequence::new(dir.path().join("absent"), 1).is_err());
    }
}
