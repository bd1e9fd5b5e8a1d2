/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{cmp::Ordering, collections::BTreeSet};

use hashbrown::HashMap;
use socialbench_core::Row;

use crate::model::{SubmissionId, Timestamp};

/// Number of rows a query returns.
pub const TOP: usize = 3;

/// The position of one submission in a [`Ranking`].
///
/// Ordered best first: higher score, then more recent timestamp, then larger id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RankKey {
    pub score: i64,
    pub timestamp: Timestamp,
    pub id: SubmissionId,
}

impl Ord for RankKey {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .score
            .cmp(&self.score)
            .then_with(|| other.timestamp.cmp(&self.timestamp))
            .then_with(|| other.id.cmp(&self.id))
    }
}

impl PartialOrd for RankKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl RankKey {
    /// The result row `(id, score, timestamp)`.
    pub fn row(&self) -> Row {
        Row::new(self.id, [self.score, self.timestamp])
    }
}

/// Scores of submissions, kept sorted so the best entries can be read without a scan.
#[derive(Debug, Default, Clone)]
pub struct Ranking {
    keys: HashMap<SubmissionId, RankKey>,
    order: BTreeSet<RankKey>,
}

impl Ranking {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Insert `id` with `score`, replacing any previous entry.
    pub fn insert(&mut self, id: SubmissionId, timestamp: Timestamp, score: i64) {
        let key = RankKey {
            score,
            timestamp,
            id,
        };
        if let Some(old) = self.keys.insert(id, key) {
            self.order.remove(&old);
        }
        self.order.insert(key);
    }

    /// Change the score of an existing entry. Returns `false` if `id` is not ranked.
    pub fn set_score(&mut self, id: SubmissionId, score: i64) -> bool {
        let Some(key) = self.keys.get_mut(&id) else {
            return false;
        };
        if key.score != score {
            self.order.remove(key);
            key.score = score;
            self.order.insert(*key);
        }
        true
    }

    /// Add `delta` to the score of an existing entry. Returns `false` if `id` is not ranked.
    pub fn add_score(&mut self, id: SubmissionId, delta: i64) -> bool {
        match self.score(id) {
            Some(score) => self.set_score(id, score + delta),
            None => false,
        }
    }

    pub fn score(&self, id: SubmissionId) -> Option<i64> {
        self.keys.get(&id).map(|k| k.score)
    }

    /// All `(id, score)` pairs in an unspecified order.
    pub fn scores(&self) -> impl Iterator<Item = (SubmissionId, i64)> + use<'_> {
        self.keys.iter().map(|(id, key)| (*id, key.score))
    }

    /// The best `n` entries, best first.
    pub fn top(&self, n: usize) -> impl Iterator<Item = &RankKey> {
        self.order.iter().take(n)
    }

    /// The best [`TOP`] entries as result rows.
    pub fn rows(&self) -> Vec<Row> {
        self.top(TOP).map(RankKey::row).collect()
    }
}

///////////
// Tests //
///////////
