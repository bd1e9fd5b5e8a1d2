/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Random but well-formed change histories for property tests.

use proptest::prelude::*;

use crate::model::{ChangeRecord, Comment, PersonId, Post, SocialNetwork, SubmissionId, User};

const PEOPLE: u8 = 6;
const POSTS: [SubmissionId; 2] = [100, 101];

/// A baseline followed by a sequence of change batches. Every reference in a batch resolves
/// against the baseline and the batches before it.
#[derive(Debug, Clone)]
pub(crate) struct Scenario {
    pub(crate) baseline: Vec<ChangeRecord>,
    pub(crate) batches: Vec<Vec<ChangeRecord>>,
}

impl Scenario {
    /// The network after the baseline, and the batches still to apply.
    pub(crate) fn network(&self) -> (SocialNetwork, Vec<Vec<ChangeRecord>>) {
        let mut network = SocialNetwork::new();
        if let Err(err) = network.apply_all(self.baseline.clone()) {
            panic!("generated baseline is invalid: {}", err);
        }
        (network, self.batches.clone())
    }
}

type Op = (u8, u8, u8);

struct Builder {
    submissions: Vec<SubmissionId>,
    comments: Vec<SubmissionId>,
    next_id: SubmissionId,
}

impl Builder {
    fn new() -> Self {
        Self {
            submissions: POSTS.to_vec(),
            comments: Vec::new(),
            next_id: 1000,
        }
    }

    fn record(&mut self, (kind, a, b): Op) -> Option<ChangeRecord> {
        let person = |x: u8| PersonId::from(x % PEOPLE);
        match kind % 4 {
            0 => {
                let (a, b) = (person(a), person(b));
                (a != b).then_some(ChangeRecord::Friend(a, b))
            }
            1 => {
                let id = self.next_id;
                self.next_id += 1;
                let parent = self.submissions[usize::from(b) % self.submissions.len()];
                self.submissions.push(id);
                self.comments.push(id);
                Some(ChangeRecord::Comment(Comment {
                    id,
                    timestamp: id,
                    content: String::new(),
                    submitter: person(a),
                    parent,
                }))
            }
            _ => {
                if self.comments.is_empty() {
                    return None;
                }
                let comment = self.comments[usize::from(b) % self.comments.len()];
                Some(ChangeRecord::Like {
                    person: person(a),
                    comment,
                })
            }
        }
    }
}

fn build(baseline_ops: Vec<Op>, batch_ops: Vec<Vec<Op>>) -> Scenario {
    let mut builder = Builder::new();

    let mut baseline: Vec<ChangeRecord> = (0..PEOPLE)
        .map(|id| {
            ChangeRecord::User(User {
                id: id.into(),
                name: format!("person {}", id),
            })
        })
        .collect();
    baseline.extend(POSTS.iter().map(|&id| {
        ChangeRecord::Post(Post {
            id,
            timestamp: id,
            content: String::new(),
            submitter: 0,
        })
    }));
    baseline.extend(baseline_ops.into_iter().filter_map(|op| builder.record(op)));

    let batches = batch_ops
        .into_iter()
        .map(|ops| ops.into_iter().filter_map(|op| builder.record(op)).collect())
        .collect();

    Scenario { baseline, batches }
}

pub(crate) fn scenario() -> impl Strategy<Value = Scenario> {
    let op = || (any::<u8>(), any::<u8>(), any::<u8>());
    (
        prop::collection::vec(op(), 0..24),
        prop::collection::vec(prop::collection::vec(op(), 0..12), 1..5),
    )
        .prop_map(|(baseline, batches)| build(baseline, batches))
}
