/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Influential posts (query `Q1`).
//!
//! A post scores [`COMMENT_WEIGHT`] for every comment in its thread, at any depth, and
//! [`LIKE_WEIGHT`] for every like on one of those comments. Both counts only grow, so
//! updates are additive.

use hashbrown::{HashMap, HashSet};
use socialbench_core::Row;

use crate::{
    model::{Delta, SocialNetwork, SubmissionId},
    ranking::Ranking,
};

pub const COMMENT_WEIGHT: i64 = 10;
pub const LIKE_WEIGHT: i64 = 1;

#[derive(Debug, Default)]
pub struct ThreadScores {
    ranking: Ranking,
}

impl ThreadScores {
    pub fn build(network: &SocialNetwork) -> Self {
        let mut totals: HashMap<SubmissionId, i64> = HashMap::with_capacity(network.posts().len());
        for (_, comment) in network.comments() {
            *totals.entry(comment.root).or_default() += COMMENT_WEIGHT;
        }
        for (id, comment) in network.comments() {
            let likes = network.likers(id).map_or(0, |l| l.len() as i64);
            *totals.entry(comment.root).or_default() += LIKE_WEIGHT * likes;
        }

        let mut ranking = Ranking::new();
        for (id, post) in network.posts() {
            ranking.insert(id, post.timestamp, totals.get(&id).copied().unwrap_or_default());
        }

        tracing::debug!(posts = ranking.len(), "thread scores built");
        Self { ranking }
    }

    /// Add the contributions of `delta`, which must already be applied to `network`.
    /// Returns the number of posts whose score changed.
    pub fn update(&mut self, network: &SocialNetwork, delta: &Delta) -> usize {
        for &post in &delta.posts {
            if let Some(info) = network.post(post) {
                self.ranking.insert(post, info.timestamp, 0);
            }
        }

        let mut increments: HashMap<SubmissionId, i64> = HashMap::new();
        for &comment in &delta.comments {
            if let Some(info) = network.comment(comment) {
                *increments.entry(info.root).or_default() += COMMENT_WEIGHT;
            }
        }
        for &(_, comment) in &delta.likes {
            if let Some(info) = network.comment(comment) {
                *increments.entry(info.root).or_default() += LIKE_WEIGHT;
            }
        }

        let mut touched = HashSet::with_capacity(increments.len());
        for (post, increment) in increments {
            if self.ranking.add_score(post, increment) {
                touched.insert(post);
            }
        }
        touched.len()
    }

    pub fn score(&self, post: SubmissionId) -> Option<i64> {
        self.ranking.score(post)
    }

    pub fn scores(&self) -> impl Iterator<Item = (SubmissionId, i64)> + use<'_> {
        self.ranking.scores()
    }

    /// The top posts as rows `(post, score, timestamp)`.
    pub fn rows(&self) -> Vec<Row> {
        self.ranking.rows()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;
    use crate::{
        model::{ChangeRecord, Comment, Post, User},
        testing,
    };

    fn network() -> SocialNetwork {
        let mut network = SocialNetwork::new();
        network
            .apply_all(vec![
                ChangeRecord::User(User {
                    id: 1,
                    name: "a".into(),
                }),
                ChangeRecord::User(User {
                    id: 2,
                    name: "b".into(),
                }),
                post(10, 100),
                post(20, 50),
                comment(11, 10),
                comment(12, 11),
                comment(21, 20),
                ChangeRecord::Like {
                    person: 1,
                    comment: 12,
                },
                ChangeRecord::Like {
                    person: 2,
                    comment: 12,
                },
            ])
            .unwrap();
        network
    }

    fn post(id: SubmissionId, timestamp: i64) -> ChangeRecord {
        ChangeRecord::Post(Post {
            id,
            timestamp,
            content: String::new(),
            submitter: 1,
        })
    }

    fn comment(id: SubmissionId, parent: SubmissionId) -> ChangeRecord {
        ChangeRecord::Comment(Comment {
            id,
            timestamp: id,
            content: String::new(),
            submitter: 2,
            parent,
        })
    }

    #[test]
    fn nested_comments_count_towards_the_root() {
        let scores = ThreadScores::build(&network());
        assert_eq!(scores.score(10), Some(22));
        assert_eq!(scores.score(20), Some(10));
        assert_eq!(scores.rows(), vec![Row::new(10, [22, 100]), Row::new(20, [10, 50])]);
    }

    #[test]
    fn updates_are_additive() {
        let mut network = network();
        let mut scores = ThreadScores::build(&network);

        let delta = network
            .apply_all(vec![
                post(30, 10),
                comment(22, 21),
                ChangeRecord::Like {
                    person: 1,
                    comment: 21,
                },
            ])
            .unwrap();

        assert_eq!(scores.update(&network, &delta), 1);
        assert_eq!(scores.score(20), Some(21));
        assert_eq!(scores.score(30), Some(0));
        assert_eq!(
            scores.rows(),
            vec![Row::new(10, [22, 100]), Row::new(20, [21, 50]), Row::new(30, [0, 10])]
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 64,
            ..ProptestConfig::default()
        })]

        #[test]
        fn incremental_matches_rebuild(scenario in testing::scenario()) {
            let (mut network, batches) = scenario.network();
            let mut scores = ThreadScores::build(&network);

            for batch in batches {
                let delta = network.apply_all(batch).unwrap();
                scores.update(&network, &delta);

                let rebuilt = ThreadScores::build(&network);
                let mut incremental: Vec<_> = scores.scores().collect();
                let mut expected: Vec<_> = rebuilt.scores().collect();
                incremental.sort();
                expected.sort();

                prop_assert_eq!(incremental, expected);
                prop_assert_eq!(scores.rows(), rebuilt.rows());
            }
        }
    }
}
