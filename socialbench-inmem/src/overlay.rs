/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Friendship scores of comments (query `Q2`).
//!
//! For every comment `c` the overlay holds a small graph: its nodes are the people who like
//! `c`, and `{a, b}` is an edge when `a` and `b` are friends and both like `c`. The score
//! of `c` is the sum of the squared sizes of the connected components of that graph.
//!
//! Edges are only ever added. A new like or a new friendship can only create edges in the
//! overlays of the comments it touches, so an update joins each new relationship against
//! the existing ones and rescores exactly the comments whose overlay changed.

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};
use socialbench_core::Row;

use crate::{
    model::{Delta, Friendship, PersonId, SocialNetwork, SubmissionId},
    ranking::Ranking,
};

/// The score of a comment nobody likes.
pub const DEFAULT_SCORE: i64 = 0;

/// A "friend who likes comment" edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct OverlayEdge {
    pub comment: SubmissionId,
    pub low: PersonId,
    pub high: PersonId,
}

/// The network relationships an [`OverlayEdge`] is derived from, by key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Attribution {
    pub friendship: Friendship,
    /// `(person, comment)` for both endpoints.
    pub likes: [(PersonId, SubmissionId); 2],
}

impl OverlayEdge {
    pub fn attribution(&self) -> Attribution {
        Attribution {
            friendship: Friendship {
                low: self.low,
                high: self.high,
            },
            likes: [(self.low, self.comment), (self.high, self.comment)],
        }
    }

    /// Check that the relationships this edge is derived from exist in `network`.
    pub fn is_justified_by(&self, network: &SocialNetwork) -> bool {
        let Attribution { friendship, likes } = self.attribution();
        network.are_friends(friendship.low, friendship.high)
            && likes.iter().all(|(p, c)| network.likes(*p, *c))
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct CommentOverlay {
    adjacency: HashMap<PersonId, HashSet<PersonId>>,
}

impl CommentOverlay {
    fn contains(&self, person: PersonId) -> bool {
        self.adjacency.contains_key(&person)
    }

    fn add_member(&mut self, person: PersonId) -> bool {
        match self.adjacency.entry(person) {
            hashbrown::hash_map::Entry::Occupied(_) => false,
            hashbrown::hash_map::Entry::Vacant(entry) => {
                entry.insert(HashSet::new());
                true
            }
        }
    }

    /// Both endpoints must already be members.
    fn add_edge(&mut self, a: PersonId, b: PersonId) -> bool {
        let added = self.adjacency.get_mut(&a).is_some_and(|n| n.insert(b));
        if added && let Some(n) = self.adjacency.get_mut(&b) {
            n.insert(a);
        }
        added
    }

    fn edge_count(&self) -> usize {
        self.adjacency.values().map(HashSet::len).sum::<usize>() / 2
    }

    fn edges(&self) -> impl Iterator<Item = (PersonId, PersonId)> + use<'_> {
        self.adjacency
            .iter()
            .flat_map(|(a, n)| n.iter().filter(move |b| a < *b).map(move |b| (*a, *b)))
    }

    /// Sum of squared component sizes, by breadth first search.
    fn score(&self) -> i64 {
        let mut seen = HashSet::with_capacity(self.adjacency.len());
        let mut queue = VecDeque::new();
        let mut score = 0i64;

        for &start in self.adjacency.keys() {
            if !seen.insert(start) {
                continue;
            }
            queue.push_back(start);
            let mut size = 0i64;
            while let Some(person) = queue.pop_front() {
                size += 1;
                for &friend in &self.adjacency[&person] {
                    if seen.insert(friend) {
                        queue.push_back(friend);
                    }
                }
            }
            score += size * size;
        }
        score
    }
}

/// Outcome of one incremental update.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateStats {
    pub new_edges: usize,
    pub rescored: usize,
}

/// The per-comment overlays together with the ranking of their scores.
#[derive(Debug, Default)]
pub struct OverlayMaintainer {
    overlays: HashMap<SubmissionId, CommentOverlay>,
    ranking: Ranking,
}

impl OverlayMaintainer {
    /// Materialize the overlay of every comment in `network` and score it.
    pub fn build(network: &SocialNetwork) -> Self {
        let mut this = Self::default();
        for (comment, info) in network.comments() {
            let mut overlay = CommentOverlay::default();
            if let Some(likers) = network.likers(comment) {
                for &person in likers {
                    overlay.add_member(person);
                }
                for &person in likers {
                    for friend in network.friends_of(person) {
                        if person < friend && likers.contains(&friend) {
                            overlay.add_edge(person, friend);
                        }
                    }
                }
            }
            this.ranking.insert(comment, info.timestamp, overlay.score());
            this.overlays.insert(comment, overlay);
        }

        tracing::debug!(
            comments = this.overlays.len(),
            edges = this.edge_count(),
            "friendship overlay built"
        );
        this
    }

    /// Bring the overlay up to date with `delta`, which must already be applied to
    /// `network`.
    pub fn update(&mut self, network: &SocialNetwork, delta: &Delta) -> UpdateStats {
        let mut affected = HashSet::new();
        let mut stats = UpdateStats::default();

        for &comment in &delta.comments {
            if let Some(info) = network.comment(comment) {
                self.overlays.entry(comment).or_default();
                self.ranking.insert(comment, info.timestamp, DEFAULT_SCORE);
                affected.insert(comment);
            }
        }

        // A new liker joins the overlay and connects to every friend already in it. A friend
        // whose like is also new connects when their own like is processed.
        for &(person, comment) in &delta.likes {
            let overlay = self.overlays.entry(comment).or_default();
            overlay.add_member(person);
            for friend in network.friends_of(person) {
                if overlay.contains(friend) && overlay.add_edge(person, friend) {
                    stats.new_edges += 1;
                }
            }
            affected.insert(comment);
        }

        // A new friendship connects its endpoints in every comment both of them like.
        for friendship in &delta.friendships {
            let (Some(low), Some(high)) = (
                network.liked_by(friendship.low),
                network.liked_by(friendship.high),
            ) else {
                continue;
            };
            let (small, large) = if low.len() <= high.len() {
                (low, high)
            } else {
                (high, low)
            };

            for comment in small.iter().filter(|c| large.contains(*c)) {
                let overlay = self.overlays.entry(*comment).or_default();
                if overlay.add_edge(friendship.low, friendship.high) {
                    stats.new_edges += 1;
                    affected.insert(*comment);
                }
            }
        }

        for comment in affected {
            let score = self.overlays.get(&comment).map_or(DEFAULT_SCORE, CommentOverlay::score);
            if self.ranking.set_score(comment, score) {
                stats.rescored += 1;
            }
        }

        tracing::debug!(
            new_edges = stats.new_edges,
            rescored = stats.rescored,
            "friendship overlay updated"
        );
        stats
    }

    pub fn score(&self, comment: SubmissionId) -> Option<i64> {
        self.ranking.score(comment)
    }

    /// Every comment with its score, in an unspecified order.
    pub fn scores(&self) -> impl Iterator<Item = (SubmissionId, i64)> + use<'_> {
        self.ranking.scores()
    }

    pub fn edge_count(&self) -> usize {
        self.overlays.values().map(CommentOverlay::edge_count).sum()
    }

    /// All overlay edges in an unspecified order.
    pub fn edges(&self) -> impl Iterator<Item = OverlayEdge> + use<'_> {
        self.overlays.iter().flat_map(|(comment, overlay)| {
            overlay.edges().map(move |(low, high)| OverlayEdge {
                comment: *comment,
                low,
                high,
            })
        })
    }

    /// The top comments as rows `(comment, score, timestamp)`.
    pub fn rows(&self) -> Vec<Row> {
        self.ranking.rows()
    }
}

///////////
// Tests //
///////////
