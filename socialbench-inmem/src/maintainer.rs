/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::fmt;

use socialbench_core::{QueryId, Row, Schema, backend::SchemaError};

use crate::{
    backend::BackendError,
    model::{ChangeRecord, Delta, ModelError, SocialNetwork},
    overlay::OverlayMaintainer,
    threads::ThreadScores,
};

/// The queries this backend answers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    /// `Q1`: the posts with the most active threads.
    InfluentialPosts,
    /// `Q2`: the comments liked by the largest groups of friends.
    FriendshipScore,
}

impl QueryKind {
    pub const ALL: [Self; 2] = [Self::InfluentialPosts, Self::FriendshipScore];

    pub fn id(self) -> QueryId {
        QueryId::new(self.as_str())
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::InfluentialPosts => "Q1",
            Self::FriendshipScore => "Q2",
        }
    }

    pub fn from_id(id: &QueryId) -> Result<Self, BackendError> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == id.as_str())
            .ok_or_else(|| BackendError::UnsupportedQuery(id.to_string()))
    }

    /// Check that `schema` declares the types this query reads.
    pub fn check_schema(self, schema: &Schema) -> Result<(), SchemaError> {
        match self {
            Self::InfluentialPosts => schema.require(&["Post", "Comment"], &["Parent", "Likes"]),
            Self::FriendshipScore => schema.require(&["User", "Comment"], &["Friend", "Likes"]),
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How query results follow the changes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Strategy {
    /// Update the derived structure from the delta of each batch.
    #[default]
    Incremental,
    /// Rebuild the derived structure from scratch after each batch.
    Batch,
}

/// A query result derived from the network.
pub(crate) trait Maintainer: Send {
    /// Absorb `delta`, already applied to `network`. Returns the number of entries whose
    /// score was recomputed.
    fn update(&mut self, network: &SocialNetwork, delta: &Delta) -> usize;

    /// The current result rows, best first.
    fn rows(&self) -> Vec<Row>;
}

impl Maintainer for OverlayMaintainer {
    fn update(&mut self, network: &SocialNetwork, delta: &Delta) -> usize {
        OverlayMaintainer::update(self, network, delta).rescored
    }

    fn rows(&self) -> Vec<Row> {
        OverlayMaintainer::rows(self)
    }
}

impl Maintainer for ThreadScores {
    fn update(&mut self, network: &SocialNetwork, delta: &Delta) -> usize {
        ThreadScores::update(self, network, delta)
    }

    fn rows(&self) -> Vec<Row> {
        ThreadScores::rows(self)
    }
}

fn build(kind: QueryKind, network: &SocialNetwork) -> Box<dyn Maintainer> {
    match kind {
        QueryKind::InfluentialPosts => Box::new(ThreadScores::build(network)),
        QueryKind::FriendshipScore => Box::new(OverlayMaintainer::build(network)),
    }
}

/// The network together with the derived structure of one query.
///
/// The derived structure is built lazily by the first query, so loading is measured
/// separately from the initial evaluation.
pub(crate) struct Engine {
    network: SocialNetwork,
    kind: QueryKind,
    strategy: Strategy,
    derived: Option<Box<dyn Maintainer>>,
}

impl Engine {
    pub(crate) fn new(kind: QueryKind, strategy: Strategy) -> Self {
        Self {
            network: SocialNetwork::new(),
            kind,
            strategy,
            derived: None,
        }
    }

    pub(crate) fn network(&self) -> &SocialNetwork {
        &self.network
    }

    /// Insert baseline records. Any derived structure is discarded.
    pub(crate) fn load(&mut self, records: Vec<ChangeRecord>) -> Result<usize, ModelError> {
        self.derived = None;
        let delta = self.network.apply_all(records)?;
        Ok(delta.len())
    }

    /// Apply one batch of changes and bring the derived structure up to date. Returns the
    /// number of new items.
    pub(crate) fn apply(&mut self, records: Vec<ChangeRecord>) -> Result<usize, ModelError> {
        let delta = self.network.apply_all(records)?;
        if !delta.is_empty()
            && let Some(derived) = self.derived.as_mut()
        {
            match self.strategy {
                Strategy::Incremental => {
                    let rescored = derived.update(&self.network, &delta);
                    tracing::trace!(rescored, "derived results updated");
                }
                Strategy::Batch => *derived = build(self.kind, &self.network),
            }
        }
        Ok(delta.len())
    }

    pub(crate) fn query(&mut self) -> Vec<Row> {
        let (kind, network) = (self.kind, &self.network);
        self.derived.get_or_insert_with(|| build(kind, network)).rows()
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use rstest::rstest;

    use super::{Strategy, *};
    use crate::testing;

    #[rstest]
    #[case("Q1", QueryKind::InfluentialPosts)]
    #[case("Q2", QueryKind::FriendshipScore)]
    fn query_ids(#[case] id: &str, #[case] kind: QueryKind) {
        assert_eq!(QueryKind::from_id(&id.into()).unwrap(), kind);
        assert_eq!(kind.id(), QueryId::from(id));
    }

    #[test]
    fn unknown_query() {
        assert!(matches!(
            QueryKind::from_id(&"Q3".into()),
            Err(BackendError::UnsupportedQuery(q)) if q == "Q3"
        ));
    }

    #[test]
    fn schema_requirements() {
        let schema = Schema::social_network();
        for kind in QueryKind::ALL {
            kind.check_schema(&schema).unwrap();
        }

        let no_friends = Schema::new(["User", "Post", "Comment"], ["Likes", "Parent"]);
        QueryKind::InfluentialPosts.check_schema(&no_friends).unwrap();
        assert_eq!(
            QueryKind::FriendshipScore.check_schema(&no_friends),
            Err(SchemaError::MissingRelationship("Friend".into()))
        );
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            ..ProptestConfig::default()
        })]

        #[test]
        fn strategies_agree(scenario in testing::scenario()) {
            for kind in QueryKind::ALL {
                let mut incremental = Engine::new(kind, Strategy::Incremental);
                let mut batch = Engine::new(kind, Strategy::Batch);
                incremental.load(scenario.baseline.clone()).unwrap();
                batch.load(scenario.baseline.clone()).unwrap();
                prop_assert_eq!(incremental.query(), batch.query());

                for records in &scenario.batches {
                    incremental.apply(records.clone()).unwrap();
                    batch.apply(records.clone()).unwrap();
                    prop_assert_eq!(incremental.query(), batch.query());
                }
                prop_assert_eq!(
                    incremental.network().like_count(),
                    batch.network().like_count()
                );
            }
        }

        #[test]
        fn empty_batches_leave_results_alone(scenario in testing::scenario()) {
            for kind in QueryKind::ALL {
                for strategy in [Strategy::Incremental, Strategy::Batch] {
                    let mut engine = Engine::new(kind, strategy);
                    engine.load(scenario.baseline.clone()).unwrap();
                    for records in &scenario.batches {
                        engine.apply(records.clone()).unwrap();
                    }
                    let before = engine.query();

                    prop_assert_eq!(engine.apply(Vec::new()).unwrap(), 0);
                    prop_assert_eq!(engine.query(), before);
                }
            }
        }
    }
}
