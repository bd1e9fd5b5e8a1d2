/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    fmt,
    path::{Path, PathBuf},
};

use thiserror::Error;

/// The capability interface a benchmarked tool implements.
///
/// The [`crate::Driver`] owns the backend for the whole run and calls these operations in
/// a fixed order:
///
/// * `initialize` and `register_schema` once, before anything else.
/// * `load_baseline` once.
/// * `run_query` for the initial result.
/// * For every change batch: `apply_change_batch`, `await_settled`, then `run_query`.
/// * `shutdown` on every exit path.
///
/// Every failure is fatal to the run; implementations should not retry.
pub trait Backend {
    /// Prepare the backend. Called exactly once, first.
    fn initialize(&mut self) -> anyhow::Result<()>;

    /// Declare the node and relationship types the run will use.
    ///
    /// Loading or querying before this succeeds is a configuration error.
    fn register_schema(&mut self, schema: &Schema) -> anyhow::Result<()>;

    /// Ingest the baseline model stored under `path`.
    fn load_baseline(&mut self, path: &Path) -> anyhow::Result<()>;

    /// Evaluate `query` against the current state and return its ordered rows.
    fn run_query(&mut self, query: &QueryId) -> anyhow::Result<Vec<Row>>;

    /// Apply one change batch. The effects need not be visible until [`Self::await_settled`]
    /// returns.
    fn apply_change_batch(&mut self, batch: &ChangeBatch) -> anyhow::Result<()>;

    /// Block until every effect of the batches applied so far, including any derived
    /// structure maintenance, is visible to [`Self::run_query`].
    fn await_settled(&mut self) -> anyhow::Result<()>;

    /// Release all resources. Must be safe to call more than once.
    fn shutdown(&mut self) -> anyhow::Result<()>;
}

/// The name of a precompiled query such as `Q1` or `Q2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for QueryId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One result row. Never empty: column 0 identifies the row.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Row(Box<[i64]>);

#[derive(Debug, Error, PartialEq, Eq)]
#[error("a result row must have at least one column")]
pub struct EmptyRow;

impl Row {
    /// Construct a row from its identifying column followed by `rest`.
    pub fn new(id: i64, rest: impl IntoIterator<Item = i64>) -> Self {
        Self(std::iter::once(id).chain(rest).collect())
    }

    /// The identifying column.
    pub fn id(&self) -> i64 {
        self.0[0]
    }

    pub fn columns(&self) -> &[i64] {
        &self.0
    }
}

impl TryFrom<Vec<i64>> for Row {
    type Error = EmptyRow;

    fn try_from(columns: Vec<i64>) -> Result<Self, Self::Error> {
        if columns.is_empty() {
            Err(EmptyRow)
        } else {
            Ok(Self(columns.into_boxed_slice()))
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("schema does not declare node type \"{0}\"")]
    MissingNode(String),
    #[error("schema does not declare relationship type \"{0}\"")]
    MissingRelationship(String),
}

/// Node and relationship type names a backend must understand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Schema {
    nodes: Vec<String>,
    relationships: Vec<String>,
}

impl Schema {
    pub fn new<N, R>(nodes: N, relationships: R) -> Self
    where
        N: IntoIterator<Item: Into<String>>,
        R: IntoIterator<Item: Into<String>>,
    {
        Self {
            nodes: nodes.into_iter().map(Into::into).collect(),
            relationships: relationships.into_iter().map(Into::into).collect(),
        }
    }

    /// The social network: users submit posts and comments, comments reply to a parent
    /// submission, users befriend each other and like comments.
    pub fn social_network() -> Self {
        Self::new(
            ["User", "Post", "Comment"],
            ["Friend", "Likes", "Submitter", "Parent"],
        )
    }

    /// Check that every listed type is declared.
    pub fn require(&self, nodes: &[&str], relationships: &[&str]) -> Result<(), SchemaError> {
        if let Some(missing) = nodes.iter().find(|n| !self.nodes.iter().any(|m| m == *n)) {
            return Err(SchemaError::MissingNode((*missing).to_owned()));
        }
        if let Some(missing) = relationships
            .iter()
            .find(|r| !self.relationships.iter().any(|m| m == *r))
        {
            return Err(SchemaError::MissingRelationship((*missing).to_owned()));
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
#[error("change batch {sequence} not found at {path:?}")]
pub struct MissingBatch {
    pub sequence: usize,
    pub path: PathBuf,
}

/// One sequence-numbered set of mutations, stored in a file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    /// 1-based position in the change sequence.
    pub sequence: usize,
    pub path: PathBuf,
}

impl ChangeBatch {
    pub fn check_exists(&self) -> Result<(), MissingBatch> {
        if self.path.is_file() {
            Ok(())
        } else {
            Err(MissingBatch {
                sequence: self.sequence,
                path: self.path.clone(),
            })
        }
    }
}

///////////
// Tests //
///////////
