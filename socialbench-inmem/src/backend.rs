/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The [`Backend`] implementation.
//!
//! The network and its derived structure live on a dedicated worker thread that processes
//! jobs in submission order. Files are parsed on the calling thread; applying a change batch
//! only enqueues it, and [`Backend::await_settled`] waits for the worker to drain the queue.

use std::{
    path::Path,
    sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, SyncSender},
    thread::{self, JoinHandle},
    time::Duration,
};

use socialbench_core::{Backend, ChangeBatch, QueryId, Row, Schema, backend::SchemaError};
use thiserror::Error;

use crate::{
    maintainer::{Engine, QueryKind, Strategy},
    model::{ChangeRecord, ModelError, records},
};

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("the backend has not been initialized or was shut down")]
    NotInitialized,
    #[error("the backend is already initialized")]
    AlreadyInitialized,
    #[error("no schema has been registered")]
    SchemaMissing,
    #[error("the schema cannot support query {query}")]
    UnsupportedSchema {
        query: QueryKind,
        #[source]
        source: SchemaError,
    },
    #[error("query \"{0}\" is not supported")]
    UnsupportedQuery(String),
    #[error("query {requested} was requested, but the backend maintains {prepared}")]
    UnpreparedQuery {
        prepared: QueryKind,
        requested: QueryKind,
    },
    #[error("expected change batch {expected}, found {found}")]
    OutOfOrder { expected: usize, found: usize },
    #[error("changes did not settle within {0:?}")]
    SettleTimeout(Duration),
    #[error("could not load the baseline")]
    Load(#[source] ModelError),
    #[error("could not apply change batch {sequence}")]
    Apply {
        sequence: usize,
        #[source]
        source: ModelError,
    },
    #[error("the worker thread stopped unexpectedly")]
    WorkerGone,
    #[error("the worker thread panicked")]
    WorkerPanicked,
}

enum Job {
    Load {
        records: Vec<ChangeRecord>,
        reply: SyncSender<Result<usize, ModelError>>,
    },
    Apply {
        sequence: usize,
        records: Vec<ChangeRecord>,
    },
    Settle {
        reply: SyncSender<Result<(), BackendError>>,
    },
    Query {
        reply: SyncSender<Vec<Row>>,
    },
    /// Block the worker until `release` fires or is dropped.
    #[cfg(test)]
    Stall { release: Receiver<()> },
}

fn work(kind: QueryKind, strategy: Strategy, jobs: Receiver<Job>) {
    let mut engine = Engine::new(kind, strategy);
    // The first failed batch. Later batches are skipped, since they may depend on it.
    let mut failure: Option<(usize, ModelError)> = None;

    // A dropped reply receiver means the caller gave up waiting; there is nobody to tell.
    for job in jobs {
        match job {
            Job::Load { records, reply } => {
                let (elapsed, result) = socialbench_runner::timed!(engine.load(records));
                if let Ok(added) = &result {
                    let network = engine.network();
                    tracing::debug!(
                        added,
                        users = network.user_count(),
                        friendships = network.friendship_count(),
                        likes = network.like_count(),
                        %elapsed,
                        "baseline loaded"
                    );
                }
                let _ = reply.send(result);
            }
            Job::Apply { sequence, records } => {
                if failure.is_some() {
                    continue;
                }
                let (elapsed, result) = socialbench_runner::timed!(engine.apply(records));
                match result {
                    Ok(added) => tracing::debug!(sequence, added, %elapsed, "change batch applied"),
                    Err(source) => failure = Some((sequence, source)),
                }
            }
            Job::Settle { reply } => {
                let result = match &failure {
                    Some((sequence, source)) => Err(BackendError::Apply {
                        sequence: *sequence,
                        source: source.clone(),
                    }),
                    None => Ok(()),
                };
                let _ = reply.send(result);
            }
            Job::Query { reply } => {
                let (elapsed, rows) = socialbench_runner::timed!(engine.query());
                tracing::debug!(rows = rows.len(), %elapsed, "query evaluated");
                let _ = reply.send(rows);
            }
            #[cfg(test)]
            Job::Stall { release } => {
                let _ = release.recv();
            }
        }
    }
}

struct Worker {
    jobs: Sender<Job>,
    handle: JoinHandle<()>,
    /// Set when a settle timed out. Every later job is refused with the same error, and the
    /// worker, which may be stuck, is detached rather than joined on shutdown.
    timed_out: Option<Duration>,
}

/// An in-memory backend for one query.
pub struct InMemoryBackend {
    query: QueryKind,
    strategy: Strategy,
    settle_timeout: Option<Duration>,
    worker: Option<Worker>,
    schema: bool,
    next_sequence: usize,
}

impl InMemoryBackend {
    pub fn new(query: QueryKind, strategy: Strategy) -> Self {
        Self {
            query,
            strategy,
            settle_timeout: None,
            worker: None,
            schema: false,
            next_sequence: 1,
        }
    }

    /// Fail [`Backend::await_settled`] when the worker takes longer than `timeout`.
    /// `None` waits indefinitely.
    pub fn with_settle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.settle_timeout = timeout;
        self
    }

    pub fn query(&self) -> QueryKind {
        self.query
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    fn worker(&self) -> Result<&Worker, BackendError> {
        self.worker.as_ref().ok_or(BackendError::NotInitialized)
    }

    fn require_schema(&self) -> Result<&Worker, BackendError> {
        let worker = self.worker()?;
        if self.schema {
            Ok(worker)
        } else {
            Err(BackendError::SchemaMissing)
        }
    }

    fn submit(&self, job: Job) -> Result<(), BackendError> {
        let worker = self.require_schema()?;
        if let Some(timeout) = worker.timed_out {
            return Err(BackendError::SettleTimeout(timeout));
        }
        worker.jobs.send(job).map_err(|_| BackendError::WorkerGone)
    }

    fn request<T>(&self, job: impl FnOnce(SyncSender<T>) -> Job) -> Result<T, BackendError> {
        let (reply, response) = mpsc::sync_channel(1);
        self.submit(job(reply))?;
        response.recv().map_err(|_| BackendError::WorkerGone)
    }
}

impl Backend for InMemoryBackend {
    fn initialize(&mut self) -> anyhow::Result<()> {
        if self.worker.is_some() {
            return Err(BackendError::AlreadyInitialized.into());
        }

        let (jobs, receiver) = mpsc::channel();
        let (query, strategy) = (self.query, self.strategy);
        let handle = thread::Builder::new()
            .name(format!("inmem-{}", query))
            .spawn(move || work(query, strategy, receiver))?;

        self.worker = Some(Worker {
            jobs,
            handle,
            timed_out: None,
        });
        self.schema = false;
        self.next_sequence = 1;
        tracing::debug!(%query, ?strategy, "in-memory backend initialized");
        Ok(())
    }

    fn register_schema(&mut self, schema: &Schema) -> anyhow::Result<()> {
        self.worker()?;
        self.query
            .check_schema(schema)
            .map_err(|source| BackendError::UnsupportedSchema {
                query: self.query,
                source,
            })?;
        self.schema = true;
        Ok(())
    }

    fn load_baseline(&mut self, path: &Path) -> anyhow::Result<()> {
        self.require_schema()?;
        let records = records::read_baseline(path)?;
        let added = self
            .request(|reply| Job::Load { records, reply })?
            .map_err(BackendError::Load)?;
        tracing::info!(path = %path.display(), added, "baseline loaded");
        Ok(())
    }

    fn run_query(&mut self, query: &QueryId) -> anyhow::Result<Vec<Row>> {
        self.require_schema()?;
        let requested = QueryKind::from_id(query)?;
        if requested != self.query {
            return Err(BackendError::UnpreparedQuery {
                prepared: self.query,
                requested,
            }
            .into());
        }
        Ok(self.request(|reply| Job::Query { reply })?)
    }

    fn apply_change_batch(&mut self, batch: &ChangeBatch) -> anyhow::Result<()> {
        self.require_schema()?;
        if batch.sequence != self.next_sequence {
            return Err(BackendError::OutOfOrder {
                expected: self.next_sequence,
                found: batch.sequence,
            }
            .into());
        }

        let records = records::read_change_batch(&batch.path)?;
        self.submit(Job::Apply {
            sequence: batch.sequence,
            records,
        })?;
        self.next_sequence += 1;
        Ok(())
    }

    fn await_settled(&mut self) -> anyhow::Result<()> {
        let (reply, response) = mpsc::sync_channel(1);
        self.submit(Job::Settle { reply })?;

        let result = match self.settle_timeout {
            None => response.recv().map_err(|_| BackendError::WorkerGone),
            Some(timeout) => response.recv_timeout(timeout).map_err(|err| match err {
                RecvTimeoutError::Timeout => {
                    if let Some(worker) = self.worker.as_mut() {
                        worker.timed_out = Some(timeout);
                    }
                    BackendError::SettleTimeout(timeout)
                }
                RecvTimeoutError::Disconnected => BackendError::WorkerGone,
            }),
        };
        Ok(result??)
    }

    fn shutdown(&mut self) -> anyhow::Result<()> {
        let Some(Worker {
            jobs,
            handle,
            timed_out,
        }) = self.worker.take()
        else {
            return Ok(());
        };
        self.schema = false;

        // Closing the queue ends the worker loop.
        drop(jobs);
        if timed_out.is_some() {
            tracing::warn!("detaching a worker that did not settle in time");
            return Ok(());
        }
        handle.join().map_err(|_| BackendError::WorkerPanicked)?;
        tracing::debug!("in-memory backend shut down");
        Ok(())
    }
}

impl Drop for InMemoryBackend {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            tracing::warn!(error = %err, "in-memory backend did not shut down cleanly");
        }
    }
}

///////////
// Tests //
///////////
