/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! An in-memory implementation of [`socialbench_core::Backend`].
//!
//! The social network is held in hash maps. Query results are kept in derived structures
//! that are either maintained incrementally from the delta of each change batch
//! ([`Strategy::Incremental`]) or rebuilt after every batch ([`Strategy::Batch`]).

pub mod backend;
pub mod maintainer;
pub mod model;
pub mod overlay;
pub mod ranking;
pub mod threads;

#[cfg(test)]
mod testing;

pub use backend::{BackendError, InMemoryBackend};
pub use maintainer::{QueryKind, Strategy};
pub use model::{ChangeRecord, Delta, ModelError, SocialNetwork};
