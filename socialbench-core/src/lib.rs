/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! The tool-independent half of socialbench: the [`Backend`] capability interface and
//! the [`Driver`] that sequences a run through its measured phases.

pub mod backend;
pub mod changes;
pub mod driver;
pub mod fingerprint;

pub use backend::{Backend, ChangeBatch, QueryId, Row, Schema};
pub use changes::ChangeSequence;
pub use driver::{Driver, FailureKind, PhaseFailure};
