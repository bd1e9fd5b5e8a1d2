/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

//! Immutable metric records and their CSV rendering.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The first line of every metric stream.
pub const HEADER: &str = "Tool,View,ChangeSet,RunIndex,Iteration,PhaseName,MetricName,MetricValue";

/// A labeled stage of a run whose cost is measured independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Phase {
    Initialization,
    Loading,
    Initial,
    Updates,
}

impl Phase {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Initialization => "Initialization",
            Self::Loading => "Loading",
            Self::Initial => "Initial",
            Self::Updates => "Updates",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of quantity a [`Snapshot`] carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// Elapsed wall time in nanoseconds.
    Time,
    /// Resident memory in bytes.
    Memory,
    /// Fingerprint of a query result.
    Elements,
}

impl Metric {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Time => "Time",
            Self::Memory => "Memory",
            Self::Elements => "Elements",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Integer(u64),
    Text(String),
}

impl From<u64> for MetricValue {
    fn from(value: u64) -> Self {
        Self::Integer(value)
    }
}

impl From<String> for MetricValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for MetricValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(v) => write!(f, "{}", v),
            Self::Text(v) => f.write_str(v),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SnapshotError {
    #[error("{field} value {value:?} contains a character that cannot appear in a metric line")]
    Malformed { field: &'static str, value: String },
}

fn check_field(field: &'static str, value: &str) -> Result<(), SnapshotError> {
    if value.contains([',', '\r', '\n']) {
        Err(SnapshotError::Malformed {
            field,
            value: value.to_owned(),
        })
    } else {
        Ok(())
    }
}

/// The fixed prefix shared by every snapshot of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunLabels {
    pub tool: String,
    pub query: String,
    pub change_set: Option<String>,
    pub run_index: u64,
}

impl RunLabels {
    /// Ensure none of the labels would break the comma separated layout.
    pub fn check(&self) -> Result<(), SnapshotError> {
        check_field("tool", &self.tool)?;
        check_field("query", &self.query)?;
        if let Some(change_set) = &self.change_set {
            check_field("change set", change_set)?;
        }
        Ok(())
    }
}

/// One measured value at a given iteration and phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    iteration: u64,
    phase: Phase,
    metric: Metric,
    value: MetricValue,
}

impl Snapshot {
    /// Construct a new snapshot, rejecting text values that would corrupt the metric line.
    pub fn new(
        iteration: u64,
        phase: Phase,
        metric: Metric,
        value: impl Into<MetricValue>,
    ) -> Result<Self, SnapshotError> {
        let value = value.into();
        if let MetricValue::Text(text) = &value {
            check_field("metric", text)?;
        }

        Ok(Self {
            iteration,
            phase,
            metric,
            value,
        })
    }

    pub fn iteration(&self) -> u64 {
        self.iteration
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn metric(&self) -> Metric {
        self.metric
    }

    pub fn value(&self) -> &MetricValue {
        &self.value
    }

    /// Render `self` as a metric line in the field order of [`HEADER`].
    pub fn line<'a>(&'a self, labels: &'a RunLabels) -> impl fmt::Display + use<'a> {
        Line {
            labels,
            snapshot: self,
        }
    }
}

struct Line<'a> {
    labels: &'a RunLabels,
    snapshot: &'a Snapshot,
}

impl fmt::Display for Line<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Self { labels, snapshot } = self;
        write!(
            f,
            "{},{},{},{},{},{},{},{}",
            labels.tool,
            labels.query,
            labels.change_set.as_deref().unwrap_or(""),
            labels.run_index,
            snapshot.iteration,
            snapshot.phase,
            snapshot.metric,
            snapshot.value,
        )
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(change_set: Option<&str>) -> RunLabels {
        RunLabels {
            tool: "InMemory".into(),
            query: "Q2".into(),
            change_set: change_set.map(String::from),
            run_index: 3,
        }
    }

    #[test]
    fn header_has_eight_fields() {
        assert_eq!(HEADER.split(',').count(), 8);
    }

    #[test]
    fn renders_in_field_order() {
        let labels = labels(Some("1"));
        let s = Snapshot::new(2, Phase::Updates, Metric::Time, 1500u64).unwrap();
        assert_eq!(s.line(&labels).to_string(), "InMemory,Q2,1,3,2,Updates,Time,1500");

        let s = Snapshot::new(0, Phase::Initial, Metric::Elements, "10|4|7").unwrap();
        assert_eq!(
            s.line(&labels).to_string(),
            "InMemory,Q2,1,3,0,Initial,Elements,10|4|7"
        );
    }

    #[test]
    fn missing_change_set_is_an_empty_field() {
        let labels = labels(None);
        let s = Snapshot::new(0, Phase::Loading, Metric::Memory, 42u64).unwrap();
        assert_eq!(s.line(&labels).to_string(), "InMemory,Q2,,3,0,Loading,Memory,42");
    }

    #[test]
    fn empty_text_is_allowed() {
        let labels = labels(None);
        let s = Snapshot::new(0, Phase::Initial, Metric::Elements, "").unwrap();
        assert_eq!(s.line(&labels).to_string(), "InMemory,Q2,,3,0,Initial,Elements,");
    }

    #[test]
    fn malformed_text_is_rejected() {
        for bad in ["a,b", "a\nb", "a\rb"] {
            let err = Snapshot::new(0, Phase::Initial, Metric::Elements, bad).unwrap_err();
            assert!(matches!(err, SnapshotError::Malformed { .. }));
        }

        let mut labels = labels(None);
        labels.tool = "In,Memory".into();
        assert!(labels.check().is_err());
    }

    #[test]
    fn values_serialize_untagged() {
        let s = Snapshot::new(1, Phase::Updates, Metric::Memory, 7u64).unwrap();
        let json = serde_json::to_value(&s).unwrap();
        assert_eq!(json["value"], serde_json::json!(7));
        assert_eq!(json["phase"], serde_json::json!("Updates"));
    }
}
