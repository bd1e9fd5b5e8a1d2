/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use serde::{Deserialize, Serialize};

/// Elapsed wall time with nanosecond resolution, the unit of every `Time` metric.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(transparent)]
pub struct NanoSeconds(u64);

impl NanoSeconds {
    pub fn new(nanos: u64) -> Self {
        Self(nanos)
    }

    pub fn as_nanos(self) -> u64 {
        self.0
    }
}

impl From<std::time::Duration> for NanoSeconds {
    /// Saturates at `u64::MAX` (roughly 584 years).
    fn from(value: std::time::Duration) -> Self {
        Self::new(u64::try_from(value.as_nanos()).unwrap_or(u64::MAX))
    }
}

impl std::fmt::Display for NanoSeconds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}ns", self.0)
    }
}

/// Evaluate the expression and return `(elapsed, result)`.
#[doc(hidden)]
#[macro_export]
macro_rules! timed {
    ($($exprs:tt)*) => {{
        let start = ::std::time::Instant::now();
        let result = $($exprs)*;
        let elapsed: $crate::utils::NanoSeconds = start.elapsed().into();
        (elapsed, result)
    }}
}

///////////
// Tests //
///////////
