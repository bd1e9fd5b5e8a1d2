/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use crate::backend::Row;

/// Separator between identifying columns.
pub const DELIMITER: char = '|';

/// Project every row to its identifying column and join them in row order.
///
/// Two tools agree on a result exactly when their fingerprints are equal, independent of
/// how many columns each query returns. An empty result yields an empty string.
pub fn fingerprint(rows: &[Row]) -> String {
    let mut out = String::new();
    for (i, row) in rows.iter().enumerate() {
        if i != 0 {
            out.push(DELIMITER);
        }
        out.push_str(&row.id().to_string());
    }
    out
}

///////////
// Tests //
///////////
