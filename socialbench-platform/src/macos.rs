/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

fn max_rss() -> Option<u64> {
    use libc::{RUSAGE_SELF, getrusage, rusage};

    // SAFETY: `rusage` is plain old data and `getrusage` fills it in.
    let mut usage: rusage = unsafe { std::mem::zeroed() };
    let result = unsafe { getrusage(RUSAGE_SELF, &mut usage) };

    if result == 0 {
        // On macOS, ru_maxrss is in bytes (unlike Linux where it's in kilobytes)
        return Some(usage.ru_maxrss as u64);
    }

    None
}

/// The current resident set size is not exposed through `libc` on macOS.
///
/// Callers fall back to [`get_peak_resident_set_size`].
pub fn get_resident_set_size() -> Option<u64> {
    None
}

/// Retrieves the peak resident set size of the process in bytes via `getrusage`.
pub fn get_peak_resident_set_size() -> Option<u64> {
    max_rss()
}

/// The system allocator on macOS has no trim entry point.
pub fn trim_heap() -> bool {
    false
}
