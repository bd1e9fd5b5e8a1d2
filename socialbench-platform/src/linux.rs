/*
 * Copyright (c) Microsoft Corporation.
 * Licensed under the MIT license.
 */

use std::{
    fs::File,
    io::{self, BufRead},
    path::Path,
};

/// Look up a `kB` valued field such as `VmRSS:` in `/proc/self/status` and return it in
/// bytes.
fn status_field_bytes(field: &str) -> Option<u64> {
    let file = File::open(Path::new("/proc/self/status")).ok()?;
    let reader = io::BufReader::new(file);

    for line in reader.lines() {
        let line = line.ok()?;
        if let Some(rest) = line.strip_prefix(field) {
            let kilobytes = rest.split_whitespace().next()?.parse::<u64>().ok()?;
            return Some(kilobytes * 1024);
        }
    }

    None
}

/// Retrieves the current resident set size of the process in bytes.
///
/// This reads the `VmRSS` field of `/proc/self/status`.
pub fn get_resident_set_size() -> Option<u64> {
    status_field_bytes("VmRSS:")
}

/// Retrieves the peak resident set size of the process in bytes.
///
/// This reads the `VmHWM` field of `/proc/self/status`, which records the maximum amount
/// of memory held in RAM at any point in time. The value might be inaccurate, according to
/// https://manpages.ubuntu.com/manpages/jammy/man5/proc.5.html.
pub fn get_peak_resident_set_size() -> Option<u64> {
    status_field_bytes("VmHWM:")
}

/// Ask the allocator to release free heap memory back to the operating system.
///
/// Returns `true` if memory was actually released. Only glibc provides `malloc_trim`;
/// other C libraries report `false`.
pub fn trim_heap() -> bool {
    #[cfg(target_env = "gnu")]
    {
        // SAFETY: `malloc_trim` has no preconditions and only touches allocator state.
        unsafe { libc::malloc_trim(0) == 1 }
    }

    #[cfg(not(target_env = "gnu"))]
    {
        false
    }
}

///////////
// Tests //
///////////

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resident_set_is_reported() {
        let rss = get_resident_set_size().unwrap();
        assert!(rss > 0);

        let peak = get_peak_resident_set_size().unwrap();
        assert!(peak > 0);
    }

    #[test]
    fn trimming_does_not_break_sampling() {
        let buffer: Vec<u8> = vec![1; 1 << 20];
        drop(buffer);

        let _ = trim_heap();
        assert!(get_resident_set_size().is_some());
    }

    #[test]
    fn unknown_fields_are_none() {
        assert!(status_field_bytes("NotAField:").is_none());
    }
}
